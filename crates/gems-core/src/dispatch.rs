//! Request dispatch for the polling channels
//!
//! A dispatcher is a registry of operation name to async handler. The
//! transport delivers positional string arguments; handlers validate and
//! parse them explicitly before touching any state.

use crate::error::Result;
use crate::ports::RequestChannel;
use futures::future::BoxFuture;
use gems_types::{Reply, Request};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reply for malformed arguments, shared by every operation.
pub const INVALID_REQUEST: &str = "Invalid request.";

type Handler = Arc<dyn Fn(Vec<String>) -> BoxFuture<'static, Reply> + Send + Sync>;

/// Named-operation registry for one polling connection.
pub struct Dispatcher {
    channel_name: String,
    handlers: HashMap<String, Handler>,
}

impl Dispatcher {
    pub fn new(channel_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for an operation name.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Reply> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |args| Box::pin(handler(args)));
        self.handlers.insert(name.to_string(), handler);
    }

    /// Look up and invoke the handler for one request.
    pub async fn dispatch(&self, request: &Request) -> Reply {
        match self.handlers.get(&request.name) {
            Some(handler) => {
                debug!(
                    "Dispatching '{}' on {} channel",
                    request.name, self.channel_name
                );
                handler(request.args.clone()).await
            }
            None => {
                warn!(
                    "Unknown request '{}' on {} channel",
                    request.name, self.channel_name
                );
                Reply::from("Unknown request.")
            }
        }
    }

    /// Serve requests from an established channel until it closes.
    pub async fn run(&self, mut channel: impl RequestChannel) -> Result<()> {
        info!("{} request handler is running", self.channel_name);
        while let Some(request) = channel.next_request().await? {
            let reply = self.dispatch(&request).await;
            channel.send_reply(&request, reply).await?;
        }
        info!("{} channel closed", self.channel_name);
        Ok(())
    }
}

/// Borrow exactly `N` positional arguments, or nothing.
pub fn expect_args<const N: usize>(args: &[String]) -> Option<[&str; N]> {
    if args.len() != N {
        return None;
    }
    let mut out = [""; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_str();
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GemsError;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct ScriptedChannel {
        pending: VecDeque<Request>,
        replies: Arc<std::sync::Mutex<Vec<(String, Reply)>>>,
    }

    #[async_trait]
    impl RequestChannel for ScriptedChannel {
        async fn next_request(&mut self) -> Result<Option<Request>> {
            Ok(self.pending.pop_front())
        }

        async fn send_reply(&mut self, request: &Request, reply: Reply) -> Result<()> {
            self.replies.lock().unwrap().push((request.id.clone(), reply));
            Ok(())
        }
    }

    fn request(name: &str, args: &[&str]) -> Request {
        Request {
            id: "1".to_string(),
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn dispatches_to_registered_handler() {
        let mut dispatcher = Dispatcher::new("main");
        dispatcher.register("ping", |_args| async { Reply::from("pong") });

        let reply = dispatcher.dispatch(&request("ping", &[])).await;
        assert_eq!(reply, Reply::from("pong"));
    }

    #[tokio::test]
    async fn unknown_operation_gets_a_generic_reply() {
        let dispatcher = Dispatcher::new("main");
        let reply = dispatcher.dispatch(&request("nope", &[])).await;
        assert_eq!(reply, Reply::from("Unknown request."));
    }

    #[tokio::test]
    async fn run_replies_to_each_request_in_order() {
        let mut dispatcher = Dispatcher::new("main");
        dispatcher.register("echo", |args| async move { Reply::from(args.join(",")) });

        let replies = Arc::new(std::sync::Mutex::new(Vec::new()));
        let channel = ScriptedChannel {
            pending: VecDeque::from([request("echo", &["a"]), request("echo", &["b", "c"])]),
            replies: replies.clone(),
        };

        dispatcher.run(channel).await.unwrap();
        assert_eq!(
            *replies.lock().unwrap(),
            vec![
                ("1".to_string(), Reply::from("a")),
                ("1".to_string(), Reply::from("b,c")),
            ]
        );
    }

    #[tokio::test]
    async fn channel_errors_propagate_out_of_run() {
        struct BrokenChannel;

        #[async_trait]
        impl RequestChannel for BrokenChannel {
            async fn next_request(&mut self) -> Result<Option<Request>> {
                Err(GemsError::Transport("connection reset".to_string()))
            }

            async fn send_reply(&mut self, _request: &Request, _reply: Reply) -> Result<()> {
                Ok(())
            }
        }

        let dispatcher = Dispatcher::new("main");
        assert!(dispatcher.run(BrokenChannel).await.is_err());
    }

    #[test]
    fn expect_args_checks_arity() {
        let args = vec!["a".to_string(), "b".to_string()];
        assert_eq!(expect_args::<2>(&args), Some(["a", "b"]));
        assert_eq!(expect_args::<1>(&args), None);
        assert_eq!(expect_args::<3>(&args), None);
    }
}
