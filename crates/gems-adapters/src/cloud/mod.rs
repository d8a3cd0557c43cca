//! Cloud-variable request channel
//!
//! Connects to a project's cloud-variable feed over WebSocket and speaks
//! the polled request/reply contract: requests arrive as numeric frames in
//! the request variable, replies are written to the response variable.

pub mod codec;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use gems_core::{GemsError, RequestChannel, Result};
use gems_types::{Reply, Request};
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One established cloud-variable connection.
pub struct CloudChannel {
    ws: WsStream,
    username: String,
    project_id: u64,
    request_var: String,
    response_var: String,
    /// Last raw request payload, so re-broadcasts of the same variable
    /// value are not dispatched twice.
    last_payload: Option<String>,
    pending: VecDeque<Request>,
}

/// Variable updates arrive batched as JSON lines.
#[derive(Debug, Deserialize)]
struct SetMessage {
    method: String,
    name: String,
    value: serde_json::Value,
}

impl CloudChannel {
    /// Open the WebSocket and perform the join handshake. The dispatcher
    /// logs its ready line once this returns.
    pub async fn connect(
        ws_url: &str,
        username: &str,
        project_id: u64,
        request_var: &str,
        response_var: &str,
    ) -> Result<Self> {
        let (mut ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| GemsError::Transport(e.to_string()))?;

        let handshake = json!({
            "method": "handshake",
            "user": username,
            "project_id": project_id.to_string(),
        });
        ws.send(Message::Text(format!("{}\n", handshake)))
            .await
            .map_err(|e| GemsError::Transport(e.to_string()))?;

        info!("Cloud channel to project {} established", project_id);
        Ok(Self {
            ws,
            username: username.to_string(),
            project_id,
            request_var: format!("\u{2601} {}", request_var),
            response_var: format!("\u{2601} {}", response_var),
            last_payload: None,
            pending: VecDeque::new(),
        })
    }

    fn take_requests(&mut self, text: &str) {
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let set: SetMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Ignoring non-JSON cloud frame: {}", e);
                    continue;
                }
            };
            if set.method != "set" || set.name != self.request_var {
                continue;
            }
            let raw = match set.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            if self.last_payload.as_deref() == Some(raw.as_str()) {
                continue;
            }
            self.last_payload = Some(raw.clone());

            match codec::decode(&raw).and_then(|text| codec::parse_request(&text)) {
                Ok(request) => self.pending.push_back(request),
                Err(e) => warn!("Dropping malformed request frame: {}", e),
            }
        }
    }
}

#[async_trait]
impl RequestChannel for CloudChannel {
    async fn next_request(&mut self) -> Result<Option<Request>> {
        loop {
            if let Some(request) = self.pending.pop_front() {
                return Ok(Some(request));
            }
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => self.take_requests(&text),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(GemsError::Transport(e.to_string())),
            }
        }
    }

    async fn send_reply(&mut self, request: &Request, reply: Reply) -> Result<()> {
        let value = codec::encode_reply(&request.id, &reply);
        let message = json!({
            "method": "set",
            "user": self.username,
            "project_id": self.project_id.to_string(),
            "name": self.response_var,
            "value": value,
        });
        self.ws
            .send(Message::Text(format!("{}\n", message)))
            .await
            .map_err(|e| GemsError::Transport(e.to_string()))
    }
}
