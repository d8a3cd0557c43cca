//! Accounts service
//!
//! Signup and login, registered on their own polling connection so
//! authentication traffic stays off the main economy channel. Login is a
//! plain credential check; no session or token is issued.

use gems_core::{expect_args, Dispatcher, Ledger, INVALID_REQUEST};
use gems_types::{Identity, Reply};
use std::sync::Arc;
use tracing::{error, info};

pub struct Accounts {
    ledger: Arc<Ledger>,
}

impl Accounts {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn register(self: &Arc<Self>, dispatcher: &mut Dispatcher) {
        let svc = self.clone();
        dispatcher.register("signup", move |args| {
            let svc = svc.clone();
            async move { svc.signup(args).await }
        });

        let svc = self.clone();
        dispatcher.register("login", move |args| {
            let svc = svc.clone();
            async move { svc.login(args).await }
        });
    }

    pub async fn signup(&self, args: Vec<String>) -> Reply {
        let Some([password, username]) = expect_args::<2>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(username);
        if self.ledger.has_credential(&id).await {
            return Reply::from("You Already Have An Account!");
        }
        if let Err(e) = self.ledger.set_credential(&id, password.to_string()).await {
            error!("Credential for {} persisted only in memory: {}", id, e);
        }
        info!("New account: {}", id);
        Reply::from(format!("Welcome {}!", id))
    }

    pub async fn login(&self, args: Vec<String>) -> Reply {
        let Some([password, username]) = expect_args::<2>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(username);
        match self.ledger.credential(&id).await {
            None => Reply::from("User Not Found!"),
            Some(stored) if stored != password => Reply::from("Incorrect Password!"),
            Some(_) => Reply::from(format!("Welcome {}!", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::test_ledger;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn signup_welcomes_new_users() {
        let accounts = Accounts::new(test_ledger().await);

        assert_eq!(
            accounts.signup(args(&["pw1", "Dave"])).await,
            Reply::from("Welcome dave!")
        );
    }

    #[tokio::test]
    async fn duplicate_signup_keeps_the_first_credential() {
        let ledger = test_ledger().await;
        let accounts = Accounts::new(ledger.clone());

        accounts.signup(args(&["pw1", "dave"])).await;
        assert_eq!(
            accounts.signup(args(&["pw2", "dave"])).await,
            Reply::from("You Already Have An Account!")
        );
        assert_eq!(
            ledger.credential(&Identity::new("dave")).await,
            Some("pw1".to_string())
        );
    }

    #[tokio::test]
    async fn login_checks_the_stored_secret() {
        let accounts = Accounts::new(test_ledger().await);
        accounts.signup(args(&["pw1", "dave"])).await;

        assert_eq!(
            accounts.login(args(&["pw1", "dave"])).await,
            Reply::from("Welcome dave!")
        );
        assert_eq!(
            accounts.login(args(&["wrong", "dave"])).await,
            Reply::from("Incorrect Password!")
        );
        assert_eq!(
            accounts.login(args(&["pw1", "nobody"])).await,
            Reply::from("User Not Found!")
        );
    }

    #[tokio::test]
    async fn aliases_collapse_to_one_account() {
        let accounts = Accounts::new(test_ledger().await);

        accounts.signup(args(&["pw1", "Da Ve"])).await;
        assert_eq!(
            accounts.signup(args(&["pw2", "@dave"])).await,
            Reply::from("You Already Have An Account!")
        );
    }
}
