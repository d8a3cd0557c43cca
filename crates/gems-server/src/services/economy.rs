//! Economy service
//!
//! The operations registered on the main polling channel. Handlers parse
//! their positional arguments explicitly, then read or mutate the ledger;
//! transfers delegate to the transfer engine.

use gems_core::{expect_args, Dispatcher, Ledger, TransferEngine, TransferOutcome, INVALID_REQUEST};
use gems_types::{Identity, Preferences, Reply};
use std::sync::Arc;
use tracing::{error, warn};

pub struct Economy {
    ledger: Arc<Ledger>,
    engine: TransferEngine,
}

impl Economy {
    pub fn new(ledger: Arc<Ledger>, engine: TransferEngine) -> Self {
        Self { ledger, engine }
    }

    /// Register every economy operation on the given dispatcher.
    pub fn register(self: &Arc<Self>, dispatcher: &mut Dispatcher) {
        dispatcher.register("ping", |_args| async { Reply::from("pong") });

        let svc = self.clone();
        dispatcher.register("balance", move |args| {
            let svc = svc.clone();
            async move { svc.balance(args).await }
        });

        let svc = self.clone();
        dispatcher.register("give", move |args| {
            let svc = svc.clone();
            async move { svc.give(args).await }
        });

        let svc = self.clone();
        dispatcher.register("search", move |args| {
            let svc = svc.clone();
            async move { svc.search(args).await }
        });

        let svc = self.clone();
        dispatcher.register("leaderboard", move |args| {
            let svc = svc.clone();
            async move { svc.leaderboard(args).await }
        });

        let svc = self.clone();
        dispatcher.register("notifications", move |args| {
            let svc = svc.clone();
            async move { svc.notifications(args).await }
        });

        let svc = self.clone();
        dispatcher.register("change_balance", move |args| {
            let svc = svc.clone();
            async move { svc.change_balance(args).await }
        });

        let svc = self.clone();
        dispatcher.register("get_preferences", move |args| {
            let svc = svc.clone();
            async move { svc.get_preferences(args).await }
        });

        let svc = self.clone();
        dispatcher.register("set_preferences", move |args| {
            let svc = svc.clone();
            async move { svc.set_preferences(args).await }
        });
    }

    /// Materialize the signup default if needed and reply the rounded
    /// balance.
    pub async fn balance(&self, args: Vec<String>) -> Reply {
        let Some([user]) = expect_args::<1>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(user);
        match self.ledger.ensure_balance(&id).await {
            Ok(balance) => Reply::from(balance),
            Err(e) => {
                error!("Balance default for {} persisted only in memory: {}", id, e);
                Reply::from(self.ledger.balance(&id).await)
            }
        }
    }

    pub async fn give(&self, args: Vec<String>) -> Reply {
        let Some([amount, users]) = expect_args::<2>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        match self.engine.transfer(amount, users).await {
            TransferOutcome::Completed { sender_balance } => Reply::from(sender_balance),
            TransferOutcome::InsufficientBalance => Reply::from("Insufficient balance."),
            TransferOutcome::InvalidRequest => Reply::from(INVALID_REQUEST),
        }
    }

    pub async fn search(&self, args: Vec<String>) -> Reply {
        let Some([user]) = expect_args::<1>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(user);
        match self.ledger.raw_balance(&id).await {
            Some(_) => Reply::from(format!(
                "{} has {} Gems!",
                id,
                self.ledger.balance(&id).await
            )),
            None => Reply::from(format!("{}'s balance couldn't be found.", id)),
        }
    }

    /// Top 10 balances, formatted one entry per line.
    pub async fn leaderboard(&self, _args: Vec<String>) -> Reply {
        let top = self.ledger.top_balances(10).await;
        Reply::List(
            top.into_iter()
                .map(|(id, amount)| format!("{}: {}", id, amount as i64))
                .collect(),
        )
    }

    pub async fn notifications(&self, args: Vec<String>) -> Reply {
        let Some([user]) = expect_args::<1>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        Reply::List(self.ledger.notifications(&Identity::new(user)).await)
    }

    /// Unconditional balance overwrite. There is no caller authentication
    /// on this operation, so every use is logged loudly.
    pub async fn change_balance(&self, args: Vec<String>) -> Reply {
        let Some([user, amount]) = expect_args::<2>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let Ok(amount) = amount.trim().parse::<f64>() else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(user);
        warn!("Unauthenticated change_balance: {} set to {}", id, amount);
        if let Err(e) = self.ledger.set_balance(&id, amount).await {
            error!("change_balance for {} persisted only in memory: {}", id, e);
        }
        Reply::from("success!")
    }

    /// Preference values only (not keys), theme first.
    pub async fn get_preferences(&self, args: Vec<String>) -> Reply {
        let Some([user]) = expect_args::<1>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        Reply::List(self.ledger.preferences(&Identity::new(user)).await.values())
    }

    /// Overwrite preferences with the given theme. Mute always resets to
    /// its default; the wire contract has no way to set it here.
    pub async fn set_preferences(&self, args: Vec<String>) -> Reply {
        let Some([theme, user]) = expect_args::<2>(&args) else {
            return Reply::from(INVALID_REQUEST);
        };
        let id = Identity::new(user);
        if let Err(e) = self
            .ledger
            .set_preferences(&id, Preferences::with_theme(theme))
            .await
        {
            error!("Preferences for {} persisted only in memory: {}", id, e);
        }
        Reply::from("updated preferences")
    }
}
