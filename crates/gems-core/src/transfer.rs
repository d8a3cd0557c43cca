//! The transfer engine
//!
//! Validates and executes a balance transfer between two identities:
//! debit, credit, a notification for each party, a profile comment for the
//! recipient, and one transaction record. The steps are sequential and not
//! atomic; a failure partway leaves the earlier steps committed, and a
//! failed comment post is reported the same way as a validation failure.

use crate::error::Result;
use crate::ledger::{Ledger, DEFAULT_BALANCE};
use crate::ports::CommentPoster;
use gems_types::Identity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome of a transfer attempt, mapped 1:1 onto the wire replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Sender's new rounded balance.
    Completed { sender_balance: i64 },
    /// Amount was not strictly positive, or the sender cannot cover it.
    InsufficientBalance,
    /// Amount failed to parse, the users field was malformed, or a side
    /// effect errored mid-sequence.
    InvalidRequest,
}

pub struct TransferEngine {
    ledger: Arc<Ledger>,
    comments: Arc<dyn CommentPoster>,
    project_name: String,
    project_url: String,
}

impl TransferEngine {
    pub fn new(
        ledger: Arc<Ledger>,
        comments: Arc<dyn CommentPoster>,
        project_name: String,
        project_url: String,
    ) -> Self {
        Self {
            ledger,
            comments,
            project_name,
            project_url,
        }
    }

    /// Execute a transfer described by raw wire arguments.
    ///
    /// The users field is `"<recipient> <sender...>"`, split on the first
    /// space only - the sender part may itself contain spaces and is taken
    /// whole before normalization.
    pub async fn transfer(&self, raw_amount: &str, raw_users: &str) -> TransferOutcome {
        let Ok(amount) = raw_amount.trim().parse::<f64>() else {
            return TransferOutcome::InvalidRequest;
        };
        let Some((recipient_raw, sender_raw)) = raw_users.split_once(' ') else {
            return TransferOutcome::InvalidRequest;
        };
        let recipient = Identity::new(recipient_raw);
        let sender = Identity::new(sender_raw);

        // An unseen sender has nothing to give: the signup default does not
        // apply on the debit side.
        let sender_balance = self.ledger.raw_balance(&sender).await.unwrap_or(0.0);
        if !(amount > 0.0 && sender_balance >= amount) {
            return TransferOutcome::InsufficientBalance;
        }

        if let Err(e) = self.ledger.set_balance(&sender, sender_balance - amount).await {
            warn!("Debit of {} persisted only in memory: {}", sender, e);
        }
        let recipient_balance = self
            .ledger
            .raw_balance(&recipient)
            .await
            .unwrap_or(DEFAULT_BALANCE);
        if let Err(e) = self
            .ledger
            .set_balance(&recipient, recipient_balance + amount)
            .await
        {
            warn!("Credit of {} persisted only in memory: {}", recipient, e);
        }

        let ts = readable_timestamp();
        let sender_note = format!("{} - You gave {} Gems to {}!", ts, amount, recipient);
        let recipient_note = format!("{} - {} gave you {} Gems", ts, sender, amount);
        if let Err(e) = self.ledger.push_notification(&sender, sender_note).await {
            warn!("Notification for {} persisted only in memory: {}", sender, e);
        }
        if let Err(e) = self.ledger.push_notification(&recipient, recipient_note).await {
            warn!("Notification for {} persisted only in memory: {}", recipient, e);
        }

        // The comment is the one side effect that aborts the sequence: the
        // balances above are already committed, and that partial state is
        // part of the documented contract.
        if let Err(e) = self.announce(&sender, &recipient, amount).await {
            error!(
                "Comment post for transfer {} -> {} failed: {}",
                sender, recipient, e
            );
            return TransferOutcome::InvalidRequest;
        }

        if let Err(e) = self
            .ledger
            .record_transaction(sender.clone(), recipient.clone(), amount)
            .await
        {
            warn!("Transaction record persisted only in memory: {}", e);
        }

        info!("{} gave {} Gems to {}", sender, amount, recipient);
        TransferOutcome::Completed {
            sender_balance: self.ledger.balance(&sender).await,
        }
    }

    async fn announce(&self, sender: &Identity, recipient: &Identity, amount: f64) -> Result<()> {
        let text = format!(
            "@{} gave you {} Gems in {} {}",
            sender, amount, self.project_name, self.project_url
        );
        self.comments.post_comment(recipient, &text).await
    }
}

/// Human-readable local timestamp used in transfer notifications.
fn readable_timestamp() -> String {
    chrono::Local::now().format("%H:%M on %m/%d/%y").to_string()
}
