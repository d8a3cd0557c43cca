//! Transaction records

use crate::Identity;
use serde::{Deserialize, Serialize};

/// One completed balance transfer, append-only.
///
/// The id is `"{epoch_seconds}_{sender}"`. Two transfers from the same
/// sender within the same second collide on id; the ledger keeps the id
/// format as-is because it is part of the external read surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub timestamp: i64,
    pub id: String,
    pub from: Identity,
    pub to: Identity,
    pub amount: f64,
}

impl Transaction {
    pub fn new(timestamp: i64, from: Identity, to: Identity, amount: f64) -> Self {
        let id = format!("{}_{}", timestamp, from);
        Self {
            timestamp,
            id,
            from,
            to,
            amount,
        }
    }

    /// Whether the given identity participated as sender or recipient.
    pub fn involves(&self, id: &Identity) -> bool {
        &self.from == id || &self.to == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_epoch_then_sender() {
        let tx = Transaction::new(1700000000, "Some Body".into(), "other".into(), 5.0);
        assert_eq!(tx.id, "1700000000_somebody");
    }

    #[test]
    fn involves_matches_either_side() {
        let tx = Transaction::new(1, "a".into(), "b".into(), 1.0);
        assert!(tx.involves(&"a".into()));
        assert!(tx.involves(&"b".into()));
        assert!(!tx.involves(&"c".into()));
    }
}
