//! The ledger store
//!
//! Five independent named mappings (balances, notifications, transactions,
//! preferences, credentials), each loaded once at startup, held in memory
//! behind its own async mutex, and written back to the blob store in full
//! after every mutation. The lock is held across the remote round trip, so
//! mutations to one mapping are strictly serialized.

use crate::error::{GemsError, Result};
use crate::ports::BlobStore;
use gems_types::{Identity, Preferences, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Balance granted to an identity that has never been seen before.
pub const DEFAULT_BALANCE: f64 = 100.0;

/// Placeholder returned when an identity has no notifications yet.
pub const NO_NOTIFICATIONS: &str = "No notifications!";

const BALANCES: &str = "balances";
const NOTIFICATIONS: &str = "notifications";
const TRANSACTIONS: &str = "transactions";
const PREFERENCES: &str = "preferences";
const CREDENTIALS: &str = "credentials";

/// One mapping plus the revision token it was last read or written at.
struct Slot<T> {
    data: T,
    revision: Option<String>,
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            revision: None,
        }
    }
}

/// Blob-backed store for the five ledger mappings.
pub struct Ledger {
    store: Arc<dyn BlobStore>,
    balances: Mutex<Slot<HashMap<Identity, f64>>>,
    notifications: Mutex<Slot<HashMap<Identity, Vec<String>>>>,
    transactions: Mutex<Slot<BTreeMap<String, Transaction>>>,
    preferences: Mutex<Slot<HashMap<Identity, Preferences>>>,
    credentials: Mutex<Slot<HashMap<Identity, String>>>,
}

impl Ledger {
    /// Load all five mappings. A missing blob or an unreadable one starts
    /// that mapping empty; the service comes up either way.
    pub async fn open(store: Arc<dyn BlobStore>) -> Self {
        let balances = Mutex::new(load_slot(store.as_ref(), BALANCES).await);
        let notifications = Mutex::new(load_slot(store.as_ref(), NOTIFICATIONS).await);
        let transactions = Mutex::new(load_slot(store.as_ref(), TRANSACTIONS).await);
        let preferences = Mutex::new(load_slot(store.as_ref(), PREFERENCES).await);
        let credentials = Mutex::new(load_slot(store.as_ref(), CREDENTIALS).await);
        Self {
            store,
            balances,
            notifications,
            transactions,
            preferences,
            credentials,
        }
    }

    // ---- balances ----

    /// Stored balance rounded for display, or the default for an unseen
    /// identity. Does not materialize the default into storage.
    pub async fn balance(&self, id: &Identity) -> i64 {
        let slot = self.balances.lock().await;
        round(slot.data.get(id).copied().unwrap_or(DEFAULT_BALANCE))
    }

    /// Raw stored balance, if the identity has one.
    pub async fn raw_balance(&self, id: &Identity) -> Option<f64> {
        let slot = self.balances.lock().await;
        slot.data.get(id).copied()
    }

    /// Store a raw balance and persist the mapping.
    pub async fn set_balance(&self, id: &Identity, amount: f64) -> Result<()> {
        let mut slot = self.balances.lock().await;
        slot.data.insert(id.clone(), amount);
        self.persist(BALANCES, &mut slot).await
    }

    /// Materialize the default balance for an unseen identity, then return
    /// the rounded balance.
    pub async fn ensure_balance(&self, id: &Identity) -> Result<i64> {
        let mut slot = self.balances.lock().await;
        if !slot.data.contains_key(id) {
            slot.data.insert(id.clone(), DEFAULT_BALANCE);
            self.persist(BALANCES, &mut slot).await?;
        }
        Ok(round(slot.data.get(id).copied().unwrap_or(DEFAULT_BALANCE)))
    }

    pub async fn user_count(&self) -> usize {
        self.balances.lock().await.data.len()
    }

    pub async fn total_balance(&self) -> i64 {
        let slot = self.balances.lock().await;
        round(slot.data.values().sum())
    }

    /// All known identities, sorted for deterministic listings.
    pub async fn users(&self) -> Vec<Identity> {
        let slot = self.balances.lock().await;
        let mut users: Vec<Identity> = slot.data.keys().cloned().collect();
        users.sort();
        users
    }

    /// Snapshot of every balance, rounded for display.
    pub async fn balances_rounded(&self) -> BTreeMap<Identity, i64> {
        let slot = self.balances.lock().await;
        slot.data
            .iter()
            .map(|(id, amount)| (id.clone(), round(*amount)))
            .collect()
    }

    /// The `n` richest identities with their raw balances, descending.
    /// Ties break on identity so the order is stable across calls.
    pub async fn top_balances(&self, n: usize) -> Vec<(Identity, f64)> {
        let slot = self.balances.lock().await;
        let mut entries: Vec<(Identity, f64)> = slot
            .data
            .iter()
            .map(|(id, amount)| (id.clone(), *amount))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    // ---- notifications ----

    /// Append a message to the identity's notification sequence, creating
    /// the sequence if absent.
    pub async fn push_notification(&self, id: &Identity, message: String) -> Result<()> {
        let mut slot = self.notifications.lock().await;
        slot.data.entry(id.clone()).or_default().push(message);
        self.persist(NOTIFICATIONS, &mut slot).await
    }

    /// The identity's notifications, oldest first, or the single-element
    /// placeholder when there are none.
    pub async fn notifications(&self, id: &Identity) -> Vec<String> {
        let slot = self.notifications.lock().await;
        slot.data
            .get(id)
            .cloned()
            .unwrap_or_else(|| vec![NO_NOTIFICATIONS.to_string()])
    }

    // ---- transactions ----

    /// Record one transfer. The id is derived from the current epoch
    /// second and the sender; a same-second repeat from one sender replaces
    /// the earlier record, which is logged but not prevented.
    pub async fn record_transaction(
        &self,
        from: Identity,
        to: Identity,
        amount: f64,
    ) -> Result<Transaction> {
        let timestamp = chrono::Utc::now().timestamp();
        let tx = Transaction::new(timestamp, from, to, amount);
        let mut slot = self.transactions.lock().await;
        if slot.data.insert(tx.id.clone(), tx.clone()).is_some() {
            warn!("Transaction id collision, replaced earlier record: {}", tx.id);
        }
        self.persist(TRANSACTIONS, &mut slot).await?;
        Ok(tx)
    }

    /// Every recorded transaction, in id order.
    pub async fn transactions(&self) -> Vec<Transaction> {
        let slot = self.transactions.lock().await;
        slot.data.values().cloned().collect()
    }

    /// Transactions where the identity is sender or recipient.
    pub async fn transactions_for(&self, id: &Identity) -> Vec<Transaction> {
        let slot = self.transactions.lock().await;
        slot.data
            .values()
            .filter(|tx| tx.involves(id))
            .cloned()
            .collect()
    }

    // ---- preferences ----

    /// Overwrite (not merge) the identity's preferences.
    pub async fn set_preferences(&self, id: &Identity, prefs: Preferences) -> Result<()> {
        let mut slot = self.preferences.lock().await;
        slot.data.insert(id.clone(), prefs);
        self.persist(PREFERENCES, &mut slot).await
    }

    /// Stored preferences, or the defaults when absent.
    pub async fn preferences(&self, id: &Identity) -> Preferences {
        let slot = self.preferences.lock().await;
        slot.data.get(id).cloned().unwrap_or_default()
    }

    // ---- credentials ----

    pub async fn credential(&self, id: &Identity) -> Option<String> {
        let slot = self.credentials.lock().await;
        slot.data.get(id).cloned()
    }

    pub async fn has_credential(&self, id: &Identity) -> bool {
        let slot = self.credentials.lock().await;
        slot.data.contains_key(id)
    }

    /// Store the signup secret for a new identity. Does not overwrite;
    /// signup rejects existing identities before calling this.
    pub async fn set_credential(&self, id: &Identity, secret: String) -> Result<()> {
        let mut slot = self.credentials.lock().await;
        slot.data.insert(id.clone(), secret);
        self.persist(CREDENTIALS, &mut slot).await
    }

    // ---- persistence ----

    /// Serialize the whole mapping and write it back conditionally. A
    /// revision conflict is retried once against the store's current
    /// revision, then propagated; any other store failure keeps the
    /// in-memory state and the old revision (the remote copy may now lag,
    /// which is logged).
    async fn persist<T>(&self, name: &str, slot: &mut Slot<T>) -> Result<()>
    where
        T: Serialize + Send,
    {
        let content = serde_json::to_vec_pretty(&slot.data)?;
        match self.store.save(name, &content, slot.revision.as_deref()).await {
            Ok(revision) => {
                slot.revision = Some(revision);
                Ok(())
            }
            Err(GemsError::RevisionConflict(_)) => {
                warn!("Revision conflict saving '{}', refreshing and retrying", name);
                let current = match self.store.load(name).await {
                    Ok(blob) => blob.map(|b| b.revision),
                    Err(e) => {
                        return Err(GemsError::Persist {
                            mapping: name.to_string(),
                            message: e.to_string(),
                        })
                    }
                };
                match self.store.save(name, &content, current.as_deref()).await {
                    Ok(revision) => {
                        slot.revision = Some(revision);
                        Ok(())
                    }
                    Err(e) => Err(GemsError::Persist {
                        mapping: name.to_string(),
                        message: e.to_string(),
                    }),
                }
            }
            Err(e) => {
                warn!("Failed to save '{}', remote copy may lag: {}", name, e);
                Ok(())
            }
        }
    }
}

fn round(amount: f64) -> i64 {
    amount.round() as i64
}

async fn load_slot<T>(store: &dyn BlobStore, name: &str) -> Slot<T>
where
    T: DeserializeOwned + Default,
{
    match store.load(name).await {
        Ok(Some(blob)) => match serde_json::from_slice(&blob.content) {
            Ok(data) => Slot {
                data,
                revision: Some(blob.revision),
            },
            Err(e) => {
                warn!("Blob '{}' is unreadable, starting fresh: {}", name, e);
                Slot::default()
            }
        },
        Ok(None) => {
            info!("Blob '{}' not found, starting fresh", name);
            Slot::default()
        }
        Err(e) => {
            warn!("Failed to load '{}', starting fresh: {}", name, e);
            Slot::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobStore;
    use crate::ports::Blob;

    async fn fresh_ledger() -> (Arc<MemoryBlobStore>, Ledger) {
        let store = Arc::new(MemoryBlobStore::new());
        let ledger = Ledger::open(store.clone()).await;
        (store, ledger)
    }

    #[tokio::test]
    async fn unseen_identity_reads_default_balance() {
        let (_, ledger) = fresh_ledger().await;
        let id = Identity::new("nobody");

        assert_eq!(ledger.balance(&id).await, 100);
        // The read path must not materialize the default.
        assert_eq!(ledger.raw_balance(&id).await, None);
        assert_eq!(ledger.user_count().await, 0);
    }

    #[tokio::test]
    async fn ensure_balance_materializes_the_default() {
        let (store, ledger) = fresh_ledger().await;
        let id = Identity::new("alice");

        assert_eq!(ledger.ensure_balance(&id).await.unwrap(), 100);
        assert_eq!(ledger.raw_balance(&id).await, Some(100.0));

        // And the mapping reached the blob store.
        let blob = store.load("balances").await.unwrap().unwrap();
        let persisted: HashMap<Identity, f64> = serde_json::from_slice(&blob.content).unwrap();
        assert_eq!(persisted.get(&id), Some(&100.0));
    }

    #[tokio::test]
    async fn balances_round_for_display_but_store_raw() {
        let (_, ledger) = fresh_ledger().await;
        let id = Identity::new("alice");

        ledger.set_balance(&id, 70.6).await.unwrap();
        assert_eq!(ledger.balance(&id).await, 71);
        assert_eq!(ledger.raw_balance(&id).await, Some(70.6));
    }

    #[tokio::test]
    async fn state_survives_a_reopen() {
        let store = Arc::new(MemoryBlobStore::new());
        {
            let ledger = Ledger::open(store.clone()).await;
            ledger.set_balance(&Identity::new("alice"), 42.0).await.unwrap();
            ledger
                .push_notification(&Identity::new("alice"), "hello".to_string())
                .await
                .unwrap();
        }

        let reopened = Ledger::open(store).await;
        assert_eq!(reopened.balance(&Identity::new("alice")).await, 42);
        assert_eq!(
            reopened.notifications(&Identity::new("alice")).await,
            vec!["hello".to_string()]
        );
    }

    #[tokio::test]
    async fn notifications_default_to_placeholder() {
        let (_, ledger) = fresh_ledger().await;
        let id = Identity::new("quiet");

        assert_eq!(ledger.notifications(&id).await, vec![NO_NOTIFICATIONS.to_string()]);

        ledger.push_notification(&id, "first".to_string()).await.unwrap();
        ledger.push_notification(&id, "second".to_string()).await.unwrap();
        assert_eq!(
            ledger.notifications(&id).await,
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[tokio::test]
    async fn preferences_round_trip_in_wire_order() {
        let (_, ledger) = fresh_ledger().await;
        let id = Identity::new("alice");

        assert_eq!(ledger.preferences(&id).await.values(), vec!["blue", "False"]);

        ledger
            .set_preferences(&id, Preferences::with_theme("dark"))
            .await
            .unwrap();
        assert_eq!(ledger.preferences(&id).await.values(), vec!["dark", "False"]);
    }

    #[tokio::test]
    async fn transactions_filter_by_participant() {
        let (_, ledger) = fresh_ledger().await;

        ledger
            .record_transaction(Identity::new("a"), Identity::new("b"), 1.0)
            .await
            .unwrap();
        ledger
            .record_transaction(Identity::new("c"), Identity::new("d"), 2.0)
            .await
            .unwrap();

        assert_eq!(ledger.transactions().await.len(), 2);
        assert_eq!(ledger.transactions_for(&Identity::new("b")).await.len(), 1);
        assert_eq!(ledger.transactions_for(&Identity::new("e")).await.len(), 0);
    }

    #[tokio::test]
    async fn top_balances_sorts_descending_and_truncates() {
        let (_, ledger) = fresh_ledger().await;
        for (name, amount) in [("a", 5.0), ("b", 50.0), ("c", 20.0)] {
            ledger.set_balance(&Identity::new(name), amount).await.unwrap();
        }

        let top = ledger.top_balances(2).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0.as_str(), "b");
        assert_eq!(top[1].0.as_str(), "c");
    }

    #[tokio::test]
    async fn persist_retries_once_after_external_write() {
        let (store, ledger) = fresh_ledger().await;
        let id = Identity::new("alice");
        ledger.set_balance(&id, 1.0).await.unwrap();

        // Someone else writes the blob behind our back, bumping the
        // revision past the one the ledger holds.
        let blob = store.load("balances").await.unwrap().unwrap();
        store
            .save("balances", &blob.content, Some(&blob.revision))
            .await
            .unwrap();

        // The next mutation hits a conflict, refreshes, and succeeds.
        ledger.set_balance(&id, 2.0).await.unwrap();
        assert_eq!(ledger.raw_balance(&id).await, Some(2.0));

        let Blob { content, .. } = store.load("balances").await.unwrap().unwrap();
        let persisted: HashMap<Identity, f64> = serde_json::from_slice(&content).unwrap();
        assert_eq!(persisted.get(&id), Some(&2.0));
    }

    #[tokio::test]
    async fn corrupt_blob_starts_fresh() {
        let store = Arc::new(MemoryBlobStore::new());
        store.save("balances", b"not json", None).await.unwrap();

        let ledger = Ledger::open(store).await;
        assert_eq!(ledger.user_count().await, 0);
    }
}
