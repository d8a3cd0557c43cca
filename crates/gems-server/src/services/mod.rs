//! Services behind the polling channels

pub mod accounts;
pub mod economy;

pub use accounts::Accounts;
pub use economy::Economy;

#[cfg(test)]
pub(crate) mod testutil {
    use async_trait::async_trait;
    use gems_core::{CommentPoster, Ledger, MemoryBlobStore, Result, TransferEngine};
    use gems_types::Identity;
    use std::sync::Arc;

    /// Comment poster that swallows everything.
    pub struct NoopPoster;

    #[async_trait]
    impl CommentPoster for NoopPoster {
        async fn post_comment(&self, _recipient: &Identity, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    pub async fn test_ledger() -> Arc<Ledger> {
        Arc::new(Ledger::open(Arc::new(MemoryBlobStore::new())).await)
    }

    pub fn test_engine(ledger: Arc<Ledger>) -> TransferEngine {
        TransferEngine::new(
            ledger,
            Arc::new(NoopPoster),
            "GemLedger".to_string(),
            "https://example.com/projects/1".to_string(),
        )
    }
}
