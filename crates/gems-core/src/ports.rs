//! Ports implemented by the adapter crate
//!
//! Each external collaborator sits behind one trait: the blob store that
//! persists the mappings, the site client that posts transfer comments,
//! and the polling channel that delivers named requests.

use crate::error::Result;
use async_trait::async_trait;
use gems_types::{Identity, Reply, Request};

/// A named blob with the revision token it was read at.
#[derive(Debug, Clone)]
pub struct Blob {
    pub content: Vec<u8>,
    pub revision: String,
}

/// Versioned blob storage keyed by name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob. `Ok(None)` means the blob does not exist yet, which
    /// callers treat as "start empty", not as an error.
    async fn load(&self, name: &str) -> Result<Option<Blob>>;

    /// Conditionally write a blob, supplying the last known revision when
    /// there is one. Returns the new revision. A stale revision fails with
    /// [`crate::GemsError::RevisionConflict`].
    async fn save(&self, name: &str, content: &[u8], revision: Option<&str>) -> Result<String>;
}

/// Posts a comment on a user's profile on the social surface.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    async fn post_comment(&self, recipient: &Identity, text: &str) -> Result<()>;
}

/// One established polling connection delivering named requests.
#[async_trait]
pub trait RequestChannel: Send {
    /// Next request, or `None` when the channel has closed cleanly.
    async fn next_request(&mut self) -> Result<Option<Request>>;

    /// Send the reply for a previously delivered request.
    async fn send_reply(&mut self, request: &Request, reply: Reply) -> Result<()>;
}
