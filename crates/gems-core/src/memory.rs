//! In-memory blob store (replaces the remote repository in tests and
//! no-persistence runs)

use crate::error::{GemsError, Result};
use crate::ports::{Blob, BlobStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

struct Entry {
    content: Vec<u8>,
    revision: u64,
}

/// Blob store backed by a process-local map, with the same conditional
/// write semantics as the remote store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Entry>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load(&self, name: &str) -> Result<Option<Blob>> {
        let blobs = self.blobs.lock().await;
        Ok(blobs.get(name).map(|entry| Blob {
            content: entry.content.clone(),
            revision: entry.revision.to_string(),
        }))
    }

    async fn save(&self, name: &str, content: &[u8], revision: Option<&str>) -> Result<String> {
        let mut blobs = self.blobs.lock().await;
        let next = match blobs.get(name) {
            Some(entry) => {
                let current = entry.revision.to_string();
                if revision != Some(current.as_str()) {
                    return Err(GemsError::RevisionConflict(name.to_string()));
                }
                entry.revision + 1
            }
            None => 1,
        };
        blobs.insert(
            name.to_string(),
            Entry {
                content: content.to_vec(),
                revision: next,
            },
        );
        Ok(next.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_blob_loads_as_none() {
        let store = MemoryBlobStore::new();
        assert!(store.load("balances").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemoryBlobStore::new();
        let rev = store.save("balances", b"{}", None).await.unwrap();

        let blob = store.load("balances").await.unwrap().unwrap();
        assert_eq!(blob.content, b"{}");
        assert_eq!(blob.revision, rev);
    }

    #[tokio::test]
    async fn stale_revision_is_a_conflict() {
        let store = MemoryBlobStore::new();
        let rev = store.save("balances", b"a", None).await.unwrap();
        store.save("balances", b"b", Some(&rev)).await.unwrap();

        let err = store.save("balances", b"c", Some(&rev)).await.unwrap_err();
        assert!(matches!(err, GemsError::RevisionConflict(_)));
    }

    #[tokio::test]
    async fn update_without_revision_is_a_conflict() {
        let store = MemoryBlobStore::new();
        store.save("balances", b"a", None).await.unwrap();

        let err = store.save("balances", b"b", None).await.unwrap_err();
        assert!(matches!(err, GemsError::RevisionConflict(_)));
    }
}
