//! GitHub contents-API blob store
//!
//! Treats a repository's `db/` directory as the blob store: one JSON file
//! per mapping, fetched and conditionally updated through the contents
//! API. The file sha doubles as the revision token.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gems_core::{Blob, BlobStore, GemsError, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("gemledger/", env!("CARGO_PKG_VERSION"));

pub struct GitHubStore {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

impl GitHubStore {
    pub fn new(owner: String, repo: String, branch: String, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            owner,
            repo,
            branch,
            token,
        }
    }

    /// Point the store at a different API host (test servers).
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    fn blob_url(&self, name: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/db/{}.json",
            self.api_url, self.owner, self.repo, name
        )
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
    }
}

#[async_trait]
impl BlobStore for GitHubStore {
    async fn load(&self, name: &str) -> Result<Option<Blob>> {
        let response = self
            .request(self.http.get(self.blob_url(name)))
            .send()
            .await
            .map_err(|e| GemsError::Store(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GemsError::Store(format!(
                "Loading '{}' failed with status {}",
                name,
                response.status()
            )));
        }

        let body: ContentResponse = response
            .json()
            .await
            .map_err(|e| GemsError::Store(e.to_string()))?;

        // The API wraps base64 bodies at 60 columns; strip the newlines
        // before decoding.
        let packed: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let content = BASE64
            .decode(packed)
            .map_err(|e| GemsError::Store(format!("Blob '{}' is not valid base64: {}", name, e)))?;

        debug!("Loaded blob '{}' at revision {}", name, body.sha);
        Ok(Some(Blob {
            content,
            revision: body.sha,
        }))
    }

    async fn save(&self, name: &str, content: &[u8], revision: Option<&str>) -> Result<String> {
        let payload = SavePayload {
            message: format!("update {}", name),
            content: BASE64.encode(content),
            branch: &self.branch,
            sha: revision,
        };

        let response = self
            .request(self.http.put(self.blob_url(name)))
            .json(&payload)
            .send()
            .await
            .map_err(|e| GemsError::Store(e.to_string()))?;

        // A stale or missing sha comes back as 409 (branch moved) or 422
        // (sha mismatch); both mean our revision is out of date.
        if response.status() == StatusCode::CONFLICT
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
        {
            return Err(GemsError::RevisionConflict(name.to_string()));
        }
        if !response.status().is_success() {
            return Err(GemsError::Store(format!(
                "Saving '{}' failed with status {}",
                name,
                response.status()
            )));
        }

        let body: SaveResponse = response
            .json()
            .await
            .map_err(|e| GemsError::Store(e.to_string()))?;

        debug!("Saved blob '{}' at revision {}", name, body.content.sha);
        Ok(body.content.sha)
    }
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct SavePayload<'a> {
    message: String,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SaveResponse {
    content: ContentMeta,
}

#[derive(Debug, Deserialize)]
struct ContentMeta {
    sha: String,
}
