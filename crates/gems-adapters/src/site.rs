//! Platform site client
//!
//! Logs the service account into the platform site and posts the transfer
//! announcement comments on recipient profiles.

use async_trait::async_trait;
use gems_core::{CommentPoster, GemsError, Result};
use gems_types::Identity;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("gemledger/", env!("CARGO_PKG_VERSION"));

pub struct SiteClient {
    http: reqwest::Client,
    site_url: String,
    username: String,
    session_token: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

impl SiteClient {
    /// Authenticate the service account. The returned client holds the
    /// session token for subsequent comment posts.
    pub async fn login(site_url: String, username: String, password: String) -> Result<Self> {
        let http = reqwest::Client::new();
        let response = http
            .post(format!("{}/login/", site_url))
            .header("User-Agent", USER_AGENT)
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| GemsError::AuthenticationFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GemsError::AuthenticationFailed(format!(
                "Site login failed with status {}",
                response.status()
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| GemsError::AuthenticationFailed(e.to_string()))?;

        info!("Logged into site as {}", username);
        Ok(Self {
            http,
            site_url,
            username,
            session_token: body.token,
        })
    }
}

#[async_trait]
impl CommentPoster for SiteClient {
    async fn post_comment(&self, recipient: &Identity, text: &str) -> Result<()> {
        let url = format!(
            "{}/site-api/comments/user/{}/add/",
            self.site_url, recipient
        );
        let response = self
            .http
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .header("X-Token", &self.session_token)
            .json(&json!({
                "content": text,
                "parent_id": "",
                "commentee_id": "",
            }))
            .send()
            .await
            .map_err(|e| GemsError::Comment(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GemsError::Comment(format!(
                "Comment on {}'s profile failed with status {}",
                recipient,
                response.status()
            )));
        }

        debug!("Posted comment on {}'s profile as {}", recipient, self.username);
        Ok(())
    }
}
