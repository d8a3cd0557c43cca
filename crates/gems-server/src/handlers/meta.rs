//! Service metadata handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Html, Json};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    version: String,
    time: String,
    docs: String,
    user_count: usize,
    total_balance: i64,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    verification: String,
}

pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        version: "v1".to_string(),
        time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        docs: state.docs_url.clone(),
        user_count: state.ledger.user_count().await,
        total_balance: state.ledger.total_balance().await,
    })
}

pub async fn verify() -> Json<VerifyResponse> {
    Json(VerifyResponse {
        verification: "api-verified-v1".to_string(),
    })
}

/// The static documentation page, read from disk on every request so it
/// can be updated without a restart.
pub async fn docs(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    tokio::fs::read_to_string(&state.docs_path)
        .await
        .map(Html)
        .map_err(|e| {
            error!("Failed to read docs page {}: {}", state.docs_path, e);
            StatusCode::NOT_FOUND
        })
}
