//! Notification handlers

use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use gems_types::Identity;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    notifications: Vec<String>,
}

pub async fn for_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<NotificationsResponse> {
    let id = Identity::new(&username);
    Json(NotificationsResponse {
        notifications: state.ledger.notifications(&id).await,
    })
}
