//! User and balance handlers

use super::ErrorResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gems_types::Identity;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    users: Vec<Identity>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    username: Identity,
    balance: i64,
}

pub async fn list(State(state): State<AppState>) -> Json<UsersResponse> {
    Json(UsersResponse {
        users: state.ledger.users().await,
    })
}

pub async fn balances(State(state): State<AppState>) -> Json<BTreeMap<Identity, i64>> {
    Json(state.ledger.balances_rounded().await)
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, (StatusCode, Json<ErrorResponse>)> {
    let id = Identity::new(&username);
    match state.ledger.raw_balance(&id).await {
        Some(_) => Ok(Json(UserResponse {
            balance: state.ledger.balance(&id).await,
            username: id,
        })),
        None => Err((StatusCode::NOT_FOUND, Json(ErrorResponse::user_not_found()))),
    }
}
