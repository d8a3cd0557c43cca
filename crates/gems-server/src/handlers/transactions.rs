//! Transaction handlers

use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use gems_types::{Identity, Transaction};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    transactions: Vec<Transaction>,
}

pub async fn list(State(state): State<AppState>) -> Json<TransactionsResponse> {
    Json(TransactionsResponse {
        transactions: state.ledger.transactions().await,
    })
}

pub async fn for_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<TransactionsResponse> {
    let id = Identity::new(&username);
    Json(TransactionsResponse {
        transactions: state.ledger.transactions_for(&id).await,
    })
}
