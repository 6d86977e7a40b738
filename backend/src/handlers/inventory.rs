//! HTTP handlers for the stock movement ledger

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::services::inventory::{InventoryService, ListTransactionsQuery};
use crate::AppState;

/// List ledger entries, newest first, optionally scoped to one product
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> AppResult<impl IntoResponse> {
    let service = InventoryService::new(state.db.clone());
    let transactions = service.list_transactions(query).await?;
    Ok(Json(serde_json::json!({ "transactions": transactions })))
}
