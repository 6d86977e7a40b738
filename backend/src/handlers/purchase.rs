//! Purchase management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::purchase::{
    CreatePurchaseInput, PurchaseItemInput, PurchaseService, SetRealLogisticsInput,
    UpdatePurchaseInput,
};
use crate::AppState;

/// List all purchases with lines and monetary summaries
pub async fn list_purchases(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchases = service.list_purchases().await?;
    Ok(Json(serde_json::json!({ "purchases": purchases })))
}

/// Get a single purchase
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchase = service.get_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Create a purchase header
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchase = service.create_purchase(input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Update a purchase
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchase = service.update_purchase(purchase_id, input).await?;
    Ok(Json(purchase))
}

/// Delete a purchase, reversing received stock
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    service.delete_purchase(purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Receive a purchase into stock
pub async fn receive_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchase = service.receive_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Record real shipping and import-tax figures
pub async fn set_real_logistics(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<SetRealLogisticsInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let purchase = service.set_real_logistics(purchase_id, input).await?;
    Ok(Json(purchase))
}

/// Add a line to a pending purchase
pub async fn add_purchase_item(
    State(state): State<AppState>,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<PurchaseItemInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let item = service.add_item(purchase_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Update a line of a pending purchase
pub async fn update_purchase_item(
    State(state): State<AppState>,
    Path((purchase_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<PurchaseItemInput>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    let item = service.update_item(purchase_id, item_id, input).await?;
    Ok(Json(item))
}

/// Remove a line from a pending purchase
pub async fn delete_purchase_item(
    State(state): State<AppState>,
    Path((purchase_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let service = PurchaseService::new(state.db.clone());
    service.delete_item(purchase_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
