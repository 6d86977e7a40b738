//! Sale management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::sale::{
    CreateSaleInput, SaleItemInput, SaleService, UpdateSaleInput, UpdateSaleItemInput,
};
use crate::AppState;

/// List all sales with lines and totals
pub async fn list_sales(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let sales = service.list_sales().await?;
    Ok(Json(serde_json::json!({ "sales": sales })))
}

/// Get a single sale
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let sale = service.get_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Create a sale header
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let sale = service.create_sale(input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Update a sale
pub async fn update_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleInput>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let sale = service.update_sale(sale_id, input).await?;
    Ok(Json(sale))
}

/// Delete a sale, reversing every fulfilled line
pub async fn delete_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    service.delete_sale(sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fulfill a sale line against stock and FIFO layers
pub async fn add_sale_item(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<SaleItemInput>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let item = service.add_sale_item(sale_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Reprice a fulfilled sale line
pub async fn update_sale_item(
    State(state): State<AppState>,
    Path((sale_id, item_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdateSaleItemInput>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    let item = service.update_sale_item(sale_id, item_id, input).await?;
    Ok(Json(item))
}

/// Reverse and remove a fulfilled sale line
pub async fn delete_sale_item(
    State(state): State<AppState>,
    Path((sale_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<impl IntoResponse> {
    let service = SaleService::new(state.db.clone());
    service.delete_sale_item(sale_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
