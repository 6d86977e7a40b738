//! Customer directory HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::customer::{CreateCustomerInput, CustomerService, UpdateCustomerInput};
use crate::AppState;

/// List all customers with their sales counts
pub async fn list_customers(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = CustomerService::new(state.db.clone());
    let customers = service.list_customers().await?;
    Ok(Json(serde_json::json!({ "customers": customers })))
}

/// Get a single customer
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.get_customer(customer_id).await?;
    Ok(Json(customer))
}

/// Create a customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<impl IntoResponse> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.create_customer(input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// Update a customer
pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<impl IntoResponse> {
    let service = CustomerService::new(state.db.clone());
    let customer = service.update_customer(customer_id, input).await?;
    Ok(Json(customer))
}

/// Delete a customer; their sales keep the snapshotted contact details
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = CustomerService::new(state.db.clone());
    service.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
