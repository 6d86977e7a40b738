//! Product catalog HTTP handlers

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::product::{CreateProductInput, ProductService, UpdateProductInput};
use crate::AppState;

/// List all products with GTQ-derived costs
pub async fn list_products(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let products = service.list_products().await?;
    Ok(Json(serde_json::json!({ "products": products })))
}

/// List products at or below their minimum stock level
pub async fn list_low_stock(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let products = service.list_low_stock().await?;
    Ok(Json(serde_json::json!({ "products": products })))
}

/// Get a single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let product = service.get_product(product_id).await?;
    Ok(Json(product))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let product = service.update_product(product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a product's selling price history, newest first
pub async fn get_price_history(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let service = ProductService::new(state.db.clone());
    let history = service.price_history(product_id).await?;
    Ok(Json(serde_json::json!({ "price_history": history })))
}

/// Import products from an uploaded CSV file
pub async fn import_products(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::ValidationError(format!("Invalid multipart payload: {}", e))
    })? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(|e| {
                AppError::ValidationError(format!("Failed to read uploaded file: {}", e))
            })?;
            file_data = Some(bytes.to_vec());
        }
    }

    let data = file_data.ok_or_else(|| AppError::Validation {
        field: "file".to_string(),
        message: "A CSV file is required in the 'file' field".to_string(),
        message_es: "Se requiere un archivo CSV en el campo 'file'".to_string(),
    })?;

    let service = ProductService::new(state.db.clone());
    let summary = service.import_csv(&data).await?;
    Ok(Json(summary))
}
