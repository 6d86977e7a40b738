//! Route definitions for the FitStore inventory platform

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // System settings (exchange rate)
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // Product catalog
        .nest("/products", product_routes())
        // Purchases, receiving and logistics
        .nest("/purchases", purchase_routes())
        // Customer directory
        .nest("/customers", customer_routes())
        // Sales and fulfillment
        .nest("/sales", sale_routes())
        // Stock movement ledger
        .route("/inventory/transactions", get(handlers::list_transactions))
        // Reports
        .route("/reports/costs", get(handlers::get_cost_report))
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/low-stock", get(handlers::list_low_stock))
        .route("/import", post(handlers::import_products))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/price-history", get(handlers::get_price_history))
}

/// Purchase management routes
fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route(
            "/:purchase_id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .delete(handlers::delete_purchase),
        )
        .route("/:purchase_id/receive", post(handlers::receive_purchase))
        .route("/:purchase_id/logistics", put(handlers::set_real_logistics))
        .route("/:purchase_id/items", post(handlers::add_purchase_item))
        .route(
            "/:purchase_id/items/:item_id",
            put(handlers::update_purchase_item).delete(handlers::delete_purchase_item),
        )
}

/// Customer directory routes
fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
}

/// Sale management routes
fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/:sale_id",
            get(handlers::get_sale)
                .put(handlers::update_sale)
                .delete(handlers::delete_sale),
        )
        .route("/:sale_id/items", post(handlers::add_sale_item))
        .route(
            "/:sale_id/items/:item_id",
            put(handlers::update_sale_item).delete(handlers::delete_sale_item),
        )
}
