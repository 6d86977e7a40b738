//! Product catalog and valuation state
//!
//! Products carry the valuation summary the layer engine maintains:
//! current stock, rolling average cost in USD and the last purchase cost.
//! The GTQ view of the average is derived at read time from the current
//! exchange rate, never stored.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use shared::costing::{usd_to_gtq, weighted_average_cost};
use shared::types::round_money;
use shared::validation::{is_low_stock, validate_non_negative_money, validate_product_name};

use crate::error::{AppError, AppResult};
use crate::services::settings;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub product_type: String,
    pub product_name: String,
    pub brand_name: String,
    pub url: String,
    pub amount_per_serving: String,
    pub serving_size: String,
    pub units_per_container: Option<Decimal>,
    pub weight_g: Option<Decimal>,
    pub description: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub average_cost: Decimal,
    pub last_purchase_cost: Decimal,
    pub last_purchase_date: Option<NaiveDate>,
    pub current_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product with the derived valuation fields
#[derive(Debug, Clone, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub is_low_stock: bool,
    pub average_cost_gtq: Decimal,
}

impl ProductResponse {
    fn new(product: Product, rate: Decimal) -> Self {
        let is_low_stock = is_low_stock(product.current_stock, product.min_stock_level);
        let average_cost_gtq = usd_to_gtq(product.average_cost, rate);
        Self {
            product,
            is_low_stock,
            average_cost_gtq,
        }
    }
}

/// Price change audit row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PriceHistory {
    pub id: Uuid,
    pub product_id: Uuid,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub changed_date: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub product_name: String,
    pub product_type: Option<String>,
    pub brand_name: Option<String>,
    pub url: Option<String>,
    pub amount_per_serving: Option<String>,
    pub serving_size: Option<String>,
    pub units_per_container: Option<Decimal>,
    pub weight_g: Option<Decimal>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub current_stock: Option<Decimal>,
    pub min_stock_level: Option<Decimal>,
    pub current_price: Option<Decimal>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub product_name: Option<String>,
    pub product_type: Option<String>,
    pub brand_name: Option<String>,
    pub url: Option<String>,
    pub amount_per_serving: Option<String>,
    pub serving_size: Option<String>,
    pub units_per_container: Option<Decimal>,
    pub weight_g: Option<Decimal>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub current_stock: Option<Decimal>,
    pub min_stock_level: Option<Decimal>,
    pub current_price: Option<Decimal>,
}

/// Result of a CSV product import
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

const PRODUCT_COLUMNS: &str = "id, product_type, product_name, brand_name, url, \
     amount_per_serving, serving_size, units_per_container, weight_g, description, unit, \
     current_stock, min_stock_level, average_cost, last_purchase_cost, last_purchase_date, \
     current_price, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all products with derived valuation fields
    pub async fn list_products(&self) -> AppResult<Vec<ProductResponse>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products ORDER BY product_name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let rate = self.read_rate().await?;
        Ok(products
            .into_iter()
            .map(|p| ProductResponse::new(p, rate))
            .collect())
    }

    /// Products at or below their reorder threshold
    pub async fn list_low_stock(&self) -> AppResult<Vec<ProductResponse>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE current_stock <= min_stock_level ORDER BY product_name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let rate = self.read_rate().await?;
        Ok(products
            .into_iter()
            .map(|p| ProductResponse::new(p, rate))
            .collect())
    }

    pub async fn get_product(&self, product_id: Uuid) -> AppResult<ProductResponse> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let rate = self.read_rate().await?;
        Ok(ProductResponse::new(product, rate))
    }

    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<ProductResponse> {
        validate_product_name(&input.product_name).map_err(|msg| AppError::Validation {
            field: "product_name".to_string(),
            message: msg.to_string(),
            message_es: "El nombre del producto es obligatorio".to_string(),
        })?;

        let current_stock = input.current_stock.unwrap_or(Decimal::ZERO);
        let min_stock_level = input.min_stock_level.unwrap_or(Decimal::ZERO);
        let current_price = input.current_price.unwrap_or(Decimal::ZERO);
        validate_stock_and_price(current_stock, current_price)?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (product_name, product_type, brand_name, url, amount_per_serving,
                                  serving_size, units_per_container, weight_g, description, unit,
                                  current_stock, min_stock_level, current_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(input.product_name.trim())
        .bind(input.product_type.unwrap_or_default())
        .bind(input.brand_name.unwrap_or_default())
        .bind(input.url.unwrap_or_default())
        .bind(input.amount_per_serving.unwrap_or_default())
        .bind(input.serving_size.unwrap_or_default())
        .bind(input.units_per_container)
        .bind(input.weight_g)
        .bind(input.description.unwrap_or_default())
        .bind(input.unit.unwrap_or_else(|| "unit".to_string()))
        .bind(current_stock)
        .bind(min_stock_level)
        .bind(round_money(current_price))
        .fetch_one(&self.db)
        .await?;

        let rate = self.read_rate().await?;
        Ok(ProductResponse::new(product, rate))
    }

    /// Update a product; a price change also appends a price history row
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductResponse> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1 FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let product_name = input.product_name.unwrap_or(existing.product_name);
        validate_product_name(&product_name).map_err(|msg| AppError::Validation {
            field: "product_name".to_string(),
            message: msg.to_string(),
            message_es: "El nombre del producto es obligatorio".to_string(),
        })?;

        let current_stock = input.current_stock.unwrap_or(existing.current_stock);
        let current_price = round_money(input.current_price.unwrap_or(existing.current_price));
        validate_stock_and_price(current_stock, current_price)?;

        let price_changed = current_price != existing.current_price;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET product_name = $1, product_type = $2, brand_name = $3, url = $4,
                amount_per_serving = $5, serving_size = $6, units_per_container = $7,
                weight_g = $8, description = $9, unit = $10, current_stock = $11,
                min_stock_level = $12, current_price = $13, updated_at = now()
            WHERE id = $14
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_name.trim())
        .bind(input.product_type.unwrap_or(existing.product_type))
        .bind(input.brand_name.unwrap_or(existing.brand_name))
        .bind(input.url.unwrap_or(existing.url))
        .bind(input.amount_per_serving.unwrap_or(existing.amount_per_serving))
        .bind(input.serving_size.unwrap_or(existing.serving_size))
        .bind(input.units_per_container.or(existing.units_per_container))
        .bind(input.weight_g.or(existing.weight_g))
        .bind(input.description.unwrap_or(existing.description))
        .bind(input.unit.unwrap_or(existing.unit))
        .bind(current_stock)
        .bind(input.min_stock_level.unwrap_or(existing.min_stock_level))
        .bind(current_price)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        if price_changed {
            sqlx::query(
                "INSERT INTO price_history (product_id, old_price, new_price) VALUES ($1, $2, $3)",
            )
            .bind(product_id)
            .bind(existing.current_price)
            .bind(current_price)
            .execute(&mut *tx)
            .await?;
        }

        let rate = settings::current_rate(&mut tx).await?;
        tx.commit().await?;
        Ok(ProductResponse::new(product, rate))
    }

    /// Delete a product; refused while purchases, sales or ledger entries reference it
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(AppError::NotFound("Product".to_string()))
            }
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23503") => {
                Err(AppError::Conflict {
                    resource: "product".to_string(),
                    message: "Product is referenced by purchases, sales or ledger entries"
                        .to_string(),
                    message_es: "El producto tiene compras, ventas o movimientos asociados"
                        .to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Price change history for a product, newest first
    pub async fn price_history(&self, product_id: Uuid) -> AppResult<Vec<PriceHistory>> {
        self.ensure_exists(product_id).await?;

        let history = sqlx::query_as::<_, PriceHistory>(
            r#"
            SELECT id, product_id, old_price, new_price, changed_date
            FROM price_history
            WHERE product_id = $1
            ORDER BY changed_date DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(history)
    }

    /// Bulk import products from CSV, matching rows to existing products by name.
    ///
    /// A bootstrap utility: it writes catalog fields and stock directly and
    /// does not create layers or ledger entries, like the spreadsheet import
    /// it replaces.
    pub async fn import_csv(&self, data: &[u8]) -> AppResult<ImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = reader
            .headers()
            .map_err(|e| AppError::ValidationError(format!("Invalid CSV: {}", e)))?
            .clone();

        let mut summary = ImportSummary {
            created: 0,
            updated: 0,
            skipped: 0,
        };

        let mut tx = self.db.begin().await?;

        for record in reader.records() {
            let record =
                record.map_err(|e| AppError::ValidationError(format!("Invalid CSV row: {}", e)))?;

            let product_name = column(&headers, &record, &["Product Name", "product_name"])
                .unwrap_or_default();
            if product_name.is_empty() {
                summary.skipped += 1;
                continue;
            }

            let product_type =
                column(&headers, &record, &["Product Type", "product_type"]).unwrap_or_default();
            let brand_name =
                column(&headers, &record, &["Brand Name", "Brand", "brand_name"]).unwrap_or_default();
            let url = column(&headers, &record, &["URL", "url"]).unwrap_or_default();
            let amount_per_serving = column(
                &headers,
                &record,
                &["Amount Per Serving", "Amount per serving", "amount_per_serving"],
            )
            .unwrap_or_default();
            let serving_size =
                column(&headers, &record, &["Serving Size", "serving_size"]).unwrap_or_default();
            let description =
                column(&headers, &record, &["Description", "description"]).unwrap_or_default();
            let unit = column(&headers, &record, &["Unit", "unit"])
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| "unit".to_string());

            let units_per_container = column(
                &headers,
                &record,
                &["Units per Container", "Units Per Container", "units_per_container"],
            )
            .and_then(|v| Decimal::from_str(&v).ok());
            let weight_g = column(
                &headers,
                &record,
                &["Weight G", "Weight(g)", "Weight (g)", "weight_g"],
            )
            .and_then(|v| Decimal::from_str(&v).ok());
            let current_stock =
                column(&headers, &record, &["Current Stock", "current_stock"])
                    .and_then(|v| Decimal::from_str(&v).ok())
                    .unwrap_or(Decimal::ZERO);
            let min_stock_level =
                column(&headers, &record, &["Min Stock Level", "min_stock_level"])
                    .and_then(|v| Decimal::from_str(&v).ok())
                    .unwrap_or(Decimal::ZERO);

            let existing_id = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM products WHERE product_name = $1",
            )
            .bind(&product_name)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(id) = existing_id {
                sqlx::query(
                    r#"
                    UPDATE products
                    SET product_type = $1, brand_name = $2, url = $3, amount_per_serving = $4,
                        serving_size = $5, units_per_container = $6, weight_g = $7,
                        description = $8, unit = $9, current_stock = $10, min_stock_level = $11,
                        updated_at = now()
                    WHERE id = $12
                    "#,
                )
                .bind(&product_type)
                .bind(&brand_name)
                .bind(&url)
                .bind(&amount_per_serving)
                .bind(&serving_size)
                .bind(units_per_container)
                .bind(weight_g)
                .bind(&description)
                .bind(&unit)
                .bind(current_stock.max(Decimal::ZERO))
                .bind(min_stock_level)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                summary.updated += 1;
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO products (product_name, product_type, brand_name, url,
                                          amount_per_serving, serving_size, units_per_container,
                                          weight_g, description, unit, current_stock, min_stock_level)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                    "#,
                )
                .bind(&product_name)
                .bind(&product_type)
                .bind(&brand_name)
                .bind(&url)
                .bind(&amount_per_serving)
                .bind(&serving_size)
                .bind(units_per_container)
                .bind(weight_g)
                .bind(&description)
                .bind(&unit)
                .bind(current_stock.max(Decimal::ZERO))
                .bind(min_stock_level)
                .execute(&mut *tx)
                .await?;
                summary.created += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "Product import finished"
        );
        Ok(summary)
    }

    async fn ensure_exists(&self, product_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;
        if exists == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
        Ok(())
    }

    async fn read_rate(&self) -> AppResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        settings::current_rate(&mut conn).await
    }
}

fn validate_stock_and_price(current_stock: Decimal, current_price: Decimal) -> AppResult<()> {
    if current_stock < Decimal::ZERO {
        return Err(AppError::Validation {
            field: "current_stock".to_string(),
            message: "Stock cannot be negative".to_string(),
            message_es: "El stock no puede ser negativo".to_string(),
        });
    }
    validate_non_negative_money(current_price).map_err(|msg| AppError::Validation {
        field: "current_price".to_string(),
        message: msg.to_string(),
        message_es: "El precio no puede ser negativo".to_string(),
    })
}

/// Look up a CSV field by any of the accepted header names
fn column(headers: &csv::StringRecord, record: &csv::StringRecord, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(pos) = headers.iter().position(|h| h == *name) {
            if let Some(value) = record.get(pos) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// Recompute a product's rolling average cost from its remaining layers.
///
/// Runs inside the caller's transaction, after every layer mutation for
/// the product. Zero when nothing remains.
pub(crate) async fn recompute_average_cost(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Decimal> {
    let layers = sqlx::query_as::<_, (Decimal, Decimal)>(
        "SELECT quantity_remaining, unit_cost FROM cost_layers WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    let average = round_money(weighted_average_cost(layers));

    sqlx::query("UPDATE products SET average_cost = $1, updated_at = now() WHERE id = $2")
        .bind(average)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(average)
}
