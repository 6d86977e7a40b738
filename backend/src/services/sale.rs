//! Sale service: sales, line fulfillment and reversal
//!
//! Adding a line to a sale is the fulfillment step: stock is checked and
//! decremented under a row lock, FIFO cost layers are consumed to price the
//! line's cost, and a ledger entry is appended, all in one transaction. A
//! caller may override the cost by passing a positive unit_cost, which
//! bypasses layer consumption entirely. Deleting a line reverses all of it,
//! putting the goods back as a fresh layer at the cost they left with.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use shared::costing::{gtq_to_usd, plan_fifo_consumption, plan_unit_cost, LayerView};
use shared::types::round_money;
use shared::validation::{validate_non_negative_money, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{self, TransactionType};
use crate::services::product::recompute_average_cost;
use crate::services::settings;

/// Sale lifecycle service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Sale lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "sale_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

/// Sale row; customer fields are snapshotted at creation time
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub sale_date: DateTime<Utc>,
    pub status: SaleStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sale line with the product name and line totals joined in; all GTQ
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
    pub total_price: Decimal,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Sale with its lines and derived totals
#[derive(Debug, Clone, Serialize)]
pub struct SaleResponse {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub profit: Decimal,
}

/// Input for creating a sale header; lines are added separately
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
    pub status: Option<SaleStatus>,
    pub notes: Option<String>,
}

/// Input for updating a sale
#[derive(Debug, Deserialize)]
pub struct UpdateSaleInput {
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub sale_date: Option<DateTime<Utc>>,
    pub status: Option<SaleStatus>,
    pub notes: Option<String>,
}

/// Input for fulfilling a sale line.
///
/// A positive `unit_cost` overrides FIFO costing; the line is recorded at
/// that cost and no layers are consumed.
#[derive(Debug, Deserialize)]
pub struct SaleItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_cost: Option<Decimal>,
}

/// Input for repricing a fulfilled line
#[derive(Debug, Deserialize)]
pub struct UpdateSaleItemInput {
    pub product_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

/// Bare line row used by the reversal flows
#[derive(Debug, FromRow)]
struct SaleItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit_cost: Decimal,
}

const SALE_COLUMNS: &str = "id, customer_id, customer_name, customer_phone, customer_email, \
     sale_date, status, notes, created_at, updated_at";

impl SaleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List sales with lines and totals, newest first
    pub async fn list_sales(&self) -> AppResult<Vec<SaleResponse>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales ORDER BY sale_date DESC, created_at DESC",
            SALE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT i.id, i.sale_id, i.product_id, p.product_name, i.quantity, i.unit_price,
                   i.unit_cost, i.quantity * i.unit_price AS total_price,
                   i.quantity * i.unit_cost AS total_cost, i.created_at
            FROM sale_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.sale_id = ANY($1)
            ORDER BY i.created_at, i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<SaleItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.sale_id).or_default().push(item);
        }

        Ok(sales
            .into_iter()
            .map(|sale| {
                let items = grouped.remove(&sale.id).unwrap_or_default();
                build_response(sale, items)
            })
            .collect())
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> AppResult<SaleResponse> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE id = $1",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let items = fetch_items(&self.db, sale_id).await?;
        Ok(build_response(sale, items))
    }

    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<SaleResponse> {
        let mut customer_name = input.customer_name.unwrap_or_default();
        let mut customer_phone = input.customer_phone.unwrap_or_default();
        let mut customer_email = input.customer_email.unwrap_or_default();

        if let Some(customer_id) = input.customer_id {
            let customer = sqlx::query_as::<_, (String, String, String)>(
                "SELECT name, phone, email FROM customers WHERE id = $1",
            )
            .bind(customer_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Customer".to_string()))?;

            if customer_name.trim().is_empty() {
                customer_name = customer.0;
            }
            if customer_phone.trim().is_empty() {
                customer_phone = customer.1;
            }
            if customer_email.trim().is_empty() {
                customer_email = customer.2;
            }
        }

        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO sales (customer_id, customer_name, customer_phone, customer_email,
                               sale_date, status, notes)
            VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6, $7)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(input.customer_id)
        .bind(customer_name)
        .bind(customer_phone)
        .bind(customer_email)
        .bind(input.sale_date)
        .bind(input.status.unwrap_or(SaleStatus::Pending))
        .bind(input.notes.unwrap_or_default())
        .fetch_one(&self.db)
        .await?;

        Ok(build_response(sale, Vec::new()))
    }

    pub async fn update_sale(
        &self,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> AppResult<SaleResponse> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM sales WHERE id = $1 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        if let Some(customer_id) = input.customer_id {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers WHERE id = $1")
                    .bind(customer_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if exists == 0 {
                return Err(AppError::NotFound("Customer".to_string()));
            }
        }

        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            UPDATE sales
            SET customer_id = $1, customer_name = $2, customer_phone = $3, customer_email = $4,
                sale_date = $5, status = $6, notes = $7, updated_at = now()
            WHERE id = $8
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(input.customer_id.or(existing.customer_id))
        .bind(input.customer_name.unwrap_or(existing.customer_name))
        .bind(input.customer_phone.unwrap_or(existing.customer_phone))
        .bind(input.customer_email.unwrap_or(existing.customer_email))
        .bind(input.sale_date.unwrap_or(existing.sale_date))
        .bind(input.status.unwrap_or(existing.status))
        .bind(input.notes.unwrap_or(existing.notes))
        .bind(sale_id)
        .fetch_one(&mut *tx)
        .await?;

        let items = fetch_items_tx(&mut tx, sale_id).await?;
        tx.commit().await?;
        Ok(build_response(sale, items))
    }

    /// Delete a sale, reversing every fulfilled line first
    pub async fn delete_sale(&self, sale_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        // lines sorted by product so concurrent reversals lock in the same order
        let items = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, product_id, quantity, unit_cost
            FROM sale_items
            WHERE sale_id = $1
            ORDER BY product_id, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            reverse_line(&mut tx, sale_id, item).await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Fulfill a sale line: check stock, consume FIFO layers, append to the
    /// ledger and record the line, all under the product row lock
    pub async fn add_sale_item(
        &self,
        sale_id: Uuid,
        input: SaleItemInput,
    ) -> AppResult<SaleItem> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
            message_es: "La cantidad debe ser mayor que cero".to_string(),
        })?;
        validate_non_negative_money(input.unit_price).map_err(|msg| AppError::Validation {
            field: "unit_price".to_string(),
            message: msg.to_string(),
            message_es: "El precio no puede ser negativo".to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let (product_name, current_stock, average_cost) =
            sqlx::query_as::<_, (String, Decimal, Decimal)>(
                "SELECT product_name, current_stock, average_cost FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(input.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if input.quantity > current_stock {
            return Err(AppError::InsufficientStock {
                product: product_name,
                available: current_stock,
                requested: input.quantity,
            });
        }

        let rate = settings::current_rate(&mut tx).await?;

        let unit_cost = match input.unit_cost {
            Some(cost) if cost > Decimal::ZERO => round_money(cost),
            _ => {
                self.consume_layers(&mut tx, input.product_id, input.quantity, average_cost, rate)
                    .await?
            }
        };

        let stock_after = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE products
            SET current_stock = current_stock - $1, updated_at = now()
            WHERE id = $2
            RETURNING current_stock
            "#,
        )
        .bind(input.quantity)
        .bind(input.product_id)
        .fetch_one(&mut *tx)
        .await?;

        inventory::append_entry(
            &mut tx,
            input.product_id,
            TransactionType::Sale,
            -input.quantity,
            stock_after,
            Some(sale_id),
            &format!("Sale {} fulfilled", sale_id),
        )
        .await?;

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, unit_cost)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(sale_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(unit_cost)
        .fetch_one(&mut *tx)
        .await?;

        let item = fetch_item_tx(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Reprice a fulfilled line. Quantity and product are fixed once the
    /// line exists; delete and re-add to change them.
    pub async fn update_sale_item(
        &self,
        sale_id: Uuid,
        item_id: Uuid,
        input: UpdateSaleItemInput,
    ) -> AppResult<SaleItem> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let existing = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, product_id, quantity, unit_cost
            FROM sale_items
            WHERE id = $1 AND sale_id = $2
            "#,
        )
        .bind(item_id)
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale item".to_string()))?;

        if input.quantity.is_some_and(|q| q != existing.quantity) {
            return Err(AppError::Conflict {
                resource: "sale_item".to_string(),
                message: "Quantity cannot change after fulfillment; delete the line and add it again"
                    .to_string(),
                message_es: "La cantidad no puede cambiar; elimine la línea y agréguela de nuevo"
                    .to_string(),
            });
        }
        if input.product_id.is_some_and(|p| p != existing.product_id) {
            return Err(AppError::Conflict {
                resource: "sale_item".to_string(),
                message: "Product cannot change after fulfillment; delete the line and add it again"
                    .to_string(),
                message_es: "El producto no puede cambiar; elimine la línea y agréguela de nuevo"
                    .to_string(),
            });
        }

        if let Some(unit_price) = input.unit_price {
            validate_non_negative_money(unit_price).map_err(|msg| AppError::Validation {
                field: "unit_price".to_string(),
                message: msg.to_string(),
                message_es: "El precio no puede ser negativo".to_string(),
            })?;

            sqlx::query("UPDATE sale_items SET unit_price = $1 WHERE id = $2")
                .bind(unit_price)
                .bind(item_id)
                .execute(&mut *tx)
                .await?;
        }

        let item = fetch_item_tx(&mut tx, existing.id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Reverse a fulfilled line: restore stock, drop its ledger entry and
    /// put the goods back as a restoration layer. The sale row lock
    /// serializes concurrent deletes so the line is reversed at most once.
    pub async fn delete_sale_item(&self, sale_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sales WHERE id = $1 FOR UPDATE")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let item = sqlx::query_as::<_, SaleItemRow>(
            r#"
            SELECT id, product_id, quantity, unit_cost
            FROM sale_items
            WHERE id = $1 AND sale_id = $2
            "#,
        )
        .bind(item_id)
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale item".to_string()))?;

        reverse_line(&mut tx, sale_id, &item).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Walk FIFO layers under lock, decrement the draws and return the
    /// money-rounded unit cost in GTQ
    async fn consume_layers(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        quantity: Decimal,
        average_cost: Decimal,
        rate: Decimal,
    ) -> AppResult<Decimal> {
        let layers: Vec<LayerView> = sqlx::query_as::<_, (i64, Decimal, Decimal)>(
            r#"
            SELECT id, quantity_remaining, unit_cost_gtq
            FROM cost_layers
            WHERE product_id = $1 AND quantity_remaining > 0
            ORDER BY created_at, id
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|(id, quantity_remaining, unit_cost_gtq)| LayerView {
            id,
            quantity_remaining,
            unit_cost_gtq,
        })
        .collect();

        let fallback_unit_cost_gtq = average_cost * rate;
        let plan = plan_fifo_consumption(&layers, quantity, fallback_unit_cost_gtq);

        if plan.shortfall > Decimal::ZERO {
            tracing::warn!(
                product_id = %product_id,
                shortfall = %plan.shortfall,
                "Cost layers short of requested quantity, costing shortfall at average"
            );
        }

        for draw in &plan.draws {
            sqlx::query(
                "UPDATE cost_layers SET quantity_remaining = quantity_remaining - $1 WHERE id = $2",
            )
            .bind(draw.quantity)
            .bind(draw.layer_id)
            .execute(&mut *conn)
            .await?;
        }

        recompute_average_cost(&mut *conn, product_id).await?;

        Ok(plan_unit_cost(&plan, quantity))
    }
}

/// Reverse one fulfilled line inside the caller's transaction.
///
/// Restores stock, deletes exactly one matching sale ledger entry (oldest
/// first; absent entries are left alone), re-creates the goods as a
/// restoration layer priced at the cost they were sold at, recomputes the
/// average and appends an adjustment entry, then drops the line.
async fn reverse_line(
    conn: &mut PgConnection,
    sale_id: Uuid,
    item: &SaleItemRow,
) -> AppResult<()> {
    let (current_stock, average_cost) = sqlx::query_as::<_, (Decimal, Decimal)>(
        "SELECT current_stock, average_cost FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(item.product_id)
    .fetch_one(&mut *conn)
    .await?;

    let stock_after = current_stock + item.quantity;
    sqlx::query("UPDATE products SET current_stock = $1, updated_at = now() WHERE id = $2")
        .bind(stock_after)
        .bind(item.product_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM inventory_transactions
        WHERE id = (
            SELECT id FROM inventory_transactions
            WHERE product_id = $1 AND transaction_type = $2
              AND reference_id = $3 AND quantity_change = $4
            ORDER BY created_at, id
            LIMIT 1
        )
        "#,
    )
    .bind(item.product_id)
    .bind(TransactionType::Sale)
    .bind(sale_id)
    .bind(-item.quantity)
    .execute(&mut *conn)
    .await?;

    let rate = settings::current_rate(&mut *conn).await?;
    let restored_cost_gtq = if item.unit_cost > Decimal::ZERO {
        item.unit_cost
    } else {
        round_money(average_cost * rate)
    };

    if restored_cost_gtq > Decimal::ZERO {
        let restored_cost_usd = gtq_to_usd(restored_cost_gtq, rate);
        // restoration layers never take part in logistics allocation
        sqlx::query(
            r#"
            INSERT INTO cost_layers (product_id, purchase_item_id, unit_cost, unit_cost_gtq,
                                     base_unit_cost, logistics_allocated, quantity_remaining,
                                     original_quantity)
            VALUES ($1, NULL, $2, $3, $2, TRUE, $4, $4)
            "#,
        )
        .bind(item.product_id)
        .bind(restored_cost_usd)
        .bind(restored_cost_gtq)
        .bind(item.quantity)
        .execute(&mut *conn)
        .await?;
    } else {
        tracing::debug!(
            product_id = %item.product_id,
            "Zero-cost line reversed without a restoration layer"
        );
    }

    recompute_average_cost(&mut *conn, item.product_id).await?;

    inventory::append_entry(
        &mut *conn,
        item.product_id,
        TransactionType::Adjustment,
        item.quantity,
        stock_after,
        Some(sale_id),
        "Restored from deleted sale line",
    )
    .await?;

    let deleted = sqlx::query("DELETE FROM sale_items WHERE id = $1")
        .bind(item.id)
        .execute(&mut *conn)
        .await?;
    if deleted.rows_affected() == 0 {
        // the line vanished mid-reversal; abort rather than restore twice
        return Err(AppError::NotFound("Sale item".to_string()));
    }

    Ok(())
}

async fn fetch_items(db: &PgPool, sale_id: Uuid) -> AppResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT i.id, i.sale_id, i.product_id, p.product_name, i.quantity, i.unit_price,
               i.unit_cost, i.quantity * i.unit_price AS total_price,
               i.quantity * i.unit_cost AS total_cost, i.created_at
        FROM sale_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.sale_id = $1
        ORDER BY i.created_at, i.id
        "#,
    )
    .bind(sale_id)
    .fetch_all(db)
    .await?;
    Ok(items)
}

async fn fetch_items_tx(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT i.id, i.sale_id, i.product_id, p.product_name, i.quantity, i.unit_price,
               i.unit_cost, i.quantity * i.unit_price AS total_price,
               i.quantity * i.unit_cost AS total_cost, i.created_at
        FROM sale_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.sale_id = $1
        ORDER BY i.created_at, i.id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn fetch_item_tx(conn: &mut PgConnection, item_id: Uuid) -> AppResult<SaleItem> {
    let item = sqlx::query_as::<_, SaleItem>(
        r#"
        SELECT i.id, i.sale_id, i.product_id, p.product_name, i.quantity, i.unit_price,
               i.unit_cost, i.quantity * i.unit_price AS total_price,
               i.quantity * i.unit_cost AS total_cost, i.created_at
        FROM sale_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.id = $1
        "#,
    )
    .bind(item_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(item)
}

fn build_response(sale: Sale, items: Vec<SaleItem>) -> SaleResponse {
    let total_revenue: Decimal = items.iter().map(|i| i.total_price).sum();
    let total_cost: Decimal = items.iter().map(|i| i.total_cost).sum();
    SaleResponse {
        sale,
        items,
        profit: total_revenue - total_cost,
        total_revenue,
        total_cost,
    }
}
