//! Purchase service: orders, receiving, logistics allocation and reversal
//!
//! Receiving a purchase is the only way stock and cost layers enter the
//! system: status moves to received, each line bumps stock, creates a cost
//! layer at the current exchange rate and appends a ledger entry. Real
//! shipping and import-tax figures usually arrive later; recording them
//! fires the one-shot allocation engine that spreads the cost across the
//! purchase's layers in proportion to line value.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use shared::costing::{allocate_logistics_shares, usd_to_gtq, AllocationLine};
use shared::validation::{validate_non_negative_money, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::services::inventory::{self, TransactionType};
use crate::services::product::recompute_average_cost;
use crate::services::settings;

/// Purchase lifecycle service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

/// Purchase lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "purchase_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

/// Purchase row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub order_id: String,
    pub purchase_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub status: PurchaseStatus,
    pub weight_lb: Decimal,
    pub notes: String,
    pub estimated_shipping: Decimal,
    pub estimated_taxes: Decimal,
    pub real_shipping: Option<Decimal>,
    pub real_taxes: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase line with the product name and line total joined in
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub discount: Decimal,
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Monetary summary derived from the purchase and its lines
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseSummary {
    pub product_cost: Decimal,
    pub estimated_logistic_cost: Decimal,
    pub real_logistic_cost: Option<Decimal>,
    pub estimated_total: Decimal,
    pub real_total: Option<Decimal>,
    pub total_cost: Decimal,
    pub total_cost_gtq: Decimal,
}

/// Purchase with its lines and monetary summary
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    #[serde(flatten)]
    pub summary: PurchaseSummary,
}

/// Input for creating a purchase header; lines are added separately
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub order_id: Option<String>,
    pub purchase_date: NaiveDate,
    pub delivery_date: Option<NaiveDate>,
    pub weight_lb: Option<Decimal>,
    pub notes: Option<String>,
    pub estimated_shipping: Option<Decimal>,
    pub estimated_taxes: Option<Decimal>,
}

/// Input for updating a purchase
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePurchaseInput {
    pub order_id: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub status: Option<PurchaseStatus>,
    pub weight_lb: Option<Decimal>,
    pub notes: Option<String>,
    pub estimated_shipping: Option<Decimal>,
    pub estimated_taxes: Option<Decimal>,
    pub real_shipping: Option<Decimal>,
    pub real_taxes: Option<Decimal>,
}

/// Input for a purchase line
#[derive(Debug, Deserialize)]
pub struct PurchaseItemInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub discount: Option<Decimal>,
}

/// Input for recording real logistics figures
#[derive(Debug, Deserialize)]
pub struct SetRealLogisticsInput {
    pub real_shipping: Decimal,
    pub real_taxes: Decimal,
}

/// Bare line row used by the orchestration flows
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit_cost: Decimal,
}

const PURCHASE_COLUMNS: &str = "id, order_id, purchase_date, delivery_date, status, weight_lb, \
     notes, estimated_shipping, estimated_taxes, real_shipping, real_taxes, created_at, updated_at";

impl PurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List purchases with lines and monetary summaries, newest first
    pub async fn list_purchases(&self) -> AppResult<Vec<PurchaseResponse>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases ORDER BY purchase_date DESC, created_at DESC",
            PURCHASE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<Uuid> = purchases.iter().map(|p| p.id).collect();
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT i.id, i.purchase_id, i.product_id, p.product_name, i.quantity, i.unit_cost,
                   i.discount, i.quantity * i.unit_cost - i.discount AS total_price, i.created_at
            FROM purchase_items i
            JOIN products p ON p.id = i.product_id
            WHERE i.purchase_id = ANY($1)
            ORDER BY i.created_at, i.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<PurchaseItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.purchase_id).or_default().push(item);
        }

        let rate = self.read_rate().await?;
        Ok(purchases
            .into_iter()
            .map(|purchase| {
                let items = grouped.remove(&purchase.id).unwrap_or_default();
                build_response(purchase, items, rate)
            })
            .collect())
    }

    pub async fn get_purchase(&self, purchase_id: Uuid) -> AppResult<PurchaseResponse> {
        let purchase = self.fetch_purchase(purchase_id).await?;
        let items = fetch_items(&self.db, purchase_id).await?;
        let rate = self.read_rate().await?;
        Ok(build_response(purchase, items, rate))
    }

    pub async fn create_purchase(&self, input: CreatePurchaseInput) -> AppResult<PurchaseResponse> {
        let estimated_shipping = input.estimated_shipping.unwrap_or(Decimal::ZERO);
        let estimated_taxes = input.estimated_taxes.unwrap_or(Decimal::ZERO);
        validate_money_field(estimated_shipping, "estimated_shipping")?;
        validate_money_field(estimated_taxes, "estimated_taxes")?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            INSERT INTO purchases (order_id, purchase_date, delivery_date, weight_lb, notes,
                                   estimated_shipping, estimated_taxes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(input.order_id.unwrap_or_default())
        .bind(input.purchase_date)
        .bind(input.delivery_date)
        .bind(input.weight_lb.unwrap_or(Decimal::ZERO))
        .bind(input.notes.unwrap_or_default())
        .bind(estimated_shipping)
        .bind(estimated_taxes)
        .fetch_one(&self.db)
        .await?;

        let rate = self.read_rate().await?;
        Ok(build_response(purchase, Vec::new(), rate))
    }

    /// Update a purchase.
    ///
    /// The generic update can only move status between pending and
    /// cancelled; receiving goes through `receive_purchase`. When the
    /// update completes the real logistics figures on a received purchase
    /// (both were not set before, both are set now), the allocation engine
    /// fires exactly once.
    pub async fn update_purchase(
        &self,
        purchase_id: Uuid,
        input: UpdatePurchaseInput,
    ) -> AppResult<PurchaseResponse> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases WHERE id = $1 FOR UPDATE",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let status = match input.status {
            Some(new_status) if new_status != existing.status => {
                if existing.status == PurchaseStatus::Received
                    || new_status == PurchaseStatus::Received
                {
                    return Err(AppError::InvalidStateTransition(format!(
                        "Cannot move a purchase from {} to {} here; receiving has its own endpoint",
                        existing.status.as_str(),
                        new_status.as_str()
                    )));
                }
                new_status
            }
            _ => existing.status,
        };

        let estimated_shipping = input.estimated_shipping.unwrap_or(existing.estimated_shipping);
        let estimated_taxes = input.estimated_taxes.unwrap_or(existing.estimated_taxes);
        let real_shipping = input.real_shipping.or(existing.real_shipping);
        let real_taxes = input.real_taxes.or(existing.real_taxes);
        validate_money_field(estimated_shipping, "estimated_shipping")?;
        validate_money_field(estimated_taxes, "estimated_taxes")?;
        if let Some(amount) = real_shipping {
            validate_money_field(amount, "real_shipping")?;
        }
        if let Some(amount) = real_taxes {
            validate_money_field(amount, "real_taxes")?;
        }

        let had_real_costs = existing.real_shipping.is_some() && existing.real_taxes.is_some();

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            UPDATE purchases
            SET order_id = $1, purchase_date = $2, delivery_date = $3, status = $4,
                weight_lb = $5, notes = $6, estimated_shipping = $7, estimated_taxes = $8,
                real_shipping = $9, real_taxes = $10, updated_at = now()
            WHERE id = $11
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(input.order_id.unwrap_or(existing.order_id))
        .bind(input.purchase_date.unwrap_or(existing.purchase_date))
        .bind(input.delivery_date.or(existing.delivery_date))
        .bind(status)
        .bind(input.weight_lb.unwrap_or(existing.weight_lb))
        .bind(input.notes.unwrap_or(existing.notes))
        .bind(estimated_shipping)
        .bind(estimated_taxes)
        .bind(real_shipping)
        .bind(real_taxes)
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        let has_real_costs = purchase.real_shipping.is_some() && purchase.real_taxes.is_some();
        if purchase.status == PurchaseStatus::Received && !had_real_costs && has_real_costs {
            run_allocation(&mut tx, &purchase).await?;
        }

        let items = fetch_items_tx(&mut tx, purchase_id).await?;
        let rate = settings::current_rate(&mut tx).await?;
        tx.commit().await?;
        Ok(build_response(purchase, items, rate))
    }

    /// Record real shipping and import-tax figures
    pub async fn set_real_logistics(
        &self,
        purchase_id: Uuid,
        input: SetRealLogisticsInput,
    ) -> AppResult<PurchaseResponse> {
        self.update_purchase(
            purchase_id,
            UpdatePurchaseInput {
                real_shipping: Some(input.real_shipping),
                real_taxes: Some(input.real_taxes),
                ..Default::default()
            },
        )
        .await
    }

    /// Receive a purchase: bump stock, create cost layers and ledger entries
    pub async fn receive_purchase(&self, purchase_id: Uuid) -> AppResult<PurchaseResponse> {
        let mut tx = self.db.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases WHERE id = $1 FOR UPDATE",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        if purchase.status == PurchaseStatus::Received {
            return Err(AppError::Conflict {
                resource: "purchase".to_string(),
                message: "Purchase already received".to_string(),
                message_es: "La compra ya fue recibida".to_string(),
            });
        }

        // lines sorted by product so concurrent receives lock in the same order
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, product_id, quantity, unit_cost
            FROM purchase_items
            WHERE purchase_id = $1
            ORDER BY product_id, id
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&mut *tx)
        .await?;

        let rate = settings::current_rate(&mut tx).await?;
        let reference = order_reference(&purchase);

        for item in &items {
            let stock_after = sqlx::query_scalar::<_, Decimal>(
                r#"
                UPDATE products
                SET current_stock = current_stock + $1,
                    last_purchase_cost = $2,
                    last_purchase_date = $3,
                    updated_at = now()
                WHERE id = $4
                RETURNING current_stock
                "#,
            )
            .bind(item.quantity)
            .bind(item.unit_cost)
            .bind(purchase.purchase_date)
            .bind(item.product_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO cost_layers (product_id, purchase_item_id, unit_cost, unit_cost_gtq,
                                         base_unit_cost, quantity_remaining, original_quantity)
                VALUES ($1, $2, $3, $4, $3, $5, $5)
                "#,
            )
            .bind(item.product_id)
            .bind(item.id)
            .bind(item.unit_cost)
            .bind(usd_to_gtq(item.unit_cost, rate))
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            recompute_average_cost(&mut tx, item.product_id).await?;

            inventory::append_entry(
                &mut tx,
                item.product_id,
                TransactionType::Purchase,
                item.quantity,
                stock_after,
                Some(purchase.id),
                &format!("Purchase {} received", reference),
            )
            .await?;
        }

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "UPDATE purchases SET status = $1, updated_at = now() WHERE id = $2 RETURNING {}",
            PURCHASE_COLUMNS
        ))
        .bind(PurchaseStatus::Received)
        .bind(purchase_id)
        .fetch_one(&mut *tx)
        .await?;

        let items = fetch_items_tx(&mut tx, purchase_id).await?;
        tx.commit().await?;

        tracing::info!(purchase_id = %purchase_id, lines = items.len(), "Purchase received");
        Ok(build_response(purchase, items, rate))
    }

    /// Delete a purchase, reversing its stock and layers when it was received
    pub async fn delete_purchase(&self, purchase_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases WHERE id = $1 FOR UPDATE",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        if purchase.status == PurchaseStatus::Received {
            let items = sqlx::query_as::<_, ItemRow>(
                r#"
                SELECT id, product_id, quantity, unit_cost
                FROM purchase_items
                WHERE purchase_id = $1
                ORDER BY product_id, id
                "#,
            )
            .bind(purchase_id)
            .fetch_all(&mut *tx)
            .await?;

            let reference = order_reference(&purchase);

            for item in &items {
                let current = sqlx::query_scalar::<_, Decimal>(
                    "SELECT current_stock FROM products WHERE id = $1 FOR UPDATE",
                )
                .bind(item.product_id)
                .fetch_one(&mut *tx)
                .await?;

                let mut new_stock = current - item.quantity;
                if new_stock < Decimal::ZERO {
                    tracing::warn!(
                        product_id = %item.product_id,
                        purchase_id = %purchase_id,
                        current = %current,
                        reversing = %item.quantity,
                        "Reversing purchase would drive stock negative, clamping to zero"
                    );
                    new_stock = Decimal::ZERO;
                }

                sqlx::query(
                    "UPDATE products SET current_stock = $1, updated_at = now() WHERE id = $2",
                )
                .bind(new_stock)
                .bind(item.product_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM cost_layers WHERE purchase_item_id = $1")
                    .bind(item.id)
                    .execute(&mut *tx)
                    .await?;

                recompute_average_cost(&mut tx, item.product_id).await?;
            }

            sqlx::query(
                "DELETE FROM inventory_transactions WHERE reference_id = $1 AND transaction_type = $2",
            )
            .bind(purchase_id)
            .bind(TransactionType::Purchase)
            .execute(&mut *tx)
            .await?;

            // one adjustment entry per affected product, after the deletions above
            let mut reversed: BTreeMap<Uuid, Decimal> = BTreeMap::new();
            for item in &items {
                *reversed.entry(item.product_id).or_insert(Decimal::ZERO) += item.quantity;
            }
            for (product_id, total_quantity) in &reversed {
                let fresh_stock = sqlx::query_scalar::<_, Decimal>(
                    "SELECT current_stock FROM products WHERE id = $1",
                )
                .bind(product_id)
                .fetch_one(&mut *tx)
                .await?;

                inventory::append_entry(
                    &mut tx,
                    *product_id,
                    TransactionType::Adjustment,
                    -*total_quantity,
                    fresh_stock,
                    Some(purchase_id),
                    &format!("Purchase {} deleted - stock reversed", reference),
                )
                .await?;
            }
        }

        sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Add a line to a pending purchase
    pub async fn add_item(
        &self,
        purchase_id: Uuid,
        input: PurchaseItemInput,
    ) -> AppResult<PurchaseItem> {
        let discount = input.discount.unwrap_or(Decimal::ZERO);
        validate_item_input(input.quantity, input.unit_cost, discount)?;

        let mut tx = self.db.begin().await?;
        self.ensure_pending(&mut tx, purchase_id).await?;

        let product_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE id = $1")
                .bind(input.product_id)
                .fetch_one(&mut *tx)
                .await?;
        if product_exists == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let item_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_items (purchase_id, product_id, quantity, unit_cost, discount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(purchase_id)
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(discount)
        .fetch_one(&mut *tx)
        .await?;

        let item = fetch_item_tx(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Update a line of a pending purchase
    pub async fn update_item(
        &self,
        purchase_id: Uuid,
        item_id: Uuid,
        input: PurchaseItemInput,
    ) -> AppResult<PurchaseItem> {
        let discount = input.discount.unwrap_or(Decimal::ZERO);
        validate_item_input(input.quantity, input.unit_cost, discount)?;

        let mut tx = self.db.begin().await?;
        self.ensure_pending(&mut tx, purchase_id).await?;

        let updated = sqlx::query(
            r#"
            UPDATE purchase_items
            SET product_id = $1, quantity = $2, unit_cost = $3, discount = $4
            WHERE id = $5 AND purchase_id = $6
            "#,
        )
        .bind(input.product_id)
        .bind(input.quantity)
        .bind(input.unit_cost)
        .bind(discount)
        .bind(item_id)
        .bind(purchase_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase item".to_string()));
        }

        let item = fetch_item_tx(&mut tx, item_id).await?;
        tx.commit().await?;
        Ok(item)
    }

    /// Remove a line from a pending purchase
    pub async fn delete_item(&self, purchase_id: Uuid, item_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.ensure_pending(&mut tx, purchase_id).await?;

        let deleted = sqlx::query("DELETE FROM purchase_items WHERE id = $1 AND purchase_id = $2")
            .bind(item_id)
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase item".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ensure_pending(
        &self,
        conn: &mut PgConnection,
        purchase_id: Uuid,
    ) -> AppResult<()> {
        let status = sqlx::query_scalar::<_, PurchaseStatus>(
            "SELECT status FROM purchases WHERE id = $1 FOR UPDATE",
        )
        .bind(purchase_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        if status != PurchaseStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Purchase lines can only be changed while the purchase is pending, not {}",
                status.as_str()
            )));
        }
        Ok(())
    }

    async fn fetch_purchase(&self, purchase_id: Uuid) -> AppResult<Purchase> {
        sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM purchases WHERE id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))
    }

    async fn read_rate(&self) -> AppResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        settings::current_rate(&mut conn).await
    }
}

/// Spread the purchase's real logistics cost across its unallocated layers.
///
/// Idempotent: layers already marked allocated are skipped, lines without a
/// layer are skipped. Returns false when the figures or product cost make
/// allocation a no-op.
async fn run_allocation(conn: &mut PgConnection, purchase: &Purchase) -> AppResult<bool> {
    let total_logistics = purchase.real_shipping.unwrap_or(Decimal::ZERO)
        + purchase.real_taxes.unwrap_or(Decimal::ZERO);

    let items = sqlx::query_as::<_, ItemRow>(
        r#"
        SELECT id, product_id, quantity, unit_cost
        FROM purchase_items
        WHERE purchase_id = $1
        ORDER BY product_id, id
        "#,
    )
    .bind(purchase.id)
    .fetch_all(&mut *conn)
    .await?;

    let lines: Vec<AllocationLine> = items
        .iter()
        .map(|item| AllocationLine {
            quantity: item.quantity,
            unit_cost: item.unit_cost,
        })
        .collect();

    let Some(shares) = allocate_logistics_shares(&lines, total_logistics) else {
        tracing::debug!(purchase_id = %purchase.id, "Logistics allocation not ready, skipping");
        return Ok(false);
    };

    let rate = settings::current_rate(&mut *conn).await?;

    for (item, share) in items.iter().zip(shares.iter()) {
        sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(item.product_id)
            .execute(&mut *conn)
            .await?;

        let layer = sqlx::query_as::<_, (i64, Decimal, bool)>(
            r#"
            SELECT id, base_unit_cost, logistics_allocated
            FROM cost_layers
            WHERE purchase_item_id = $1
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(item.id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((layer_id, base_unit_cost, already_allocated)) = layer else {
            continue;
        };
        if already_allocated {
            continue;
        }

        let landed_unit_cost = base_unit_cost + share.per_unit;

        sqlx::query(
            r#"
            UPDATE cost_layers
            SET allocated_logistics_per_unit = $1, unit_cost = $2, unit_cost_gtq = $3,
                logistics_allocated = TRUE
            WHERE id = $4
            "#,
        )
        .bind(share.per_unit)
        .bind(landed_unit_cost)
        .bind(usd_to_gtq(landed_unit_cost, rate))
        .bind(layer_id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "UPDATE products SET last_purchase_cost = $1, updated_at = now() WHERE id = $2",
        )
        .bind(landed_unit_cost)
        .bind(item.product_id)
        .execute(&mut *conn)
        .await?;

        recompute_average_cost(&mut *conn, item.product_id).await?;
    }

    tracing::info!(
        purchase_id = %purchase.id,
        total_logistics = %total_logistics,
        "Logistics cost allocated across purchase layers"
    );
    Ok(true)
}

async fn fetch_items(db: &PgPool, purchase_id: Uuid) -> AppResult<Vec<PurchaseItem>> {
    let items = sqlx::query_as::<_, PurchaseItem>(
        r#"
        SELECT i.id, i.purchase_id, i.product_id, p.product_name, i.quantity, i.unit_cost,
               i.discount, i.quantity * i.unit_cost - i.discount AS total_price, i.created_at
        FROM purchase_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.purchase_id = $1
        ORDER BY i.created_at, i.id
        "#,
    )
    .bind(purchase_id)
    .fetch_all(db)
    .await?;
    Ok(items)
}

async fn fetch_items_tx(
    conn: &mut PgConnection,
    purchase_id: Uuid,
) -> AppResult<Vec<PurchaseItem>> {
    let items = sqlx::query_as::<_, PurchaseItem>(
        r#"
        SELECT i.id, i.purchase_id, i.product_id, p.product_name, i.quantity, i.unit_cost,
               i.discount, i.quantity * i.unit_cost - i.discount AS total_price, i.created_at
        FROM purchase_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.purchase_id = $1
        ORDER BY i.created_at, i.id
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn fetch_item_tx(conn: &mut PgConnection, item_id: Uuid) -> AppResult<PurchaseItem> {
    let item = sqlx::query_as::<_, PurchaseItem>(
        r#"
        SELECT i.id, i.purchase_id, i.product_id, p.product_name, i.quantity, i.unit_cost,
               i.discount, i.quantity * i.unit_cost - i.discount AS total_price, i.created_at
        FROM purchase_items i
        JOIN products p ON p.id = i.product_id
        WHERE i.id = $1
        "#,
    )
    .bind(item_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(item)
}

fn build_response(purchase: Purchase, items: Vec<PurchaseItem>, rate: Decimal) -> PurchaseResponse {
    let summary = build_summary(&purchase, &items, rate);
    PurchaseResponse {
        purchase,
        items,
        summary,
    }
}

fn build_summary(purchase: &Purchase, items: &[PurchaseItem], rate: Decimal) -> PurchaseSummary {
    let product_cost: Decimal = items.iter().map(|i| i.total_price).sum();
    let estimated_logistic_cost = purchase.estimated_shipping + purchase.estimated_taxes;
    let real_logistic_cost = match (purchase.real_shipping, purchase.real_taxes) {
        (Some(shipping), Some(taxes)) => Some(shipping + taxes),
        _ => None,
    };
    let estimated_total = product_cost + estimated_logistic_cost;
    let real_total = real_logistic_cost.map(|cost| product_cost + cost);
    let total_cost = real_total.unwrap_or(estimated_total);

    PurchaseSummary {
        product_cost,
        estimated_logistic_cost,
        real_logistic_cost,
        estimated_total,
        real_total,
        total_cost,
        total_cost_gtq: usd_to_gtq(total_cost, rate),
    }
}

fn order_reference(purchase: &Purchase) -> String {
    if purchase.order_id.is_empty() {
        purchase.id.to_string()
    } else {
        purchase.order_id.clone()
    }
}

fn validate_money_field(amount: Decimal, field: &str) -> AppResult<()> {
    validate_non_negative_money(amount).map_err(|msg| AppError::Validation {
        field: field.to_string(),
        message: msg.to_string(),
        message_es: "El monto no puede ser negativo".to_string(),
    })
}

fn validate_item_input(quantity: Decimal, unit_cost: Decimal, discount: Decimal) -> AppResult<()> {
    validate_positive_quantity(quantity).map_err(|msg| AppError::Validation {
        field: "quantity".to_string(),
        message: msg.to_string(),
        message_es: "La cantidad debe ser mayor que cero".to_string(),
    })?;
    validate_money_field(unit_cost, "unit_cost")?;
    validate_money_field(discount, "discount")
}
