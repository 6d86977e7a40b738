//! Inventory ledger service: the append-only audit trail of stock movements
//!
//! Every stock change (purchase receipt, sale, reversal adjustment) appends
//! an entry inside the same transaction as the movement itself. The ledger
//! is an audit surface; stock is never reconstructed from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Inventory ledger service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Stock movement categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inventory_transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Purchase,
    Sale,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Purchase => "purchase",
            TransactionType::Sale => "sale",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

/// Ledger entry with the product name joined in for display
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub transaction_type: TransactionType,
    pub quantity_change: Decimal,
    pub quantity_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing ledger entries
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub product_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List ledger entries, newest first
    pub async fn list_transactions(
        &self,
        query: ListTransactionsQuery,
    ) -> AppResult<Vec<InventoryTransaction>> {
        let limit = query.limit.unwrap_or(200).clamp(1, 1000);

        let transactions = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            SELECT t.id, t.product_id, p.product_name, t.transaction_type,
                   t.quantity_change, t.quantity_after, t.reference_id, t.notes, t.created_at
            FROM inventory_transactions t
            JOIN products p ON p.id = t.product_id
            WHERE ($1::uuid IS NULL OR t.product_id = $1)
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT $2
            "#,
        )
        .bind(query.product_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(transactions)
    }
}

/// Append a ledger entry inside an open transaction
pub(crate) async fn append_entry(
    conn: &mut PgConnection,
    product_id: Uuid,
    transaction_type: TransactionType,
    quantity_change: Decimal,
    quantity_after: Decimal,
    reference_id: Option<Uuid>,
    notes: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_transactions
            (product_id, transaction_type, quantity_change, quantity_after, reference_id, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(product_id)
    .bind(transaction_type)
    .bind(quantity_change)
    .bind(quantity_after)
    .bind(reference_id)
    .bind(notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
