//! System settings service: the global USD to GTQ exchange rate
//!
//! Settings live in a single well-known row that is created on first
//! access. Valuation flows read the rate inside their own transactions so
//! a sale and a rate update never interleave mid-flow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use shared::types::round_rate;
use shared::validation::validate_exchange_rate;

use crate::error::{AppError, AppResult};

/// Settings service for the global configuration row
#[derive(Clone)]
pub struct SettingsService {
    db: PgPool,
}

/// The global settings row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SystemSettings {
    pub id: i16,
    pub usd_to_gtq_rate: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Input for updating the exchange rate
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsInput {
    pub usd_to_gtq_rate: Decimal,
}

impl SettingsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fetch the settings row, creating it with defaults on first access
    pub async fn get_settings(&self) -> AppResult<SystemSettings> {
        let mut tx = self.db.begin().await?;
        let settings = get_or_create_settings(&mut tx).await?;
        tx.commit().await?;
        Ok(settings)
    }

    /// Update the exchange rate
    pub async fn update_settings(&self, input: UpdateSettingsInput) -> AppResult<SystemSettings> {
        validate_exchange_rate(input.usd_to_gtq_rate).map_err(|msg| AppError::Validation {
            field: "usd_to_gtq_rate".to_string(),
            message: msg.to_string(),
            message_es: "El tipo de cambio debe ser mayor que cero".to_string(),
        })?;

        let mut tx = self.db.begin().await?;
        get_or_create_settings(&mut tx).await?;

        let settings = sqlx::query_as::<_, SystemSettings>(
            r#"
            UPDATE system_settings
            SET usd_to_gtq_rate = $1, last_updated = now()
            WHERE id = 1
            RETURNING id, usd_to_gtq_rate, last_updated
            "#,
        )
        .bind(round_rate(input.usd_to_gtq_rate))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(settings)
    }
}

/// Read the current exchange rate inside an open transaction
pub(crate) async fn current_rate(conn: &mut PgConnection) -> AppResult<Decimal> {
    let settings = get_or_create_settings(conn).await?;
    Ok(settings.usd_to_gtq_rate)
}

/// Fetch the settings row, inserting the default one if it does not exist yet
pub(crate) async fn get_or_create_settings(conn: &mut PgConnection) -> AppResult<SystemSettings> {
    sqlx::query("INSERT INTO system_settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
        .execute(&mut *conn)
        .await?;

    let settings = sqlx::query_as::<_, SystemSettings>(
        "SELECT id, usd_to_gtq_rate, last_updated FROM system_settings WHERE id = 1",
    )
    .fetch_one(&mut *conn)
    .await?;

    Ok(settings)
}
