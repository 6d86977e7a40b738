//! Reporting service for cost analysis and data export
//! Aggregates cost of goods sold, revenue and profit per product

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::types::DateRange;
use shared::validation::validate_date_range;

use crate::error::{AppError, AppResult};
use crate::services::sale::SaleStatus;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Per-product cost report entry; monetary figures in GTQ
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductCostReport {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_sold: Decimal,
    pub total_cost: Decimal,
    pub total_revenue: Decimal,
    pub avg_unit_cost: Decimal,
    pub profit: Decimal,
}

/// Grand totals across the reported products
#[derive(Debug, Serialize)]
pub struct CostReportTotals {
    pub quantity_sold: Decimal,
    pub total_cost: Decimal,
    pub total_revenue: Decimal,
    pub profit: Decimal,
}

/// Cost report over a date range of completed sales
#[derive(Debug, Serialize)]
pub struct CostReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub products: Vec<ProductCostReport>,
    pub totals: CostReportTotals,
}

/// Report query parameters; both dates are required
#[derive(Debug, Deserialize)]
pub struct CostReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub format: Option<String>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get the cost report for completed sales within the range
    pub async fn get_cost_report(&self, range: &DateRange) -> AppResult<CostReport> {
        validate_date_range(range).map_err(|msg| AppError::Validation {
            field: "start_date".to_string(),
            message: msg.to_string(),
            message_es: "La fecha inicial no puede ser posterior a la final".to_string(),
        })?;

        let products = sqlx::query_as::<_, ProductCostReport>(
            r#"
            SELECT
                i.product_id,
                p.product_name,
                SUM(i.quantity) as quantity_sold,
                SUM(i.quantity * i.unit_cost) as total_cost,
                SUM(i.quantity * i.unit_price) as total_revenue,
                CASE WHEN SUM(i.quantity) > 0
                    THEN ROUND(SUM(i.quantity * i.unit_cost) / SUM(i.quantity), 2)
                    ELSE 0
                END as avg_unit_cost,
                SUM(i.quantity * (i.unit_price - i.unit_cost)) as profit
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            JOIN products p ON p.id = i.product_id
            WHERE s.status = $1
              AND s.sale_date::date BETWEEN $2 AND $3
            GROUP BY i.product_id, p.product_name
            ORDER BY total_revenue DESC
            "#,
        )
        .bind(SaleStatus::Completed)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let totals = CostReportTotals {
            quantity_sold: products.iter().map(|p| p.quantity_sold).sum(),
            total_cost: products.iter().map(|p| p.total_cost).sum(),
            total_revenue: products.iter().map(|p| p.total_revenue).sum(),
            profit: products.iter().map(|p| p.profit).sum(),
        };

        Ok(CostReport {
            start_date: range.start,
            end_date: range.end,
            products,
            totals,
        })
    }

    /// Parse the report's required date parameters
    pub fn parse_report_range(
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> AppResult<DateRange> {
        let start = parse_report_date(start_date, "start_date")?;
        let end = parse_report_date(end_date, "end_date")?;
        Ok(DateRange::new(start, end))
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                crate::error::AppError::Internal(format!("CSV serialization error: {}", e))
            })?;
        }
        let csv_data = String::from_utf8(wtr.into_inner().map_err(|e| {
            crate::error::AppError::Internal(format!("CSV writer error: {}", e))
        })?)
        .map_err(|e| crate::error::AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

fn parse_report_date(value: Option<&str>, field: &str) -> AppResult<NaiveDate> {
    let raw = value.ok_or_else(|| AppError::Validation {
        field: field.to_string(),
        message: format!("{} is required", field),
        message_es: "La fecha es obligatoria".to_string(),
    })?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AppError::Validation {
        field: field.to_string(),
        message: format!("{} must be formatted YYYY-MM-DD", field),
        message_es: "La fecha debe tener el formato YYYY-MM-DD".to_string(),
    })
}
