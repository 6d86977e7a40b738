//! Reporting handlers for cost analysis and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::services::reporting::{CostReportQuery, ReportingService};
use crate::AppState;

/// Get the cost report for completed sales; `format=csv` downloads the
/// per-product rows as a CSV attachment
pub async fn get_cost_report(
    State(state): State<AppState>,
    Query(query): Query<CostReportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db.clone());

    let range = ReportingService::parse_report_range(
        query.start_date.as_deref(),
        query.end_date.as_deref(),
    )?;
    let report = service.get_cost_report(&range).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&report.products)?;
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"cost_report.csv\"",
                ),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(report).into_response())
    }
}
