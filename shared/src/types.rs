//! Common types and money conventions used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a monetary amount to 2 decimal places, half away from zero.
///
/// This matches what NUMERIC(10,2) columns do to values on insert, so
/// amounts computed in Rust agree with what the database stores.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round an exchange rate to 4 decimal places, half away from zero
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Default USD to GTQ exchange rate used until the settings row is edited
pub fn default_usd_to_gtq_rate() -> Decimal {
    Decimal::new(77500, 4)
}

/// Date range for report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    pub fn new(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Self {
        Self { start, end }
    }
}
