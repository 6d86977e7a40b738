//! Validation utilities for the FitStore inventory platform

use rust_decimal::Decimal;

use crate::types::DateRange;

// ============================================================================
// Quantity and Money Validations
// ============================================================================

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Validate that a monetary amount is not negative
pub fn validate_non_negative_money(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Validate that an exchange rate is strictly positive
pub fn validate_exchange_rate(rate: Decimal) -> Result<(), &'static str> {
    if rate <= Decimal::ZERO {
        return Err("Exchange rate must be greater than zero");
    }
    Ok(())
}

/// Check whether a product is at or below its reorder threshold
pub fn is_low_stock(current_stock: Decimal, min_stock_level: Decimal) -> bool {
    current_stock <= min_stock_level
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a report date range (start must not be after end)
pub fn validate_date_range(range: &DateRange) -> Result<(), &'static str> {
    if range.start > range.end {
        return Err("Start date must be before or equal to end date");
    }
    Ok(())
}

/// Validate a product name (required, at most 200 characters)
pub fn validate_product_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Product name is required");
    }
    if trimmed.len() > 200 {
        return Err("Product name must be at most 200 characters");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}
