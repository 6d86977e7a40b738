//! FIFO cost layer math for inventory valuation
//!
//! Purchases create cost layers (a quantity at a landed USD unit cost with a
//! GTQ snapshot); sales consume them oldest first. Everything in this module
//! is pure: the backend services own persistence and locking and feed layer
//! views in, so the valuation math is testable without a database.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_money;

/// View of a cost layer for FIFO planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerView {
    pub id: i64,
    pub quantity_remaining: Decimal,
    pub unit_cost_gtq: Decimal,
}

/// A planned decrement against a single layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDraw {
    pub layer_id: i64,
    pub quantity: Decimal,
}

/// Outcome of planning a FIFO consumption
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionPlan {
    /// Total cost of the consumed quantity in GTQ, unrounded
    pub total_cost_gtq: Decimal,
    /// Per-layer quantities to decrement, oldest layer first
    pub draws: Vec<LayerDraw>,
    /// Quantity the layers could not cover, costed at the fallback rate
    pub shortfall: Decimal,
}

/// Plan a FIFO consumption of `quantity` units against `layers`.
///
/// `layers` must already be ordered oldest first. Each draw takes
/// `min(still needed, layer remaining)` until the quantity is satisfied.
/// If the layers run out, the rest is costed at `fallback_unit_cost_gtq`
/// (the product's average cost converted at the current rate). A shortfall
/// is an auditable costing fallback, not an error.
pub fn plan_fifo_consumption(
    layers: &[LayerView],
    quantity: Decimal,
    fallback_unit_cost_gtq: Decimal,
) -> ConsumptionPlan {
    let mut remaining = quantity;
    let mut total = Decimal::ZERO;
    let mut draws = Vec::new();

    for layer in layers {
        if remaining <= Decimal::ZERO {
            break;
        }
        if layer.quantity_remaining <= Decimal::ZERO {
            continue;
        }
        let take = remaining.min(layer.quantity_remaining);
        total += take * layer.unit_cost_gtq;
        draws.push(LayerDraw {
            layer_id: layer.id,
            quantity: take,
        });
        remaining -= take;
    }

    let shortfall = remaining.max(Decimal::ZERO);
    if shortfall > Decimal::ZERO {
        total += shortfall * fallback_unit_cost_gtq;
    }

    ConsumptionPlan {
        total_cost_gtq: total,
        draws,
        shortfall,
    }
}

/// Per-unit cost of a plan, money-rounded; zero for a non-positive quantity
pub fn plan_unit_cost(plan: &ConsumptionPlan, quantity: Decimal) -> Decimal {
    if quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(plan.total_cost_gtq / quantity)
}

/// Weighted average unit cost over `(quantity_remaining, unit_cost)` pairs.
///
/// Returns zero when no quantity remains. The result is unrounded; storage
/// rounds it to money precision.
pub fn weighted_average_cost<I>(layers: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let mut total_quantity = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;

    for (quantity, unit_cost) in layers {
        if quantity <= Decimal::ZERO {
            continue;
        }
        total_quantity += quantity;
        total_value += quantity * unit_cost;
    }

    if total_quantity > Decimal::ZERO {
        total_value / total_quantity
    } else {
        Decimal::ZERO
    }
}

/// One purchase line considered for logistics allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

/// Logistics cost assigned to a line
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticsShare {
    /// The line's slice of the total logistics cost (USD, unrounded)
    pub share: Decimal,
    /// The slice spread across the line's units (USD, money-rounded)
    pub per_unit: Decimal,
}

/// Split `total_logistics` across `lines` in proportion to line value
/// (`quantity * unit_cost`).
///
/// Returns `None` when there is nothing to allocate: zero/negative
/// logistics, or zero total product cost.
pub fn allocate_logistics_shares(
    lines: &[AllocationLine],
    total_logistics: Decimal,
) -> Option<Vec<LogisticsShare>> {
    if total_logistics <= Decimal::ZERO {
        return None;
    }
    let total_product_cost: Decimal = lines.iter().map(|l| l.quantity * l.unit_cost).sum();
    if total_product_cost <= Decimal::ZERO {
        return None;
    }

    let shares = lines
        .iter()
        .map(|line| {
            let line_value = line.quantity * line.unit_cost;
            let share = line_value / total_product_cost * total_logistics;
            let per_unit = if line.quantity > Decimal::ZERO {
                round_money(share / line.quantity)
            } else {
                Decimal::ZERO
            };
            LogisticsShare { share, per_unit }
        })
        .collect();

    Some(shares)
}

/// Convert a USD amount to GTQ at the given rate, money-rounded
pub fn usd_to_gtq(amount_usd: Decimal, rate: Decimal) -> Decimal {
    round_money(amount_usd * rate)
}

/// Convert a GTQ amount back to USD at the given rate, money-rounded.
/// A non-positive rate yields zero; callers validate rates before use.
pub fn gtq_to_usd(amount_gtq: Decimal, rate: Decimal) -> Decimal {
    if rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(amount_gtq / rate)
}
