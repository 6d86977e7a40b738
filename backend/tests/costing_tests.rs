//! FIFO cost layer consumption tests
//!
//! Tests for layer consumption including:
//! - Oldest-first draw ordering
//! - Quantity conservation across draws and shortfall
//! - Average-cost fallback when layers run out
//! - Money rounding of the resulting unit cost

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::costing::{plan_fifo_consumption, plan_unit_cost, usd_to_gtq, LayerView};
use shared::types::round_money;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn layer(id: i64, remaining: &str, unit_cost_gtq: &str) -> LayerView {
    LayerView {
        id,
        quantity_remaining: dec(remaining),
        unit_cost_gtq: dec(unit_cost_gtq),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two layers, consumption spans both: 5 at 10 then 2 at 12 = 74
    #[test]
    fn test_consumption_spans_layers() {
        let layers = vec![layer(1, "5", "10.00"), layer(2, "5", "12.00")];

        let plan = plan_fifo_consumption(&layers, dec("7"), dec("20.00"));

        assert_eq!(plan.total_cost_gtq, dec("74.00"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].layer_id, 1);
        assert_eq!(plan.draws[0].quantity, dec("5"));
        assert_eq!(plan.draws[1].layer_id, 2);
        assert_eq!(plan.draws[1].quantity, dec("2"));
    }

    /// Consumption smaller than the oldest layer touches only it
    #[test]
    fn test_partial_draw_from_oldest() {
        let layers = vec![layer(1, "5", "10.00"), layer(2, "5", "12.00")];

        let plan = plan_fifo_consumption(&layers, dec("3"), dec("20.00"));

        assert_eq!(plan.total_cost_gtq, dec("30.00"));
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].layer_id, 1);
        assert_eq!(plan.draws[0].quantity, dec("3"));
    }

    /// No layers at all: the whole quantity is costed at the fallback
    #[test]
    fn test_no_layers_uses_fallback() {
        let plan = plan_fifo_consumption(&[], dec("3"), dec("20.00"));

        assert_eq!(plan.total_cost_gtq, dec("60.00"));
        assert_eq!(plan.shortfall, dec("3"));
        assert!(plan.draws.is_empty());
    }

    /// Layers cover part of the quantity, fallback covers the rest
    #[test]
    fn test_shortfall_costed_at_fallback() {
        let layers = vec![layer(1, "2", "10.00")];

        let plan = plan_fifo_consumption(&layers, dec("5"), dec("20.00"));

        // 2 * 10 + 3 * 20 = 80
        assert_eq!(plan.total_cost_gtq, dec("80.00"));
        assert_eq!(plan.shortfall, dec("3"));
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].quantity, dec("2"));
    }

    /// Exhausted layers are skipped without a draw
    #[test]
    fn test_exhausted_layers_skipped() {
        let layers = vec![
            layer(1, "0", "8.00"),
            layer(2, "4", "10.00"),
            layer(3, "4", "12.00"),
        ];

        let plan = plan_fifo_consumption(&layers, dec("6"), dec("20.00"));

        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].layer_id, 2);
        assert_eq!(plan.draws[1].layer_id, 3);
        // 4 * 10 + 2 * 12 = 64
        assert_eq!(plan.total_cost_gtq, dec("64.00"));
    }

    /// Unit cost is the money-rounded average of the consumed total
    #[test]
    fn test_unit_cost_rounding() {
        let layers = vec![layer(1, "1", "10.00"), layer(2, "2", "11.00")];

        let plan = plan_fifo_consumption(&layers, dec("3"), dec("20.00"));

        // 32 / 3 = 10.666... rounds to 10.67
        assert_eq!(plan.total_cost_gtq, dec("32.00"));
        assert_eq!(plan_unit_cost(&plan, dec("3")), dec("10.67"));
    }

    /// Zero requested quantity produces an empty plan and a zero unit cost
    #[test]
    fn test_zero_quantity() {
        let layers = vec![layer(1, "5", "10.00")];

        let plan = plan_fifo_consumption(&layers, Decimal::ZERO, dec("20.00"));

        assert_eq!(plan.total_cost_gtq, Decimal::ZERO);
        assert!(plan.draws.is_empty());
        assert_eq!(plan_unit_cost(&plan, Decimal::ZERO), Decimal::ZERO);
    }

    /// Fractional quantities flow through the draws unchanged
    #[test]
    fn test_fractional_quantities() {
        let layers = vec![layer(1, "1.5", "10.00"), layer(2, "3.5", "14.00")];

        let plan = plan_fifo_consumption(&layers, dec("2.5"), dec("20.00"));

        // 1.5 * 10 + 1.0 * 14 = 29
        assert_eq!(plan.total_cost_gtq, dec("29.00"));
        assert_eq!(plan.draws[0].quantity, dec("1.5"));
        assert_eq!(plan.draws[1].quantity, dec("1.0"));
    }

    /// Layer costs snapshotted in GTQ are used as-is; the current rate
    /// only matters for the fallback
    #[test]
    fn test_snapshotted_cost_ignores_rate_change() {
        let layers = vec![layer(1, "5", "77.50")];

        // fallback reflects a different, newer rate
        let plan = plan_fifo_consumption(&layers, dec("5"), dec("80.00"));

        assert_eq!(plan.total_cost_gtq, dec("387.50"));
        assert_eq!(plan.shortfall, Decimal::ZERO);
    }

    /// USD amounts convert to GTQ with money rounding
    #[test]
    fn test_usd_to_gtq_conversion() {
        assert_eq!(usd_to_gtq(dec("10.00"), dec("7.7500")), dec("77.50"));
        assert_eq!(usd_to_gtq(dec("1.33"), dec("7.7500")), dec("10.31"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    /// Strategy for generating unit costs in GTQ
    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.01 to 1000.00
    }

    /// Strategy for generating a stack of layers, oldest first
    fn layers_strategy() -> impl Strategy<Value = Vec<LayerView>> {
        prop::collection::vec((quantity_strategy(), cost_strategy()), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (quantity_remaining, unit_cost_gtq))| LayerView {
                    id: i as i64 + 1,
                    quantity_remaining,
                    unit_cost_gtq,
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Property: drawn quantity plus shortfall equals the request
        #[test]
        fn prop_consumption_conserves_quantity(
            layers in layers_strategy(),
            quantity in quantity_strategy()
        ) {
            let plan = plan_fifo_consumption(&layers, quantity, dec("15.00"));

            let drawn: Decimal = plan.draws.iter().map(|d| d.quantity).sum();
            prop_assert_eq!(drawn + plan.shortfall, quantity);
        }

        /// Property: draws never exceed what a layer holds
        #[test]
        fn prop_draws_within_layer_bounds(
            layers in layers_strategy(),
            quantity in quantity_strategy()
        ) {
            let plan = plan_fifo_consumption(&layers, quantity, dec("15.00"));

            for draw in &plan.draws {
                let source = layers.iter().find(|l| l.id == draw.layer_id).unwrap();
                prop_assert!(draw.quantity > Decimal::ZERO);
                prop_assert!(draw.quantity <= source.quantity_remaining);
            }
        }

        /// Property: a layer is only drawn after every older layer with
        /// stock is fully drained
        #[test]
        fn prop_oldest_layers_drain_first(
            layers in layers_strategy(),
            quantity in quantity_strategy()
        ) {
            let plan = plan_fifo_consumption(&layers, quantity, dec("15.00"));

            for draw in &plan.draws {
                let position = layers.iter().position(|l| l.id == draw.layer_id).unwrap();
                for older in &layers[..position] {
                    if older.quantity_remaining <= Decimal::ZERO {
                        continue;
                    }
                    let older_draw = plan.draws.iter().find(|d| d.layer_id == older.id);
                    prop_assert!(older_draw.is_some());
                    prop_assert_eq!(older_draw.unwrap().quantity, older.quantity_remaining);
                }
            }
        }

        /// Property: with no shortfall the unit cost sits between the
        /// cheapest and priciest consumed layer, after rounding
        #[test]
        fn prop_unit_cost_bounded_by_layer_costs(
            layers in layers_strategy(),
            quantity in quantity_strategy()
        ) {
            let plan = plan_fifo_consumption(&layers, quantity, dec("15.00"));

            if plan.shortfall == Decimal::ZERO && !plan.draws.is_empty() {
                let unit_cost = plan_unit_cost(&plan, quantity);
                let consumed_costs: Vec<Decimal> = plan
                    .draws
                    .iter()
                    .map(|d| layers.iter().find(|l| l.id == d.layer_id).unwrap().unit_cost_gtq)
                    .collect();
                let min = *consumed_costs.iter().min().unwrap();
                let max = *consumed_costs.iter().max().unwrap();

                prop_assert!(unit_cost >= round_money(min) - dec("0.01"));
                prop_assert!(unit_cost <= round_money(max) + dec("0.01"));
            }
        }

        /// Property: total cost equals the sum over draws plus the
        /// fallback-costed shortfall
        #[test]
        fn prop_total_cost_decomposes(
            layers in layers_strategy(),
            quantity in quantity_strategy(),
            fallback in cost_strategy()
        ) {
            let plan = plan_fifo_consumption(&layers, quantity, fallback);

            let layer_cost: Decimal = plan
                .draws
                .iter()
                .map(|d| {
                    let source = layers.iter().find(|l| l.id == d.layer_id).unwrap();
                    d.quantity * source.unit_cost_gtq
                })
                .sum();

            prop_assert_eq!(plan.total_cost_gtq, layer_cost + plan.shortfall * fallback);
        }
    }
}

// ============================================================================
// Integration Test Helpers (consumption applied to a layer stack)
// ============================================================================

#[cfg(test)]
mod integration_helpers {
    use super::*;

    /// Apply a consumption plan to the stack the way the service updates
    /// quantity_remaining, returning the new stack
    pub fn apply_consumption(layers: &[LayerView], quantity: Decimal) -> Vec<LayerView> {
        let plan = plan_fifo_consumption(layers, quantity, dec("20.00"));
        layers
            .iter()
            .map(|l| {
                let drawn = plan
                    .draws
                    .iter()
                    .find(|d| d.layer_id == l.id)
                    .map(|d| d.quantity)
                    .unwrap_or(Decimal::ZERO);
                LayerView {
                    id: l.id,
                    quantity_remaining: l.quantity_remaining - drawn,
                    unit_cost_gtq: l.unit_cost_gtq,
                }
            })
            .collect()
    }

    #[test]
    fn test_remaining_after_consumption() {
        let layers = vec![layer(1, "5", "10.00"), layer(2, "5", "12.00")];

        let after = apply_consumption(&layers, dec("7"));

        assert_eq!(after[0].quantity_remaining, Decimal::ZERO);
        assert_eq!(after[1].quantity_remaining, dec("3"));
    }

    #[test]
    fn test_successive_consumptions_drain_in_order() {
        let layers = vec![layer(1, "5", "10.00"), layer(2, "5", "12.00")];

        let after_first = apply_consumption(&layers, dec("3"));
        assert_eq!(after_first[0].quantity_remaining, dec("2"));
        assert_eq!(after_first[1].quantity_remaining, dec("5"));

        let after_second = apply_consumption(&after_first, dec("4"));
        assert_eq!(after_second[0].quantity_remaining, Decimal::ZERO);
        assert_eq!(after_second[1].quantity_remaining, dec("3"));
    }

    #[test]
    fn test_drained_stack_costs_at_fallback() {
        let layers = vec![layer(1, "4", "10.00")];

        let after = apply_consumption(&layers, dec("4"));
        let plan = plan_fifo_consumption(&after, dec("2"), dec("20.00"));

        assert_eq!(plan.shortfall, dec("2"));
        assert_eq!(plan.total_cost_gtq, dec("40.00"));
    }
}
