//! Cost report aggregation and export tests
//!
//! Tests for the period cost report including:
//! - Date range parsing and validation
//! - Per-product aggregation of completed sale lines
//! - Grand total consistency
//! - CSV export formatting

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use shared::types::{round_money, DateRange};
use shared::validation::validate_date_range;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One sale line as the report query sees it
#[derive(Debug, Clone)]
struct SaleRecord {
    product: &'static str,
    sale_date: NaiveDate,
    completed: bool,
    quantity: Decimal,
    unit_price: Decimal,
    unit_cost: Decimal,
}

/// One aggregated report line
#[derive(Debug, Clone, PartialEq)]
struct ReportLine {
    product: &'static str,
    quantity_sold: Decimal,
    total_cost: Decimal,
    total_revenue: Decimal,
    avg_unit_cost: Decimal,
    profit: Decimal,
}

/// Aggregate completed lines inside the range, ordered by revenue
/// descending like the report query
fn simulate_cost_report(records: &[SaleRecord], range: &DateRange) -> Vec<ReportLine> {
    let mut grouped: BTreeMap<&'static str, (Decimal, Decimal, Decimal)> = BTreeMap::new();

    for record in records {
        if !record.completed {
            continue;
        }
        if record.sale_date < range.start || record.sale_date > range.end {
            continue;
        }
        let entry = grouped.entry(record.product).or_insert((
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        ));
        entry.0 += record.quantity;
        entry.1 += record.quantity * record.unit_cost;
        entry.2 += record.quantity * record.unit_price;
    }

    let mut lines: Vec<ReportLine> = grouped
        .into_iter()
        .map(|(product, (quantity_sold, total_cost, total_revenue))| {
            let avg_unit_cost = if quantity_sold > Decimal::ZERO {
                round_money(total_cost / quantity_sold)
            } else {
                Decimal::ZERO
            };
            ReportLine {
                product,
                quantity_sold,
                total_cost,
                total_revenue,
                avg_unit_cost,
                profit: total_revenue - total_cost,
            }
        })
        .collect();

    lines.sort_by(|a, b| b.total_revenue.cmp(&a.total_revenue));
    lines
}

/// Grand totals across report lines
fn report_totals(lines: &[ReportLine]) -> (Decimal, Decimal, Decimal, Decimal) {
    lines.iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(quantity, cost, revenue, profit), line| {
            (
                quantity + line.quantity_sold,
                cost + line.total_cost,
                revenue + line.total_revenue,
                profit + line.profit,
            )
        },
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn fixture() -> Vec<SaleRecord> {
        vec![
            SaleRecord {
                product: "Creatine 300g",
                sale_date: date("2026-01-10"),
                completed: true,
                quantity: dec("3"),
                unit_price: dec("250.00"),
                unit_cost: dec("155.00"),
            },
            SaleRecord {
                product: "Creatine 300g",
                sale_date: date("2026-01-20"),
                completed: true,
                quantity: dec("2"),
                unit_price: dec("245.00"),
                unit_cost: dec("160.00"),
            },
            SaleRecord {
                product: "Whey 5lb",
                sale_date: date("2026-01-15"),
                completed: true,
                quantity: dec("1"),
                unit_price: dec("480.00"),
                unit_cost: dec("390.00"),
            },
            SaleRecord {
                product: "Shaker",
                sale_date: date("2026-01-18"),
                completed: false,
                quantity: dec("10"),
                unit_price: dec("60.00"),
                unit_cost: dec("25.00"),
            },
        ]
    }

    fn january() -> DateRange {
        DateRange::new(date("2026-01-01"), date("2026-01-31"))
    }

    /// Lines group by product and sum quantity, cost and revenue
    #[test]
    fn test_aggregation_per_product() {
        let lines = simulate_cost_report(&fixture(), &january());

        assert_eq!(lines.len(), 2);

        let creatine = lines.iter().find(|l| l.product == "Creatine 300g").unwrap();
        assert_eq!(creatine.quantity_sold, dec("5"));
        // 3 * 155 + 2 * 160 = 785
        assert_eq!(creatine.total_cost, dec("785.00"));
        // 3 * 250 + 2 * 245 = 1240
        assert_eq!(creatine.total_revenue, dec("1240.00"));
        assert_eq!(creatine.profit, dec("455.00"));
    }

    /// Average unit cost is total cost over quantity, money rounded
    #[test]
    fn test_average_unit_cost() {
        let lines = simulate_cost_report(&fixture(), &january());

        let creatine = lines.iter().find(|l| l.product == "Creatine 300g").unwrap();
        // 785 / 5 = 157.00
        assert_eq!(creatine.avg_unit_cost, dec("157.00"));
    }

    /// Pending sales stay out of the report
    #[test]
    fn test_pending_sales_excluded() {
        let lines = simulate_cost_report(&fixture(), &january());

        assert!(lines.iter().all(|l| l.product != "Shaker"));
    }

    /// Lines outside the range stay out, boundaries are inclusive
    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(date("2026-01-10"), date("2026-01-15"));
        let lines = simulate_cost_report(&fixture(), &range);

        // the Jan 10 creatine line and the Jan 15 whey line survive
        let creatine = lines.iter().find(|l| l.product == "Creatine 300g").unwrap();
        assert_eq!(creatine.quantity_sold, dec("3"));
        assert!(lines.iter().any(|l| l.product == "Whey 5lb"));
    }

    /// Highest revenue product leads the report
    #[test]
    fn test_sorted_by_revenue_descending() {
        let lines = simulate_cost_report(&fixture(), &january());

        assert_eq!(lines[0].product, "Creatine 300g");
        assert_eq!(lines[1].product, "Whey 5lb");
    }

    /// Grand totals sum the lines
    #[test]
    fn test_grand_totals() {
        let lines = simulate_cost_report(&fixture(), &january());
        let (quantity, cost, revenue, profit) = report_totals(&lines);

        assert_eq!(quantity, dec("6"));
        assert_eq!(cost, dec("1175.00"));
        assert_eq!(revenue, dec("1720.00"));
        assert_eq!(profit, dec("545.00"));
    }

    /// An empty window produces an empty report
    #[test]
    fn test_empty_window() {
        let range = DateRange::new(date("2025-06-01"), date("2025-06-30"));
        let lines = simulate_cost_report(&fixture(), &range);

        assert!(lines.is_empty());
        let (quantity, cost, revenue, profit) = report_totals(&lines);
        assert_eq!(quantity, Decimal::ZERO);
        assert_eq!(cost, Decimal::ZERO);
        assert_eq!(revenue, Decimal::ZERO);
        assert_eq!(profit, Decimal::ZERO);
    }

    /// Report dates parse as YYYY-MM-DD only
    #[test]
    fn test_date_parsing() {
        assert!(NaiveDate::parse_from_str("2026-01-31", "%Y-%m-%d").is_ok());
        assert!(NaiveDate::parse_from_str("31/01/2026", "%Y-%m-%d").is_err());
        assert!(NaiveDate::parse_from_str("2026-02-30", "%Y-%m-%d").is_err());
        assert!(NaiveDate::parse_from_str("", "%Y-%m-%d").is_err());
    }

    /// A reversed range is rejected, a single-day range is fine
    #[test]
    fn test_range_validation() {
        let start = date("2026-01-01");
        let end = date("2026-01-31");

        assert!(validate_date_range(&DateRange::new(start, end)).is_ok());
        assert!(validate_date_range(&DateRange::new(end, start)).is_err());
        assert!(validate_date_range(&DateRange::new(start, start)).is_ok());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    const PRODUCTS: [&str; 3] = ["Creatine 300g", "Whey 5lb", "Shaker"];

    /// Strategy for completed sale lines inside January 2026
    fn record_strategy() -> impl Strategy<Value = SaleRecord> {
        (
            0usize..3,
            1u32..=28,
            (1i64..=50i64).prop_map(|n| Decimal::new(n, 0)),
            (1000i64..=60000i64).prop_map(|n| Decimal::new(n, 2)),
            (500i64..=40000i64).prop_map(|n| Decimal::new(n, 2)),
        )
            .prop_map(|(product, day, quantity, unit_price, unit_cost)| SaleRecord {
                product: PRODUCTS[product],
                sale_date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
                completed: true,
                quantity,
                unit_price,
                unit_cost,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: profit always equals revenue minus cost, per line
        /// and in the totals
        #[test]
        fn prop_profit_decomposes(records in prop::collection::vec(record_strategy(), 1..20)) {
            let range = DateRange::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            );
            let lines = simulate_cost_report(&records, &range);

            for line in &lines {
                prop_assert_eq!(line.profit, line.total_revenue - line.total_cost);
            }

            let (_, cost, revenue, profit) = report_totals(&lines);
            prop_assert_eq!(profit, revenue - cost);
        }

        /// Property: grand totals match summing the raw records directly
        #[test]
        fn prop_totals_match_records(records in prop::collection::vec(record_strategy(), 1..20)) {
            let range = DateRange::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            );
            let lines = simulate_cost_report(&records, &range);
            let (quantity, cost, revenue, _) = report_totals(&lines);

            let raw_quantity: Decimal = records.iter().map(|r| r.quantity).sum();
            let raw_cost: Decimal = records.iter().map(|r| r.quantity * r.unit_cost).sum();
            let raw_revenue: Decimal = records.iter().map(|r| r.quantity * r.unit_price).sum();

            prop_assert_eq!(quantity, raw_quantity);
            prop_assert_eq!(cost, raw_cost);
            prop_assert_eq!(revenue, raw_revenue);
        }

        /// Property: lines come out sorted by revenue descending
        #[test]
        fn prop_sorted_by_revenue(records in prop::collection::vec(record_strategy(), 1..20)) {
            let range = DateRange::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            );
            let lines = simulate_cost_report(&records, &range);

            for pair in lines.windows(2) {
                prop_assert!(pair[0].total_revenue >= pair[1].total_revenue);
            }
        }

        /// Property: the average unit cost stays within a cent of
        /// cost over quantity
        #[test]
        fn prop_average_close_to_ratio(records in prop::collection::vec(record_strategy(), 1..20)) {
            let range = DateRange::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            );
            let lines = simulate_cost_report(&records, &range);

            for line in &lines {
                let ratio = line.total_cost / line.quantity_sold;
                let diff = (line.avg_unit_cost - ratio).abs();
                prop_assert!(diff <= dec("0.005"));
            }
        }
    }
}

// ============================================================================
// CSV Export Tests
// ============================================================================

#[cfg(test)]
mod csv_tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct CsvRow {
        product_name: String,
        quantity_sold: Decimal,
        total_cost: Decimal,
        total_revenue: Decimal,
        avg_unit_cost: Decimal,
        profit: Decimal,
    }

    fn write_csv(rows: &[CsvRow]) -> String {
        let mut writer = csv::Writer::from_writer(vec![]);
        for row in rows {
            writer.serialize(row).unwrap();
        }
        let bytes = writer.into_inner().unwrap();
        String::from_utf8(bytes).unwrap()
    }

    /// Headers come from the struct field names
    #[test]
    fn test_csv_header_row() {
        let rows = vec![CsvRow {
            product_name: "Creatine 300g".to_string(),
            quantity_sold: dec("5"),
            total_cost: dec("785.00"),
            total_revenue: dec("1240.00"),
            avg_unit_cost: dec("157.00"),
            profit: dec("455.00"),
        }];

        let csv = write_csv(&rows);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "product_name,quantity_sold,total_cost,total_revenue,avg_unit_cost,profit"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Creatine 300g,5,785.00,1240.00,157.00,455.00"
        );
    }

    /// One data line per report line, order preserved
    #[test]
    fn test_csv_row_per_line() {
        let rows = vec![
            CsvRow {
                product_name: "Creatine 300g".to_string(),
                quantity_sold: dec("5"),
                total_cost: dec("785.00"),
                total_revenue: dec("1240.00"),
                avg_unit_cost: dec("157.00"),
                profit: dec("455.00"),
            },
            CsvRow {
                product_name: "Whey 5lb".to_string(),
                quantity_sold: dec("1"),
                total_cost: dec("390.00"),
                total_revenue: dec("480.00"),
                avg_unit_cost: dec("390.00"),
                profit: dec("90.00"),
            },
        ];

        let csv = write_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Creatine 300g,"));
        assert!(lines[2].starts_with("Whey 5lb,"));
    }

    /// Product names containing commas get quoted
    #[test]
    fn test_csv_quoting() {
        let rows = vec![CsvRow {
            product_name: "Whey, chocolate".to_string(),
            quantity_sold: dec("1"),
            total_cost: dec("390.00"),
            total_revenue: dec("480.00"),
            avg_unit_cost: dec("390.00"),
            profit: dec("90.00"),
        }];

        let csv = write_csv(&rows);

        assert!(csv.contains("\"Whey, chocolate\""));
    }
}
