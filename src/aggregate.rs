//! Per-department aggregation of sales rows
//!
//! Pure and synchronous. Output is ordered by descending total; departments
//! with equal totals keep the order in which they were first seen.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::codec::SalesRow;

/// Total sales for one department
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTotal {
    pub department_name: String,
    pub total_sales: i64,
}

/// Sum `number_of_sales` per trimmed department name.
///
/// Runs in O(n + k log k) for n rows and k departments. Sums saturate at the
/// `i64` bounds.
pub fn aggregate(rows: &[SalesRow]) -> Vec<AggregatedTotal> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<AggregatedTotal> = Vec::new();

    for row in rows {
        let department = row.department_name.trim();
        match slots.get(department) {
            Some(&slot) => {
                let total = &mut totals[slot].total_sales;
                *total = total.saturating_add(row.number_of_sales);
            }
            None => {
                slots.insert(department, totals.len());
                totals.push(AggregatedTotal {
                    department_name: department.to_string(),
                    total_sales: row.number_of_sales,
                });
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    totals.sort_by(|a, b| b.total_sales.cmp(&a.total_sales));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(department: &str, sales: i64) -> SalesRow {
        SalesRow {
            department_name: department.to_string(),
            date: "2023-08-01".to_string(),
            number_of_sales: sales,
        }
    }

    fn total(department: &str, sales: i64) -> AggregatedTotal {
        AggregatedTotal {
            department_name: department.to_string(),
            total_sales: sales,
        }
    }

    #[test]
    fn test_aggregate_sums_and_orders_descending() {
        let rows = vec![
            row("Electronics", 100),
            row("Clothing", 200),
            row("Electronics", 150),
        ];
        assert_eq!(
            aggregate(&rows),
            vec![total("Electronics", 250), total("Clothing", 200)]
        );
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_empty());
    }

    #[test]
    fn test_aggregate_trims_department_names() {
        let rows = vec![row(" Toys", 1), row("Toys ", 2)];
        assert_eq!(aggregate(&rows), vec![total("Toys", 3)]);
    }

    #[test]
    fn test_aggregate_conserves_total_sales() {
        let rows: Vec<SalesRow> = (0..200)
            .map(|i| row(&format!("dept-{}", i % 7), (i * 37 % 101) - 20))
            .collect();
        let input_sum: i64 = rows.iter().map(|r| r.number_of_sales).sum();
        let output_sum: i64 = aggregate(&rows).iter().map(|t| t.total_sales).sum();
        assert_eq!(input_sum, output_sum);
    }

    #[test]
    fn test_aggregate_totals_are_order_independent() {
        let rows = vec![
            row("A", 5),
            row("B", 3),
            row("C", 8),
            row("A", 1),
            row("B", 9),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let mut forward = aggregate(&rows);
        let mut backward = aggregate(&reversed);
        forward.sort_by(|a, b| a.department_name.cmp(&b.department_name));
        backward.sort_by(|a, b| a.department_name.cmp(&b.department_name));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_aggregate_ties_follow_first_seen_order() {
        let rows = vec![row("Zeta", 10), row("Alpha", 10), row("Mid", 30)];
        assert_eq!(
            aggregate(&rows),
            vec![total("Mid", 30), total("Zeta", 10), total("Alpha", 10)]
        );

        let swapped = vec![row("Alpha", 10), row("Zeta", 10), row("Mid", 30)];
        assert_eq!(
            aggregate(&swapped),
            vec![total("Mid", 30), total("Alpha", 10), total("Zeta", 10)]
        );
    }

    #[test]
    fn test_aggregate_accepts_zero_and_negative() {
        let rows = vec![row("Returns", -5), row("Idle", 0), row("Returns", 2)];
        assert_eq!(
            aggregate(&rows),
            vec![total("Idle", 0), total("Returns", -3)]
        );
    }

    #[test]
    fn test_aggregate_saturates() {
        let rows = vec![row("Huge", i64::MAX), row("Huge", 1)];
        assert_eq!(aggregate(&rows), vec![total("Huge", i64::MAX)]);
    }
}
