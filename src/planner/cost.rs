//! Cost model
//!
//! Row-count estimates derived from the catalog's per-table hints. Used to
//! choose the hash-join lowering under `JoinStrategy::Auto` and shown in
//! EXPLAIN output. No statistics beyond the registered hints.

use crate::catalog::{Catalog, DEFAULT_ROW_ESTIMATE};
use crate::planner::physical::PhysicalPlan;

/// Cost estimate for a plan subtree
#[derive(Debug, Clone, Default)]
pub struct Cost {
    /// Estimated number of rows produced
    pub rows: f64,
    /// CPU cost (arbitrary units)
    pub cpu: f64,
}

/// Cost estimator for physical plans
pub struct CostEstimator;

impl CostEstimator {
    /// Fraction of rows assumed to pass a filter predicate
    const FILTER_SELECTIVITY: f64 = 0.33;

    /// Fraction of the cross product assumed to survive a join condition
    const JOIN_SELECTIVITY: f64 = 0.1;

    /// Fraction of input rows assumed to form distinct groups
    const GROUP_FRACTION: f64 = 0.2;

    pub fn estimate(plan: &PhysicalPlan, catalog: &Catalog) -> Cost {
        match plan {
            PhysicalPlan::TableScan { table, .. } => {
                let rows = catalog
                    .get_table(table)
                    .map(|t| t.estimated_rows)
                    .unwrap_or(DEFAULT_ROW_ESTIMATE) as f64;
                Cost { rows, cpu: rows }
            }

            PhysicalPlan::Filter { input, .. } => {
                let input = Self::estimate(input, catalog);
                Cost {
                    rows: (input.rows * Self::FILTER_SELECTIVITY).max(1.0),
                    cpu: input.cpu + input.rows,
                }
            }

            PhysicalPlan::Project { input, .. } => {
                let input = Self::estimate(input, catalog);
                Cost {
                    rows: input.rows,
                    cpu: input.cpu + input.rows,
                }
            }

            PhysicalPlan::Calc {
                input, predicate, ..
            } => {
                let input = Self::estimate(input, catalog);
                let selectivity = if predicate.is_some() {
                    Self::FILTER_SELECTIVITY
                } else {
                    1.0
                };
                Cost {
                    rows: (input.rows * selectivity).max(1.0),
                    cpu: input.cpu + input.rows,
                }
            }

            PhysicalPlan::NestedLoopJoin { left, right, .. } => {
                let left = Self::estimate(left, catalog);
                let right = Self::estimate(right, catalog);
                Cost {
                    rows: (left.rows * right.rows * Self::JOIN_SELECTIVITY).max(1.0),
                    // the right side is rescanned per left row
                    cpu: left.cpu + left.rows * right.rows.max(1.0),
                }
            }

            PhysicalPlan::HashJoin { left, right, .. } => {
                let left = Self::estimate(left, catalog);
                let right = Self::estimate(right, catalog);
                Cost {
                    rows: (left.rows * right.rows * Self::JOIN_SELECTIVITY).max(1.0),
                    cpu: left.cpu + right.cpu + left.rows + right.rows,
                }
            }

            PhysicalPlan::HashAggregate { input, .. } => {
                let input = Self::estimate(input, catalog);
                Cost {
                    rows: (input.rows * Self::GROUP_FRACTION).max(1.0),
                    cpu: input.cpu + input.rows,
                }
            }

            PhysicalPlan::Sort { input, .. } => {
                let input = Self::estimate(input, catalog);
                let n = input.rows;
                Cost {
                    rows: n,
                    cpu: input.cpu + n * n.ln().max(1.0),
                }
            }

            PhysicalPlan::Values { .. } => Cost { rows: 1.0, cpu: 1.0 },

            PhysicalPlan::DeleteScan { table, .. } => {
                let rows = catalog
                    .get_table(table)
                    .map(|t| t.estimated_rows)
                    .unwrap_or(DEFAULT_ROW_ESTIMATE) as f64;
                Cost {
                    rows: (rows * Self::FILTER_SELECTIVITY).max(1.0),
                    cpu: rows,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType, TableSchema};
    use crate::planner::logical::OutputColumn;

    fn catalog_with_hint(rows: u64) -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register_table(
                TableSchema::new("t")
                    .column(Column::new("id", DataType::Integer))
                    .estimated_rows(rows),
            )
            .unwrap();
        catalog
    }

    fn scan() -> PhysicalPlan {
        PhysicalPlan::TableScan {
            table: "t".to_string(),
            columns: vec![OutputColumn::new("id", DataType::Integer, true)],
        }
    }

    #[test]
    fn test_scan_uses_catalog_hint() {
        let catalog = catalog_with_hint(1000);
        let cost = CostEstimator::estimate(&scan(), &catalog);
        assert_eq!(cost.rows, 1000.0);
    }

    #[test]
    fn test_filter_reduces_estimate() {
        let catalog = catalog_with_hint(1000);
        let filtered = PhysicalPlan::Filter {
            input: Box::new(scan()),
            predicate: crate::sql::ResolvedExpr::Literal(crate::sql::Literal::Boolean(
                true,
            )),
        };
        let cost = CostEstimator::estimate(&filtered, &catalog);
        assert!(cost.rows < 1000.0);
        assert!(cost.rows >= 1.0);
    }
}
