//! Physical planning
//!
//! Lowers the optimized logical plan 1:1 into executable operators. The
//! only choice made here is the join algorithm: nested loop by default,
//! hash join for inner equi-joins when the strategy (and, for `Auto`, the
//! row-count estimates) call for it.

use tracing::debug;

use crate::catalog::Catalog;
use crate::sql::ast::{BinaryOp, JoinType, ResolvedExpr};

use super::super::cost::CostEstimator;
use super::super::error::PlannerResult;
use super::super::logical::LogicalPlan;
use super::PhysicalPlan;

/// How joins are lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// Always nested loop
    #[default]
    NestedLoop,
    /// Hash join whenever the join is an inner equi-join
    Hash,
    /// Hash join for inner equi-joins over inputs large enough to repay
    /// building the hash table
    Auto,
}

/// Estimated cross-product size below which `Auto` keeps the nested loop
const HASH_JOIN_WORK_THRESHOLD: f64 = 512.0;

/// Physical planner
pub struct PhysicalPlanner {
    strategy: JoinStrategy,
}

impl PhysicalPlanner {
    pub fn new() -> Self {
        Self::with_strategy(JoinStrategy::default())
    }

    pub fn with_strategy(strategy: JoinStrategy) -> Self {
        PhysicalPlanner { strategy }
    }

    pub fn plan(&self, plan: LogicalPlan, catalog: &Catalog) -> PlannerResult<PhysicalPlan> {
        match plan {
            LogicalPlan::Scan { table, columns } => {
                Ok(PhysicalPlan::TableScan { table, columns })
            }

            LogicalPlan::Filter { input, predicate } => Ok(PhysicalPlan::Filter {
                input: Box::new(self.plan(*input, catalog)?),
                predicate,
            }),

            LogicalPlan::Project { input, expressions } => Ok(PhysicalPlan::Project {
                input: Box::new(self.plan(*input, catalog)?),
                expressions,
            }),

            LogicalPlan::Calc {
                input,
                expressions,
                predicate,
            } => Ok(PhysicalPlan::Calc {
                input: Box::new(self.plan(*input, catalog)?),
                expressions,
                predicate,
            }),

            LogicalPlan::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                let left_width = left.output_columns().len();
                let left = self.plan(*left, catalog)?;
                let right = self.plan(*right, catalog)?;
                Ok(self.plan_join(left, right, join_type, condition, left_width, catalog))
            }

            LogicalPlan::Aggregate {
                input,
                group_by,
                aggregates,
            } => Ok(PhysicalPlan::HashAggregate {
                input: Box::new(self.plan(*input, catalog)?),
                group_by,
                aggregates,
            }),

            LogicalPlan::Sort { input, keys } => Ok(PhysicalPlan::Sort {
                input: Box::new(self.plan(*input, catalog)?),
                keys,
            }),

            LogicalPlan::Insert {
                table,
                columns,
                values,
            } => Ok(PhysicalPlan::Values {
                table,
                columns,
                values,
            }),

            LogicalPlan::Delete {
                table,
                columns,
                predicate,
            } => Ok(PhysicalPlan::DeleteScan {
                table,
                columns,
                predicate,
            }),
        }
    }

    fn plan_join(
        &self,
        left: PhysicalPlan,
        right: PhysicalPlan,
        join_type: JoinType,
        condition: Option<ResolvedExpr>,
        left_width: usize,
        catalog: &Catalog,
    ) -> PhysicalPlan {
        if join_type == JoinType::Inner {
            if let Some(keys) = condition.as_ref().and_then(|c| equi_keys(c, left_width)) {
                let use_hash = match self.strategy {
                    JoinStrategy::NestedLoop => false,
                    JoinStrategy::Hash => true,
                    JoinStrategy::Auto => {
                        let l = CostEstimator::estimate(&left, catalog).rows;
                        let r = CostEstimator::estimate(&right, catalog).rows;
                        l * r >= HASH_JOIN_WORK_THRESHOLD
                    }
                };
                if use_hash {
                    debug!(left_key = keys.0, right_key = keys.1, "lowering to hash join");
                    return PhysicalPlan::HashJoin {
                        left: Box::new(left),
                        right: Box::new(right),
                        left_key: keys.0,
                        right_key: keys.1,
                    };
                }
            }
        }

        PhysicalPlan::NestedLoopJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_type,
            condition,
        }
    }
}

impl Default for PhysicalPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract hash keys from a `left.col = right.col` condition, in either
/// operand order. Returns (probe offset, build offset within right row).
fn equi_keys(condition: &ResolvedExpr, left_width: usize) -> Option<(usize, usize)> {
    let (left, right) = match condition {
        ResolvedExpr::BinaryOp {
            left,
            op: BinaryOp::Eq,
            right,
            ..
        } => (left.as_ref(), right.as_ref()),
        _ => return None,
    };
    let (a, b) = match (left, right) {
        (ResolvedExpr::Column(a), ResolvedExpr::Column(b)) => (a.index, b.index),
        _ => return None,
    };
    if a < left_width && b >= left_width {
        Some((a, b - left_width))
    } else if b < left_width && a >= left_width {
        Some((b, a - left_width))
    } else {
        None
    }
}
