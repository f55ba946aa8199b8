//! Physical query plans

pub mod planner;

pub use planner::{JoinStrategy, PhysicalPlanner};

use crate::sql::ast::{AggregateCall, AggregateKind, JoinType, ResolvedExpr};

use super::logical::expr::OutputColumn;
use super::logical::join_output_columns;

/// Physical plan node; each logical node lowers to exactly one of these
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    TableScan {
        table: String,
        columns: Vec<OutputColumn>,
    },
    Filter {
        input: Box<PhysicalPlan>,
        predicate: ResolvedExpr,
    },
    Project {
        input: Box<PhysicalPlan>,
        expressions: Vec<(ResolvedExpr, String)>,
    },
    Calc {
        input: Box<PhysicalPlan>,
        expressions: Vec<(ResolvedExpr, String)>,
        predicate: Option<ResolvedExpr>,
    },
    NestedLoopJoin {
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        join_type: JoinType,
        condition: Option<ResolvedExpr>,
    },
    /// Inner equi-join with the right side as the build table
    HashJoin {
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        /// Probe key offset in the left row
        left_key: usize,
        /// Build key offset in the right row
        right_key: usize,
    },
    HashAggregate {
        input: Box<PhysicalPlan>,
        group_by: Vec<ResolvedExpr>,
        aggregates: Vec<(AggregateCall, String)>,
    },
    Sort {
        input: Box<PhysicalPlan>,
        keys: Vec<(ResolvedExpr, bool)>,
    },
    /// Single-row literal source (INSERT)
    Values {
        table: String,
        columns: Vec<OutputColumn>,
        values: Vec<ResolvedExpr>,
    },
    /// Filtered view of a table: emits the rows a DELETE leaves behind
    DeleteScan {
        table: String,
        columns: Vec<OutputColumn>,
        predicate: Option<ResolvedExpr>,
    },
}

impl PhysicalPlan {
    pub fn output_columns(&self) -> Vec<OutputColumn> {
        match self {
            PhysicalPlan::TableScan { columns, .. } => columns.clone(),
            PhysicalPlan::Filter { input, .. } => input.output_columns(),
            PhysicalPlan::Project { expressions, .. }
            | PhysicalPlan::Calc { expressions, .. } => expressions
                .iter()
                .map(|(expr, name)| {
                    OutputColumn::new(name.clone(), expr.data_type(), expr.is_nullable())
                })
                .collect(),
            PhysicalPlan::NestedLoopJoin {
                left,
                right,
                join_type,
                ..
            } => join_output_columns(
                left.output_columns(),
                right.output_columns(),
                *join_type,
            ),
            PhysicalPlan::HashJoin { left, right, .. } => join_output_columns(
                left.output_columns(),
                right.output_columns(),
                JoinType::Inner,
            ),
            PhysicalPlan::HashAggregate {
                group_by,
                aggregates,
                ..
            } => {
                let mut columns: Vec<OutputColumn> = group_by
                    .iter()
                    .map(|expr| {
                        OutputColumn::new(
                            expr.display_name(),
                            expr.data_type(),
                            expr.is_nullable(),
                        )
                    })
                    .collect();
                columns.extend(aggregates.iter().map(|(call, name)| {
                    OutputColumn::new(
                        name.clone(),
                        call.result_type,
                        !matches!(call.kind, AggregateKind::Count),
                    )
                }));
                columns
            }
            PhysicalPlan::Sort { input, .. } => input.output_columns(),
            PhysicalPlan::Values { columns, .. }
            | PhysicalPlan::DeleteScan { columns, .. } => columns.clone(),
        }
    }
}
