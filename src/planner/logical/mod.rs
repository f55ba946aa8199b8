//! Logical query plans
//!
//! Relational operator tree produced by the builder and rewritten by the
//! optimizer. Every node can derive its output schema from its children;
//! the optimizer relies on that to verify rewrites are schema-preserving.

pub mod builder;
pub mod expr;

pub use builder::LogicalPlanBuilder;
pub use expr::OutputColumn;

use crate::sql::ast::{AggregateCall, AggregateKind, JoinType, ResolvedExpr};

/// Logical plan node
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// Read a registered table, projecting its declared columns in order
    Scan {
        table: String,
        columns: Vec<OutputColumn>,
    },
    Filter {
        input: Box<LogicalPlan>,
        predicate: ResolvedExpr,
    },
    Project {
        input: Box<LogicalPlan>,
        expressions: Vec<(ResolvedExpr, String)>,
    },
    /// Fused projection + optional predicate; produced by the optimizer
    Calc {
        input: Box<LogicalPlan>,
        expressions: Vec<(ResolvedExpr, String)>,
        predicate: Option<ResolvedExpr>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        join_type: JoinType,
        condition: Option<ResolvedExpr>,
    },
    /// Grouping: output is the group keys followed by the aggregate values
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<ResolvedExpr>,
        aggregates: Vec<(AggregateCall, String)>,
    },
    Sort {
        input: Box<LogicalPlan>,
        /// Sort keys over the input's output columns, with ascending flag
        keys: Vec<(ResolvedExpr, bool)>,
    },
    /// Single-row literal source feeding a table's schema
    Insert {
        table: String,
        columns: Vec<OutputColumn>,
        /// One value expression per table column, in schema order
        values: Vec<ResolvedExpr>,
    },
    /// Logical delete: emits the rows that survive the predicate
    Delete {
        table: String,
        columns: Vec<OutputColumn>,
        predicate: Option<ResolvedExpr>,
    },
}

impl LogicalPlan {
    /// Derive the output schema from the node and its children
    pub fn output_columns(&self) -> Vec<OutputColumn> {
        match self {
            LogicalPlan::Scan { columns, .. } => columns.clone(),
            LogicalPlan::Filter { input, .. } => input.output_columns(),
            LogicalPlan::Project { expressions, .. }
            | LogicalPlan::Calc { expressions, .. } => expressions
                .iter()
                .map(|(expr, name)| {
                    OutputColumn::new(name.clone(), expr.data_type(), expr.is_nullable())
                })
                .collect(),
            LogicalPlan::Join {
                left,
                right,
                join_type,
                ..
            } => join_output_columns(
                left.output_columns(),
                right.output_columns(),
                *join_type,
            ),
            LogicalPlan::Aggregate {
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
            LogicalPlan::Sort { input, .. } => input.output_columns(),
            LogicalPlan::Insert { columns, .. } | LogicalPlan::Delete { columns, .. } => {
                columns.clone()
            }
        }
    }

    /// Rebuild the node with each child replaced by `f(child)`
    pub fn map_children(self, f: &mut dyn FnMut(LogicalPlan) -> LogicalPlan) -> LogicalPlan {
        match self {
            LogicalPlan::Filter { input, predicate } => LogicalPlan::Filter {
                input: Box::new(f(*input)),
                predicate,
            },
            LogicalPlan::Project { input, expressions } => LogicalPlan::Project {
                input: Box::new(f(*input)),
                expressions,
            },
            LogicalPlan::Calc {
                input,
                expressions,
                predicate,
            } => LogicalPlan::Calc {
                input: Box::new(f(*input)),
                expressions,
                predicate,
            },
            LogicalPlan::Join {
                left,
                right,
                join_type,
                condition,
            } => LogicalPlan::Join {
                left: Box::new(f(*left)),
                right: Box::new(f(*right)),
                join_type,
                condition,
            },
            LogicalPlan::Aggregate {
                input,
                group_by,
                aggregates,
            } => LogicalPlan::Aggregate {
                input: Box::new(f(*input)),
                group_by,
                aggregates,
            },
            LogicalPlan::Sort { input, keys } => LogicalPlan::Sort {
                input: Box::new(f(*input)),
                keys,
            },
            leaf @ (LogicalPlan::Scan { .. }
            | LogicalPlan::Insert { .. }
            | LogicalPlan::Delete { .. }) => leaf,
        }
    }
}

/// Join output: left columns then right columns; outer joins make the
/// padded side nullable.
pub(crate) fn join_output_columns(
    mut left: Vec<OutputColumn>,
    mut right: Vec<OutputColumn>,
    join_type: JoinType,
) -> Vec<OutputColumn> {
    match join_type {
        JoinType::Left => {
            for col in &mut right {
                col.nullable = true;
            }
        }
        JoinType::Right => {
            for col in &mut left {
                col.nullable = true;
            }
        }
        JoinType::Inner | JoinType::Cross => {}
    }
    left.extend(right);
    left
}
