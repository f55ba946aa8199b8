//! Rewrite rules
//!
//! Pure structural rewrites over `LogicalPlan`. Each rule transforms the
//! tree top-down; the optimizer driver runs the rule list repeatedly until
//! the plan stops changing.

use crate::catalog::DataType;
use crate::sql::ast::{BinaryOp, JoinType, ResolvedColumn, ResolvedExpr};

use super::super::logical::LogicalPlan;

/// A named plan rewrite
pub trait RewriteRule {
    fn name(&self) -> &'static str;
    fn apply(&self, plan: LogicalPlan) -> LogicalPlan;
}

// ---------------------------------------------------------------------------
// Expression helpers
// ---------------------------------------------------------------------------

/// Split a predicate into its AND-ed conjuncts
pub fn split_conjuncts(expr: ResolvedExpr) -> Vec<ResolvedExpr> {
    match expr {
        ResolvedExpr::BinaryOp {
            left,
            op: BinaryOp::And,
            right,
            ..
        } => {
            let mut parts = split_conjuncts(*left);
            parts.extend(split_conjuncts(*right));
            parts
        }
        other => vec![other],
    }
}

/// Rebuild a predicate from conjuncts; None for an empty list
pub fn combine_conjuncts(parts: Vec<ResolvedExpr>) -> Option<ResolvedExpr> {
    parts.into_iter().reduce(|acc, part| ResolvedExpr::BinaryOp {
        left: Box::new(acc),
        op: BinaryOp::And,
        right: Box::new(part),
        result_type: DataType::Boolean,
    })
}

/// Collect every column index the expression references
fn collect_columns(expr: &ResolvedExpr, out: &mut Vec<usize>) {
    match expr {
        ResolvedExpr::Column(c) => out.push(c.index),
        ResolvedExpr::BinaryOp { left, right, .. } => {
            collect_columns(left, out);
            collect_columns(right, out);
        }
        ResolvedExpr::UnaryOp { expr, .. } => collect_columns(expr, out),
        ResolvedExpr::IsNull { expr, .. } => collect_columns(expr, out),
        ResolvedExpr::Aggregate(call) => {
            if let Some(arg) = &call.arg {
                collect_columns(arg, out);
            }
        }
        ResolvedExpr::Literal(_) => {}
    }
}

fn referenced_columns(expr: &ResolvedExpr) -> Vec<usize> {
    let mut out = Vec::new();
    collect_columns(expr, &mut out);
    out
}

/// Shift every column index by `delta` (moving a predicate across a join
/// boundary)
fn shift_columns(expr: ResolvedExpr, delta: isize) -> ResolvedExpr {
    match expr {
        ResolvedExpr::Column(c) => ResolvedExpr::Column(ResolvedColumn {
            index: (c.index as isize + delta) as usize,
            ..c
        }),
        ResolvedExpr::BinaryOp {
            left,
            op,
            right,
            result_type,
        } => ResolvedExpr::BinaryOp {
            left: Box::new(shift_columns(*left, delta)),
            op,
            right: Box::new(shift_columns(*right, delta)),
            result_type,
        },
        ResolvedExpr::UnaryOp {
            op,
            expr,
            result_type,
        } => ResolvedExpr::UnaryOp {
            op,
            expr: Box::new(shift_columns(*expr, delta)),
            result_type,
        },
        ResolvedExpr::IsNull { expr, negated } => ResolvedExpr::IsNull {
            expr: Box::new(shift_columns(*expr, delta)),
            negated,
        },
        other => other,
    }
}

/// Rewrite column references through a projection: index i becomes the
/// projection's i-th expression. Only valid when every referenced item is
/// a bare column; returns None otherwise.
fn remap_through_projection(
    expr: &ResolvedExpr,
    expressions: &[(ResolvedExpr, String)],
) -> Option<ResolvedExpr> {
    match expr {
        ResolvedExpr::Column(c) => match expressions.get(c.index) {
            Some((ResolvedExpr::Column(inner), _)) => {
                Some(ResolvedExpr::Column(inner.clone()))
            }
            _ => None,
        },
        ResolvedExpr::BinaryOp {
            left,
            op,
            right,
            result_type,
        } => Some(ResolvedExpr::BinaryOp {
            left: Box::new(remap_through_projection(left, expressions)?),
            op: *op,
            right: Box::new(remap_through_projection(right, expressions)?),
            result_type: *result_type,
        }),
        ResolvedExpr::UnaryOp {
            op,
            expr,
            result_type,
        } => Some(ResolvedExpr::UnaryOp {
            op: *op,
            expr: Box::new(remap_through_projection(expr, expressions)?),
            result_type: *result_type,
        }),
        ResolvedExpr::IsNull { expr, negated } => Some(ResolvedExpr::IsNull {
            expr: Box::new(remap_through_projection(expr, expressions)?),
            negated: *negated,
        }),
        ResolvedExpr::Literal(_) => Some(expr.clone()),
        ResolvedExpr::Aggregate(_) => None,
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Collapse adjacent filters into one AND-ed predicate
pub struct FilterMerge;

impl RewriteRule for FilterMerge {
    fn name(&self) -> &'static str {
        "FilterMerge"
    }

    fn apply(&self, plan: LogicalPlan) -> LogicalPlan {
        let plan = match plan {
            LogicalPlan::Filter { input, predicate } => match *input {
                LogicalPlan::Filter {
                    input: inner,
                    predicate: inner_predicate,
                } => LogicalPlan::Filter {
                    input: inner,
                    predicate: ResolvedExpr::BinaryOp {
                        left: Box::new(inner_predicate),
                        op: BinaryOp::And,
                        right: Box::new(predicate),
                        result_type: DataType::Boolean,
                    },
                },
                other => LogicalPlan::Filter {
                    input: Box::new(other),
                    predicate,
                },
            },
            other => other,
        };
        plan.map_children(&mut |child| self.apply(child))
    }
}

/// Move a filter below a projection when its references are bare columns
pub struct PushFilterPastProject;

impl RewriteRule for PushFilterPastProject {
    fn name(&self) -> &'static str {
        "PushFilterPastProject"
    }

    fn apply(&self, plan: LogicalPlan) -> LogicalPlan {
        let plan = match plan {
            LogicalPlan::Filter { input, predicate } => match *input {
                LogicalPlan::Project {
                    input: inner,
                    expressions,
                } => match remap_through_projection(&predicate, &expressions) {
                    Some(remapped) => LogicalPlan::Project {
                        input: Box::new(LogicalPlan::Filter {
                            input: inner,
                            predicate: remapped,
                        }),
                        expressions,
                    },
                    None => LogicalPlan::Filter {
                        input: Box::new(LogicalPlan::Project {
                            input: inner,
                            expressions,
                        }),
                        predicate,
                    },
                },
                other => LogicalPlan::Filter {
                    input: Box::new(other),
                    predicate,
                },
            },
            other => other,
        };
        plan.map_children(&mut |child| self.apply(child))
    }
}

/// Push single-side conjuncts of a filter above an inner or cross join
/// below the join, onto the side they reference
pub struct PushFilterIntoJoin;

impl RewriteRule for PushFilterIntoJoin {
    fn name(&self) -> &'static str {
        "PushFilterIntoJoin"
    }

    fn apply(&self, plan: LogicalPlan) -> LogicalPlan {
        let plan = match plan {
            LogicalPlan::Filter { input, predicate } => match *input {
                LogicalPlan::Join {
                    left,
                    right,
                    join_type,
                    condition,
                } if matches!(join_type, JoinType::Inner | JoinType::Cross) => {
                    let left_width = left.output_columns().len();

                    let mut left_parts = Vec::new();
                    let mut right_parts = Vec::new();
                    let mut kept = Vec::new();
                    for conjunct in split_conjuncts(predicate) {
                        let refs = referenced_columns(&conjunct);
                        if !refs.is_empty() && refs.iter().all(|&i| i < left_width) {
                            left_parts.push(conjunct);
                        } else if !refs.is_empty()
                            && refs.iter().all(|&i| i >= left_width)
                        {
                            right_parts
                                .push(shift_columns(conjunct, -(left_width as isize)));
                        } else {
                            kept.push(conjunct);
                        }
                    }

                    let left = match combine_conjuncts(left_parts) {
                        Some(p) => Box::new(LogicalPlan::Filter {
                            input: left,
                            predicate: p,
                        }),
                        None => left,
                    };
                    let right = match combine_conjuncts(right_parts) {
                        Some(p) => Box::new(LogicalPlan::Filter {
                            input: right,
                            predicate: p,
                        }),
                        None => right,
                    };

                    let join = LogicalPlan::Join {
                        left,
                        right,
                        join_type,
                        condition,
                    };
                    match combine_conjuncts(kept) {
                        Some(p) => LogicalPlan::Filter {
                            input: Box::new(join),
                            predicate: p,
                        },
                        None => join,
                    }
                }
                other => LogicalPlan::Filter {
                    input: Box::new(other),
                    predicate,
                },
            },
            other => other,
        };
        plan.map_children(&mut |child| self.apply(child))
    }
}

/// Fuse an adjacent Project-over-Filter pair into a single Calc node
pub struct FuseFilterProject;

impl RewriteRule for FuseFilterProject {
    fn name(&self) -> &'static str {
        "FuseFilterProject"
    }

    fn apply(&self, plan: LogicalPlan) -> LogicalPlan {
        let plan = match plan {
            LogicalPlan::Project { input, expressions } => match *input {
                LogicalPlan::Filter {
                    input: inner,
                    predicate,
                } => LogicalPlan::Calc {
                    input: inner,
                    expressions,
                    predicate: Some(predicate),
                },
                other => LogicalPlan::Project {
                    input: Box::new(other),
                    expressions,
                },
            },
            other => other,
        };
        plan.map_children(&mut |child| self.apply(child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;

    fn col(index: usize) -> ResolvedExpr {
        ResolvedExpr::Column(ResolvedColumn {
            table: "t".to_string(),
            name: format!("c{}", index),
            index,
            data_type: DataType::Integer,
            nullable: true,
        })
    }

    fn eq(left: ResolvedExpr, right: ResolvedExpr) -> ResolvedExpr {
        ResolvedExpr::BinaryOp {
            left: Box::new(left),
            op: BinaryOp::Eq,
            right: Box::new(right),
            result_type: DataType::Boolean,
        }
    }

    #[test]
    fn test_split_and_combine_conjuncts() {
        let pred = combine_conjuncts(vec![col(0), col(1), col(2)]).unwrap();
        let parts = split_conjuncts(pred);
        assert_eq!(parts, vec![col(0), col(1), col(2)]);
        assert!(combine_conjuncts(vec![]).is_none());
    }

    #[test]
    fn test_shift_columns() {
        let shifted = shift_columns(eq(col(3), col(4)), -3);
        assert_eq!(referenced_columns(&shifted), vec![0, 1]);
    }

    #[test]
    fn test_remap_through_projection_bare_columns_only() {
        let exprs = vec![
            (col(5), "a".to_string()),
            (
                ResolvedExpr::BinaryOp {
                    left: Box::new(col(1)),
                    op: BinaryOp::Add,
                    right: Box::new(col(2)),
                    result_type: DataType::Integer,
                },
                "b".to_string(),
            ),
        ];
        // references item 0 (a bare column): remappable
        let remapped = remap_through_projection(&col(0), &exprs).unwrap();
        assert_eq!(referenced_columns(&remapped), vec![5]);
        // references item 1 (a computed expression): not remappable
        assert!(remap_through_projection(&col(1), &exprs).is_none());
    }
}
