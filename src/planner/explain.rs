//! EXPLAIN output formatting

use std::fmt::Write;

use crate::catalog::Catalog;
use crate::planner::cost::CostEstimator;
use crate::planner::physical::PhysicalPlan;

/// Formats a physical plan as an indented tree with row estimates
pub struct ExplainOutput;

impl ExplainOutput {
    pub fn format(plan: &PhysicalPlan, catalog: &Catalog) -> String {
        let mut output = String::new();
        Self::format_node(plan, catalog, 0, &mut output);
        output
    }

    fn format_node(plan: &PhysicalPlan, catalog: &Catalog, indent: usize, out: &mut String) {
        let prefix = "  ".repeat(indent);
        let rows = CostEstimator::estimate(plan, catalog).rows.round() as u64;

        match plan {
            PhysicalPlan::TableScan { table, columns } => {
                let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
                let _ = writeln!(
                    out,
                    "{}TableScan: {} [{}] (est {} rows)",
                    prefix,
                    table,
                    names.join(", "),
                    rows
                );
            }

            PhysicalPlan::Filter { input, predicate } => {
                let _ = writeln!(
                    out,
                    "{}Filter: {} (est {} rows)",
                    prefix,
                    predicate.display_name(),
                    rows
                );
                Self::format_node(input, catalog, indent + 1, out);
            }

            PhysicalPlan::Project { input, expressions } => {
                let names: Vec<_> = expressions.iter().map(|(_, n)| n.as_str()).collect();
                let _ = writeln!(out, "{}Project: [{}]", prefix, names.join(", "));
                Self::format_node(input, catalog, indent + 1, out);
            }

            PhysicalPlan::Calc {
                input,
                expressions,
                predicate,
            } => {
                let names: Vec<_> = expressions.iter().map(|(_, n)| n.as_str()).collect();
                match predicate {
                    Some(p) => {
                        let _ = writeln!(
                            out,
                            "{}Calc: [{}] where {} (est {} rows)",
                            prefix,
                            names.join(", "),
                            p.display_name(),
                            rows
                        );
                    }
                    None => {
                        let _ = writeln!(out, "{}Calc: [{}]", prefix, names.join(", "));
                    }
                }
                Self::format_node(input, catalog, indent + 1, out);
            }

            PhysicalPlan::NestedLoopJoin {
                left,
                right,
                join_type,
                condition,
            } => {
                let cond = condition
                    .as_ref()
                    .map(|c| format!(" on {}", c.display_name()))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "{}NestedLoopJoin: {:?}{} (est {} rows)",
                    prefix, join_type, cond, rows
                );
                Self::format_node(left, catalog, indent + 1, out);
                Self::format_node(right, catalog, indent + 1, out);
            }

            PhysicalPlan::HashJoin {
                left,
                right,
                left_key,
                right_key,
            } => {
                let _ = writeln!(
                    out,
                    "{}HashJoin: left[{}] = right[{}] (est {} rows)",
                    prefix, left_key, right_key, rows
                );
                Self::format_node(left, catalog, indent + 1, out);
                Self::format_node(right, catalog, indent + 1, out);
            }

            PhysicalPlan::HashAggregate {
                input,
                group_by,
                aggregates,
            } => {
                let keys: Vec<_> = group_by.iter().map(|e| e.display_name()).collect();
                let aggs: Vec<_> = aggregates.iter().map(|(_, n)| n.as_str()).collect();
                let _ = writeln!(
                    out,
                    "{}HashAggregate: group=[{}] aggs=[{}] (est {} rows)",
                    prefix,
                    keys.join(", "),
                    aggs.join(", "),
                    rows
                );
                Self::format_node(input, catalog, indent + 1, out);
            }

            PhysicalPlan::Sort { input, keys } => {
                let parts: Vec<_> = keys
                    .iter()
                    .map(|(expr, asc)| {
                        format!(
                            "{} {}",
                            expr.display_name(),
                            if *asc { "ASC" } else { "DESC" }
                        )
                    })
                    .collect();
                let _ = writeln!(out, "{}Sort: [{}]", prefix, parts.join(", "));
                Self::format_node(input, catalog, indent + 1, out);
            }

            PhysicalPlan::Values { table, .. } => {
                let _ = writeln!(out, "{}Values: {} (1 row)", prefix, table);
            }

            PhysicalPlan::DeleteScan {
                table, predicate, ..
            } => {
                let cond = predicate
                    .as_ref()
                    .map(|p| format!(" where {}", p.display_name()))
                    .unwrap_or_default();
                let _ = writeln!(out, "{}DeleteScan: {}{}", prefix, table, cond);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType, TableSchema};
    use crate::planner::logical::LogicalPlanBuilder;
    use crate::planner::optimizer::Optimizer;
    use crate::planner::physical::PhysicalPlanner;
    use crate::sql::{Parser, Resolver, TypeChecker};

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register_table(
                TableSchema::new("users")
                    .column(Column::new("id", DataType::Integer).nullable(false))
                    .column(Column::new("name", DataType::Varchar))
                    .column(Column::new("age", DataType::Integer))
                    .estimated_rows(10),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_explain_fused_select() {
        let catalog = test_catalog();
        let stmt = Parser::parse_one("SELECT id, name FROM users WHERE age > 18").unwrap();
        let resolved = Resolver::new(&catalog).resolve(stmt).unwrap();
        TypeChecker::check(&resolved, &catalog).unwrap();
        let logical = LogicalPlanBuilder::build(resolved, &catalog).unwrap();
        let optimized = Optimizer::new().optimize(logical).unwrap();
        let physical = PhysicalPlanner::new().plan(optimized, &catalog).unwrap();

        let text = ExplainOutput::format(&physical, &catalog);
        assert!(text.contains("Calc"), "unexpected explain:\n{}", text);
        assert!(text.contains("TableScan: users"));
        assert!(text.contains("est 10 rows"));
    }
}
