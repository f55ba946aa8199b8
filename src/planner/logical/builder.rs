//! Logical plan construction
//!
//! Builds the literal statement shape with no optimization: scans and
//! joins in FROM order, then Filter, Aggregate, Project, Sort. Select and
//! ORDER BY expressions above an Aggregate are rewritten to reference the
//! aggregate's output columns (group keys first, then aggregate values).

use crate::catalog::{Catalog, TableSchema};
use crate::sql::ast::{
    AggregateCall, ResolvedColumn, ResolvedExpr, ResolvedSelect, ResolvedStatement,
};

use super::super::error::{PlannerError, PlannerResult};
use super::expr::OutputColumn;
use super::LogicalPlan;

/// Logical plan builder
pub struct LogicalPlanBuilder;

impl LogicalPlanBuilder {
    pub fn build(stmt: ResolvedStatement, catalog: &Catalog) -> PlannerResult<LogicalPlan> {
        match stmt {
            ResolvedStatement::Select(select) => Self::build_select(select, catalog),
            ResolvedStatement::Insert {
                table,
                columns,
                values,
            } => Self::build_insert(table, columns, values, catalog),
            ResolvedStatement::Delete { table, filter } => {
                let schema = lookup(catalog, &table.table)?;
                Ok(LogicalPlan::Delete {
                    table: schema.name.clone(),
                    columns: scan_columns(schema),
                    predicate: filter,
                })
            }
            ResolvedStatement::CreateTable { .. } => Err(PlannerError::Unsupported(
                "CREATE TABLE is applied to the catalog, not planned".to_string(),
            )),
        }
    }

    fn build_select(select: ResolvedSelect, catalog: &Catalog) -> PlannerResult<LogicalPlan> {
        let base = lookup(catalog, &select.from.table)?;
        let mut plan = LogicalPlan::Scan {
            table: base.name.clone(),
            columns: scan_columns(base),
        };

        for join in select.joins {
            let schema = lookup(catalog, &join.table.table)?;
            let right = LogicalPlan::Scan {
                table: schema.name.clone(),
                columns: scan_columns(schema),
            };
            plan = LogicalPlan::Join {
                left: Box::new(plan),
                right: Box::new(right),
                join_type: join.join_type,
                condition: join.condition,
            };
        }

        if let Some(predicate) = select.filter {
            plan = LogicalPlan::Filter {
                input: Box::new(plan),
                predicate,
            };
        }

        let mut items: Vec<(ResolvedExpr, String)> = select
            .items
            .into_iter()
            .map(|item| (item.expr, item.name))
            .collect();
        let mut order_by = select.order_by;

        let grouping = !select.group_by.is_empty()
            || items.iter().any(|(e, _)| e.has_aggregate())
            || order_by.iter().any(|(e, _)| e.has_aggregate());

        if grouping {
            let mut aggregates: Vec<AggregateCall> = Vec::new();
            for (expr, _) in &items {
                collect_aggregates(expr, &mut aggregates);
            }
            for (expr, _) in &order_by {
                collect_aggregates(expr, &mut aggregates);
            }

            let group_by = select.group_by;
            let named_aggregates: Vec<(AggregateCall, String)> = aggregates
                .iter()
                .map(|call| {
                    let name = ResolvedExpr::Aggregate(call.clone()).display_name();
                    (call.clone(), name)
                })
                .collect();

            plan = LogicalPlan::Aggregate {
                input: Box::new(plan),
                group_by: group_by.clone(),
                aggregates: named_aggregates,
            };

            // Rewrite everything above the Aggregate to reference its output
            let agg_schema = plan.output_columns();
            for (expr, _) in items.iter_mut() {
                *expr = rewrite_over_aggregate(expr.clone(), &group_by, &aggregates, &agg_schema)?;
            }
            for (expr, _) in order_by.iter_mut() {
                *expr = rewrite_over_aggregate(expr.clone(), &group_by, &aggregates, &agg_schema)?;
            }
        }

        let project_columns: Vec<(ResolvedExpr, String)> = items;
        plan = LogicalPlan::Project {
            input: Box::new(plan),
            expressions: project_columns.clone(),
        };

        if !order_by.is_empty() {
            let keys = order_by
                .into_iter()
                .map(|(expr, asc)| {
                    Ok((map_to_projection(&expr, &project_columns)?, asc))
                })
                .collect::<PlannerResult<Vec<_>>>()?;
            plan = LogicalPlan::Sort {
                input: Box::new(plan),
                keys,
            };
        }

        Ok(plan)
    }

    fn build_insert(
        table: String,
        columns: Vec<ResolvedColumn>,
        values: Vec<ResolvedExpr>,
        catalog: &Catalog,
    ) -> PlannerResult<LogicalPlan> {
        let schema = lookup(catalog, &table)?;

        // Build a full-width row: listed columns get their value, the rest
        // default to NULL
        let mut row: Vec<ResolvedExpr> = schema
            .columns
            .iter()
            .map(|_| ResolvedExpr::Literal(crate::sql::Literal::Null))
            .collect();
        for (col, value) in columns.iter().zip(values.into_iter()) {
            row[col.index] = value;
        }

        Ok(LogicalPlan::Insert {
            table: schema.name.clone(),
            columns: scan_columns(schema),
            values: row,
        })
    }
}

fn lookup<'a>(catalog: &'a Catalog, table: &str) -> PlannerResult<&'a TableSchema> {
    // The resolver has already verified the table exists
    catalog
        .get_table(table)
        .ok_or_else(|| PlannerError::Internal(format!("table '{}' vanished", table)))
}

fn scan_columns(schema: &TableSchema) -> Vec<OutputColumn> {
    schema
        .columns
        .iter()
        .map(|c| OutputColumn::new(c.name.clone(), c.data_type, c.nullable))
        .collect()
}

/// Collect distinct aggregate calls in evaluation order
fn collect_aggregates(expr: &ResolvedExpr, out: &mut Vec<AggregateCall>) {
    match expr {
        ResolvedExpr::Aggregate(call) => {
            if !out.contains(call) {
                out.push(call.clone());
            }
        }
        ResolvedExpr::BinaryOp { left, right, .. } => {
            collect_aggregates(left, out);
            collect_aggregates(right, out);
        }
        ResolvedExpr::UnaryOp { expr, .. } => collect_aggregates(expr, out),
        ResolvedExpr::IsNull { expr, .. } => collect_aggregates(expr, out),
        ResolvedExpr::Column(_) | ResolvedExpr::Literal(_) => {}
    }
}

/// Replace group-key subtrees and aggregate calls with references into the
/// aggregate's output row (group keys first, then aggregate values).
fn rewrite_over_aggregate(
    expr: ResolvedExpr,
    group_by: &[ResolvedExpr],
    aggregates: &[AggregateCall],
    agg_schema: &[OutputColumn],
) -> PlannerResult<ResolvedExpr> {
    if let Some(pos) = group_by.iter().position(|g| *g == expr) {
        let col = &agg_schema[pos];
        return Ok(output_ref(col, pos));
    }

    match expr {
        ResolvedExpr::Aggregate(call) => {
            let pos = aggregates
                .iter()
                .position(|a| *a == call)
                .ok_or_else(|| PlannerError::Internal("uncollected aggregate".into()))?;
            let index = group_by.len() + pos;
            let col = &agg_schema[index];
            Ok(output_ref(col, index))
        }
        ResolvedExpr::BinaryOp {
            left,
            op,
            right,
            result_type,
        } => Ok(ResolvedExpr::BinaryOp {
            left: Box::new(rewrite_over_aggregate(*left, group_by, aggregates, agg_schema)?),
            op,
            right: Box::new(rewrite_over_aggregate(
                *right, group_by, aggregates, agg_schema,
            )?),
            result_type,
        }),
        ResolvedExpr::UnaryOp {
            op,
            expr,
            result_type,
        } => Ok(ResolvedExpr::UnaryOp {
            op,
            expr: Box::new(rewrite_over_aggregate(*expr, group_by, aggregates, agg_schema)?),
            result_type,
        }),
        ResolvedExpr::IsNull { expr, negated } => Ok(ResolvedExpr::IsNull {
            expr: Box::new(rewrite_over_aggregate(*expr, group_by, aggregates, agg_schema)?),
            negated,
        }),
        ResolvedExpr::Literal(_) => Ok(expr),
        ResolvedExpr::Column(c) => {
            // The type checker guarantees grouped queries only reach here
            // through a group-by match
            Err(PlannerError::Internal(format!(
                "ungrouped column '{}' above aggregate",
                c.name
            )))
        }
    }
}

fn output_ref(col: &OutputColumn, index: usize) -> ResolvedExpr {
    ResolvedExpr::Column(ResolvedColumn {
        table: String::new(),
        name: col.name.clone(),
        index,
        data_type: col.data_type,
        nullable: col.nullable,
    })
}

/// Map an ORDER BY expression to a reference into the projection's output.
/// The key must match a select item.
fn map_to_projection(
    expr: &ResolvedExpr,
    items: &[(ResolvedExpr, String)],
) -> PlannerResult<ResolvedExpr> {
    if let Some(pos) = items.iter().position(|(e, _)| e == expr) {
        let (item_expr, name) = &items[pos];
        return Ok(ResolvedExpr::Column(ResolvedColumn {
            table: String::new(),
            name: name.clone(),
            index: pos,
            data_type: item_expr.data_type(),
            nullable: item_expr.is_nullable(),
        }));
    }
    Err(PlannerError::Unsupported(
        "ORDER BY expressions must appear in the select list".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, DataType};
    use crate::sql::{Parser, Resolver, TypeChecker};

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register_table(
                TableSchema::new("users")
                    .column(Column::new("id", DataType::Integer).nullable(false))
                    .column(Column::new("name", DataType::Varchar))
                    .column(Column::new("age", DataType::Integer)),
            )
            .unwrap();
        catalog
            .register_table(
                TableSchema::new("orders")
                    .column(Column::new("id", DataType::Integer).nullable(false))
                    .column(Column::new("user_id", DataType::Integer))
                    .column(Column::new("goods", DataType::Varchar))
                    .column(Column::new("price", DataType::Decimal)),
            )
            .unwrap();
        catalog
    }

    fn build(sql: &str) -> LogicalPlan {
        let catalog = test_catalog();
        let stmt = Parser::parse_one(sql).unwrap();
        let resolved = Resolver::new(&catalog).resolve(stmt).unwrap();
        TypeChecker::check(&resolved, &catalog).unwrap();
        LogicalPlanBuilder::build(resolved, &catalog).unwrap()
    }

    #[test]
    fn test_select_shape() {
        let plan = build("SELECT id, name FROM users WHERE age > 18");
        match plan {
            LogicalPlan::Project { input, expressions } => {
                assert_eq!(expressions.len(), 2);
                assert!(matches!(*input, LogicalPlan::Filter { .. }));
            }
            other => panic!("expected Project, got {:?}", other),
        }
    }

    #[test]
    fn test_join_then_filter_shape() {
        let plan = build(
            "SELECT u.id FROM users u JOIN orders o ON u.id = o.user_id WHERE age > 20",
        );
        match plan {
            LogicalPlan::Project { input, .. } => match *input {
                LogicalPlan::Filter { input, .. } => {
                    assert!(matches!(*input, LogicalPlan::Join { .. }));
                }
                other => panic!("expected Filter, got {:?}", other),
            },
            other => panic!("expected Project, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_rewrite() {
        let plan = build("SELECT age, COUNT(*), SUM(id) + 1 FROM users GROUP BY age");
        let (input, expressions) = match plan {
            LogicalPlan::Project { input, expressions } => (input, expressions),
            other => panic!("expected Project, got {:?}", other),
        };
        match *input {
            LogicalPlan::Aggregate {
                group_by,
                aggregates,
                ..
            } => {
                assert_eq!(group_by.len(), 1);
                assert_eq!(aggregates.len(), 2);
            }
            other => panic!("expected Aggregate, got {:?}", other),
        }
        // items now reference aggregate output positions 0..=2
        match &expressions[0].0 {
            ResolvedExpr::Column(c) => assert_eq!(c.index, 0),
            other => panic!("expected column ref, got {:?}", other),
        }
        match &expressions[1].0 {
            ResolvedExpr::Column(c) => assert_eq!(c.index, 1),
            other => panic!("expected column ref, got {:?}", other),
        }
        match &expressions[2].0 {
            ResolvedExpr::BinaryOp { left, .. } => match left.as_ref() {
                ResolvedExpr::Column(c) => assert_eq!(c.index, 2),
                other => panic!("expected column ref, got {:?}", other),
            },
            other => panic!("expected binary op, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_keys_reference_projection() {
        let plan = build("SELECT id, age FROM users ORDER BY age DESC, id");
        match plan {
            LogicalPlan::Sort { input, keys } => {
                assert_eq!(keys.len(), 2);
                assert!(!keys[0].1);
                assert!(keys[1].1);
                match &keys[0].0 {
                    ResolvedExpr::Column(c) => assert_eq!(c.index, 1),
                    other => panic!("expected column ref, got {:?}", other),
                }
                assert!(matches!(*input, LogicalPlan::Project { .. }));
            }
            other => panic!("expected Sort, got {:?}", other),
        }
    }

    #[test]
    fn test_order_by_not_in_select_rejected() {
        let catalog = test_catalog();
        let stmt = Parser::parse_one("SELECT id FROM users ORDER BY age").unwrap();
        let resolved = Resolver::new(&catalog).resolve(stmt).unwrap();
        let err = LogicalPlanBuilder::build(resolved, &catalog).unwrap_err();
        assert!(matches!(err, PlannerError::Unsupported(_)));
    }

    #[test]
    fn test_insert_pads_missing_columns() {
        let plan = build("INSERT INTO users (id, name) VALUES (1, 'Jark')");
        match plan {
            LogicalPlan::Insert {
                columns, values, ..
            } => {
                assert_eq!(columns.len(), 3);
                assert_eq!(values.len(), 3);
                assert!(matches!(
                    values[2],
                    ResolvedExpr::Literal(crate::sql::Literal::Null)
                ));
            }
            other => panic!("expected Insert, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_plan() {
        let plan = build("DELETE FROM users WHERE id > 1");
        match plan {
            LogicalPlan::Delete {
                table,
                columns,
                predicate,
            } => {
                assert_eq!(table, "users");
                assert_eq!(columns.len(), 3);
                assert!(predicate.is_some());
            }
            other => panic!("expected Delete, got {:?}", other),
        }
    }
}
