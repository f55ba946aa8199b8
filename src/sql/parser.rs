//! SQL parser
//!
//! Thin wrapper over the `sqlparser` crate. The grammar and tokenizer come
//! from `sqlparser` (generic dialect); this module lowers its AST into the
//! engine's own, rejecting everything outside the supported surface with
//! `SqlError::Unsupported`. Tokenizer positions travel inside the parse
//! error message ("at Line: n, Column: m").

use chrono::NaiveDate;
use sqlparser::ast as sp;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::catalog::DataType;

use super::ast::*;
use super::error::{SqlError, SqlResult};

/// SQL parser entry point
pub struct Parser;

impl Parser {
    /// Parse exactly one statement
    pub fn parse_one(sql: &str) -> SqlResult<Statement> {
        let mut stmts = SqlParser::parse_sql(&GenericDialect {}, sql)?;

        match stmts.len() {
            0 => Err(SqlError::Parse("empty statement".to_string())),
            1 => convert_statement(stmts.remove(0)),
            _ => Err(SqlError::Parse(
                "expected a single statement".to_string(),
            )),
        }
    }
}

fn convert_statement(stmt: sp::Statement) -> SqlResult<Statement> {
    match stmt {
        sp::Statement::Query(query) => Ok(Statement::Select(convert_query(*query)?)),
        sp::Statement::Insert(insert) => convert_insert(insert),
        sp::Statement::Delete(delete) => convert_delete(delete),
        sp::Statement::CreateTable(create) => convert_create_table(create),
        other => Err(SqlError::Unsupported(format!("statement: {}", other))),
    }
}

fn convert_query(query: sp::Query) -> SqlResult<SelectStatement> {
    if query.with.is_some() {
        return Err(SqlError::Unsupported("WITH (common table expressions)".into()));
    }
    if query.limit.is_some() || query.offset.is_some() || query.fetch.is_some() {
        return Err(SqlError::Unsupported("LIMIT/OFFSET".into()));
    }

    let select = match *query.body {
        sp::SetExpr::Select(select) => *select,
        sp::SetExpr::SetOperation { .. } => {
            return Err(SqlError::Unsupported("set operations".into()))
        }
        other => return Err(SqlError::Unsupported(format!("query body: {}", other))),
    };

    if select.distinct.is_some() {
        return Err(SqlError::Unsupported("DISTINCT".into()));
    }
    if select.having.is_some() {
        return Err(SqlError::Unsupported("HAVING".into()));
    }
    if select.from.is_empty() {
        return Err(SqlError::Unsupported("SELECT without FROM".into()));
    }

    let (from, joins) = convert_from(select.from)?;

    let items = select
        .projection
        .into_iter()
        .map(convert_select_item)
        .collect::<SqlResult<Vec<_>>>()?;

    let filter = select.selection.map(convert_expr).transpose()?;

    let group_by = match select.group_by {
        sp::GroupByExpr::Expressions(exprs, modifiers) => {
            if !modifiers.is_empty() {
                return Err(SqlError::Unsupported("GROUP BY modifiers".into()));
            }
            exprs
                .into_iter()
                .map(convert_expr)
                .collect::<SqlResult<Vec<_>>>()?
        }
        sp::GroupByExpr::All(_) => return Err(SqlError::Unsupported("GROUP BY ALL".into())),
    };

    let order_by = match query.order_by {
        Some(order) => order
            .exprs
            .into_iter()
            .map(convert_order_by)
            .collect::<SqlResult<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(SelectStatement {
        items,
        from,
        joins,
        filter,
        group_by,
        order_by,
    })
}

/// Flatten the FROM clause into a base table plus a left-deep join list.
/// Comma-separated tables become cross join steps.
fn convert_from(from: Vec<sp::TableWithJoins>) -> SqlResult<(TableRef, Vec<Join>)> {
    let mut joins = Vec::new();
    let mut base = None;

    for twj in from {
        let table = convert_table_factor(twj.relation)?;
        match base {
            None => base = Some(table),
            Some(_) => joins.push(Join {
                table,
                join_type: JoinType::Cross,
                condition: None,
            }),
        }
        for join in twj.joins {
            joins.push(convert_join(join)?);
        }
    }

    // convert_query rejects an empty FROM before calling here
    let base = base.ok_or_else(|| SqlError::Unsupported("SELECT without FROM".into()))?;
    Ok((base, joins))
}

fn convert_table_factor(factor: sp::TableFactor) -> SqlResult<TableRef> {
    match factor {
        sp::TableFactor::Table {
            name, alias, args, ..
        } => {
            if args.is_some() {
                return Err(SqlError::Unsupported("table functions".into()));
            }
            let name = object_name(&name)?;
            let alias = match alias {
                Some(a) => {
                    if !a.columns.is_empty() {
                        return Err(SqlError::Unsupported("column aliases in FROM".into()));
                    }
                    Some(a.name.value)
                }
                None => None,
            };
            Ok(TableRef { name, alias })
        }
        sp::TableFactor::Derived { .. } => {
            Err(SqlError::Unsupported("subquery in FROM".into()))
        }
        other => Err(SqlError::Unsupported(format!("table factor: {}", other))),
    }
}

fn convert_join(join: sp::Join) -> SqlResult<Join> {
    let table = convert_table_factor(join.relation)?;
    let (join_type, constraint) = match join.join_operator {
        sp::JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
        sp::JoinOperator::LeftOuter(c) => (JoinType::Left, Some(c)),
        sp::JoinOperator::RightOuter(c) => (JoinType::Right, Some(c)),
        sp::JoinOperator::CrossJoin => (JoinType::Cross, None),
        sp::JoinOperator::FullOuter(_) => {
            return Err(SqlError::Unsupported("FULL OUTER JOIN".into()))
        }
        other => return Err(SqlError::Unsupported(format!("join type: {:?}", other))),
    };

    let condition = match constraint {
        Some(sp::JoinConstraint::On(expr)) => Some(convert_expr(expr)?),
        Some(sp::JoinConstraint::None) | None => None,
        Some(sp::JoinConstraint::Using(_)) => {
            return Err(SqlError::Unsupported("JOIN USING".into()))
        }
        Some(sp::JoinConstraint::Natural) => {
            return Err(SqlError::Unsupported("NATURAL JOIN".into()))
        }
    };

    Ok(Join {
        table,
        join_type,
        condition,
    })
}

fn convert_select_item(item: sp::SelectItem) -> SqlResult<SelectItem> {
    match item {
        sp::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::Expr {
            expr: convert_expr(expr)?,
            alias: None,
        }),
        sp::SelectItem::ExprWithAlias { expr, alias } => Ok(SelectItem::Expr {
            expr: convert_expr(expr)?,
            alias: Some(alias.value),
        }),
        sp::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
        sp::SelectItem::QualifiedWildcard(name, _) => {
            Ok(SelectItem::QualifiedWildcard(object_name(&name)?))
        }
    }
}

fn convert_order_by(item: sp::OrderByExpr) -> SqlResult<OrderByItem> {
    if item.nulls_first.is_some() {
        return Err(SqlError::Unsupported("NULLS FIRST/LAST".into()));
    }
    Ok(OrderByItem {
        expr: convert_expr(item.expr)?,
        asc: item.asc.unwrap_or(true),
    })
}

fn convert_expr(expr: sp::Expr) -> SqlResult<Expr> {
    match expr {
        sp::Expr::Identifier(ident) => Ok(Expr::Column {
            table: None,
            name: ident.value,
        }),

        sp::Expr::CompoundIdentifier(parts) => {
            if parts.len() != 2 {
                return Err(SqlError::Unsupported(
                    "column references deeper than table.column".into(),
                ));
            }
            let mut parts = parts.into_iter();
            let table = parts.next().map(|i| i.value);
            let name = match parts.next() {
                Some(i) => i.value,
                None => return Err(SqlError::Parse("empty identifier".into())),
            };
            Ok(Expr::Column { table, name })
        }

        sp::Expr::Value(value) => Ok(Expr::Literal(convert_value(value)?)),

        sp::Expr::TypedString { data_type, value } => match data_type {
            sp::DataType::Date => {
                let date = NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                    SqlError::Parse(format!("invalid DATE literal '{}'", value))
                })?;
                Ok(Expr::Literal(Literal::Date(date)))
            }
            other => Err(SqlError::Unsupported(format!("typed literal: {}", other))),
        },

        sp::Expr::BinaryOp { left, op, right } => {
            let op = convert_binary_op(op)?;
            Ok(Expr::BinaryOp {
                left: Box::new(convert_expr(*left)?),
                op,
                right: Box::new(convert_expr(*right)?),
            })
        }

        sp::Expr::UnaryOp { op, expr } => {
            let inner = convert_expr(*expr)?;
            match op {
                sp::UnaryOperator::Minus => Ok(Expr::UnaryOp {
                    op: UnaryOp::Neg,
                    expr: Box::new(inner),
                }),
                sp::UnaryOperator::Not => Ok(Expr::UnaryOp {
                    op: UnaryOp::Not,
                    expr: Box::new(inner),
                }),
                sp::UnaryOperator::Plus => Ok(inner),
                other => Err(SqlError::Unsupported(format!("unary operator: {}", other))),
            }
        }

        sp::Expr::Nested(inner) => convert_expr(*inner),

        sp::Expr::IsNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(convert_expr(*inner)?),
            negated: false,
        }),

        sp::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
            expr: Box::new(convert_expr(*inner)?),
            negated: true,
        }),

        sp::Expr::Function(func) => convert_function(func),

        sp::Expr::Subquery(_) | sp::Expr::Exists { .. } | sp::Expr::InSubquery { .. } => {
            Err(SqlError::Unsupported("subqueries".into()))
        }

        other => Err(SqlError::Unsupported(format!("expression: {}", other))),
    }
}

fn convert_value(value: sp::Value) -> SqlResult<Literal> {
    match value {
        sp::Value::Number(text, _) => {
            if text.contains('.') || text.contains('e') || text.contains('E') {
                text.parse::<f64>()
                    .map(Literal::Decimal)
                    .map_err(|_| SqlError::Parse(format!("invalid number '{}'", text)))
            } else {
                text.parse::<i64>()
                    .map(Literal::Integer)
                    .map_err(|_| SqlError::Parse(format!("invalid integer '{}'", text)))
            }
        }
        sp::Value::SingleQuotedString(s) => Ok(Literal::String(s)),
        sp::Value::Boolean(b) => Ok(Literal::Boolean(b)),
        sp::Value::Null => Ok(Literal::Null),
        other => Err(SqlError::Unsupported(format!("literal: {}", other))),
    }
}

fn convert_binary_op(op: sp::BinaryOperator) -> SqlResult<BinaryOp> {
    match op {
        sp::BinaryOperator::Plus => Ok(BinaryOp::Add),
        sp::BinaryOperator::Minus => Ok(BinaryOp::Sub),
        sp::BinaryOperator::Multiply => Ok(BinaryOp::Mul),
        sp::BinaryOperator::Divide => Ok(BinaryOp::Div),
        sp::BinaryOperator::Eq => Ok(BinaryOp::Eq),
        sp::BinaryOperator::NotEq => Ok(BinaryOp::NotEq),
        sp::BinaryOperator::Lt => Ok(BinaryOp::Lt),
        sp::BinaryOperator::LtEq => Ok(BinaryOp::LtEq),
        sp::BinaryOperator::Gt => Ok(BinaryOp::Gt),
        sp::BinaryOperator::GtEq => Ok(BinaryOp::GtEq),
        sp::BinaryOperator::And => Ok(BinaryOp::And),
        sp::BinaryOperator::Or => Ok(BinaryOp::Or),
        other => Err(SqlError::Unsupported(format!("operator: {}", other))),
    }
}

/// Only aggregate calls are supported as functions
fn convert_function(func: sp::Function) -> SqlResult<Expr> {
    if func.over.is_some() {
        return Err(SqlError::Unsupported("window functions".into()));
    }
    if func.filter.is_some() || func.null_treatment.is_some() || !func.within_group.is_empty() {
        return Err(SqlError::Unsupported("function modifiers".into()));
    }

    let name = object_name(&func.name)?;
    let kind = AggregateKind::from_name(&name)
        .ok_or_else(|| SqlError::Unsupported(format!("function: {}", name)))?;

    let list = match func.args {
        sp::FunctionArguments::List(list) => list,
        sp::FunctionArguments::None => {
            return Err(SqlError::Parse(format!("{} requires an argument", name)))
        }
        sp::FunctionArguments::Subquery(_) => {
            return Err(SqlError::Unsupported("subqueries".into()))
        }
    };
    if list.duplicate_treatment.is_some() {
        return Err(SqlError::Unsupported("DISTINCT aggregates".into()));
    }
    if list.args.len() != 1 {
        return Err(SqlError::Parse(format!(
            "{} takes exactly one argument",
            name
        )));
    }

    let arg = match list.args.into_iter().next() {
        Some(sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Wildcard)) => {
            if kind != AggregateKind::Count {
                return Err(SqlError::InvalidAggregation(format!(
                    "{}(*) is not valid",
                    name
                )));
            }
            None
        }
        Some(sp::FunctionArg::Unnamed(sp::FunctionArgExpr::Expr(expr))) => {
            Some(Box::new(convert_expr(expr)?))
        }
        _ => return Err(SqlError::Unsupported("named function arguments".into())),
    };

    Ok(Expr::Aggregate { kind, arg })
}

fn convert_insert(insert: sp::Insert) -> SqlResult<Statement> {
    if insert.returning.is_some() {
        return Err(SqlError::Unsupported("INSERT ... RETURNING".into()));
    }
    if insert.on.is_some() {
        return Err(SqlError::Unsupported("INSERT ... ON CONFLICT".into()));
    }

    let table = object_name(&insert.table_name)?;
    let columns = insert.columns.into_iter().map(|c| c.value).collect();

    let source = insert
        .source
        .ok_or_else(|| SqlError::Unsupported("INSERT without VALUES".into()))?;
    let mut rows = match *source.body {
        sp::SetExpr::Values(values) => values.rows,
        _ => return Err(SqlError::Unsupported("INSERT ... SELECT".into())),
    };
    if rows.len() != 1 {
        return Err(SqlError::Unsupported("multi-row INSERT".into()));
    }
    let values = rows
        .remove(0)
        .into_iter()
        .map(convert_expr)
        .collect::<SqlResult<Vec<_>>>()?;

    Ok(Statement::Insert {
        table,
        columns,
        values,
    })
}

fn convert_delete(delete: sp::Delete) -> SqlResult<Statement> {
    if !delete.tables.is_empty() {
        return Err(SqlError::Unsupported("multi-table DELETE".into()));
    }
    if delete.using.is_some() {
        return Err(SqlError::Unsupported("DELETE ... USING".into()));
    }
    if delete.returning.is_some() {
        return Err(SqlError::Unsupported("DELETE ... RETURNING".into()));
    }
    if !delete.order_by.is_empty() || delete.limit.is_some() {
        return Err(SqlError::Unsupported("ORDER BY/LIMIT in DELETE".into()));
    }

    let mut from = match delete.from {
        sp::FromTable::WithFromKeyword(v) | sp::FromTable::WithoutKeyword(v) => v,
    };
    if from.len() != 1 {
        return Err(SqlError::Unsupported("multi-table DELETE".into()));
    }
    let twj = from.remove(0);
    if !twj.joins.is_empty() {
        return Err(SqlError::Unsupported("joins in DELETE".into()));
    }
    let table = convert_table_factor(twj.relation)?;

    let filter = delete.selection.map(convert_expr).transpose()?;

    Ok(Statement::Delete { table, filter })
}

fn convert_create_table(create: sp::CreateTable) -> SqlResult<Statement> {
    if create.query.is_some() {
        return Err(SqlError::Unsupported("CREATE TABLE ... AS".into()));
    }
    if create.if_not_exists {
        return Err(SqlError::Unsupported("IF NOT EXISTS".into()));
    }
    if !create.constraints.is_empty() {
        return Err(SqlError::Unsupported("table constraints".into()));
    }

    let name = object_name(&create.name)?;

    let mut columns = Vec::new();
    for col in create.columns {
        let data_type = convert_data_type(&col.data_type)?;
        let mut nullable = true;
        for opt in &col.options {
            match opt.option {
                sp::ColumnOption::NotNull => nullable = false,
                sp::ColumnOption::Null => nullable = true,
                ref other => {
                    return Err(SqlError::Unsupported(format!(
                        "column option: {}",
                        other
                    )))
                }
            }
        }
        columns.push(ColumnSpec {
            name: col.name.value,
            data_type,
            nullable,
        });
    }

    let mut path = None;
    let mut row_count = None;
    for option in create.with_options {
        match option {
            sp::SqlOption::KeyValue { key, value } => {
                match key.value.to_ascii_lowercase().as_str() {
                    "path" => match value {
                        sp::Expr::Value(sp::Value::SingleQuotedString(s)) => path = Some(s),
                        other => {
                            return Err(SqlError::Parse(format!(
                                "path must be a string, got {}",
                                other
                            )))
                        }
                    },
                    "row_count" => match value {
                        sp::Expr::Value(sp::Value::Number(n, _)) => {
                            row_count = Some(n.parse::<u64>().map_err(|_| {
                                SqlError::Parse(format!("invalid row_count '{}'", n))
                            })?);
                        }
                        other => {
                            return Err(SqlError::Parse(format!(
                                "row_count must be a number, got {}",
                                other
                            )))
                        }
                    },
                    other => {
                        return Err(SqlError::Unsupported(format!(
                            "table option: {}",
                            other
                        )))
                    }
                }
            }
            other => {
                return Err(SqlError::Unsupported(format!("table option: {}", other)))
            }
        }
    }

    Ok(Statement::CreateTable {
        name,
        columns,
        path,
        row_count,
    })
}

fn convert_data_type(dt: &sp::DataType) -> SqlResult<DataType> {
    match dt {
        sp::DataType::Int(_) | sp::DataType::Integer(_) | sp::DataType::BigInt(_) => {
            Ok(DataType::Integer)
        }
        sp::DataType::Varchar(_) | sp::DataType::CharacterVarying(_) | sp::DataType::Text => {
            Ok(DataType::Varchar)
        }
        sp::DataType::Decimal(_) | sp::DataType::Numeric(_) => Ok(DataType::Decimal),
        sp::DataType::Boolean => Ok(DataType::Boolean),
        sp::DataType::Date => Ok(DataType::Date),
        other => Err(SqlError::Unsupported(format!("data type: {}", other))),
    }
}

fn object_name(name: &sp::ObjectName) -> SqlResult<String> {
    if name.0.len() != 1 {
        return Err(SqlError::Unsupported(format!(
            "qualified name: {}",
            name
        )));
    }
    Ok(name.0[0].value.clone())
}
