//! Statement validation
//!
//! Second validation pass over the resolved AST: predicates must be
//! BOOLEAN, aggregate placement must be legal, and INSERT values must fit
//! the target schema, including its NOT NULL columns.

use crate::catalog::{Catalog, DataType};

use super::ast::*;
use super::error::{SqlError, SqlResult};

/// Statement type checker
pub struct TypeChecker;

impl TypeChecker {
    pub fn check(stmt: &ResolvedStatement, catalog: &Catalog) -> SqlResult<()> {
        match stmt {
            ResolvedStatement::Select(select) => Self::check_select(select),
            ResolvedStatement::Insert {
                table,
                columns,
                values,
            } => Self::check_insert(table, columns, values, catalog),
            ResolvedStatement::Delete { filter, .. } => Self::check_delete(filter),
            ResolvedStatement::CreateTable { .. } => Ok(()),
        }
    }

    fn check_select(select: &ResolvedSelect) -> SqlResult<()> {
        if let Some(filter) = &select.filter {
            Self::check_is_boolean(filter)?;
            if filter.has_aggregate() {
                return Err(SqlError::InvalidAggregation(
                    "aggregates are not allowed in WHERE".to_string(),
                ));
            }
        }

        for join in &select.joins {
            if let Some(cond) = &join.condition {
                Self::check_is_boolean(cond)?;
                if cond.has_aggregate() {
                    return Err(SqlError::InvalidAggregation(
                        "aggregates are not allowed in JOIN conditions".to_string(),
                    ));
                }
            }
        }

        for key in &select.group_by {
            if key.has_aggregate() {
                return Err(SqlError::InvalidAggregation(
                    "aggregates are not allowed in GROUP BY".to_string(),
                ));
            }
        }

        let grouping = !select.group_by.is_empty()
            || select.items.iter().any(|i| i.expr.has_aggregate())
            || select.order_by.iter().any(|(e, _)| e.has_aggregate());

        if grouping {
            for item in &select.items {
                Self::check_grouped(&item.expr, &select.group_by)?;
            }
            for (expr, _) in &select.order_by {
                Self::check_grouped(expr, &select.group_by)?;
            }
        }

        Ok(())
    }

    /// In a grouped query, an expression must be an aggregate, match a
    /// GROUP BY key, or be built from such parts.
    fn check_grouped(expr: &ResolvedExpr, group_by: &[ResolvedExpr]) -> SqlResult<()> {
        if group_by.contains(expr) {
            return Ok(());
        }
        match expr {
            ResolvedExpr::Aggregate(_) | ResolvedExpr::Literal(_) => Ok(()),
            ResolvedExpr::Column(c) => Err(SqlError::InvalidAggregation(format!(
                "column '{}' must appear in GROUP BY or inside an aggregate",
                c.name
            ))),
            ResolvedExpr::BinaryOp { left, right, .. } => {
                Self::check_grouped(left, group_by)?;
                Self::check_grouped(right, group_by)
            }
            ResolvedExpr::UnaryOp { expr, .. } => Self::check_grouped(expr, group_by),
            ResolvedExpr::IsNull { expr, .. } => Self::check_grouped(expr, group_by),
        }
    }

    fn check_insert(
        table: &str,
        columns: &[ResolvedColumn],
        values: &[ResolvedExpr],
        catalog: &Catalog,
    ) -> SqlResult<()> {
        for (col, value) in columns.iter().zip(values.iter()) {
            if Self::is_definitely_null(value) {
                if !col.nullable {
                    return Err(SqlError::TypeError(format!(
                        "column '{}' cannot be NULL",
                        col.name
                    )));
                }
                continue;
            }
            if !types_compatible(col.data_type, value.data_type()) {
                return Err(SqlError::TypeError(format!(
                    "cannot insert {} into {} column '{}'",
                    value.data_type(),
                    col.data_type,
                    col.name
                )));
            }
        }

        // Unlisted columns are padded with NULL, so every NOT NULL column
        // must be assigned a value
        if let Some(schema) = catalog.get_table(table) {
            for (index, column) in schema.columns.iter().enumerate() {
                if !column.nullable && !columns.iter().any(|c| c.index == index) {
                    return Err(SqlError::TypeError(format!(
                        "column '{}' cannot be NULL",
                        column.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_delete(filter: &Option<ResolvedExpr>) -> SqlResult<()> {
        if let Some(filter) = filter {
            Self::check_is_boolean(filter)?;
            if filter.has_aggregate() {
                return Err(SqlError::InvalidAggregation(
                    "aggregates are not allowed in DELETE".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn is_definitely_null(expr: &ResolvedExpr) -> bool {
        matches!(expr, ResolvedExpr::Literal(Literal::Null))
    }

    fn check_is_boolean(expr: &ResolvedExpr) -> SqlResult<()> {
        if Self::is_definitely_null(expr) {
            return Ok(());
        }
        match expr.data_type() {
            DataType::Boolean => Ok(()),
            other => Err(SqlError::TypeError(format!(
                "predicate must be BOOLEAN, found {}",
                other
            ))),
        }
    }
}

/// Assignment compatibility: exact match or numeric widening
fn types_compatible(target: DataType, source: DataType) -> bool {
    target == source || (target.is_numeric() && source.is_numeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Column, TableSchema};
    use crate::sql::parser::Parser;
    use crate::sql::resolver::Resolver;

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
    }

    fn check(sql: &str) -> SqlResult<()> {
        let catalog = test_catalog();
        let stmt = Parser::parse_one(sql)?;
        let resolved = Resolver::new(&catalog).resolve(stmt)?;
        TypeChecker::check(&resolved, &catalog)
    }

    #[test]
    fn test_boolean_predicates() {
        assert!(check("SELECT id FROM users WHERE age > 18").is_ok());
        assert!(matches!(
            check("SELECT id FROM users WHERE age").unwrap_err(),
            SqlError::TypeError(_)
        ));
    }

    #[test]
    fn test_aggregates_in_where_rejected() {
        assert!(matches!(
            check("SELECT id FROM users WHERE COUNT(*) > 1").unwrap_err(),
            SqlError::InvalidAggregation(_)
        ));
    }

    #[test]
    fn test_grouping_rules() {
        assert!(check("SELECT age, COUNT(*) FROM users GROUP BY age").is_ok());
        assert!(check("SELECT age + 1, MAX(id) FROM users GROUP BY age").is_ok());
        assert!(check("SELECT COUNT(*) FROM users").is_ok());

        // name is neither grouped nor aggregated
        assert!(matches!(
            check("SELECT name, COUNT(*) FROM users GROUP BY age").unwrap_err(),
            SqlError::InvalidAggregation(_)
        ));
        // mixed aggregate and bare column without GROUP BY
        assert!(matches!(
            check("SELECT name, COUNT(*) FROM users").unwrap_err(),
            SqlError::InvalidAggregation(_)
        ));
        // ORDER BY must obey grouping too
        assert!(matches!(
            check("SELECT age, COUNT(*) FROM users GROUP BY age ORDER BY name")
                .unwrap_err(),
            SqlError::InvalidAggregation(_)
        ));
    }

    #[test]
    fn test_insert_type_check() {
        assert!(check("INSERT INTO users (id, name, age) VALUES (1, 'Ann', 30)").is_ok());
        assert!(matches!(
            check("INSERT INTO users (id) VALUES ('oops')").unwrap_err(),
            SqlError::TypeError(_)
        ));
        assert!(matches!(
            check("INSERT INTO users (id) VALUES (NULL)").unwrap_err(),
            SqlError::TypeError(_)
        ));
        assert!(check("INSERT INTO users (id, name) VALUES (1, NULL)").is_ok());
    }

    #[test]
    fn test_insert_must_assign_not_null_columns() {
        // id is NOT NULL; leaving it out would pad it with NULL
        assert!(matches!(
            check("INSERT INTO users (name) VALUES ('Ann')").unwrap_err(),
            SqlError::TypeError(_)
        ));
        // nullable columns may be left out
        assert!(check("INSERT INTO users (id) VALUES (1)").is_ok());
    }
}
