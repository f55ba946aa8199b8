//! Name resolution and type inference
//!
//! Binds every column reference against the catalog through a scope of
//! FROM/JOIN aliases and annotates every expression with its result type.
//! Column indexes are global offsets into the concatenated row of the FROM
//! clause, left join side first.

use std::path::PathBuf;

use crate::catalog::{Catalog, Column, DataType, SourceLocation, TableSchema};

use super::ast::*;
use super::error::{SqlError, SqlResult};

/// One table visible in a scope
struct ScopeTable<'a> {
    alias: String,
    /// Offset of this table's first column in the concatenated row
    offset: usize,
    columns: &'a [Column],
}

/// The set of tables a column reference can bind against
struct Scope<'a> {
    tables: Vec<ScopeTable<'a>>,
}

impl<'a> Scope<'a> {
    fn new() -> Self {
        Scope { tables: Vec::new() }
    }

    fn add_table(&mut self, alias: String, schema: &'a TableSchema) -> SqlResult<()> {
        if self
            .tables
            .iter()
            .any(|t| t.alias.eq_ignore_ascii_case(&alias))
        {
            return Err(SqlError::AmbiguousReference(format!(
                "duplicate table alias '{}'",
                alias
            )));
        }
        let offset = self.width();
        self.tables.push(ScopeTable {
            alias,
            offset,
            columns: &schema.columns,
        });
        Ok(())
    }

    fn width(&self) -> usize {
        self.tables
            .last()
            .map(|t| t.offset + t.columns.len())
            .unwrap_or(0)
    }

    fn resolve_column(&self, table: Option<&str>, name: &str) -> SqlResult<ResolvedColumn> {
        match table {
            Some(qualifier) => {
                let scope_table = self
                    .tables
                    .iter()
                    .find(|t| t.alias.eq_ignore_ascii_case(qualifier))
                    .ok_or_else(|| SqlError::UnknownTable(qualifier.to_string()))?;
                let (pos, col) = scope_table
                    .columns
                    .iter()
                    .enumerate()
                    .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        SqlError::UnknownColumn(format!("{}.{}", qualifier, name))
                    })?;
                Ok(ResolvedColumn {
                    table: scope_table.alias.clone(),
                    name: col.name.clone(),
                    index: scope_table.offset + pos,
                    data_type: col.data_type,
                    nullable: col.nullable,
                })
            }
            None => {
                let mut found = None;
                for scope_table in &self.tables {
                    if let Some((pos, col)) = scope_table
                        .columns
                        .iter()
                        .enumerate()
                        .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
                    {
                        if found.is_some() {
                            return Err(SqlError::AmbiguousReference(name.to_string()));
                        }
                        found = Some(ResolvedColumn {
                            table: scope_table.alias.clone(),
                            name: col.name.clone(),
                            index: scope_table.offset + pos,
                            data_type: col.data_type,
                            nullable: col.nullable,
                        });
                    }
                }
                found.ok_or_else(|| SqlError::UnknownColumn(name.to_string()))
            }
        }
    }
}

/// Statement resolver
pub struct Resolver<'a> {
    catalog: &'a Catalog,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Resolver { catalog }
    }

    pub fn resolve(&self, stmt: Statement) -> SqlResult<ResolvedStatement> {
        match stmt {
            Statement::Select(select) => {
                Ok(ResolvedStatement::Select(self.resolve_select(select)?))
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => self.resolve_insert(table, columns, values),
            Statement::Delete { table, filter } => self.resolve_delete(table, filter),
            Statement::CreateTable {
                name,
                columns,
                path,
                row_count,
            } => resolve_create_table(name, columns, path, row_count),
        }
    }

    fn lookup_table(&self, name: &str) -> SqlResult<&'a TableSchema> {
        self.catalog
            .get_table(name)
            .ok_or_else(|| SqlError::UnknownTable(name.to_string()))
    }

    fn resolve_select(&self, select: SelectStatement) -> SqlResult<ResolvedSelect> {
        let mut scope = Scope::new();

        let base_schema = self.lookup_table(&select.from.name)?;
        let base_alias = select
            .from
            .alias
            .clone()
            .unwrap_or_else(|| select.from.name.clone());
        scope.add_table(base_alias.clone(), base_schema)?;
        let from = ResolvedTableRef {
            table: base_schema.name.clone(),
            alias: base_alias,
        };

        // Join conditions see the tables joined so far, built left to right
        let mut joins = Vec::new();
        for join in select.joins {
            let schema = self.lookup_table(&join.table.name)?;
            let alias = join
                .table
                .alias
                .clone()
                .unwrap_or_else(|| join.table.name.clone());
            scope.add_table(alias.clone(), schema)?;

            let condition = join
                .condition
                .map(|c| self.resolve_expr(c, &scope))
                .transpose()?;

            joins.push(ResolvedJoinStep {
                table: ResolvedTableRef {
                    table: schema.name.clone(),
                    alias,
                },
                join_type: join.join_type,
                condition,
            });
        }

        let mut items = Vec::new();
        for item in select.items {
            match item {
                SelectItem::Wildcard => {
                    for table in &scope.tables {
                        expand_wildcard(table, &mut items);
                    }
                }
                SelectItem::QualifiedWildcard(qualifier) => {
                    let table = scope
                        .tables
                        .iter()
                        .find(|t| t.alias.eq_ignore_ascii_case(&qualifier))
                        .ok_or_else(|| SqlError::UnknownTable(qualifier.clone()))?;
                    expand_wildcard(table, &mut items);
                }
                SelectItem::Expr { expr, alias } => {
                    let resolved = self.resolve_expr(expr, &scope)?;
                    let name = alias.unwrap_or_else(|| resolved.display_name());
                    items.push(ResolvedSelectItem {
                        expr: resolved,
                        name,
                    });
                }
            }
        }

        let filter = select
            .filter
            .map(|f| self.resolve_expr(f, &scope))
            .transpose()?;

        let group_by = select
            .group_by
            .into_iter()
            .map(|e| self.resolve_expr(e, &scope))
            .collect::<SqlResult<Vec<_>>>()?;

        let order_by = select
            .order_by
            .into_iter()
            .map(|o| Ok((self.resolve_expr(o.expr, &scope)?, o.asc)))
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(ResolvedSelect {
            items,
            from,
            joins,
            filter,
            group_by,
            order_by,
        })
    }

    fn resolve_insert(
        &self,
        table: String,
        columns: Vec<String>,
        values: Vec<Expr>,
    ) -> SqlResult<ResolvedStatement> {
        let schema = self.lookup_table(&table)?;

        let target_columns: Vec<ResolvedColumn> = if columns.is_empty() {
            schema
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| resolved_column(&schema.name, c, i))
                .collect()
        } else {
            columns
                .iter()
                .map(|name| {
                    let (i, c) = schema.get_column(name).ok_or_else(|| {
                        SqlError::UnknownColumn(format!("{}.{}", table, name))
                    })?;
                    Ok(resolved_column(&schema.name, c, i))
                })
                .collect::<SqlResult<Vec<_>>>()?
        };

        if target_columns.len() != values.len() {
            return Err(SqlError::TypeError(format!(
                "INSERT has {} values for {} columns",
                values.len(),
                target_columns.len()
            )));
        }

        // VALUES may only contain literal expressions; resolve against an
        // empty scope so column references fail
        let scope = Scope::new();
        let values = values
            .into_iter()
            .map(|v| self.resolve_expr(v, &scope))
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(ResolvedStatement::Insert {
            table: schema.name.clone(),
            columns: target_columns,
            values,
        })
    }

    fn resolve_delete(&self, table: TableRef, filter: Option<Expr>) -> SqlResult<ResolvedStatement> {
        let schema = self.lookup_table(&table.name)?;
        let alias = table.alias.unwrap_or_else(|| table.name.clone());

        let mut scope = Scope::new();
        scope.add_table(alias.clone(), schema)?;

        let filter = filter.map(|f| self.resolve_expr(f, &scope)).transpose()?;

        Ok(ResolvedStatement::Delete {
            table: ResolvedTableRef {
                table: schema.name.clone(),
                alias,
            },
            filter,
        })
    }

    fn resolve_expr(&self, expr: Expr, scope: &Scope) -> SqlResult<ResolvedExpr> {
        match expr {
            Expr::Column { table, name } => Ok(ResolvedExpr::Column(
                scope.resolve_column(table.as_deref(), &name)?,
            )),

            Expr::Literal(lit) => Ok(ResolvedExpr::Literal(lit)),

            Expr::BinaryOp { left, op, right } => {
                let left = self.resolve_expr(*left, scope)?;
                let right = self.resolve_expr(*right, scope)?;
                let result_type = infer_binary_result_type(op, &left, &right)?;
                Ok(ResolvedExpr::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                    result_type,
                })
            }

            Expr::UnaryOp { op, expr } => {
                let inner = self.resolve_expr(*expr, scope)?;
                let result_type = infer_unary_result_type(op, &inner)?;
                Ok(ResolvedExpr::UnaryOp {
                    op,
                    expr: Box::new(inner),
                    result_type,
                })
            }

            Expr::IsNull { expr, negated } => Ok(ResolvedExpr::IsNull {
                expr: Box::new(self.resolve_expr(*expr, scope)?),
                negated,
            }),

            Expr::Aggregate { kind, arg } => {
                let arg = arg
                    .map(|a| self.resolve_expr(*a, scope))
                    .transpose()?;
                if let Some(arg) = &arg {
                    if arg.has_aggregate() {
                        return Err(SqlError::InvalidAggregation(
                            "aggregate calls cannot be nested".to_string(),
                        ));
                    }
                }
                let result_type = infer_aggregate_result_type(kind, arg.as_ref())?;
                Ok(ResolvedExpr::Aggregate(AggregateCall {
                    kind,
                    arg: arg.map(Box::new),
                    result_type,
                }))
            }
        }
    }
}

fn expand_wildcard(table: &ScopeTable, items: &mut Vec<ResolvedSelectItem>) {
    for (pos, col) in table.columns.iter().enumerate() {
        items.push(ResolvedSelectItem {
            expr: ResolvedExpr::Column(ResolvedColumn {
                table: table.alias.clone(),
                name: col.name.clone(),
                index: table.offset + pos,
                data_type: col.data_type,
                nullable: col.nullable,
            }),
            name: col.name.clone(),
        });
    }
}

fn resolved_column(table: &str, col: &Column, index: usize) -> ResolvedColumn {
    ResolvedColumn {
        table: table.to_string(),
        name: col.name.clone(),
        index,
        data_type: col.data_type,
        nullable: col.nullable,
    }
}

fn resolve_create_table(
    name: String,
    columns: Vec<ColumnSpec>,
    path: Option<String>,
    row_count: Option<u64>,
) -> SqlResult<ResolvedStatement> {
    let mut schema = TableSchema::new(&name);
    for spec in columns {
        if schema.get_column(&spec.name).is_some() {
            return Err(SqlError::TypeError(format!(
                "duplicate column '{}'",
                spec.name
            )));
        }
        schema = schema.column(Column::new(spec.name, spec.data_type).nullable(spec.nullable));
    }
    if let Some(path) = path {
        schema = schema.source(SourceLocation::Csv(PathBuf::from(path)));
    }
    if let Some(rows) = row_count {
        schema = schema.estimated_rows(rows);
    }
    Ok(ResolvedStatement::CreateTable { schema })
}

/// Whether the expression is a bare NULL literal (polymorphic in type checks)
fn is_null_literal(expr: &ResolvedExpr) -> bool {
    matches!(expr, ResolvedExpr::Literal(Literal::Null))
}

fn infer_binary_result_type(
    op: BinaryOp,
    left: &ResolvedExpr,
    right: &ResolvedExpr,
) -> SqlResult<DataType> {
    let lt = left.data_type();
    let rt = right.data_type();

    if op.is_arithmetic() {
        // NULL adopts the other operand's type
        if is_null_literal(left) && is_null_literal(right) {
            return Ok(DataType::Integer);
        }
        if is_null_literal(left) {
            return numeric_or_error(op, rt);
        }
        if is_null_literal(right) {
            return numeric_or_error(op, lt);
        }
        if !lt.is_numeric() || !rt.is_numeric() {
            return Err(SqlError::TypeError(format!(
                "cannot apply {} to {} and {}",
                op.symbol(),
                lt,
                rt
            )));
        }
        return Ok(wider_numeric_type(lt, rt));
    }

    if op.is_comparison() {
        if is_null_literal(left) || is_null_literal(right) {
            return Ok(DataType::Boolean);
        }
        let comparable = lt == rt || (lt.is_numeric() && rt.is_numeric());
        if !comparable {
            return Err(SqlError::TypeError(format!(
                "cannot compare {} and {}",
                lt, rt
            )));
        }
        return Ok(DataType::Boolean);
    }

    // AND / OR
    for (expr, t) in [(left, lt), (right, rt)] {
        if !is_null_literal(expr) && t != DataType::Boolean {
            return Err(SqlError::TypeError(format!(
                "{} requires BOOLEAN operands, found {}",
                op.symbol(),
                t
            )));
        }
    }
    Ok(DataType::Boolean)
}

fn numeric_or_error(op: BinaryOp, t: DataType) -> SqlResult<DataType> {
    if t.is_numeric() {
        Ok(t)
    } else {
        Err(SqlError::TypeError(format!(
            "cannot apply {} to {}",
            op.symbol(),
            t
        )))
    }
}

/// INTEGER promotes to DECIMAL, never the reverse
fn wider_numeric_type(a: DataType, b: DataType) -> DataType {
    if a == DataType::Decimal || b == DataType::Decimal {
        DataType::Decimal
    } else {
        DataType::Integer
    }
}

fn infer_unary_result_type(op: UnaryOp, expr: &ResolvedExpr) -> SqlResult<DataType> {
    let t = expr.data_type();
    match op {
        UnaryOp::Neg => {
            if is_null_literal(expr) || t.is_numeric() {
                Ok(if t.is_numeric() { t } else { DataType::Integer })
            } else {
                Err(SqlError::TypeError(format!("cannot negate {}", t)))
            }
        }
        UnaryOp::Not => {
            if is_null_literal(expr) || t == DataType::Boolean {
                Ok(DataType::Boolean)
            } else {
                Err(SqlError::TypeError(format!(
                    "NOT requires BOOLEAN, found {}",
                    t
                )))
            }
        }
    }
}

fn infer_aggregate_result_type(
    kind: AggregateKind,
    arg: Option<&ResolvedExpr>,
) -> SqlResult<DataType> {
    match kind {
        AggregateKind::Count => Ok(DataType::Integer),
        AggregateKind::Sum => {
            let arg = arg.ok_or_else(|| {
                SqlError::InvalidAggregation("SUM requires an argument".to_string())
            })?;
            let t = arg.data_type();
            if is_null_literal(arg) || t.is_numeric() {
                Ok(if t.is_numeric() { t } else { DataType::Integer })
            } else {
                Err(SqlError::TypeError(format!("cannot SUM {}", t)))
            }
        }
        AggregateKind::Avg => {
            let arg = arg.ok_or_else(|| {
                SqlError::InvalidAggregation("AVG requires an argument".to_string())
            })?;
            let t = arg.data_type();
            if is_null_literal(arg) || t.is_numeric() {
                Ok(DataType::Decimal)
            } else {
                Err(SqlError::TypeError(format!("cannot AVG {}", t)))
            }
        }
        AggregateKind::Min | AggregateKind::Max => {
            let arg = arg.ok_or_else(|| {
                SqlError::InvalidAggregation(format!("{} requires an argument", kind.name()))
            })?;
            Ok(arg.data_type())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::Parser;

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

    fn resolve(sql: &str) -> SqlResult<ResolvedStatement> {
        let catalog = test_catalog();
        let stmt = Parser::parse_one(sql)?;
        Resolver::new(&catalog).resolve(stmt)
    }

    fn resolve_select(sql: &str) -> ResolvedSelect {
        match resolve(sql).unwrap() {
            ResolvedStatement::Select(s) => s,
            other => panic!("expected SELECT, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_columns_and_types() {
        let select = resolve_select("SELECT id, name, age + 1 FROM users");
        assert_eq!(select.items.len(), 3);
        match &select.items[0].expr {
            ResolvedExpr::Column(c) => {
                assert_eq!(c.index, 0);
                assert_eq!(c.data_type, DataType::Integer);
                assert!(!c.nullable);
            }
            other => panic!("expected column, got {:?}", other),
        }
        assert_eq!(select.items[2].expr.data_type(), DataType::Integer);
        assert_eq!(select.items[2].name, "age + 1");
    }

    #[test]
    fn test_join_offsets_right_side() {
        let select = resolve_select(
            "SELECT o.price FROM users u JOIN orders o ON u.id = o.user_id",
        );
        // orders columns start after users' three
        match &select.items[0].expr {
            ResolvedExpr::Column(c) => assert_eq!(c.index, 3 + 3),
            other => panic!("expected column, got {:?}", other),
        }
        let cond = select.joins[0].condition.as_ref().unwrap();
        match cond {
            ResolvedExpr::BinaryOp { left, right, .. } => {
                match (left.as_ref(), right.as_ref()) {
                    (ResolvedExpr::Column(l), ResolvedExpr::Column(r)) => {
                        assert_eq!(l.index, 0);
                        assert_eq!(r.index, 3 + 1);
                    }
                    other => panic!("expected columns, got {:?}", other),
                }
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_wildcard_expansion() {
        let select = resolve_select("SELECT * FROM users u, orders o");
        assert_eq!(select.items.len(), 7);
        let select = resolve_select("SELECT o.* FROM users u, orders o");
        assert_eq!(select.items.len(), 4);
        assert_eq!(select.items[0].name, "id");
    }

    #[test]
    fn test_unknown_table_and_column() {
        assert!(matches!(
            resolve("SELECT id FROM missing").unwrap_err(),
            SqlError::UnknownTable(_)
        ));
        assert!(matches!(
            resolve("SELECT nope FROM users").unwrap_err(),
            SqlError::UnknownColumn(_)
        ));
        assert!(matches!(
            resolve("SELECT x.id FROM users u").unwrap_err(),
            SqlError::UnknownTable(_)
        ));
    }

    #[test]
    fn test_ambiguous_reference() {
        // both tables have an `id` column
        let err = resolve("SELECT id FROM users u JOIN orders o ON u.id = o.user_id")
            .unwrap_err();
        assert!(matches!(err, SqlError::AmbiguousReference(_)));
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            resolve("SELECT name + 1 FROM users").unwrap_err(),
            SqlError::TypeError(_)
        ));
        assert!(matches!(
            resolve("SELECT id FROM users WHERE name > 5").unwrap_err(),
            SqlError::TypeError(_)
        ));
        assert!(matches!(
            resolve("SELECT id FROM users WHERE age AND TRUE").unwrap_err(),
            SqlError::TypeError(_)
        ));
    }

    #[test]
    fn test_numeric_promotion() {
        let select = resolve_select("SELECT price + 1 FROM orders");
        assert_eq!(select.items[0].expr.data_type(), DataType::Decimal);
    }

    #[test]
    fn test_aggregate_types() {
        let select =
            resolve_select("SELECT COUNT(*), SUM(price), AVG(age) FROM users u, orders o");
        assert_eq!(select.items[0].expr.data_type(), DataType::Integer);
        assert_eq!(select.items[1].expr.data_type(), DataType::Decimal);
        assert_eq!(select.items[2].expr.data_type(), DataType::Decimal);
        assert_eq!(select.items[0].name, "COUNT(*)");

        assert!(matches!(
            resolve("SELECT SUM(name) FROM users").unwrap_err(),
            SqlError::TypeError(_)
        ));
        assert!(matches!(
            resolve("SELECT SUM(SUM(age)) FROM users").unwrap_err(),
            SqlError::InvalidAggregation(_)
        ));
    }

    #[test]
    fn test_resolve_insert() {
        let stmt = resolve("INSERT INTO users (id, name, age) VALUES (1, 'Jark', 21)");
        match stmt.unwrap() {
            ResolvedStatement::Insert {
                columns, values, ..
            } => {
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[1].index, 1);
                assert_eq!(values.len(), 3);
            }
            other => panic!("expected INSERT, got {:?}", other),
        }

        assert!(matches!(
            resolve("INSERT INTO users (id, nope) VALUES (1, 2)").unwrap_err(),
            SqlError::UnknownColumn(_)
        ));
        assert!(matches!(
            resolve("INSERT INTO users (id) VALUES (1, 2)").unwrap_err(),
            SqlError::TypeError(_)
        ));
    }

    #[test]
    fn test_resolve_delete() {
        match resolve("DELETE FROM users WHERE id > 1").unwrap() {
            ResolvedStatement::Delete { table, filter } => {
                assert_eq!(table.table, "users");
                assert!(filter.is_some());
            }
            other => panic!("expected DELETE, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_create_table() {
        let stmt = resolve(
            "CREATE TABLE t (a INTEGER NOT NULL, b VARCHAR) WITH (row_count = 7)",
        );
        match stmt.unwrap() {
            ResolvedStatement::CreateTable { schema } => {
                assert_eq!(schema.columns.len(), 2);
                assert_eq!(schema.estimated_rows, 7);
            }
            other => panic!("expected CREATE TABLE, got {:?}", other),
        }
    }
}
