//! Literal row sources

use crate::planner::OutputColumn;
use crate::sql::ResolvedExpr;

use super::error::{ExecutorError, ExecutorResult};
use super::eval::eval;
use super::row::Row;
use super::Executor;

/// Emits a single row of evaluated literals, coerced to the target
/// table's column types. Backs INSERT.
pub struct ValuesExec {
    columns: Vec<OutputColumn>,
    values: Vec<ResolvedExpr>,
    emitted: bool,
}

impl ValuesExec {
    pub fn new(columns: Vec<OutputColumn>, values: Vec<ResolvedExpr>) -> Self {
        ValuesExec {
            columns,
            values,
            emitted: false,
        }
    }
}

impl Executor for ValuesExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;

        let empty = Row::empty();
        let mut out = Vec::with_capacity(self.values.len());
        for (expr, column) in self.values.iter().zip(self.columns.iter()) {
            let value = eval(expr, &empty)?;
            let coerced = value.clone().coerce_to(column.data_type).ok_or_else(|| {
                ExecutorError::Cast {
                    value: value.to_string(),
                    target: column.data_type,
                }
            })?;
            out.push(coerced);
        }
        Ok(Some(Row::new(out)))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        Ok(())
    }
}

/// Emits a fixed list of prebuilt rows; the executor-side test double
/// and the backing for in-memory inputs that bypass the catalog
pub struct RowsExec {
    rows: Vec<Row>,
    position: usize,
}

impl RowsExec {
    pub fn new(rows: Vec<Row>) -> Self {
        RowsExec { rows, position: 0 }
    }
}

impl Executor for RowsExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.position >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.position].clone();
        self.position += 1;
        Ok(Some(row))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::executor::Datum;
    use crate::sql::ast::Literal;

    #[test]
    fn test_values_coerces_to_column_types() {
        let columns = vec![
            OutputColumn::new("id", DataType::Integer, false),
            OutputColumn::new("score", DataType::Decimal, true),
        ];
        let values = vec![
            ResolvedExpr::Literal(Literal::Integer(1)),
            ResolvedExpr::Literal(Literal::Integer(9)),
        ];
        let mut exec = ValuesExec::new(columns, values);
        exec.open().unwrap();
        assert_eq!(
            exec.next().unwrap().unwrap(),
            Row::new(vec![Datum::Int(1), Datum::Decimal(9.0)])
        );
        assert!(exec.next().unwrap().is_none());
    }

    #[test]
    fn test_values_rejects_bad_coercion() {
        let columns = vec![OutputColumn::new("id", DataType::Integer, false)];
        let values = vec![ResolvedExpr::Literal(Literal::String("x".into()))];
        let mut exec = ValuesExec::new(columns, values);
        exec.open().unwrap();
        assert!(matches!(
            exec.next().unwrap_err(),
            ExecutorError::Cast { .. }
        ));
    }
}
