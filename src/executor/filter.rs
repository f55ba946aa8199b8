//! Filter operator

use crate::sql::ResolvedExpr;

use super::datum::Datum;
use super::error::ExecutorResult;
use super::eval::eval;
use super::row::Row;
use super::Executor;

/// Passes rows whose predicate evaluates to TRUE. FALSE and NULL both
/// drop the row.
pub struct FilterExec {
    input: Box<dyn Executor>,
    predicate: ResolvedExpr,
}

impl FilterExec {
    pub fn new(input: Box<dyn Executor>, predicate: ResolvedExpr) -> Self {
        FilterExec { input, predicate }
    }
}

impl Executor for FilterExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.input.open()
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        while let Some(row) = self.input.next()? {
            if eval(&self.predicate, &row)? == Datum::Bool(true) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.input.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::executor::values::RowsExec;
    use crate::sql::ast::{BinaryOp, Literal, ResolvedColumn};

    fn age_gt(threshold: i64) -> ResolvedExpr {
        ResolvedExpr::BinaryOp {
            left: Box::new(ResolvedExpr::Column(ResolvedColumn {
                table: "t".to_string(),
                name: "age".to_string(),
                index: 0,
                data_type: DataType::Integer,
                nullable: true,
            })),
            op: BinaryOp::Gt,
            right: Box::new(ResolvedExpr::Literal(Literal::Integer(threshold))),
            result_type: DataType::Boolean,
        }
    }

    #[test]
    fn test_null_never_passes() {
        let rows = vec![
            Row::new(vec![Datum::Int(30)]),
            Row::new(vec![Datum::Null]),
            Row::new(vec![Datum::Int(10)]),
        ];
        let mut filter = FilterExec::new(Box::new(RowsExec::new(rows)), age_gt(18));
        filter.open().unwrap();
        assert_eq!(
            filter.next().unwrap().unwrap(),
            Row::new(vec![Datum::Int(30)])
        );
        assert!(filter.next().unwrap().is_none());
        filter.close().unwrap();
    }
}
