//! DELETE as a filtered view
//!
//! Sources are read-only, so DELETE streams the rows that survive: a
//! row is dropped only when the predicate evaluates to TRUE. FALSE and
//! NULL both keep the row.

use crate::source::RecordSource;
use crate::sql::ResolvedExpr;

use super::datum::Datum;
use super::error::ExecutorResult;
use super::eval::eval;
use super::row::Row;
use super::Executor;

pub struct DeleteScanExec {
    source: Box<dyn RecordSource>,
    predicate: Option<ResolvedExpr>,
}

impl DeleteScanExec {
    pub fn new(source: Box<dyn RecordSource>, predicate: Option<ResolvedExpr>) -> Self {
        DeleteScanExec { source, predicate }
    }
}

impl Executor for DeleteScanExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.source.open()
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        loop {
            let row = match self.source.next()? {
                Some(row) => row,
                None => return Ok(None),
            };
            let deleted = match &self.predicate {
                Some(predicate) => eval(predicate, &row)? == Datum::Bool(true),
                // unconditional DELETE removes everything
                None => true,
            };
            if !deleted {
                return Ok(Some(row));
            }
        }
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.source.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::source::MemSource;
    use crate::sql::ast::{BinaryOp, Literal, ResolvedColumn};

    fn id_eq(value: i64) -> ResolvedExpr {
        ResolvedExpr::BinaryOp {
            left: Box::new(ResolvedExpr::Column(ResolvedColumn {
                table: "t".to_string(),
                name: "id".to_string(),
                index: 0,
                data_type: DataType::Integer,
                nullable: true,
            })),
            op: BinaryOp::Eq,
            right: Box::new(ResolvedExpr::Literal(Literal::Integer(value))),
            result_type: DataType::Boolean,
        }
    }

    #[test]
    fn test_delete_keeps_null_predicate_rows() {
        let rows = vec![
            Row::new(vec![Datum::Int(1)]),
            Row::new(vec![Datum::Null]),
            Row::new(vec![Datum::Int(2)]),
        ];
        let mut exec =
            DeleteScanExec::new(Box::new(MemSource::new(rows)), Some(id_eq(1)));
        exec.open().unwrap();
        assert_eq!(exec.next().unwrap().unwrap(), Row::new(vec![Datum::Null]));
        assert_eq!(exec.next().unwrap().unwrap(), Row::new(vec![Datum::Int(2)]));
        assert!(exec.next().unwrap().is_none());
    }

    #[test]
    fn test_unconditional_delete_empties_table() {
        let rows = vec![Row::new(vec![Datum::Int(1)])];
        let mut exec = DeleteScanExec::new(Box::new(MemSource::new(rows)), None);
        exec.open().unwrap();
        assert!(exec.next().unwrap().is_none());
    }
}
