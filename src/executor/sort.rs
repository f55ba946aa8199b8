//! Sort operator

use std::cmp::Ordering;

use crate::sql::ResolvedExpr;

use super::datum::Datum;
use super::error::ExecutorResult;
use super::eval::eval;
use super::row::Row;
use super::Executor;

/// Blocking stable sort. Rows that compare equal on every key keep
/// their input order. NULL sorts before every non-NULL value.
pub struct SortExec {
    input: Box<dyn Executor>,
    keys: Vec<(ResolvedExpr, bool)>,
    sorted: Vec<Row>,
    emit: usize,
}

impl SortExec {
    pub fn new(input: Box<dyn Executor>, keys: Vec<(ResolvedExpr, bool)>) -> Self {
        SortExec {
            input,
            keys,
            sorted: Vec::new(),
            emit: 0,
        }
    }
}

impl Executor for SortExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.sorted.clear();
        self.emit = 0;

        self.input.open()?;
        let mut keyed: Vec<(Vec<Datum>, Row)> = Vec::new();
        loop {
            let row = match self.input.next()? {
                Some(row) => row,
                None => break,
            };
            let mut key = Vec::with_capacity(self.keys.len());
            for (expr, _) in &self.keys {
                key.push(eval(expr, &row)?);
            }
            keyed.push((key, row));
        }
        self.input.close()?;

        let directions: Vec<bool> = self.keys.iter().map(|(_, asc)| *asc).collect();
        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), asc) in a.iter().zip(b.iter()).zip(directions.iter()) {
                let ordering = x.cmp(y);
                let ordering = if *asc { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        self.sorted = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.emit >= self.sorted.len() {
            return Ok(None);
        }
        let row = self.sorted[self.emit].clone();
        self.emit += 1;
        Ok(Some(row))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.sorted.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::executor::values::RowsExec;
    use crate::sql::ast::ResolvedColumn;

    fn col(index: usize) -> ResolvedExpr {
        ResolvedExpr::Column(ResolvedColumn {
            table: "t".to_string(),
            name: format!("c{}", index),
            index,
            data_type: DataType::Integer,
            nullable: true,
        })
    }

    fn drain(exec: &mut dyn Executor) -> Vec<Row> {
        exec.open().unwrap();
        let mut out = Vec::new();
        while let Some(row) = exec.next().unwrap() {
            out.push(row);
        }
        exec.close().unwrap();
        out
    }

    #[test]
    fn test_sort_nulls_first_and_stability() {
        let rows = vec![
            Row::new(vec![Datum::Int(2), Datum::Str("first".into())]),
            Row::new(vec![Datum::Null, Datum::Str("null".into())]),
            Row::new(vec![Datum::Int(1), Datum::Str("one".into())]),
            Row::new(vec![Datum::Int(2), Datum::Str("second".into())]),
        ];
        let mut sort = SortExec::new(Box::new(RowsExec::new(rows)), vec![(col(0), true)]);
        let out = drain(&mut sort);
        assert_eq!(out[0].get(1), Some(&Datum::Str("null".into())));
        assert_eq!(out[1].get(0), Some(&Datum::Int(1)));
        // equal keys preserve input order
        assert_eq!(out[2].get(1), Some(&Datum::Str("first".into())));
        assert_eq!(out[3].get(1), Some(&Datum::Str("second".into())));
    }

    #[test]
    fn test_sort_descending() {
        let rows = vec![
            Row::new(vec![Datum::Int(1)]),
            Row::new(vec![Datum::Int(3)]),
            Row::new(vec![Datum::Int(2)]),
        ];
        let mut sort = SortExec::new(Box::new(RowsExec::new(rows)), vec![(col(0), false)]);
        let out = drain(&mut sort);
        let values: Vec<_> = out.iter().map(|r| r.get(0).cloned()).collect();
        assert_eq!(
            values,
            vec![Some(Datum::Int(3)), Some(Datum::Int(2)), Some(Datum::Int(1))]
        );
    }
}
