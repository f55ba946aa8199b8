//! Projection and the fused Calc operator

use crate::sql::ResolvedExpr;

use super::datum::Datum;
use super::error::ExecutorResult;
use super::eval::eval;
use super::row::Row;
use super::Executor;

/// Computes one output value per expression for each input row
pub struct ProjectExec {
    input: Box<dyn Executor>,
    expressions: Vec<ResolvedExpr>,
}

impl ProjectExec {
    pub fn new(input: Box<dyn Executor>, expressions: Vec<ResolvedExpr>) -> Self {
        ProjectExec { input, expressions }
    }
}

impl Executor for ProjectExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.input.open()
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        match self.input.next()? {
            Some(row) => Ok(Some(project_row(&self.expressions, &row)?)),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.input.close()
    }
}

/// Fused filter-then-project: evaluates the predicate against the input
/// row and projects only survivors, one operator deep instead of two
pub struct CalcExec {
    input: Box<dyn Executor>,
    expressions: Vec<ResolvedExpr>,
    predicate: Option<ResolvedExpr>,
}

impl CalcExec {
    pub fn new(
        input: Box<dyn Executor>,
        expressions: Vec<ResolvedExpr>,
        predicate: Option<ResolvedExpr>,
    ) -> Self {
        CalcExec {
            input,
            expressions,
            predicate,
        }
    }
}

impl Executor for CalcExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.input.open()
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        while let Some(row) = self.input.next()? {
            if let Some(predicate) = &self.predicate {
                if eval(predicate, &row)? != Datum::Bool(true) {
                    continue;
                }
            }
            return Ok(Some(project_row(&self.expressions, &row)?));
        }
        Ok(None)
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.input.close()
    }
}

fn project_row(expressions: &[ResolvedExpr], row: &Row) -> ExecutorResult<Row> {
    let mut values = Vec::with_capacity(expressions.len());
    for expr in expressions {
        values.push(eval(expr, row)?);
    }
    Ok(Row::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::executor::values::RowsExec;
    use crate::sql::ast::{BinaryOp, Literal, ResolvedColumn};

    fn col(index: usize) -> ResolvedExpr {
        ResolvedExpr::Column(ResolvedColumn {
            table: "t".to_string(),
            name: format!("c{}", index),
            index,
            data_type: DataType::Integer,
            nullable: true,
        })
    }

    #[test]
    fn test_project_computes_expressions() {
        let rows = vec![Row::new(vec![Datum::Int(1), Datum::Int(2)])];
        let double = ResolvedExpr::BinaryOp {
            left: Box::new(col(0)),
            op: BinaryOp::Mul,
            right: Box::new(ResolvedExpr::Literal(Literal::Integer(2))),
            result_type: DataType::Integer,
        };
        let mut project =
            ProjectExec::new(Box::new(RowsExec::new(rows)), vec![col(1), double]);
        project.open().unwrap();
        assert_eq!(
            project.next().unwrap().unwrap(),
            Row::new(vec![Datum::Int(2), Datum::Int(2)])
        );
        assert!(project.next().unwrap().is_none());
    }

    #[test]
    fn test_calc_filters_then_projects() {
        let rows = vec![
            Row::new(vec![Datum::Int(1), Datum::Int(10)]),
            Row::new(vec![Datum::Int(2), Datum::Int(20)]),
        ];
        let predicate = ResolvedExpr::BinaryOp {
            left: Box::new(col(0)),
            op: BinaryOp::Eq,
            right: Box::new(ResolvedExpr::Literal(Literal::Integer(2))),
            result_type: DataType::Boolean,
        };
        let mut calc = CalcExec::new(
            Box::new(RowsExec::new(rows)),
            vec![col(1)],
            Some(predicate),
        );
        calc.open().unwrap();
        assert_eq!(
            calc.next().unwrap().unwrap(),
            Row::new(vec![Datum::Int(20)])
        );
        assert!(calc.next().unwrap().is_none());
    }
}
