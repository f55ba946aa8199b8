//! Expression evaluation
//!
//! Evaluates resolved expressions against a row with SQL semantics: NULL
//! propagates through arithmetic and comparisons, AND/OR follow
//! three-valued logic, division by zero is a runtime error.

use std::cmp::Ordering;

use crate::sql::ast::{BinaryOp, ResolvedExpr, UnaryOp};

use super::datum::Datum;
use super::error::{ExecutorError, ExecutorResult};
use super::row::Row;

pub fn eval(expr: &ResolvedExpr, row: &Row) -> ExecutorResult<Datum> {
    match expr {
        ResolvedExpr::Column(c) => row.get(c.index).cloned().ok_or_else(|| {
            ExecutorError::ColumnIndexOutOfBounds {
                index: c.index,
                width: row.len(),
            }
        }),

        ResolvedExpr::Literal(lit) => Ok(Datum::from_literal(lit)),

        ResolvedExpr::BinaryOp {
            left, op, right, ..
        } => eval_binary(left, *op, right, row),

        ResolvedExpr::UnaryOp { op, expr, .. } => {
            let value = eval(expr, row)?;
            match op {
                UnaryOp::Neg => negate(value),
                UnaryOp::Not => Ok(match value.as_bool() {
                    Some(b) => Datum::Bool(!b),
                    None => Datum::Null,
                }),
            }
        }

        ResolvedExpr::IsNull { expr, negated } => {
            let value = eval(expr, row)?;
            Ok(Datum::Bool(value.is_null() != *negated))
        }

        // Aggregates are computed by the aggregate operator; the builder
        // never leaves one in a row-level expression
        ResolvedExpr::Aggregate(_) => Err(ExecutorError::InvalidOperation(
            "aggregate call in row context".to_string(),
        )),
    }
}

fn eval_binary(
    left: &ResolvedExpr,
    op: BinaryOp,
    right: &ResolvedExpr,
    row: &Row,
) -> ExecutorResult<Datum> {
    // AND/OR short-circuit so a decided result never trips over an error
    // in the other operand
    if op == BinaryOp::And {
        let l = eval(left, row)?;
        if l.as_bool() == Some(false) {
            return Ok(Datum::Bool(false));
        }
        let r = eval(right, row)?;
        return Ok(eval_and(l, r));
    }
    if op == BinaryOp::Or {
        let l = eval(left, row)?;
        if l.as_bool() == Some(true) {
            return Ok(Datum::Bool(true));
        }
        let r = eval(right, row)?;
        return Ok(eval_or(l, r));
    }

    let l = eval(left, row)?;
    let r = eval(right, row)?;

    if l.is_null() || r.is_null() {
        return Ok(Datum::Null);
    }

    if op.is_arithmetic() {
        return eval_arithmetic(op, l, r);
    }

    // comparison
    let ordering = compare(&l, &r)?;
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        _ => unreachable!("non-comparison operator"),
    };
    Ok(Datum::Bool(result))
}

fn eval_arithmetic(op: BinaryOp, l: Datum, r: Datum) -> ExecutorResult<Datum> {
    // INTEGER op INTEGER stays integral; anything else widens to DECIMAL
    if let (Datum::Int(a), Datum::Int(b)) = (&l, &r) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => {
                if b == 0 {
                    return Err(ExecutorError::DivisionByZero);
                }
                a.checked_div(b)
            }
            _ => unreachable!("non-arithmetic operator"),
        };
        return result.map(Datum::Int).ok_or_else(|| {
            ExecutorError::InvalidOperation("integer overflow".to_string())
        });
    }

    let (a, b) = match (l.as_decimal(), r.as_decimal()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ExecutorError::TypeMismatch(format!(
                "cannot apply {} to {} and {}",
                op.symbol(),
                l,
                r
            )))
        }
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExecutorError::DivisionByZero);
            }
            a / b
        }
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(Datum::Decimal(result))
}

fn compare(l: &Datum, r: &Datum) -> ExecutorResult<Ordering> {
    let comparable = match (l, r) {
        (Datum::Bool(_), Datum::Bool(_))
        | (Datum::Str(_), Datum::Str(_))
        | (Datum::Date(_), Datum::Date(_)) => true,
        _ => l.as_decimal().is_some() && r.as_decimal().is_some(),
    };
    if !comparable {
        return Err(ExecutorError::TypeMismatch(format!(
            "cannot compare {} and {}",
            l, r
        )));
    }
    Ok(l.cmp(r))
}

fn negate(value: Datum) -> ExecutorResult<Datum> {
    match value {
        Datum::Null => Ok(Datum::Null),
        Datum::Int(i) => i
            .checked_neg()
            .map(Datum::Int)
            .ok_or_else(|| ExecutorError::InvalidOperation("integer overflow".to_string())),
        Datum::Decimal(d) => Ok(Datum::Decimal(-d)),
        other => Err(ExecutorError::TypeMismatch(format!(
            "cannot negate {}",
            other
        ))),
    }
}

/// Three-valued AND
pub fn eval_and(l: Datum, r: Datum) -> Datum {
    match (l.as_bool(), r.as_bool()) {
        (Some(false), _) | (_, Some(false)) => Datum::Bool(false),
        (Some(true), Some(true)) => Datum::Bool(true),
        _ => Datum::Null,
    }
}

/// Three-valued OR
pub fn eval_or(l: Datum, r: Datum) -> Datum {
    match (l.as_bool(), r.as_bool()) {
        (Some(true), _) | (_, Some(true)) => Datum::Bool(true),
        (Some(false), Some(false)) => Datum::Bool(false),
        _ => Datum::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::sql::ast::{Literal, ResolvedColumn};

    fn col(index: usize, data_type: DataType) -> ResolvedExpr {
        ResolvedExpr::Column(ResolvedColumn {
            table: "t".to_string(),
            name: format!("c{}", index),
            index,
            data_type,
            nullable: true,
        })
    }

    fn lit(l: Literal) -> ResolvedExpr {
        ResolvedExpr::Literal(l)
    }

    fn binop(left: ResolvedExpr, op: BinaryOp, right: ResolvedExpr) -> ResolvedExpr {
        let result_type = if op.is_arithmetic() {
            DataType::Integer
        } else {
            DataType::Boolean
        };
        ResolvedExpr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
            result_type,
        }
    }

    #[test]
    fn test_arithmetic() {
        let row = Row::new(vec![Datum::Int(20)]);
        let expr = binop(col(0, DataType::Integer), BinaryOp::Add, lit(Literal::Integer(1)));
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Int(21));

        let expr = binop(
            col(0, DataType::Integer),
            BinaryOp::Mul,
            lit(Literal::Decimal(1.5)),
        );
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Decimal(30.0));
    }

    #[test]
    fn test_null_propagates() {
        let row = Row::new(vec![Datum::Null]);
        for op in [BinaryOp::Add, BinaryOp::Eq, BinaryOp::Lt] {
            let expr = binop(col(0, DataType::Integer), op, lit(Literal::Integer(1)));
            assert_eq!(eval(&expr, &row).unwrap(), Datum::Null);
        }
    }

    #[test]
    fn test_division_by_zero() {
        let row = Row::empty();
        let expr = binop(
            lit(Literal::Integer(1)),
            BinaryOp::Div,
            lit(Literal::Integer(0)),
        );
        assert!(matches!(
            eval(&expr, &row).unwrap_err(),
            ExecutorError::DivisionByZero
        ));
        let expr = binop(
            lit(Literal::Decimal(1.0)),
            BinaryOp::Div,
            lit(Literal::Decimal(0.0)),
        );
        assert!(matches!(
            eval(&expr, &row).unwrap_err(),
            ExecutorError::DivisionByZero
        ));
    }

    #[test]
    fn test_integer_division_truncates() {
        let row = Row::empty();
        let expr = binop(
            lit(Literal::Integer(7)),
            BinaryOp::Div,
            lit(Literal::Integer(2)),
        );
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Int(3));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval_and(Datum::Null, Datum::Bool(false)), Datum::Bool(false));
        assert_eq!(eval_and(Datum::Null, Datum::Bool(true)), Datum::Null);
        assert_eq!(eval_or(Datum::Null, Datum::Bool(true)), Datum::Bool(true));
        assert_eq!(eval_or(Datum::Null, Datum::Bool(false)), Datum::Null);
    }

    #[test]
    fn test_and_short_circuits_errors() {
        let row = Row::empty();
        let divide = binop(
            lit(Literal::Integer(1)),
            BinaryOp::Div,
            lit(Literal::Integer(0)),
        );
        let guarded = binop(
            lit(Literal::Boolean(false)),
            BinaryOp::And,
            binop(divide, BinaryOp::Gt, lit(Literal::Integer(0))),
        );
        assert_eq!(eval(&guarded, &row).unwrap(), Datum::Bool(false));
    }

    #[test]
    fn test_is_null() {
        let row = Row::new(vec![Datum::Null, Datum::Int(1)]);
        let expr = ResolvedExpr::IsNull {
            expr: Box::new(col(0, DataType::Integer)),
            negated: false,
        };
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Bool(true));
        let expr = ResolvedExpr::IsNull {
            expr: Box::new(col(1, DataType::Integer)),
            negated: true,
        };
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Bool(true));
    }

    #[test]
    fn test_string_comparison() {
        let row = Row::new(vec![Datum::Str("Jark".to_string())]);
        let expr = binop(
            col(0, DataType::Varchar),
            BinaryOp::Eq,
            lit(Literal::String("Jark".to_string())),
        );
        assert_eq!(eval(&expr, &row).unwrap(), Datum::Bool(true));
    }
}
