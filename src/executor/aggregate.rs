//! Hash aggregation
//!
//! Blocking operator: drains its input on open, grouping rows by their
//! key values, then emits one row per group in first-seen order. With no
//! GROUP BY the whole input is one group, and an empty input still
//! produces a single row (COUNT is 0, the other aggregates are NULL).

use std::collections::HashMap;

use crate::sql::ast::{AggregateCall, AggregateKind};

use super::datum::Datum;
use super::error::{ExecutorError, ExecutorResult};
use super::eval::eval;
use super::row::Row;
use super::Executor;

pub struct HashAggregateExec {
    input: Box<dyn Executor>,
    group_by: Vec<crate::sql::ResolvedExpr>,
    aggregates: Vec<AggregateCall>,

    groups: Vec<(Vec<Datum>, Vec<Accumulator>)>,
    index: HashMap<Vec<Datum>, usize>,
    emit: usize,
}

impl HashAggregateExec {
    pub fn new(
        input: Box<dyn Executor>,
        group_by: Vec<crate::sql::ResolvedExpr>,
        aggregates: Vec<AggregateCall>,
    ) -> Self {
        HashAggregateExec {
            input,
            group_by,
            aggregates,
            groups: Vec::new(),
            index: HashMap::new(),
            emit: 0,
        }
    }

    fn accumulators(&self) -> Vec<Accumulator> {
        self.aggregates.iter().map(Accumulator::new).collect()
    }

    fn absorb(&mut self, row: &Row) -> ExecutorResult<()> {
        let mut key = Vec::with_capacity(self.group_by.len());
        for expr in &self.group_by {
            key.push(eval(expr, row)?);
        }

        let slot = match self.index.get(&key) {
            Some(slot) => *slot,
            None => {
                let slot = self.groups.len();
                self.index.insert(key.clone(), slot);
                self.groups.push((key, self.accumulators()));
                slot
            }
        };

        for (call, acc) in self.aggregates.iter().zip(self.groups[slot].1.iter_mut()) {
            let value = match &call.arg {
                Some(arg) => Some(eval(arg, row)?),
                None => None,
            };
            acc.absorb(value)?;
        }
        Ok(())
    }
}

impl Executor for HashAggregateExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.groups.clear();
        self.index.clear();
        self.emit = 0;

        self.input.open()?;
        loop {
            let row = match self.input.next()? {
                Some(row) => row,
                None => break,
            };
            self.absorb(&row)?;
        }
        self.input.close()?;

        // scalar aggregation always yields exactly one row
        if self.group_by.is_empty() && self.groups.is_empty() {
            self.groups.push((Vec::new(), self.accumulators()));
        }
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.emit >= self.groups.len() {
            return Ok(None);
        }
        let (key, accs) = &self.groups[self.emit];
        self.emit += 1;

        let mut values = key.clone();
        for acc in accs {
            values.push(acc.finish());
        }
        Ok(Some(Row::new(values)))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.groups.clear();
        self.index.clear();
        Ok(())
    }
}

/// Per-group running state for one aggregate call
enum Accumulator {
    /// COUNT(*) counts rows; COUNT(expr) counts non-NULL values
    Count { count: i64, count_rows: bool },
    /// Running sum, NULL until the first non-NULL input; integers stay
    /// integral
    Sum(Option<Datum>),
    Min(Option<Datum>),
    Max(Option<Datum>),
    Avg { sum: f64, count: i64 },
}

impl Accumulator {
    fn new(call: &AggregateCall) -> Self {
        match call.kind {
            AggregateKind::Count => Accumulator::Count {
                count: 0,
                count_rows: call.arg.is_none(),
            },
            AggregateKind::Sum => Accumulator::Sum(None),
            AggregateKind::Min => Accumulator::Min(None),
            AggregateKind::Max => Accumulator::Max(None),
            AggregateKind::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
        }
    }

    /// `value` is None only for COUNT(*)
    fn absorb(&mut self, value: Option<Datum>) -> ExecutorResult<()> {
        match self {
            Accumulator::Count { count, count_rows } => {
                if *count_rows || !matches!(value, Some(Datum::Null)) {
                    *count += 1;
                }
            }

            Accumulator::Sum(state) => {
                let value = match value {
                    Some(Datum::Null) | None => return Ok(()),
                    Some(value) => value,
                };
                *state = Some(match state.take() {
                    None => value,
                    Some(current) => add_numeric(current, value)?,
                });
            }

            Accumulator::Min(state) => {
                if let Some(value) = non_null(value) {
                    let better = match state {
                        Some(current) => value < *current,
                        None => true,
                    };
                    if better {
                        *state = Some(value);
                    }
                }
            }

            Accumulator::Max(state) => {
                if let Some(value) = non_null(value) {
                    let better = match state {
                        Some(current) => value > *current,
                        None => true,
                    };
                    if better {
                        *state = Some(value);
                    }
                }
            }

            Accumulator::Avg { sum, count } => {
                if let Some(value) = non_null(value) {
                    match value.as_decimal() {
                        Some(v) => {
                            *sum += v;
                            *count += 1;
                        }
                        None => {
                            return Err(ExecutorError::TypeMismatch(format!(
                                "AVG over non-numeric value {}",
                                value
                            )))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(&self) -> Datum {
        match self {
            Accumulator::Count { count, .. } => Datum::Int(*count),
            Accumulator::Sum(state) | Accumulator::Min(state) | Accumulator::Max(state) => {
                state.clone().unwrap_or(Datum::Null)
            }
            Accumulator::Avg { sum, count } => {
                if *count == 0 {
                    Datum::Null
                } else {
                    Datum::Decimal(sum / *count as f64)
                }
            }
        }
    }
}

fn non_null(value: Option<Datum>) -> Option<Datum> {
    match value {
        Some(Datum::Null) | None => None,
        Some(value) => Some(value),
    }
}

fn add_numeric(a: Datum, b: Datum) -> ExecutorResult<Datum> {
    match (&a, &b) {
        (Datum::Int(x), Datum::Int(y)) => x
            .checked_add(*y)
            .map(Datum::Int)
            .ok_or_else(|| ExecutorError::InvalidOperation("integer overflow in SUM".to_string())),
        _ => match (a.as_decimal(), b.as_decimal()) {
            (Some(x), Some(y)) => Ok(Datum::Decimal(x + y)),
            _ => Err(ExecutorError::TypeMismatch(format!(
                "SUM over non-numeric value {}",
                b
            ))),
        },
    }
}
