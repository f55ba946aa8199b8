//! Join operators
//!
//! `NestedLoopJoinExec` handles every join type and condition shape;
//! `HashJoinExec` is the equi-join fast path the physical planner picks
//! when asked to. Both produce the same multiset of rows for the plans
//! the planner gives them.

use std::collections::HashMap;

use crate::sql::ast::JoinType;
use crate::sql::ResolvedExpr;

use super::datum::Datum;
use super::error::ExecutorResult;
use super::eval::eval;
use super::row::Row;
use super::Executor;

/// Nested-loop join. The right input is materialized on open; the left
/// side streams. Outer variants pad the non-matching side with NULLs.
pub struct NestedLoopJoinExec {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    join_type: JoinType,
    condition: Option<ResolvedExpr>,
    left_width: usize,
    right_width: usize,

    right_rows: Vec<Row>,
    /// Per-right-row match flag, tracked only for RIGHT joins
    right_matched: Vec<bool>,
    current_left: Option<Row>,
    left_matched: bool,
    right_index: usize,
    /// Emit cursor for unmatched right rows after the left is drained
    tail_index: usize,
    left_done: bool,
}

impl NestedLoopJoinExec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        join_type: JoinType,
        condition: Option<ResolvedExpr>,
        left_width: usize,
        right_width: usize,
    ) -> Self {
        NestedLoopJoinExec {
            left,
            right,
            join_type,
            condition,
            left_width,
            right_width,
            right_rows: Vec::new(),
            right_matched: Vec::new(),
            current_left: None,
            left_matched: false,
            right_index: 0,
            tail_index: 0,
            left_done: false,
        }
    }

    fn matches(&self, combined: &Row) -> ExecutorResult<bool> {
        match &self.condition {
            Some(condition) => Ok(eval(condition, combined)? == Datum::Bool(true)),
            None => Ok(true),
        }
    }
}

impl Executor for NestedLoopJoinExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.left.open()?;
        self.right.open()?;
        while let Some(row) = self.right.next()? {
            self.right_rows.push(row);
        }
        self.right.close()?;
        if self.join_type == JoinType::Right {
            self.right_matched = vec![false; self.right_rows.len()];
        }
        self.current_left = None;
        self.left_matched = false;
        self.right_index = 0;
        self.tail_index = 0;
        self.left_done = false;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        loop {
            if self.left_done {
                // RIGHT join tail: right rows no left row matched
                while self.tail_index < self.right_matched.len() {
                    let i = self.tail_index;
                    self.tail_index += 1;
                    if !self.right_matched[i] {
                        let padded = null_row(self.left_width);
                        return Ok(Some(padded.concat(self.right_rows[i].clone())));
                    }
                }
                return Ok(None);
            }

            if self.current_left.is_none() {
                match self.left.next()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.left_matched = false;
                        self.right_index = 0;
                    }
                    None => {
                        self.left_done = true;
                        continue;
                    }
                }
            }

            let left_row = match &self.current_left {
                Some(row) => row.clone(),
                None => continue,
            };

            while self.right_index < self.right_rows.len() {
                let i = self.right_index;
                self.right_index += 1;
                let combined = left_row.clone().concat(self.right_rows[i].clone());
                if self.matches(&combined)? {
                    self.left_matched = true;
                    if !self.right_matched.is_empty() {
                        self.right_matched[i] = true;
                    }
                    return Ok(Some(combined));
                }
            }

            // left row exhausted the right side
            self.current_left = None;
            if self.join_type == JoinType::Left && !self.left_matched {
                return Ok(Some(left_row.concat(null_row(self.right_width))));
            }
        }
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.right_rows.clear();
        self.right_matched.clear();
        self.left.close()
    }
}

/// Inner equi-join. Builds a hash table over the right input on open,
/// then probes it with each left row. NULL keys never match.
pub struct HashJoinExec {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_key: usize,
    right_key: usize,

    table: HashMap<Datum, Vec<Row>>,
    current_left: Option<Row>,
    match_index: usize,
}

impl HashJoinExec {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        left_key: usize,
        right_key: usize,
    ) -> Self {
        HashJoinExec {
            left,
            right,
            left_key,
            right_key,
            table: HashMap::new(),
            current_left: None,
            match_index: 0,
        }
    }
}

impl Executor for HashJoinExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.left.open()?;
        self.right.open()?;
        while let Some(row) = self.right.next()? {
            let key = row.get(self.right_key).cloned().unwrap_or(Datum::Null);
            if key.is_null() {
                continue;
            }
            self.table.entry(key).or_default().push(row);
        }
        self.right.close()?;
        self.current_left = None;
        self.match_index = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        loop {
            if let Some(left_row) = &self.current_left {
                let key = left_row.get(self.left_key).cloned().unwrap_or(Datum::Null);
                if !key.is_null() {
                    if let Some(matches) = self.table.get(&key) {
                        if self.match_index < matches.len() {
                            let right_row = matches[self.match_index].clone();
                            self.match_index += 1;
                            return Ok(Some(left_row.clone().concat(right_row)));
                        }
                    }
                }
                self.current_left = None;
            }

            match self.left.next()? {
                Some(row) => {
                    self.current_left = Some(row);
                    self.match_index = 0;
                }
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.table.clear();
        self.left.close()
    }
}

fn null_row(width: usize) -> Row {
    Row::new(vec![Datum::Null; width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::executor::values::RowsExec;
    use crate::sql::ast::{BinaryOp, ResolvedColumn};

    fn rows(values: &[&[i64]]) -> Vec<Row> {
        values
            .iter()
            .map(|vals| Row::new(vals.iter().map(|v| Datum::Int(*v)).collect()))
            .collect()
    }

    fn eq_condition(left_index: usize, right_index: usize) -> ResolvedExpr {
        let col = |index: usize| {
            ResolvedExpr::Column(ResolvedColumn {
                table: "t".to_string(),
                name: format!("c{}", index),
                index,
                data_type: DataType::Integer,
                nullable: true,
            })
        };
        ResolvedExpr::BinaryOp {
            left: Box::new(col(left_index)),
            op: BinaryOp::Eq,
            right: Box::new(col(right_index)),
            result_type: DataType::Boolean,
        }
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
    fn test_inner_join_matches() {
        let left = RowsExec::new(rows(&[&[1, 10], &[2, 20], &[3, 30]]));
        let right = RowsExec::new(rows(&[&[2, 200], &[3, 300], &[3, 301]]));
        let mut join = NestedLoopJoinExec::new(
            Box::new(left),
            Box::new(right),
            JoinType::Inner,
            Some(eq_condition(0, 2)),
            2,
            2,
        );
        let out = drain(&mut join);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], Row::new(rows(&[&[2, 20, 2, 200]])[0].values().to_vec()));
    }

    #[test]
    fn test_left_join_pads_right() {
        let left = RowsExec::new(rows(&[&[1], &[2]]));
        let right = RowsExec::new(rows(&[&[2]]));
        let mut join = NestedLoopJoinExec::new(
            Box::new(left),
            Box::new(right),
            JoinType::Left,
            Some(eq_condition(0, 1)),
            1,
            1,
        );
        let out = drain(&mut join);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Row::new(vec![Datum::Int(1), Datum::Null]));
        assert_eq!(out[1], Row::new(vec![Datum::Int(2), Datum::Int(2)]));
    }

    #[test]
    fn test_right_join_pads_left() {
        let left = RowsExec::new(rows(&[&[2]]));
        let right = RowsExec::new(rows(&[&[1], &[2]]));
        let mut join = NestedLoopJoinExec::new(
            Box::new(left),
            Box::new(right),
            JoinType::Right,
            Some(eq_condition(0, 1)),
            1,
            1,
        );
        let out = drain(&mut join);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Row::new(vec![Datum::Int(2), Datum::Int(2)]));
        assert_eq!(out[1], Row::new(vec![Datum::Null, Datum::Int(1)]));
    }

    #[test]
    fn test_cross_join() {
        let left = RowsExec::new(rows(&[&[1], &[2]]));
        let right = RowsExec::new(rows(&[&[10], &[20]]));
        let mut join = NestedLoopJoinExec::new(
            Box::new(left),
            Box::new(right),
            JoinType::Cross,
            None,
            1,
            1,
        );
        assert_eq!(drain(&mut join).len(), 4);
    }

    #[test]
    fn test_hash_join_agrees_with_nested_loop() {
        let left_rows = rows(&[&[1, 10], &[2, 20], &[3, 30], &[2, 21]]);
        let right_rows = rows(&[&[2, 200], &[3, 300], &[3, 301], &[9, 900]]);

        let mut nlj = NestedLoopJoinExec::new(
            Box::new(RowsExec::new(left_rows.clone())),
            Box::new(RowsExec::new(right_rows.clone())),
            JoinType::Inner,
            Some(eq_condition(0, 2)),
            2,
            2,
        );
        let mut hash = HashJoinExec::new(
            Box::new(RowsExec::new(left_rows)),
            Box::new(RowsExec::new(right_rows)),
            0,
            0,
        );

        let mut a = drain(&mut nlj);
        let mut b = drain(&mut hash);
        a.sort_by(|x, y| x.values().cmp(y.values()));
        b.sort_by(|x, y| x.values().cmp(y.values()));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_join_crosses_numeric_key_types() {
        // Int 2 on the probe side must find Decimal 2.0 on the build side
        let left_rows = vec![Row::new(vec![Datum::Int(2)])];
        let right_rows = vec![Row::new(vec![Datum::Decimal(2.0)])];
        let mut hash = HashJoinExec::new(
            Box::new(RowsExec::new(left_rows)),
            Box::new(RowsExec::new(right_rows)),
            0,
            0,
        );
        let out = drain(&mut hash);
        assert_eq!(
            out,
            vec![Row::new(vec![Datum::Int(2), Datum::Decimal(2.0)])]
        );
    }

    #[test]
    fn test_null_keys_never_join() {
        let left_rows = vec![Row::new(vec![Datum::Null])];
        let right_rows = vec![Row::new(vec![Datum::Null])];
        let mut hash = HashJoinExec::new(
            Box::new(RowsExec::new(left_rows.clone())),
            Box::new(RowsExec::new(right_rows.clone())),
            0,
            0,
        );
        assert!(drain(&mut hash).is_empty());

        let mut nlj = NestedLoopJoinExec::new(
            Box::new(RowsExec::new(left_rows)),
            Box::new(RowsExec::new(right_rows)),
            JoinType::Inner,
            Some(eq_condition(0, 1)),
            1,
            1,
        );
        assert!(drain(&mut nlj).is_empty());
    }
}
