//! Pull-based query execution
//!
//! Every operator implements the same open/next/close protocol. `next`
//! produces one row at a time; blocking operators (aggregate, sort, the
//! build side of joins) drain their input inside `open`. The tree is
//! driven lazily through `RowStream`, so a consumer that stops early
//! never pays for the rows it does not read.

mod aggregate;
mod datum;
mod delete;
mod engine;
mod error;
mod eval;
mod filter;
mod join;
mod project;
mod row;
mod scan;
mod sort;
mod values;

pub use datum::Datum;
pub use engine::ExecutorEngine;
pub use error::{ExecutorError, ExecutorResult};
pub use row::Row;
pub use values::RowsExec;

use tracing::debug;

use crate::planner::OutputColumn;

/// One node in an executor tree
pub trait Executor {
    fn open(&mut self) -> ExecutorResult<()>;
    fn next(&mut self) -> ExecutorResult<Option<Row>>;
    fn close(&mut self) -> ExecutorResult<()>;
}

/// Lazy stream of result rows. The output schema is available before
/// any row is pulled; iteration drives the executor tree one row at a
/// time and closes it on exhaustion, error, or drop.
pub struct RowStream {
    schema: Vec<OutputColumn>,
    exec: Box<dyn Executor>,
    done: bool,
}

impl RowStream {
    pub(crate) fn new(
        schema: Vec<OutputColumn>,
        mut exec: Box<dyn Executor>,
    ) -> ExecutorResult<Self> {
        exec.open()?;
        Ok(RowStream {
            schema,
            exec,
            done: false,
        })
    }

    pub fn schema(&self) -> &[OutputColumn] {
        &self.schema
    }

    /// Drain every remaining row into memory
    pub fn collect_rows(self) -> ExecutorResult<Vec<Row>> {
        let mut rows = Vec::new();
        for row in self {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("schema", &self.schema)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl Iterator for RowStream {
    type Item = ExecutorResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.exec.next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                match self.exec.close() {
                    Ok(()) => None,
                    Err(e) => Some(Err(e)),
                }
            }
            Err(e) => {
                self.done = true;
                if let Err(close_err) = self.exec.close() {
                    debug!(error = %close_err, "close failed after execution error");
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for RowStream {
    fn drop(&mut self) {
        if !self.done {
            self.done = true;
            if let Err(e) = self.exec.close() {
                debug!(error = %e, "close failed on dropped stream");
            }
        }
    }
}
