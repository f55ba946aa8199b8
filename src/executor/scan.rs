//! Table scan

use crate::source::RecordSource;

use super::error::ExecutorResult;
use super::row::Row;
use super::Executor;

/// Streams rows from a source adapter in source order
pub struct ScanExec {
    source: Box<dyn RecordSource>,
}

impl ScanExec {
    pub fn new(source: Box<dyn RecordSource>) -> Self {
        ScanExec { source }
    }
}

impl Executor for ScanExec {
    fn open(&mut self) -> ExecutorResult<()> {
        self.source.open()
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        self.source.next()
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.source.close()
    }
}
