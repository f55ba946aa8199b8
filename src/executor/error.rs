//! Execution errors

use thiserror::Error;

use crate::catalog::DataType;

/// Runtime errors surfaced through the row stream
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// A source adapter failed to open or read
    #[error("source error: {0}")]
    Source(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot cast {value} to {target}")]
    Cast { value: String, target: DataType },

    #[error("type error: {0}")]
    TypeMismatch(String),

    #[error("column index {index} out of bounds for row of width {width}")]
    ColumnIndexOutOfBounds { index: usize, width: usize },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
