//! SQL front-end errors

use thiserror::Error;

/// Errors from parsing, resolution, and validation
#[derive(Error, Debug)]
pub enum SqlError {
    /// Malformed SQL text; the message retains the tokenizer position
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("ambiguous reference '{0}'")]
    AmbiguousReference(String),

    #[error("type error: {0}")]
    TypeError(String),

    #[error("invalid aggregation: {0}")]
    InvalidAggregation(String),

    /// Recognized SQL outside the supported surface
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<sqlparser::parser::ParserError> for SqlError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        SqlError::Parse(err.to_string())
    }
}

pub type SqlResult<T> = Result<T, SqlError>;
