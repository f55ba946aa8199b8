//! Planner errors

use thiserror::Error;

/// Errors from plan construction and rewriting
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("unsupported query shape: {0}")]
    Unsupported(String),

    /// An optimizer rewrite changed the plan's output schema. This is a
    /// bug in the rule, not in the query.
    #[error("optimizer rule '{rule}' changed the plan schema")]
    SchemaMismatch { rule: String },

    #[error("internal planner error: {0}")]
    Internal(String),
}

pub type PlannerResult<T> = Result<T, PlannerError>;
