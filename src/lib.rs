//! quern: a small relational query engine
//!
//! SQL text flows through a fixed pipeline: parse to an AST, resolve
//! names and check types against the catalog, build a logical plan,
//! rewrite it with an ordered rule set, lower it to a physical plan,
//! and execute it as a pull-based operator tree. The result is a lazy
//! [`RowStream`] whose schema is known before the first row is pulled.
//!
//! Tables are registered up front and their sources (CSV files or
//! in-memory rows) are read-only: INSERT yields the inserted row as a
//! stream and DELETE yields the rows that survive, neither mutates the
//! underlying data.
//!
//! ```no_run
//! use quern::catalog::{Catalog, Column, DataType, TableSchema};
//!
//! # fn main() -> Result<(), quern::EngineError> {
//! let mut catalog = Catalog::new();
//! catalog.register_table(
//!     TableSchema::new("users")
//!         .column(Column::new("id", DataType::Integer).nullable(false))
//!         .column(Column::new("name", DataType::Varchar))
//!         .source(quern::source::csv_location("users.csv")),
//! )?;
//!
//! let stream = quern::run_statement("SELECT id, name FROM users WHERE id > 3", &catalog)?;
//! for row in stream {
//!     println!("{:?}", row?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod executor;
pub mod planner;
pub mod source;
pub mod sql;

pub use catalog::{Catalog, CatalogError};
pub use executor::{Datum, ExecutorError, Row, RowStream};
pub use planner::{JoinStrategy, Optimizer, PlannerError};
pub use sql::SqlError;

use thiserror::Error;
use tracing::debug;

use executor::ExecutorEngine;
use planner::{ExplainOutput, LogicalPlanBuilder, PhysicalPlanner};
use sql::{Parser, ResolvedStatement, Resolver, TypeChecker};

/// Any error the engine can surface, by pipeline stage
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Planner(#[from] PlannerError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Per-statement knobs: the rewrite rule set and the join strategy
pub struct EngineConfig {
    pub optimizer: Optimizer,
    pub join_strategy: JoinStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            optimizer: Optimizer::new(),
            join_strategy: JoinStrategy::default(),
        }
    }
}

/// Run one SQL statement with the default configuration
pub fn run_statement(sql: &str, catalog: &Catalog) -> Result<RowStream, EngineError> {
    run_statement_with(sql, catalog, &EngineConfig::default())
}

/// Run one SQL statement, returning a lazy stream of result rows
pub fn run_statement_with(
    sql: &str,
    catalog: &Catalog,
    config: &EngineConfig,
) -> Result<RowStream, EngineError> {
    let physical = plan_statement(sql, catalog, config)?;
    let schema = physical.output_columns();
    let exec = ExecutorEngine::new(catalog).build(&physical)?;
    Ok(RowStream::new(schema, exec)?)
}

/// Plan one SQL statement and render the physical plan as text
pub fn explain(sql: &str, catalog: &Catalog) -> Result<String, EngineError> {
    let physical = plan_statement(sql, catalog, &EngineConfig::default())?;
    Ok(ExplainOutput::format(&physical, catalog))
}

/// Apply a DDL statement to the catalog. This is the only entry point
/// that mutates the catalog; queries take it by shared reference.
pub fn apply_ddl(sql: &str, catalog: &mut Catalog) -> Result<(), EngineError> {
    let statement = Parser::parse_one(sql)?;
    let resolved = Resolver::new(catalog).resolve(statement)?;
    match resolved {
        ResolvedStatement::CreateTable { schema } => {
            catalog.register_table(schema)?;
            Ok(())
        }
        _ => Err(EngineError::Sql(SqlError::Unsupported(
            "not a DDL statement".to_string(),
        ))),
    }
}

fn plan_statement(
    sql: &str,
    catalog: &Catalog,
    config: &EngineConfig,
) -> Result<planner::PhysicalPlan, EngineError> {
    let statement = Parser::parse_one(sql)?;
    let resolved = Resolver::new(catalog).resolve(statement)?;
    TypeChecker::check(&resolved, catalog)?;

    if matches!(resolved, ResolvedStatement::CreateTable { .. }) {
        return Err(EngineError::Sql(SqlError::Unsupported(
            "CREATE TABLE must go through apply_ddl".to_string(),
        )));
    }

    let logical = LogicalPlanBuilder::build(resolved, catalog)?;
    let optimized = config.optimizer.optimize(logical)?;
    let physical = PhysicalPlanner::with_strategy(config.join_strategy).plan(optimized, catalog)?;
    debug!(plan = %ExplainOutput::format(&physical, catalog), "planned statement");
    Ok(physical)
}
