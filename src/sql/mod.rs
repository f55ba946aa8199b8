//! SQL front end: parsing, name resolution, and validation

pub mod ast;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod typecheck;

pub use ast::{
    AggregateCall, AggregateKind, BinaryOp, Expr, JoinType, Literal, ResolvedColumn,
    ResolvedExpr, ResolvedSelect, ResolvedSelectItem, ResolvedStatement, ResolvedTableRef,
    SelectItem, Statement, UnaryOp,
};
pub use error::{SqlError, SqlResult};
pub use parser::Parser;
pub use resolver::Resolver;
pub use typecheck::TypeChecker;
