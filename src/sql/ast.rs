//! SQL abstract syntax tree
//!
//! Two layers: the position-free AST produced by the parser, and the
//! resolved AST produced by the resolver, where every column reference is
//! bound to a table and a row offset and every expression carries its
//! result type.

use chrono::NaiveDate;

use crate::catalog::DataType;

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Date(NaiveDate),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

impl AggregateKind {
    pub fn from_name(name: &str) -> Option<AggregateKind> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateKind::Count),
            "SUM" => Some(AggregateKind::Sum),
            "MIN" => Some(AggregateKind::Min),
            "MAX" => Some(AggregateKind::Max),
            "AVG" => Some(AggregateKind::Avg),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::Avg => "AVG",
        }
    }
}

/// Unresolved expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        table: Option<String>,
        name: String,
    },
    Literal(Literal),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// Aggregate call; `arg` is None for COUNT(*)
    Aggregate {
        kind: AggregateKind,
        arg: Option<Box<Expr>>,
    },
}

/// SELECT list item
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Expr { expr: Expr, alias: Option<String> },
    Wildcard,
    QualifiedWildcard(String),
}

/// Table reference in FROM
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

/// One join step in the FROM clause
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: TableRef,
    pub join_type: JoinType,
    pub condition: Option<Expr>,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub asc: bool,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderByItem>,
}

/// Column definition in CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// Parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Expr>,
    },
    Delete {
        table: TableRef,
        filter: Option<Expr>,
    },
    CreateTable {
        name: String,
        columns: Vec<ColumnSpec>,
        path: Option<String>,
        row_count: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Resolved AST
// ---------------------------------------------------------------------------

/// A column bound to a table and an offset into the operator's input row
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    /// Table alias the column was resolved against
    pub table: String,
    pub name: String,
    /// Offset into the concatenated input row
    pub index: usize,
    pub data_type: DataType,
    pub nullable: bool,
}

/// A resolved aggregate call
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub kind: AggregateKind,
    /// None for COUNT(*)
    pub arg: Option<Box<ResolvedExpr>>,
    pub result_type: DataType,
}

/// Typed, resolved expression
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedExpr {
    Column(ResolvedColumn),
    Literal(Literal),
    BinaryOp {
        left: Box<ResolvedExpr>,
        op: BinaryOp,
        right: Box<ResolvedExpr>,
        result_type: DataType,
    },
    UnaryOp {
        op: UnaryOp,
        expr: Box<ResolvedExpr>,
        result_type: DataType,
    },
    IsNull {
        expr: Box<ResolvedExpr>,
        negated: bool,
    },
    Aggregate(AggregateCall),
}

impl ResolvedExpr {
    /// The expression's result type. A bare NULL literal has no inherent
    /// type; VARCHAR stands in for it.
    pub fn data_type(&self) -> DataType {
        match self {
            ResolvedExpr::Column(c) => c.data_type,
            ResolvedExpr::Literal(lit) => match lit {
                Literal::Null => DataType::Varchar,
                Literal::Boolean(_) => DataType::Boolean,
                Literal::Integer(_) => DataType::Integer,
                Literal::Decimal(_) => DataType::Decimal,
                Literal::String(_) => DataType::Varchar,
                Literal::Date(_) => DataType::Date,
            },
            ResolvedExpr::BinaryOp { result_type, .. } => *result_type,
            ResolvedExpr::UnaryOp { result_type, .. } => *result_type,
            ResolvedExpr::IsNull { .. } => DataType::Boolean,
            ResolvedExpr::Aggregate(call) => call.result_type,
        }
    }

    /// Whether the expression can produce NULL
    pub fn is_nullable(&self) -> bool {
        match self {
            ResolvedExpr::Column(c) => c.nullable,
            ResolvedExpr::Literal(lit) => matches!(lit, Literal::Null),
            ResolvedExpr::BinaryOp { left, right, .. } => {
                left.is_nullable() || right.is_nullable()
            }
            ResolvedExpr::UnaryOp { expr, .. } => expr.is_nullable(),
            ResolvedExpr::IsNull { .. } => false,
            ResolvedExpr::Aggregate(call) => !matches!(call.kind, AggregateKind::Count),
        }
    }

    /// Whether the expression contains an aggregate call anywhere
    pub fn has_aggregate(&self) -> bool {
        match self {
            ResolvedExpr::Aggregate(_) => true,
            ResolvedExpr::BinaryOp { left, right, .. } => {
                left.has_aggregate() || right.has_aggregate()
            }
            ResolvedExpr::UnaryOp { expr, .. } => expr.has_aggregate(),
            ResolvedExpr::IsNull { expr, .. } => expr.has_aggregate(),
            ResolvedExpr::Column(_) | ResolvedExpr::Literal(_) => false,
        }
    }

    /// Human-readable rendering, used for derived column names and EXPLAIN
    pub fn display_name(&self) -> String {
        match self {
            ResolvedExpr::Column(c) => c.name.clone(),
            ResolvedExpr::Literal(lit) => match lit {
                Literal::Null => "NULL".to_string(),
                Literal::Boolean(b) => b.to_string(),
                Literal::Integer(i) => i.to_string(),
                Literal::Decimal(d) => d.to_string(),
                Literal::String(s) => format!("'{}'", s),
                Literal::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
            },
            ResolvedExpr::BinaryOp { left, op, right, .. } => format!(
                "{} {} {}",
                left.display_name(),
                op.symbol(),
                right.display_name()
            ),
            ResolvedExpr::UnaryOp { op, expr, .. } => match op {
                UnaryOp::Not => format!("NOT {}", expr.display_name()),
                UnaryOp::Neg => format!("-{}", expr.display_name()),
            },
            ResolvedExpr::IsNull { expr, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", expr.display_name())
                } else {
                    format!("{} IS NULL", expr.display_name())
                }
            }
            ResolvedExpr::Aggregate(call) => match &call.arg {
                Some(arg) => format!("{}({})", call.kind.name(), arg.display_name()),
                None => format!("{}(*)", call.kind.name()),
            },
        }
    }
}

/// Resolved SELECT list item
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelectItem {
    pub expr: ResolvedExpr,
    /// Output column name (alias, column name, or rendered expression)
    pub name: String,
}

/// A table bound in the FROM clause
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTableRef {
    pub table: String,
    pub alias: String,
}

/// One resolved join step
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedJoinStep {
    pub table: ResolvedTableRef,
    pub join_type: JoinType,
    pub condition: Option<ResolvedExpr>,
}

/// Resolved SELECT
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelect {
    pub items: Vec<ResolvedSelectItem>,
    pub from: ResolvedTableRef,
    pub joins: Vec<ResolvedJoinStep>,
    pub filter: Option<ResolvedExpr>,
    pub group_by: Vec<ResolvedExpr>,
    pub order_by: Vec<(ResolvedExpr, bool)>,
}

/// Resolved statement
#[derive(Debug, Clone)]
pub enum ResolvedStatement {
    Select(ResolvedSelect),
    Insert {
        table: String,
        /// Target columns in statement order
        columns: Vec<ResolvedColumn>,
        values: Vec<ResolvedExpr>,
    },
    Delete {
        table: ResolvedTableRef,
        filter: Option<ResolvedExpr>,
    },
    CreateTable {
        schema: crate::catalog::TableSchema,
    },
}
