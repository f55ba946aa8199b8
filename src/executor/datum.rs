//! Runtime values
//!
//! `Datum` is the runtime representation of a single column value. NULL is
//! an explicit variant; comparison and hashing treat it as a value (NULL
//! sorts first, NULL == NULL for grouping), while SQL three-valued logic
//! lives in the expression evaluator.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

use crate::catalog::DataType;
use crate::sql::Literal;

/// A single runtime value
#[derive(Debug, Clone)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Str(String),
    Date(NaiveDate),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value widened to f64 (INTEGER or DECIMAL)
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The declared type this value inhabits, if any (NULL has none)
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Datum::Null => None,
            Datum::Bool(_) => Some(DataType::Boolean),
            Datum::Int(_) => Some(DataType::Integer),
            Datum::Decimal(_) => Some(DataType::Decimal),
            Datum::Str(_) => Some(DataType::Varchar),
            Datum::Date(_) => Some(DataType::Date),
        }
    }

    pub fn from_literal(lit: &Literal) -> Datum {
        match lit {
            Literal::Null => Datum::Null,
            Literal::Boolean(b) => Datum::Bool(*b),
            Literal::Integer(i) => Datum::Int(*i),
            Literal::Decimal(d) => Datum::Decimal(*d),
            Literal::String(s) => Datum::Str(s.clone()),
            Literal::Date(d) => Datum::Date(*d),
        }
    }

    /// Widen toward a declared column type. INTEGER widens to DECIMAL;
    /// everything else must already match (NULL fits anywhere).
    pub fn coerce_to(self, target: DataType) -> Option<Datum> {
        match (&self, target) {
            (Datum::Null, _) => Some(self),
            (Datum::Int(i), DataType::Decimal) => Some(Datum::Decimal(*i as f64)),
            _ => match self.data_type() {
                Some(t) if t == target => Some(self),
                _ => None,
            },
        }
    }

    /// Rank used to order values of different variants; NULL sorts first.
    fn type_rank(&self) -> u8 {
        match self {
            Datum::Null => 0,
            Datum::Bool(_) => 1,
            Datum::Int(_) | Datum::Decimal(_) => 2,
            Datum::Str(_) => 3,
            Datum::Date(_) => 4,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{}", b),
            Datum::Int(i) => write!(f, "{}", i),
            Datum::Decimal(d) => write!(f, "{}", d),
            Datum::Str(s) => write!(f, "{}", s),
            Datum::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Bool(a), Datum::Bool(b)) => a == b,
            (Datum::Int(a), Datum::Int(b)) => a == b,
            (Datum::Str(a), Datum::Str(b)) => a == b,
            (Datum::Date(a), Datum::Date(b)) => a == b,
            // Numeric comparison crosses the Int/Decimal boundary
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Eq for Datum {}

impl PartialOrd for Datum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Datum {
    /// Total order: NULL first, then by type rank, then by value.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Datum::Null, Datum::Null) => Ordering::Equal,
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Str(a), Datum::Str(b)) => a.cmp(b),
            (Datum::Date(a), Datum::Date(b)) => a.cmp(b),
            (a, b) if a.type_rank() == 2 && b.type_rank() == 2 => {
                let x = a.as_decimal().unwrap_or(0.0);
                let y = b.as_decimal().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl Hash for Datum {
    /// Int and Decimal share a type rank and compare numerically, so both
    /// hash their widened f64 form to keep Hash consistent with Eq.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_rank().hash(state);
        match self {
            Datum::Null => {}
            Datum::Bool(b) => b.hash(state),
            Datum::Int(i) => (*i as f64).to_bits().hash(state),
            Datum::Decimal(d) => d.to_bits().hash(state),
            Datum::Str(s) => s.hash(state),
            Datum::Date(d) => d.hash(state),
        }
    }
}
