//! Table catalog
//!
//! The catalog maps table names to schemas and source locations. It is
//! populated up front (programmatically or through `apply_ddl`) and is
//! read-only while queries run; registration requires exclusive access.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::executor::Row;

/// Row-count hint used when a table is registered without one.
pub const DEFAULT_ROW_ESTIMATE: u64 = 100;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Varchar,
    Decimal,
    Boolean,
    Date,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Decimal)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Integer => "INTEGER",
            DataType::Varchar => "VARCHAR",
            DataType::Decimal => "DECIMAL",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
        };
        write!(f, "{}", s)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    /// Create a column (nullable by default)
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Column {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Set nullability
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Where a table's rows come from
#[derive(Debug, Clone)]
pub enum SourceLocation {
    /// Headerless CSV file; fields parsed per the schema column types
    Csv(PathBuf),
    /// Rows held in memory
    Memory(Vec<Row>),
}

/// Table schema: columns plus the source the rows are read from
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub source: SourceLocation,
    pub estimated_rows: u64,
}

impl TableSchema {
    /// Create a table schema with an empty in-memory source
    pub fn new(name: impl Into<String>) -> Self {
        TableSchema {
            name: name.into(),
            columns: Vec::new(),
            source: SourceLocation::Memory(Vec::new()),
            estimated_rows: DEFAULT_ROW_ESTIMATE,
        }
    }

    /// Add a column (builder style)
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the row source
    pub fn source(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }

    /// Set the estimated row count hint
    pub fn estimated_rows(mut self, rows: u64) -> Self {
        self.estimated_rows = rows;
        self
    }

    /// Find a column by name (case-insensitive), returning its position
    pub fn get_column(&self, name: &str) -> Option<(usize, &Column)> {
        self.columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.eq_ignore_ascii_case(name))
    }
}

/// Catalog operation errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("table '{0}' has no columns")]
    EmptySchema(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// The table catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, TableSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            tables: HashMap::new(),
        }
    }

    /// Register a table. Names are stored lowercased; duplicates are an error.
    pub fn register_table(&mut self, schema: TableSchema) -> CatalogResult<()> {
        let key = schema.name.to_ascii_lowercase();
        if schema.columns.is_empty() {
            return Err(CatalogError::EmptySchema(schema.name));
        }
        if self.tables.contains_key(&key) {
            return Err(CatalogError::TableExists(schema.name));
        }
        tracing::debug!(table = %key, columns = schema.columns.len(), "registered table");
        self.tables.insert(key, schema);
        Ok(())
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_ascii_lowercase())
    }

    /// Table names, sorted for stable output
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}
