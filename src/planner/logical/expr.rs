//! Plan-level expression support types

use crate::catalog::DataType;

/// One column of an operator's output schema
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl OutputColumn {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        OutputColumn {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}
