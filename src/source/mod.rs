//! Row source adapters
//!
//! A `RecordSource` produces a table's raw rows in stable source order
//! through the same open/next/close protocol the executors use. Adapters
//! are constructed from the catalog's `SourceLocation` when the executor
//! tree is built.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;

use crate::catalog::{Column, DataType, SourceLocation, TableSchema};
use crate::executor::{Datum, ExecutorError, ExecutorResult, Row};

/// A stream of raw table rows
pub trait RecordSource {
    fn open(&mut self) -> ExecutorResult<()>;
    fn next(&mut self) -> ExecutorResult<Option<Row>>;
    fn close(&mut self) -> ExecutorResult<()>;
}

/// Build the adapter for a registered table
pub fn source_for(schema: &TableSchema) -> Box<dyn RecordSource> {
    match &schema.source {
        SourceLocation::Csv(path) => {
            Box::new(CsvSource::new(path.clone(), schema.columns.clone()))
        }
        SourceLocation::Memory(rows) => Box::new(MemSource::new(rows.clone())),
    }
}

/// Headerless CSV file source; fields are parsed per the schema column
/// types. An empty field reads as NULL in a nullable column and is an
/// error in a NOT NULL one.
pub struct CsvSource {
    path: PathBuf,
    columns: Vec<Column>,
    reader: Option<csv::Reader<File>>,
    record: StringRecord,
    /// 1-based row position, for error messages
    position: u64,
}

impl CsvSource {
    pub fn new(path: PathBuf, columns: Vec<Column>) -> Self {
        CsvSource {
            path,
            columns,
            reader: None,
            record: StringRecord::new(),
            position: 0,
        }
    }
}

impl RecordSource for CsvSource {
    fn open(&mut self) -> ExecutorResult<()> {
        let file = File::open(&self.path).map_err(|e| {
            ExecutorError::Source(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        self.reader = Some(
            csv::ReaderBuilder::new()
                .has_headers(false)
                .from_reader(file),
        );
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ExecutorError::Source("source not open".to_string()))?;

        let more = reader.read_record(&mut self.record).map_err(|e| {
            ExecutorError::Source(format!("{}: {}", self.path.display(), e))
        })?;
        if !more {
            return Ok(None);
        }
        self.position += 1;

        if self.record.len() != self.columns.len() {
            return Err(ExecutorError::Source(format!(
                "{} row {}: expected {} fields, found {}",
                self.path.display(),
                self.position,
                self.columns.len(),
                self.record.len()
            )));
        }

        let mut values = Vec::with_capacity(self.columns.len());
        for (field, column) in self.record.iter().zip(self.columns.iter()) {
            values.push(parse_field(field, column).map_err(|msg| {
                ExecutorError::Source(format!(
                    "{} row {} column '{}': {}",
                    self.path.display(),
                    self.position,
                    column.name,
                    msg
                ))
            })?);
        }
        Ok(Some(Row::new(values)))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        self.reader = None;
        Ok(())
    }
}

fn parse_field(field: &str, column: &Column) -> Result<Datum, String> {
    if field.is_empty() {
        if !column.nullable {
            return Err("NULL in NOT NULL column".to_string());
        }
        return Ok(Datum::Null);
    }
    match column.data_type {
        DataType::Integer => field
            .trim()
            .parse::<i64>()
            .map(Datum::Int)
            .map_err(|_| format!("invalid INTEGER '{}'", field)),
        DataType::Decimal => field
            .trim()
            .parse::<f64>()
            .map(Datum::Decimal)
            .map_err(|_| format!("invalid DECIMAL '{}'", field)),
        DataType::Boolean => match field.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Datum::Bool(true)),
            "false" | "0" => Ok(Datum::Bool(false)),
            _ => Err(format!("invalid BOOLEAN '{}'", field)),
        },
        DataType::Date => NaiveDate::parse_from_str(field.trim(), "%Y-%m-%d")
            .map(Datum::Date)
            .map_err(|_| format!("invalid DATE '{}'", field)),
        DataType::Varchar => Ok(Datum::Str(field.to_string())),
    }
}

/// In-memory row source
pub struct MemSource {
    rows: Vec<Row>,
    position: usize,
}

impl MemSource {
    pub fn new(rows: Vec<Row>) -> Self {
        MemSource { rows, position: 0 }
    }
}

impl RecordSource for MemSource {
    fn open(&mut self) -> ExecutorResult<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self) -> ExecutorResult<Option<Row>> {
        if self.position >= self.rows.len() {
            return Ok(None);
        }
        let row = self.rows[self.position].clone();
        self.position += 1;
        Ok(Some(row))
    }

    fn close(&mut self) -> ExecutorResult<()> {
        Ok(())
    }
}

/// Convenience for registering CSV-backed tables by path
pub fn csv_location(path: impl AsRef<Path>) -> SourceLocation {
    SourceLocation::Csv(path.as_ref().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::Integer).nullable(false),
            Column::new("name", DataType::Varchar),
            Column::new("age", DataType::Integer),
        ]
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_csv_source_reads_in_order() {
        let file = write_csv("1,Jark,21\n2,Nicole,20\n3,Mike,30\n");
        let mut source = CsvSource::new(file.path().to_path_buf(), csv_columns());
        source.open().unwrap();

        let first = source.next().unwrap().unwrap();
        assert_eq!(
            first.values(),
            &[
                Datum::Int(1),
                Datum::Str("Jark".to_string()),
                Datum::Int(21)
            ]
        );
        assert!(source.next().unwrap().is_some());
        assert!(source.next().unwrap().is_some());
        assert!(source.next().unwrap().is_none());
        source.close().unwrap();
    }

    #[test]
    fn test_csv_empty_field_is_null() {
        let file = write_csv("1,,21\n");
        let mut source = CsvSource::new(file.path().to_path_buf(), csv_columns());
        source.open().unwrap();
        let row = source.next().unwrap().unwrap();
        assert_eq!(row.get(1), Some(&Datum::Null));
    }

    #[test]
    fn test_csv_empty_field_in_not_null_column_rejected() {
        let file = write_csv("1,Jark,21\n,Nicole,20\n");
        let mut source = CsvSource::new(file.path().to_path_buf(), csv_columns());
        source.open().unwrap();
        assert!(source.next().unwrap().is_some());
        let err = source.next().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 2"), "bad message: {}", msg);
        assert!(msg.contains("'id'"), "bad message: {}", msg);
        assert!(msg.contains("NOT NULL"), "bad message: {}", msg);
    }

    #[test]
    fn test_csv_parse_error_names_position() {
        let file = write_csv("1,Jark,twenty\n");
        let mut source = CsvSource::new(file.path().to_path_buf(), csv_columns());
        source.open().unwrap();
        let err = source.next().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 1"), "bad message: {}", msg);
        assert!(msg.contains("age"), "bad message: {}", msg);
    }

    #[test]
    fn test_csv_missing_file() {
        let mut source = CsvSource::new(PathBuf::from("/nonexistent.csv"), csv_columns());
        assert!(matches!(
            source.open().unwrap_err(),
            ExecutorError::Source(_)
        ));
    }

    #[test]
    fn test_mem_source_rewinds_on_open() {
        let rows = vec![
            Row::new(vec![Datum::Int(1)]),
            Row::new(vec![Datum::Int(2)]),
        ];
        let mut source = MemSource::new(rows);
        source.open().unwrap();
        assert!(source.next().unwrap().is_some());
        source.open().unwrap();
        assert_eq!(
            source.next().unwrap().unwrap().values(),
            &[Datum::Int(1)]
        );
    }
}
