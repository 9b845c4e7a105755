//! Expected column schema
//!
//! The ordered list of encoded feature columns the models were trained on.
//! Loaded once at startup from a flat text file, one column name per line.

use crate::error::{SchemaError, StartupError};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Ordered, duplicate-free list of encoded feature columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ColumnSchema {
    /// Load the schema from a text file, preserving file order
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StartupError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| StartupError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let schema = Self::parse(&contents).map_err(|source| StartupError::Schema {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), columns = schema.len(), "Loaded column schema");
        Ok(schema)
    }

    /// Parse a newline-separated column listing; blank lines are skipped
    pub fn parse(contents: &str) -> Result<Self, SchemaError> {
        Self::from_columns(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn from_columns<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if positions.insert(column.clone(), idx).is_some() {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }

        Ok(Self { columns, positions })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_preserves_order_and_trims() {
        let schema = ColumnSchema::parse("duration\n  src_bytes \r\nprotocol_type_tcp\n").unwrap();
        assert_eq!(
            schema.columns(),
            &["duration", "src_bytes", "protocol_type_tcp"]
        );
        assert_eq!(schema.position("src_bytes"), Some(1));
        assert!(!schema.contains("service_http"));
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let schema = ColumnSchema::parse("duration\n\n   \nflag_SF\n").unwrap();
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_empty_schema_rejected() {
        assert_eq!(ColumnSchema::parse("\n \n"), Err(SchemaError::Empty));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        assert_eq!(
            ColumnSchema::parse("duration\nflag_SF\nduration\n"),
            Err(SchemaError::DuplicateColumn("duration".to_string()))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "duration").unwrap();
        writeln!(file, "service_http").unwrap();

        let schema = ColumnSchema::load(file.path()).unwrap();
        assert_eq!(schema.columns(), &["duration", "service_http"]);
    }

    #[test]
    fn test_load_missing_file_is_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ColumnSchema::load(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, StartupError::Read { .. }));
    }
}
