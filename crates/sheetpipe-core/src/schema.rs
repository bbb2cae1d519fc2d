use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered, typed column declaration for a [`Table`](crate::Table).
///
/// Column set and order are fixed for the lifetime of a table and are
/// identical on both sides of the staging handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// The export schema: one row per user document.
    pub fn user_export() -> Self {
        Self::new(vec![
            Column::new("id", ColumnType::Text),
            Column::new("createdAt", ColumnType::Timestamp),
            Column::new("updatedAt", ColumnType::Timestamp),
            Column::new("email", ColumnType::Text),
        ])
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Check that this schema is identical to `expected` (names, types and
    /// order). Called at the extractor output and loader input boundaries.
    pub fn ensure_matches(&self, expected: &TableSchema) -> Result<()> {
        if self == expected {
            Ok(())
        } else {
            Err(Error::SchemaMismatch(format!(
                "expected columns [{}], got [{}]",
                expected.column_names().join(", "),
                self.column_names().join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_export_column_order() {
        let schema = TableSchema::user_export();
        assert_eq!(
            schema.column_names(),
            vec!["id", "createdAt", "updatedAt", "email"]
        );
        assert_eq!(schema.columns()[1].column_type, ColumnType::Timestamp);
        assert_eq!(schema.arity(), 4);
    }

    #[test]
    fn test_ensure_matches_accepts_identical_schema() {
        let schema = TableSchema::user_export();
        assert!(schema.ensure_matches(&TableSchema::user_export()).is_ok());
    }

    #[test]
    fn test_ensure_matches_rejects_reordered_columns() {
        let reordered = TableSchema::new(vec![
            Column::new("email", ColumnType::Text),
            Column::new("id", ColumnType::Text),
            Column::new("createdAt", ColumnType::Timestamp),
            Column::new("updatedAt", ColumnType::Timestamp),
        ]);

        let err = reordered
            .ensure_matches(&TableSchema::user_export())
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
    }
}
