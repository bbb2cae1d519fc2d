use crate::{Error, Result, TableSchema};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single table value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Null,
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// True for `Number` cells holding an infinity or NaN.
    pub fn is_non_finite(&self) -> bool {
        matches!(self, Cell::Number(n) if !n.is_finite())
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::String(String::new()),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(String::new())),
            Cell::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Timestamp(ts) => {
                f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }
}

/// An ordered sequence of rows sharing one fixed schema.
///
/// Owned by the pipeline run that produced it and moved by value through
/// the staging handoff; there is no shared mutable view of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, enforcing the schema arity.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.schema.arity() {
            return Err(Error::SchemaMismatch(format!(
                "row has {} cell(s), schema has {} column(s)",
                row.len(),
                self.schema.arity()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Replace non-finite numbers with nulls, then all nulls with zero.
    ///
    /// The spreadsheet service rejects non-finite numeric values, so they
    /// can never reach the write. Finite values pass through untouched.
    /// Returns the number of cells replaced.
    pub fn sanitize(&mut self) -> usize {
        let mut replaced = 0;
        for row in &mut self.rows {
            for cell in row {
                if cell.is_non_finite() {
                    *cell = Cell::Null;
                }
                if matches!(cell, Cell::Null) {
                    *cell = Cell::Number(0.0);
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Row-major grid for the worksheet write: one header row of column
    /// names followed by one row per record, in original order.
    pub fn to_grid(&self) -> Vec<Vec<Value>> {
        let header = self
            .schema
            .column_names()
            .into_iter()
            .map(|name| Value::String(name.to_string()))
            .collect();

        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(header);
        for row in &self.rows {
            grid.push(row.iter().map(Cell::to_json).collect());
        }
        grid
    }

    /// Plain-text rendering of the first `limit` rows, for diagnostics.
    pub fn preview(&self, limit: usize) -> String {
        let mut out = String::new();
        out.push_str(&self.schema.column_names().join(" | "));
        for row in self.rows.iter().take(limit) {
            out.push('\n');
            let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            out.push_str(&cells.join(" | "));
        }
        out
    }
}
