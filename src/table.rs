//! Tabular microdata model
//!
//! Cells are dynamically typed (`Value`); a `Table` stores them column-major
//! with a stable row index assigned at construction and preserved across
//! record suppression, so suppressed outputs can still be traced back to the
//! original rows.

use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("column '{0}' is not present in the table")]
    UnknownColumn(String),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row} has {got} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        got: usize,
        expected: usize,
    },
}

/// A single cell. Columns are not forced to a uniform type; generalization
/// rewrites numeric columns into string labels in place.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Parse a raw text cell: integer first, then float, else trimmed string.
    /// Table cells and hierarchy cells go through the same rule so that
    /// positional hierarchy lookup matches on equal values.
    pub fn parse(text: &str) -> Value {
        let t = text.trim();
        if let Ok(i) = t.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = t.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(t.to_string())
    }

    /// The suppression sentinel.
    pub fn star() -> Value {
        Value::Str("*".to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Str(_))
    }
}

// Floats compare and hash by bit pattern so a Value can key a hash map.
// Cells never hold NaN arithmetic results; they only hold parsed input.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Int(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Str(s) => {
                2u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// An ordered table of records. Column names are unique; cells are stored
/// column-major (`cells[c][r]`).
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    cells: Vec<Vec<Value>>,
    index: Vec<usize>,
}

impl Table {
    /// Build a table from row-major data. Fails on duplicate column names or
    /// ragged rows. Rows get index 0..n-1.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        let width = columns.len();
        let mut cells: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RaggedRow {
                    row: r,
                    got: row.len(),
                    expected: width,
                });
            }
            for (c, cell) in row.into_iter().enumerate() {
                cells[c].push(cell);
            }
        }
        let n = cells.first().map(|c| c.len()).unwrap_or(0);
        Ok(Table {
            columns,
            cells,
            index: (0..n).collect(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    fn column_pos(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&[Value], TableError> {
        Ok(&self.cells[self.column_pos(name)?])
    }

    /// Replace a column wholesale. The replacement must keep the row count.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        let pos = self.column_pos(name)?;
        if values.len() != self.n_rows() {
            return Err(TableError::RaggedRow {
                row: 0,
                got: values.len(),
                expected: self.n_rows(),
            });
        }
        self.cells[pos] = values;
        Ok(())
    }

    /// Number of distinct values currently observed in a column.
    pub fn distinct_count(&self, name: &str) -> Result<usize, TableError> {
        let col = self.column(name)?;
        let distinct: std::collections::HashSet<&Value> = col.iter().collect();
        Ok(distinct.len())
    }

    /// Original row id of the row currently at position `r`.
    pub fn row_id(&self, r: usize) -> usize {
        self.index[r]
    }

    /// Keep only the rows whose position is marked `true`. Surviving rows
    /// retain their original index.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows());
        for col in &mut self.cells {
            let mut r = 0;
            col.retain(|_| {
                let kept = keep[r];
                r += 1;
                kept
            });
        }
        let mut r = 0;
        self.index.retain(|_| {
            let kept = keep[r];
            r += 1;
            kept
        });
    }

    /// Same schema, zero rows. Infeasible searches return this so callers can
    /// still see the column layout.
    pub fn cleared(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            cells: self.columns.iter().map(|_| Vec::new()).collect(),
            index: Vec::new(),
        }
    }
}
