//! Table and hierarchy loading from CSV files
//!
//! The dialect is deliberately small: comma-separated fields, optional
//! double quotes around fields that contain commas (interval labels such as
//! `"[20, 30)"` need them), `""` as an escaped quote inside a quoted field.
//! Cells are whitespace-trimmed and type-inferred. Blank lines are skipped.
//!
//! Tables carry a header row of column names. Hierarchy files have no
//! header: column i holds the labels of generalization level i, rows aligned
//! by position.

use crate::hierarchy::Hierarchy;
use crate::table::{Table, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    fn parse(path: &Path, message: impl Into<String>) -> Self {
        LoadError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Load a table from a CSV file with a header row.
pub fn load_table(path: &Path) -> Result<Table, LoadError> {
    let mut lines = read_lines(path)?.into_iter();
    let Some((header_no, header)) = lines.next() else {
        return Err(LoadError::parse(path, "file has no header row"));
    };
    let columns: Vec<String> = split_fields(&header)
        .map_err(|m| LoadError::parse(path, format!("line {header_no}: {m}")))?
        .into_iter()
        .map(|f| f.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let fields = split_fields(&line)
            .map_err(|m| LoadError::parse(path, format!("line {line_no}: {m}")))?;
        if fields.len() != columns.len() {
            return Err(LoadError::parse(
                path,
                format!(
                    "line {line_no}: {} fields, expected {}",
                    fields.len(),
                    columns.len()
                ),
            ));
        }
        rows.push(fields.iter().map(|f| Value::parse(f)).collect());
    }

    Table::from_rows(columns, rows).map_err(|e| LoadError::parse(path, e.to_string()))
}

/// Load one QI's hierarchy from a headerless CSV: column i = level i.
pub fn load_hierarchy(path: &Path) -> Result<Hierarchy, LoadError> {
    let lines = read_lines(path)?;
    if lines.is_empty() {
        return Err(LoadError::parse(path, "hierarchy file is empty"));
    }

    let mut levels: Vec<Vec<Value>> = Vec::new();
    for (line_no, line) in &lines {
        let fields = split_fields(line)
            .map_err(|m| LoadError::parse(path, format!("line {line_no}: {m}")))?;
        if levels.is_empty() {
            levels = (0..fields.len()).map(|_| Vec::new()).collect();
        }
        if fields.len() != levels.len() {
            return Err(LoadError::parse(
                path,
                format!(
                    "line {line_no}: {} levels, expected {}",
                    fields.len(),
                    levels.len()
                ),
            ));
        }
        for (level, field) in levels.iter_mut().zip(&fields) {
            level.push(Value::parse(field));
        }
    }

    Hierarchy::new(levels).map_err(|e| LoadError::parse(path, e.to_string()))
}

/// Non-blank lines with their 1-based line numbers.
fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect())
}

/// Split one CSV line into fields, honoring double quotes.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                }
                other => current.push(other),
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}
