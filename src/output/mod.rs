//! Result writing and the run report
//!
//! The anonymized table goes out as CSV (quoting fields that need it, so
//! interval labels survive a round trip through the loader). The run report
//! summarizes what the search did: row counts, suppression, and the final
//! generalization level per QI, rendered as text for the terminal or as JSON
//! via serde.

use crate::engine::Anonymization;
use crate::table::Table;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Write a table as CSV with a header row.
pub fn write_csv(table: &Table, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render_csv(table)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn render_csv(table: &Table) -> String {
    let mut out = String::new();
    let header: Vec<String> = table.columns().iter().map(|c| quote_field(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    let columns: Vec<&[crate::table::Value]> = table
        .columns()
        .iter()
        .map(|c| table.column(c).unwrap_or(&[]))
        .collect();
    for r in 0..table.n_rows() {
        let row: Vec<String> = columns
            .iter()
            .map(|col| quote_field(&col[r].to_string()))
            .collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Summary of one anonymization run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub model: String,
    pub rows_input: usize,
    pub rows_output: usize,
    pub suppressed_records: usize,
    pub suppression_pct: f64,
    pub satisfied: bool,
    pub gen_level: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new(model: &str, rows_input: usize, result: &Anonymization) -> Self {
        let suppression_pct = if rows_input == 0 {
            0.0
        } else {
            result.suppressed as f64 * 100.0 / rows_input as f64
        };
        RunReport {
            model: model.to_string(),
            rows_input,
            rows_output: result.table.n_rows(),
            suppressed_records: result.suppressed,
            suppression_pct,
            satisfied: !result.table.is_empty(),
            gen_level: result.gen_level.clone(),
        }
    }

    /// Plain text block for terminal display.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "model: {}", self.model);
        let _ = writeln!(
            out,
            "rows: {} -> {} ({} suppressed, {:.1}%)",
            self.rows_input, self.rows_output, self.suppressed_records, self.suppression_pct
        );
        let levels: Vec<String> = self
            .gen_level
            .iter()
            .map(|(qi, level)| format!("{qi}={level}"))
            .collect();
        let _ = writeln!(
            out,
            "generalization: {}",
            if levels.is_empty() {
                "none".to_string()
            } else {
                levels.join(" ")
            }
        );
        let _ = writeln!(out, "satisfied: {}", self.satisfied);
        out
    }

    /// Pretty JSON for `--report`.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
