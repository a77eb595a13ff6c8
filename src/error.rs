//! Crate-level error type for the anonymization API
//!
//! `InvalidLevel` is surfaced only by the explicit transformation operations;
//! inside the search driver it is a recoverable signal that a ladder is
//! exhausted and never reaches the caller. Infeasibility is not an error at
//! all: the API returns an empty table instead.

use crate::table::TableError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnonymityError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("column '{0}' is not present in the table")]
    UnknownColumn(String),

    #[error("level {level} exceeds the top of the '{qi}' hierarchy ({top})")]
    InvalidLevel { qi: String, level: usize, top: usize },

    #[error("value '{value}' of '{qi}' has no image at level {level} of its hierarchy")]
    UnknownValue {
        qi: String,
        value: String,
        level: usize,
    },
}

impl From<TableError> for AnonymityError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::UnknownColumn(name) => AnonymityError::UnknownColumn(name),
            // Construction-side errors cannot escape a well-formed table; if
            // one ever does, report it verbatim.
            other => AnonymityError::InvalidParameter(other.to_string()),
        }
    }
}
