//! Error types for the load and filter stages.
//!
//! Parse failures, empty aggregates and join misses never surface here: they
//! are absorbed as missing values further down the pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot open data store {}: {source}", path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot read relation {relation}: {source}")]
    Query {
        relation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("relation {relation} has no column {column:?}")]
    MissingColumn {
        relation: &'static str,
        column: &'static str,
    },

    #[error("relation {relation} has a non-integer {column}: {value}")]
    InvalidKey {
        relation: &'static str,
        column: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("a specific {0} must be selected")]
    SelectionRequired(&'static str),

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
