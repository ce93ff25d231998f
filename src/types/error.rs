use thiserror::Error;

use crate::types::value::ColumnType;
use crate::types::{PageNo, RowId};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {details}")]
    Parse { details: String },

    #[error("table '{name}' not found")]
    TableNotFound { name: String },

    #[error("table '{name}' already exists")]
    TableExists { name: String },

    #[error("column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("expected {expected} values, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("cannot convert {literal} to {column_type}")]
    TypeMismatch {
        literal: String,
        column_type: ColumnType,
    },

    #[error("value {literal} is out of range for {column_type}")]
    Overflow {
        literal: String,
        column_type: ColumnType,
    },

    #[error("text value of {length} bytes exceeds the 243-byte limit")]
    TextTooLong { length: usize },

    #[error("column '{column}' cannot be NULL")]
    NullConstraint { column: String },

    #[error("duplicate value for unique column '{column}'")]
    UniqueViolation { column: String },

    #[error("DELETE requires a WHERE clause")]
    WhereRequired,

    #[error("updated record for row id {row_id} grows beyond its current cell")]
    UpdateGrowsCell { row_id: RowId },

    #[error("record payload of {length} bytes does not fit into an empty page")]
    PayloadTooLarge { length: usize },

    #[error("corrupted page {page_no}: {reason}")]
    PageCorruption { page_no: PageNo, reason: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
