use std::io;

use thiserror::Error;

/// Reasons a record draft cannot be normalized for persistence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),
    #[error("Invalid numeric value for {field}: `{raw}`")]
    InvalidNumeric { field: String, raw: String },
    #[error("Invalid date for {field}: `{raw}`")]
    InvalidDate { field: String, raw: String },
    #[error("Subcategory `{subcategory}` is not valid for category `{category}`")]
    InvalidSubcategory {
        category: String,
        subcategory: String,
    },
    #[error("Nozzle number {0} is outside the dispenser layout")]
    InvalidNozzleNumber(i64),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Expenditure line not found: {0}")]
    LineNotFound(usize),
    #[error("Nozzle reading not found: {0}")]
    NozzleNotFound(usize),
    #[error("Record not found: {0}")]
    RecordNotFound(i64),
    #[error("No free {0} id left")]
    IdsExhausted(&'static str),
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
