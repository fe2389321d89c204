//! Error types for geoweights

use std::path::PathBuf;
use thiserror::Error;

/// Broad failure classes. Validation errors fail fast before any row is
/// accumulated; structural and degenerate-data errors surface after
/// accumulation; format errors abort a read immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputValidation,
    DegenerateData,
    Structural,
    Format,
    Resource,
    Usage,
}

/// Main error type for geoweights operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("attribute `{field}` of feature {id} is not numeric")]
    WrongAttributeType { field: String, id: i32 },

    #[error("feature {id} has no value for attribute `{field}`")]
    MissingAttribute { field: String, id: i32 },

    #[error("feature {id} has no timestamp")]
    MissingTimestamp { id: i32 },

    #[error("attribute variance is zero or undefined")]
    FeatureVarianceZero,

    #[error("General G requires non-negative values; feature {id} has {value}")]
    NegativeValue { id: i32, value: f64 },

    #[error("statistic variance is not positive ({0})")]
    DegenerateVariance(f64),

    #[error("all {0} features have zero neighbors")]
    AllFeaturesIsolated(usize),

    #[error("duplicate feature id {0}")]
    DuplicateId(i32),

    #[error("feature {id} lists neighbor {neighbor} more than once")]
    DuplicateNeighbor { id: i32, neighbor: i32 },

    #[error("feature id {0} is not part of this run")]
    UnknownFeature(i32),

    #[error("invalid weights file: {0}")]
    Format(String),

    #[error("feature {id}: non-uniform weights cannot be stored in a fixed-weight matrix")]
    EncodingMismatch { id: i32 },

    #[error("weight matrix declares {expected} rows, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("statistic has already been finalized")]
    UseAfterFinalize,

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidParameter { .. }
            | Error::WrongAttributeType { .. }
            | Error::MissingAttribute { .. }
            | Error::MissingTimestamp { .. } => ErrorKind::InputValidation,
            Error::FeatureVarianceZero
            | Error::NegativeValue { .. }
            | Error::DegenerateVariance(_) => ErrorKind::DegenerateData,
            Error::AllFeaturesIsolated(_)
            | Error::DuplicateId(_)
            | Error::DuplicateNeighbor { .. }
            | Error::UnknownFeature(_) => ErrorKind::Structural,
            Error::Format(_) | Error::EncodingMismatch { .. } | Error::RowCountMismatch { .. } => {
                ErrorKind::Format
            }
            Error::Io(_) | Error::Create { .. } => ErrorKind::Resource,
            Error::UseAfterFinalize | Error::Cancelled => ErrorKind::Usage,
        }
    }
}

/// Build an `InvalidParameter` error.
pub fn invalid_parameter(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Result type alias for geoweights operations
pub type Result<T> = std::result::Result<T, Error>;
