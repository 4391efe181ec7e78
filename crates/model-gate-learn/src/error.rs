//! Error types for dataset loading and model fitting

use thiserror::Error;

/// Result type alias for learning operations
pub type LearnResult<T> = std::result::Result<T, LearnError>;

/// Errors raised while loading data, fitting or evaluating a model
#[derive(Error, Debug)]
pub enum LearnError {
    /// File could not be read or written
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV could not be parsed
    #[error("CSV error: {0}")]
    Csv(String),

    /// A required column is absent
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// A feature cell is not numeric
    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// A target cell is not a binary label
    #[error("Invalid target '{value}' at row {row}: expected 0/1 or true/false")]
    InvalidTarget { row: usize, value: String },

    /// No rows or no feature columns
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Split leaves one side empty
    #[error("Cannot split {rows} rows with test fraction {test_size}")]
    SplitTooSmall { rows: usize, test_size: f64 },

    /// Parameters file is malformed or out of range
    #[error("Invalid training parameters: {0}")]
    InvalidParameters(String),

    /// AUC needs both classes in the evaluated labels
    #[error("ROC AUC is undefined: {0}")]
    UndefinedAuc(String),

    /// Predictions and labels do not line up
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Model (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LearnError {
    /// Wrap an IO error with the path it concerns
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        LearnError::Io {
            path: path.as_ref().display().to_string(),
            source: err,
        }
    }

    /// Whether the error means an input file does not exist
    pub fn is_missing_file(&self) -> bool {
        match self {
            LearnError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<csv::Error> for LearnError {
    fn from(err: csv::Error) -> Self {
        LearnError::Csv(err.to_string())
    }
}

impl From<serde_json::Error> for LearnError {
    fn from(err: serde_json::Error) -> Self {
        LearnError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_predicate() {
        let err = LearnError::io(
            "data/insurance.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_missing_file());
        assert!(err.to_string().contains("data/insurance.csv"));

        let err = LearnError::Csv("bad quote".to_string());
        assert!(!err.is_missing_file());
    }
}
