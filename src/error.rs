use thiserror::Error;

use crate::nesting::NestingError;

#[derive(Error, Debug)]
pub enum MetaError {
    /// Malformed attribute value in an input tuple.
    #[error("parse error: {0}")]
    Parse(String),

    /// Flat tuple list could not be nested.
    #[error("nesting error: {0}")]
    Nesting(#[from] NestingError),

    /// Malformed XML test case.
    #[error("XML error: {0}")]
    Xml(String),

    /// Malformed JSON input or failure writing JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input file with an extension the tools do not handle.
    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    /// Invalid configuration or command options.
    #[error("config error: {0}")]
    Config(String),

    /// Propagated I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        MetaError::Xml(err.to_string())
    }
}
