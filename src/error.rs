use thiserror::Error;

/// A list of problems found in the OME attributes of a store root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .problems.join("; "))]
pub struct SchemaError {
    pub problems: Vec<String>,
}

impl SchemaError {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Not a ZIP container, or a required metadata document is missing or malformed.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub fn format(message: impl std::fmt::Display) -> Self {
        Error::Format(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
