//! Error handling for the acladm HAL
//!
//! Structured error types for the operations that cross the process
//! boundary: spawning ACL tools and reading filesystem metadata.

use std::fmt;
use std::io;
use std::path::Path;
use std::result;

/// Result type for HAL operations
pub type HalResult<T> = result::Result<T, HalError>;

/// Error types for HAL operations
#[derive(Debug, Clone)]
pub enum HalError {
    /// I/O operation failed
    Io(IoError),
    /// External tool ran but reported failure
    Process(ProcessError),
    /// Target path does not exist or was rejected
    InvalidPath(String),
    /// Invalid operation or argument
    Invalid(String),
    /// Operation not supported on this platform
    Unsupported(String),
}

#[derive(Debug, Clone)]
pub struct IoError {
    pub operation: String,
    pub path: Option<String>,
    pub kind: io::ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ProcessError {
    pub program: String,
    pub exit_code: Option<i32>,
    /// Diagnostic text captured from the tool's stderr
    pub message: String,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HalError::Io(err) => match &err.path {
                Some(path) => write!(f, "I/O error in {} ({}): {}", err.operation, path, err.message),
                None => write!(f, "I/O error in {}: {}", err.operation, err.message),
            },
            HalError::Process(err) => match err.exit_code {
                Some(code) => write!(f, "{} exited with status {}: {}", err.program, code, err.message),
                None => write!(f, "{} terminated abnormally: {}", err.program, err.message),
            },
            HalError::InvalidPath(path) => write!(f, "Invalid path: {path}"),
            HalError::Invalid(msg) => write!(f, "Invalid operation: {msg}"),
            HalError::Unsupported(msg) => write!(f, "Unsupported operation: {msg}"),
        }
    }
}

impl std::error::Error for HalError {}

impl From<io::Error> for HalError {
    fn from(err: io::Error) -> Self {
        HalError::Io(IoError {
            operation: "unknown".to_string(),
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}

// Helper functions for creating specific error types
impl HalError {
    pub fn io_error(operation: &str, path: Option<&Path>, err: io::Error) -> Self {
        HalError::Io(IoError {
            operation: operation.to_string(),
            path: path.map(|p| p.display().to_string()),
            kind: err.kind(),
            message: err.to_string(),
        })
    }

    pub fn process_error(program: &str, exit_code: Option<i32>, message: &str) -> Self {
        HalError::Process(ProcessError {
            program: program.to_string(),
            exit_code,
            message: message.trim().to_string(),
        })
    }

    pub fn invalid_path(path: &Path) -> Self {
        HalError::InvalidPath(path.display().to_string())
    }

    pub fn unsupported(message: &str) -> Self {
        HalError::Unsupported(message.to_string())
    }

    pub fn invalid(message: &str) -> Self {
        HalError::Invalid(message.to_string())
    }

    /// True when the error means the path itself is missing.
    pub fn is_missing_path(&self) -> bool {
        match self {
            HalError::InvalidPath(_) => true,
            HalError::Io(err) => err.kind == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
