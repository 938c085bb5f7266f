//! Error types for the reconciliation engine.

use crate::validation::Violation;
use acladm_hal::HalError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type AclResult<T> = Result<T, AclError>;

#[derive(Debug, Clone, Error)]
pub enum AclError {
    /// Target path does not exist or the ACL tool rejected it
    #[error("invalid path: {}", .path.display())]
    InvalidPath { path: PathBuf },

    /// The ACL tool returned a non-success outcome
    #[error("{message}")]
    ToolExecutionFailure { message: String },

    /// A mapping failed presence/uniqueness/existence checks
    #[error("{}", join_violations(.0))]
    Validation(Vec<Violation>),

    /// The record targeted for destruction no longer exists
    #[error("mapping {id} no longer exists")]
    RaceNotFound { id: u64 },

    /// ACL text could not be parsed
    #[error("cannot parse ACL entry '{line}': {reason}")]
    Parse { line: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("mapping store error: {0}")]
    Store(String),

    #[error("I/O error on {}: {}", .path.display(), .message)]
    Io { path: PathBuf, message: String },
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl AclError {
    pub fn tool(message: impl Into<String>) -> Self {
        AclError::ToolExecutionFailure {
            message: message.into(),
        }
    }

    pub fn parse(line: &str, reason: impl Into<String>) -> Self {
        AclError::Parse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        AclError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Error class name used in sweep reports, e.g. `ToolExecutionFailure: ...`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AclError::InvalidPath { .. } => "InvalidPath",
            AclError::ToolExecutionFailure { .. } => "ToolExecutionFailure",
            AclError::Validation(_) => "ValidationFailure",
            AclError::RaceNotFound { .. } => "RaceNotFound",
            AclError::Parse { .. } => "ParseError",
            AclError::Config(_) => "ConfigError",
            AclError::Store(_) => "StoreError",
            AclError::Io { .. } => "IoError",
        }
    }
}

impl From<HalError> for AclError {
    fn from(err: HalError) -> Self {
        match err {
            HalError::InvalidPath(path) => AclError::InvalidPath { path: PathBuf::from(path) },
            HalError::Io(io) if io.kind == std::io::ErrorKind::NotFound => match io.path {
                Some(path) => AclError::InvalidPath { path: PathBuf::from(path) },
                None => AclError::tool(io.message),
            },
            other => AclError::tool(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hal_invalid_path_maps_to_invalid_path() {
        let err: AclError = HalError::InvalidPath("/gone".into()).into();
        assert!(matches!(err, AclError::InvalidPath { ref path } if path == &PathBuf::from("/gone")));
    }

    #[test]
    fn hal_process_failure_keeps_diagnostic() {
        let err: AclError = HalError::process_error("nfs4_setfacl", Some(1), "Failed setxattr operation").into();
        assert_eq!(err.kind_name(), "ToolExecutionFailure");
        assert!(err.to_string().contains("Failed setxattr operation"));
    }

    #[test]
    fn validation_message_joins_violations() {
        let err = AclError::Validation(vec![Violation::MissingUser, Violation::MissingApp]);
        assert_eq!(err.to_string(), "User can't be blank. App can't be blank.");
    }
}
