use std::path::PathBuf;

use thiserror::Error;

// Main application error type

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Transport Error: {0}")]
    Transport(#[from] TransportError),
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Ui Error: {0}")]
    Ui(String),
}

// Guards applied before a request is dispatched. These never reach the
// network; the UI disables the matching affordances as well.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("text prompt must not be empty")]
    EmptyPrompt,
    #[error("no uploaded file to track")]
    MissingFile,
}

// Failure of a single outbound call. Every variant names the operation
// so a probe failure buried in a log line can be attributed.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{operation} rejected before dispatch: {source}")]
    Invalid {
        operation: &'static str,
        #[source]
        source: ValidationError,
    },
    #[error("{operation} request failed: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} failed with HTTP {status}: {message}")]
    Http {
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("{operation} returned an invalid body: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },
    #[error("{operation} could not write {path}: {source}")]
    File {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{operation} could not read {path}: {source}")]
    Read {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn operation(&self) -> &'static str {
        match self {
            TransportError::Invalid { operation, .. }
            | TransportError::Network { operation, .. }
            | TransportError::Http { operation, .. }
            | TransportError::Decode { operation, .. }
            | TransportError::File { operation, .. }
            | TransportError::Read { operation, .. } => operation,
        }
    }

    /// The raw HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_carry_operation_and_status() {
        let err = TransportError::Http {
            operation: "upload",
            status: 500,
            message: "Upload failed: disk full".to_string(),
        };
        assert_eq!(err.operation(), "upload");
        assert_eq!(err.status(), Some(500));
        assert_eq!(
            err.to_string(),
            "upload failed with HTTP 500: Upload failed: disk full"
        );
    }

    #[test]
    fn validation_errors_have_no_status() {
        let err = TransportError::Invalid {
            operation: "submit",
            source: ValidationError::EmptyPrompt,
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("text prompt must not be empty"));
    }
}
