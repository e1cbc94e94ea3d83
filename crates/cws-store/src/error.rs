use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("zip file is invalid: detected content type '{detected}'")]
    InvalidFileType { detected: String },
    #[error("publish target '{0}' is invalid (allowed: default, trustedTesters)")]
    InvalidPublishTarget(String),
    #[error("invalid store endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("{operation} failed with status {status}: {body}")]
    Http {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} request could not be sent")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("failed to decode {operation} response")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error while {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}
