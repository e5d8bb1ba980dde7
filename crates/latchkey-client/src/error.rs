//! Client error types

use std::path::PathBuf;

use latchkey_common::LatchkeyError;

/// Error type for Locket client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Business error returned by the server
    #[error("locket error: {0}")]
    Locket(#[from] LatchkeyError),

    /// Any other gRPC status
    #[error("gRPC error: {0}")]
    Grpc(tonic::Status),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to read TLS material {}: {source}", path.display())]
    TlsMaterial {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lost lock '{key}': {source}")]
    LockLost {
        key: String,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// The business error behind this failure, if any
    pub fn locket_error(&self) -> Option<&LatchkeyError> {
        match self {
            ClientError::Locket(err) => Some(err),
            ClientError::LockLost { source, .. } => source.locket_error(),
            _ => None,
        }
    }
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        match LatchkeyError::from_status(&status) {
            Some(err) => ClientError::Locket(err),
            None => ClientError::Grpc(status),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
