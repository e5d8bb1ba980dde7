//! Error types for Latchkey
//!
//! `LatchkeyError` is the single error vocabulary shared by the store, the
//! request handler and the client. Business errors travel over the wire as
//! gRPC statuses whose message is the stable error slug (`lock-collision`,
//! `resource-not-found`, ...), so a client can reconstruct the same variant.

use tonic::{Code, Status};

/// Result alias used across Latchkey crates
pub type Result<T> = std::result::Result<T, LatchkeyError>;

// gRPC status message slugs
pub const INVALID_TTL: &str = "invalid-ttl";
pub const INVALID_OWNER: &str = "invalid-owner";
pub const INVALID_TYPE: &str = "invalid-type";
pub const LOCK_COLLISION: &str = "lock-collision";
pub const RESOURCE_NOT_FOUND: &str = "resource-not-found";
pub const UNRECOVERABLE: &str = "unrecoverable";
pub const INTERNAL: &str = "internal";

/// Application-specific error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LatchkeyError {
    #[error("{}", INVALID_TTL)]
    InvalidTtl,

    #[error("{}", INVALID_OWNER)]
    InvalidOwner,

    #[error("{}", INVALID_TYPE)]
    InvalidType,

    #[error("{}", LOCK_COLLISION)]
    LockCollision,

    #[error("{}", RESOURCE_NOT_FOUND)]
    ResourceNotFound,

    /// The backing store can no longer serve requests; the process must exit.
    #[error("unrecoverable store error: {0}")]
    Unrecoverable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LatchkeyError {
    /// Stable slug carried in the gRPC status message
    pub fn slug(&self) -> &'static str {
        match self {
            LatchkeyError::InvalidTtl => INVALID_TTL,
            LatchkeyError::InvalidOwner => INVALID_OWNER,
            LatchkeyError::InvalidType => INVALID_TYPE,
            LatchkeyError::LockCollision => LOCK_COLLISION,
            LatchkeyError::ResourceNotFound => RESOURCE_NOT_FOUND,
            LatchkeyError::Unrecoverable(_) => UNRECOVERABLE,
            LatchkeyError::Internal(_) => INTERNAL,
        }
    }

    /// gRPC code this error is reported with
    pub fn code(&self) -> Code {
        match self {
            LatchkeyError::InvalidTtl | LatchkeyError::InvalidOwner | LatchkeyError::InvalidType => {
                Code::InvalidArgument
            }
            LatchkeyError::LockCollision => Code::AlreadyExists,
            LatchkeyError::ResourceNotFound => Code::NotFound,
            LatchkeyError::Unrecoverable(_) => Code::Unavailable,
            LatchkeyError::Internal(_) => Code::Internal,
        }
    }

    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, LatchkeyError::Unrecoverable(_))
    }

    /// Rebuild a business error from a status produced by [`From<LatchkeyError>`].
    ///
    /// Returns `None` for statuses that did not originate from a Latchkey error
    /// (transport failures, deadlines, unknown slugs).
    pub fn from_status(status: &Status) -> Option<Self> {
        let err = match (status.code(), status.message()) {
            (Code::InvalidArgument, INVALID_TTL) => LatchkeyError::InvalidTtl,
            (Code::InvalidArgument, INVALID_OWNER) => LatchkeyError::InvalidOwner,
            (Code::InvalidArgument, INVALID_TYPE) => LatchkeyError::InvalidType,
            (Code::AlreadyExists, LOCK_COLLISION) => LatchkeyError::LockCollision,
            (Code::NotFound, RESOURCE_NOT_FOUND) => LatchkeyError::ResourceNotFound,
            _ => return None,
        };
        Some(err)
    }
}

impl From<LatchkeyError> for Status {
    fn from(err: LatchkeyError) -> Self {
        match &err {
            LatchkeyError::Unrecoverable(msg) | LatchkeyError::Internal(msg) => {
                Status::new(err.code(), format!("{}: {}", err.slug(), msg))
            }
            _ => Status::new(err.code(), err.slug()),
        }
    }
}
