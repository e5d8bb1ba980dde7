//! Latchkey Common - Shared error types and constants
//!
//! Every other Latchkey crate reports failures through [`LatchkeyError`], which
//! maps one-to-one onto the gRPC status codes returned by the Locket service.

pub mod error;

pub use error::{LatchkeyError, Result};

/// Type string for exclusive locks
pub const LOCK_TYPE: &str = "lock";

/// Type string for presence records
pub const PRESENCE_TYPE: &str = "presence";
