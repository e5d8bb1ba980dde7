//! Latchkey Client - Rust client for the Locket service
//!
//! `LocketClient` is a thin stub over the `latchkey.Locket` gRPC service that
//! maps business errors back to `LatchkeyError`. `LockRunner` builds on it to
//! hold a lock or presence for as long as the caller keeps it running.

pub mod client;
pub mod config;
pub mod error;
pub mod lock_runner;

pub use client::LocketClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use lock_runner::LockRunner;
