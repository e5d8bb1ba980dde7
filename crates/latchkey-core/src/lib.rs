//! Latchkey Core - Locket request handling
//!
//! This crate provides:
//! - `LockHandler`, the validation and delegation layer behind the gRPC service
//! - `MetricsNotifier`, which publishes active lock and presence gauges

pub mod service;

pub use service::lock_handler::LockHandler;
pub use service::metrics_notifier::{ActiveCounts, MetricsNotifier};
