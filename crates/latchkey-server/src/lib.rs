//! Latchkey server
//!
//! Hosts the `latchkey.Locket` gRPC service over mutual TLS, together with
//! the background tasks that expire leases and publish lock counts.

pub mod metrics;
pub mod model;
pub mod service;
pub mod startup;
