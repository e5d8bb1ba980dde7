//! Latchkey API - Locket wire types and request validation
//!
//! This crate provides:
//! - Protobuf messages and tonic client/server stubs for `latchkey.Locket`
//! - The `LockType` model shared by the store and the handler
//! - Validation of the `type` / `type_code` pair carried by requests

pub mod grpc;
pub mod model;
pub mod validation;

pub use grpc::{Resource, TypeCode};
pub use model::LockType;
pub use validation::*;
