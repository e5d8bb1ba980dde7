//! Locket protocol types
//!
//! Messages and service stubs for the `latchkey.Locket` gRPC service, matching
//! `proto/latchkey.proto`.

mod latchkey;

pub use latchkey::locket_client::LocketClient as LocketGrpcClient;
pub use latchkey::locket_server::{Locket, LocketServer, SERVICE_NAME};
pub use latchkey::{
    FetchAllRequest, FetchAllResponse, FetchRequest, FetchResponse, LockRequest, LockResponse,
    ReleaseRequest, ReleaseResponse, Resource, TypeCode,
};
