pub mod grpc;
pub mod logging;
pub mod shutdown;

pub use grpc::{GrpcServerHandle, locket_service, serve_locket, start_grpc_server};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::{ShutdownSignal, TerminationReason, wait_for_termination};
