pub mod config;
pub mod constants;
pub mod tls;

pub use config::{Cli, Configuration};
pub use tls::{ServerTlsSettings, TlsValidationResult, validate_tls_config};
