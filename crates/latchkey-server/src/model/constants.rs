// Configuration keys and defaults

pub const DEFAULT_CONFIG_FILE: &str = "conf/latchkey.yml";
pub const ENV_PREFIX: &str = "LATCHKEY";

pub const SERVER_LISTEN_ADDRESS: &str = "server.listen_address";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8891";

pub const TLS_CERT_FILE: &str = "tls.cert_file";
pub const TLS_KEY_FILE: &str = "tls.key_file";
pub const TLS_CA_FILE: &str = "tls.ca_file";

pub const METRICS_INTERVAL_SECONDS: &str = "metrics.interval_seconds";
pub const DEFAULT_METRICS_INTERVAL_SECONDS: u64 = 10;
pub const METRICS_LISTEN_ADDRESS: &str = "metrics.listen_address";

pub const EXPIRATION_RETRY_INTERVAL_SECONDS: &str = "expiration.retry_interval_seconds";
pub const DEFAULT_RETRY_INTERVAL_SECONDS: u64 = 5;

pub const LOGGING_LEVEL: &str = "logging.level";
pub const LOGGING_CONSOLE: &str = "logging.console";
pub const LOGGING_FILE: &str = "logging.file";
pub const LOGGING_DIR: &str = "logging.dir";
pub const LOGGING_ROTATION: &str = "logging.rotation";
pub const DEFAULT_LOGGING_LEVEL: &str = "info";
pub const DEFAULT_LOGGING_DIR: &str = "logs";
pub const DEFAULT_LOGGING_ROTATION: &str = "daily";

pub const LOG_FILE_NAME: &str = "latchkey.log";
