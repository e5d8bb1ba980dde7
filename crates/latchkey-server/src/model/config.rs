//! Configuration management for the Latchkey server
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file
//! (`conf/latchkey.yml` or `--config`), `LATCHKEY_`-prefixed environment
//! variables, then command line overrides.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use config::{Config, Environment};
use tracing::Level;

use crate::startup::{LogRotation, LoggingConfig};

use super::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_LISTEN_ADDRESS, DEFAULT_LOGGING_DIR, DEFAULT_LOGGING_LEVEL,
    DEFAULT_LOGGING_ROTATION, DEFAULT_METRICS_INTERVAL_SECONDS, DEFAULT_RETRY_INTERVAL_SECONDS,
    ENV_PREFIX, EXPIRATION_RETRY_INTERVAL_SECONDS, LOGGING_CONSOLE, LOGGING_DIR, LOGGING_FILE,
    LOGGING_LEVEL, LOGGING_ROTATION, METRICS_INTERVAL_SECONDS, METRICS_LISTEN_ADDRESS,
    SERVER_LISTEN_ADDRESS, TLS_CA_FILE, TLS_CERT_FILE, TLS_KEY_FILE,
};
use super::tls::ServerTlsSettings;

/// Command line arguments for the server
#[derive(Debug, Default, Parser)]
#[command(name = "latchkey-server", version, about = "Distributed lock and presence service")]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long = "config", env = "LATCHKEY_CONFIG")]
    pub config: Option<PathBuf>,
    /// Address the Locket service binds to
    #[arg(short = 'l', long = "listen-address")]
    pub listen_address: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    /// Load from the process arguments and environment
    pub fn new() -> anyhow::Result<Self> {
        Self::load(&Cli::parse())
    }

    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let file_source = match &cli.config {
            Some(path) => config::File::from(path.as_path()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut config_builder = Config::builder()
            .set_default(SERVER_LISTEN_ADDRESS, DEFAULT_LISTEN_ADDRESS)?
            .set_default(METRICS_INTERVAL_SECONDS, DEFAULT_METRICS_INTERVAL_SECONDS)?
            .set_default(
                EXPIRATION_RETRY_INTERVAL_SECONDS,
                DEFAULT_RETRY_INTERVAL_SECONDS,
            )?
            .set_default(LOGGING_LEVEL, DEFAULT_LOGGING_LEVEL)?
            .set_default(LOGGING_CONSOLE, true)?
            .set_default(LOGGING_FILE, false)?
            .set_default(LOGGING_DIR, DEFAULT_LOGGING_DIR)?
            .set_default(LOGGING_ROTATION, DEFAULT_LOGGING_ROTATION)?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = &cli.listen_address {
            config_builder = config_builder.set_override(SERVER_LISTEN_ADDRESS, v.as_str())?;
        }

        let config = config_builder
            .build()
            .context("failed to load configuration")?;

        Ok(Self { config })
    }

    pub fn listen_address(&self) -> anyhow::Result<SocketAddr> {
        let address = self
            .config
            .get_string(SERVER_LISTEN_ADDRESS)
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDRESS.to_string());
        address
            .parse()
            .with_context(|| format!("invalid {}: {}", SERVER_LISTEN_ADDRESS, address))
    }

    pub fn tls_settings(&self) -> ServerTlsSettings {
        ServerTlsSettings {
            cert_path: self.optional_path(TLS_CERT_FILE),
            key_path: self.optional_path(TLS_KEY_FILE),
            ca_cert_path: self.optional_path(TLS_CA_FILE),
        }
    }

    /// Period of the active lock/presence gauges
    pub fn metrics_interval(&self) -> Duration {
        self.positive_seconds(METRICS_INTERVAL_SECONDS, DEFAULT_METRICS_INTERVAL_SECONDS)
    }

    /// Prometheus exporter address; the exporter is off when unset
    pub fn metrics_listen_address(&self) -> anyhow::Result<Option<SocketAddr>> {
        match self.config.get_string(METRICS_LISTEN_ADDRESS) {
            Ok(address) if !address.is_empty() => address
                .parse()
                .map(Some)
                .with_context(|| format!("invalid {}: {}", METRICS_LISTEN_ADDRESS, address)),
            _ => Ok(None),
        }
    }

    /// Burglar sweep cadence
    pub fn retry_interval(&self) -> Duration {
        self.positive_seconds(
            EXPIRATION_RETRY_INTERVAL_SECONDS,
            DEFAULT_RETRY_INTERVAL_SECONDS,
        )
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let level = self
            .config
            .get_string(LOGGING_LEVEL)
            .ok()
            .and_then(|v| v.parse::<Level>().ok())
            .unwrap_or(Level::INFO);
        let rotation = self
            .config
            .get_string(LOGGING_ROTATION)
            .ok()
            .and_then(|v| v.parse::<LogRotation>().ok())
            .unwrap_or(LogRotation::Daily);

        LoggingConfig {
            log_dir: PathBuf::from(
                self.config
                    .get_string(LOGGING_DIR)
                    .unwrap_or_else(|_| DEFAULT_LOGGING_DIR.to_string()),
            ),
            console_output: self.config.get_bool(LOGGING_CONSOLE).unwrap_or(true),
            file_logging: self.config.get_bool(LOGGING_FILE).unwrap_or(false),
            level,
            rotation,
        }
    }

    fn optional_path(&self, key: &str) -> Option<PathBuf> {
        self.config
            .get_string(key)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn positive_seconds(&self, key: &str, default: u64) -> Duration {
        let seconds = match self.config.get_int(key) {
            Ok(v) if v > 0 => v as u64,
            _ => default,
        };
        Duration::from_secs(seconds)
    }
}
