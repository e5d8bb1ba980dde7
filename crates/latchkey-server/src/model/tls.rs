//! TLS material for the Locket listener
//!
//! The service only speaks mutual TLS: a server identity plus the CA that
//! client certificates must chain to.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerTlsSettings {
    /// Server certificate (PEM)
    pub cert_path: Option<PathBuf>,
    /// Server private key (PEM)
    pub key_path: Option<PathBuf>,
    /// CA bundle used to verify client certificates (PEM)
    pub ca_cert_path: Option<PathBuf>,
}

impl ServerTlsSettings {
    pub fn new(
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
        ca_cert_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cert_path: Some(cert_path.into()),
            key_path: Some(key_path.into()),
            ca_cert_path: Some(ca_cert_path.into()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some() && self.ca_cert_path.is_some()
    }

    pub async fn load_cert(&self) -> anyhow::Result<Vec<u8>> {
        load_pem(self.cert_path.as_deref(), "certificate").await
    }

    pub async fn load_key(&self) -> anyhow::Result<Vec<u8>> {
        load_pem(self.key_path.as_deref(), "private key").await
    }

    pub async fn load_ca_cert(&self) -> anyhow::Result<Vec<u8>> {
        load_pem(self.ca_cert_path.as_deref(), "CA certificate").await
    }

    /// Create the tonic config; client certificates are always required
    pub async fn create_server_tls_config(&self) -> anyhow::Result<ServerTlsConfig> {
        let cert = self.load_cert().await?;
        let key = self.load_key().await?;
        let ca_cert = self.load_ca_cert().await?;

        Ok(ServerTlsConfig::new()
            .identity(Identity::from_pem(cert, key))
            .client_ca_root(Certificate::from_pem(ca_cert)))
    }
}

async fn load_pem(path: Option<&Path>, what: &str) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {} {}", what, path.display())),
        None => anyhow::bail!("{} path not configured", what),
    }
}

/// Result of TLS configuration validation
#[derive(Debug)]
pub struct TlsValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl TlsValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: &str) {
        self.valid = false;
        self.errors.push(error.to_string());
    }

    pub fn add_warning(&mut self, warning: &str) {
        self.warnings.push(warning.to_string());
    }
}

impl Default for TlsValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that every piece of TLS material is configured and present
pub fn validate_tls_config(settings: &ServerTlsSettings) -> TlsValidationResult {
    let mut result = TlsValidationResult::new();

    let entries = [
        ("tls.cert_file", &settings.cert_path),
        ("tls.key_file", &settings.key_path),
        ("tls.ca_file", &settings.ca_cert_path),
    ];

    for (key, path) in entries {
        match path {
            None => result.add_error(&format!("{} is required", key)),
            Some(path) if !path.exists() => {
                result.add_error(&format!("{} not found: {}", key, path.display()))
            }
            Some(path) if path.is_dir() => {
                result.add_error(&format!("{} is a directory: {}", key, path.display()))
            }
            Some(_) => {}
        }
    }

    if settings.cert_path.is_some() && settings.cert_path == settings.ca_cert_path {
        result.add_warning("tls.cert_file and tls.ca_file point to the same file");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_are_errors() {
        let result = validate_tls_config(&ServerTlsSettings::default());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].contains("tls.cert_file"));
        assert!(result.errors[1].contains("tls.key_file"));
        assert!(result.errors[2].contains("tls.ca_file"));
    }

    #[test]
    fn test_missing_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("server.crt"), "cert").unwrap();

        let settings = ServerTlsSettings::new(
            dir.path().join("server.crt"),
            dir.path().join("server.key"),
            dir.path().join("ca.crt"),
        );
        let result = validate_tls_config(&settings);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("tls.key_file not found"));
    }

    #[test]
    fn test_complete_settings() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["server.crt", "server.key", "ca.crt"] {
            std::fs::write(dir.path().join(name), "pem").unwrap();
        }

        let settings = ServerTlsSettings::new(
            dir.path().join("server.crt"),
            dir.path().join("server.key"),
            dir.path().join("ca.crt"),
        );
        assert!(settings.is_configured());
        let result = validate_tls_config(&settings);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_shared_cert_and_ca_warns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bundle.pem"), "pem").unwrap();
        std::fs::write(dir.path().join("server.key"), "pem").unwrap();

        let settings = ServerTlsSettings::new(
            dir.path().join("bundle.pem"),
            dir.path().join("server.key"),
            dir.path().join("bundle.pem"),
        );
        let result = validate_tls_config(&settings);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_create_config_reports_unreadable_material() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServerTlsSettings::new(
            dir.path().join("server.crt"),
            dir.path().join("server.key"),
            dir.path().join("ca.crt"),
        );
        let err = settings.create_server_tls_config().await.unwrap_err();
        assert!(err.to_string().contains("failed to read certificate"));
    }

    #[tokio::test]
    async fn test_unconfigured_path() {
        let settings = ServerTlsSettings::default();
        let err = settings.load_key().await.unwrap_err();
        assert_eq!(err.to_string(), "private key path not configured");
    }
}
