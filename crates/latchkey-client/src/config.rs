//! Client connection settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use tonic::transport::{Certificate, ClientTlsConfig, Endpoint, Identity};

use crate::error::{ClientError, Result};

/// Default timeout for establishing the connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Locket client.
///
/// The service only accepts mutual TLS, so the client always presents
/// `cert_file`/`key_file` and verifies the server against `ca_file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port`, optionally prefixed with `https://`
    pub address: String,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub ca_file: PathBuf,
    /// Name to verify the server certificate against, when it differs from
    /// the host in `address`
    pub domain_name: Option<String>,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        address: impl Into<String>,
        cert_file: impl Into<PathBuf>,
        key_file: impl Into<PathBuf>,
        ca_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            address: address.into(),
            cert_file: cert_file.into(),
            key_file: key_file.into(),
            ca_file: ca_file.into(),
            domain_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Address as an `https://` URI
    pub fn uri(&self) -> String {
        if self.address.starts_with("https://") {
            self.address.clone()
        } else if let Some(rest) = self.address.strip_prefix("http://") {
            format!("https://{}", rest)
        } else {
            format!("https://{}", self.address)
        }
    }

    /// Load the client identity and server CA from disk
    pub async fn tls_config(&self) -> Result<ClientTlsConfig> {
        let cert = read_pem(&self.cert_file).await?;
        let key = read_pem(&self.key_file).await?;
        let ca = read_pem(&self.ca_file).await?;

        let mut tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(ca))
            .identity(Identity::from_pem(cert, key));
        if let Some(domain_name) = &self.domain_name {
            tls = tls.domain_name(domain_name.clone());
        }
        Ok(tls)
    }

    /// Build the endpoint; no connection is attempted
    pub async fn endpoint(&self) -> Result<Endpoint> {
        let uri = self.uri();
        let endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|e| ClientError::InvalidAddress {
                address: self.address.clone(),
                reason: e.to_string(),
            })?;

        Ok(endpoint
            .connect_timeout(self.connect_timeout)
            .tls_config(self.tls_config().await?)?)
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::TlsMaterial {
            path: path.to_path_buf(),
            source,
        })
}
