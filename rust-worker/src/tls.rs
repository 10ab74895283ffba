//! Outbound TLS trust setup.
//!
//! System roots come from the platform store; an optional PEM bundle adds
//! private CAs on top. The resulting client is built once and shared.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::{Certificate, Client};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum TrustError {
    #[error("error reading file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid PEM certificate: {path}")]
    InvalidPem { path: PathBuf },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Immutable trust policy for outbound webhook calls.
#[derive(Clone, Default)]
pub struct TrustConfiguration {
    extra_roots: Vec<Certificate>,
}

impl TrustConfiguration {
    /// Load the trust policy, appending every certificate in `ca_file`.
    pub fn load(ca_file: Option<&Path>) -> Result<Self, TrustError> {
        let Some(path) = ca_file else {
            return Ok(Self::default());
        };

        let pem = fs::read(path).map_err(|source| TrustError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extra_roots = Self::parse_bundle(&pem).ok_or_else(|| TrustError::InvalidPem {
            path: path.to_path_buf(),
        })?;

        info!(
            ca_file = %path.display(),
            certificates = extra_roots.len(),
            "tls_ca_bundle_loaded"
        );

        Ok(Self { extra_roots })
    }

    /// A bundle with no parsable certificate is rejected.
    fn parse_bundle(pem: &[u8]) -> Option<Vec<Certificate>> {
        Certificate::from_pem_bundle(pem)
            .ok()
            .filter(|certs| !certs.is_empty())
    }

    /// Number of certificates added on top of the system roots.
    pub fn extra_root_count(&self) -> usize {
        self.extra_roots.len()
    }

    /// Build the shared HTTP client honoring this trust policy.
    pub fn build_client(&self) -> Result<Client, TrustError> {
        let builder = self
            .extra_roots
            .iter()
            .cloned()
            .fold(Client::builder(), |builder, cert| {
                builder.add_root_certificate(cert)
            });

        Ok(builder.build()?)
    }
}
