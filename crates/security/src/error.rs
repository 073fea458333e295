//! Error types for TLS trust configuration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building TLS configuration.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// A certificate, key or CA file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The certificate and private key do not form a usable pair.
    #[error("certificate and key do not match: {reason}")]
    KeyPairMismatch { reason: String },

    /// No CA certificate could be parsed into the trust pool.
    #[error("failed to parse CA certificates: {reason}")]
    CaParse { reason: String },

    /// rustls rejected the assembled configuration.
    #[error("TLS configuration error: {reason}")]
    TlsConfig { reason: String },

    /// TLS settings could not be loaded.
    #[error("invalid TLS settings: {0}")]
    Settings(String),
}

impl SecurityError {
    pub(crate) fn key_pair(reason: impl Into<String>) -> Self {
        Self::KeyPairMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn ca_parse(reason: impl Into<String>) -> Self {
        Self::CaParse {
            reason: reason.into(),
        }
    }

    pub(crate) fn tls_config(reason: impl Into<String>) -> Self {
        Self::TlsConfig {
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for SecurityError {
    fn from(err: config::ConfigError) -> Self {
        Self::Settings(err.to_string())
    }
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
