//! TLS policy settings.
//!
//! Settings are read from an optional TOML file and then overridden by
//! `STRATA_TLS_*` environment variables, e.g. `STRATA_TLS_CLIENT_MIN_VERSION=tls1.2`.

use rustls::SupportedProtocolVersion;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SecurityResult;

/// Environment prefix for settings overrides.
pub const ENV_PREFIX: &str = "STRATA_TLS";

/// Minimum server protocol version.
///
/// Pinned to the oldest version rustls speaks so that older clients can
/// still connect. This trades strength for compatibility.
pub const DEFAULT_SERVER_MIN_VERSION: MinProtocolVersion = MinProtocolVersion::Tls12;

/// Minimum client protocol version.
pub const DEFAULT_CLIENT_MIN_VERSION: MinProtocolVersion = MinProtocolVersion::Tls13;

/// Whether servers pick the cipher suite from their own preference order.
pub const DEFAULT_PREFER_SERVER_CIPHERS: bool = true;

/// Lowest TLS protocol version a configuration will negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MinProtocolVersion {
    #[serde(rename = "tls1.2")]
    Tls12,
    #[serde(rename = "tls1.3")]
    Tls13,
}

static TLS12_AND_UP: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13, &rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

impl MinProtocolVersion {
    /// Protocol versions enabled for this floor, newest first.
    pub fn enabled_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            Self::Tls12 => TLS12_AND_UP,
            Self::Tls13 => TLS13_ONLY,
        }
    }
}

impl fmt::Display for MinProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls12 => write!(f, "TLSv1.2"),
            Self::Tls13 => write!(f, "TLSv1.3"),
        }
    }
}

/// TLS policy applied by the configuration builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Directory holding `ca.crt` and the node certificates.
    pub certs_dir: Option<PathBuf>,

    /// Lowest protocol version accepted by servers.
    pub server_min_version: MinProtocolVersion,

    /// Lowest protocol version offered by clients.
    pub client_min_version: MinProtocolVersion,

    /// Prefer the server's cipher suite order over the client's.
    pub prefer_server_ciphers: bool,

    /// Reject clients without a certificate instead of verifying only when one is given.
    pub require_client_cert: bool,
}

impl Default for TlsSettings {
    fn default() -> Self {
        Self {
            certs_dir: None,
            server_min_version: DEFAULT_SERVER_MIN_VERSION,
            client_min_version: DEFAULT_CLIENT_MIN_VERSION,
            prefer_server_ciphers: DEFAULT_PREFER_SERVER_CIPHERS,
            require_client_cert: false,
        }
    }
}

impl TlsSettings {
    /// Load settings from an optional TOML file plus `STRATA_TLS_*` overrides.
    ///
    /// # Errors
    /// Returns [`crate::SecurityError::Settings`] if the file cannot be read
    /// or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> SecurityResult<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`TlsSettings::load`] with a custom environment prefix.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> SecurityResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Loading TLS settings from {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(env_prefix))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
