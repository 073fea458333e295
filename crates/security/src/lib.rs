//! TLS trust configuration for Strata nodes.
//!
//! This crate turns certificate material into ready-to-use rustls
//! configurations for the node's listeners and dialers, and summarizes
//! peer certificates for request logging.
//!
//! # Features
//! - Certificate bundle loading from a conventional directory layout
//!   (`ca.crt`, `node.server.{crt,key}`, `node.client.{crt,key}`)
//! - Trust pool construction from concatenated PEM CA certificates
//! - Server configs that verify client certificates when presented
//! - Client configs with full server verification
//! - Explicit insecure fallbacks for plaintext and test deployments
//! - Peer certificate summaries for trace logging
//!
//! # Example
//! ```no_run
//! use strata_security::{CertificateLoader, TlsSettings};
//!
//! # fn main() -> Result<(), strata_security::SecurityError> {
//! let settings = TlsSettings::default();
//! let loader = CertificateLoader::new();
//!
//! let server = loader.server_config_from_dir("/etc/strata/certs", &settings)?;
//! let client = loader.client_config_from_dir("/etc/strata/certs", &settings)?;
//!
//! // Hand server.rustls() to the acceptor and client.rustls() to the connector.
//! # let _ = (server, client);
//! # Ok(())
//! # }
//! ```

mod audit;
mod error;
mod loader;
mod pool;
mod settings;
mod tls_config;

pub use audit::{log_request_certificates, CertificateDescriptor, HandshakeState, PeerCertificateSummary};
pub use error::{SecurityError, SecurityResult};
pub use loader::{
    CertificateBundle, CertificateLoader, FsReader, ReadFile, CA_CERT_FILE, CLIENT_CERT_FILE, CLIENT_KEY_FILE,
    EMBEDDED_CERTS_PREFIX, SERVER_CERT_FILE, SERVER_KEY_FILE,
};
pub use pool::TrustPool;
pub use settings::{
    MinProtocolVersion, TlsSettings, DEFAULT_CLIENT_MIN_VERSION, DEFAULT_PREFER_SERVER_CIPHERS,
    DEFAULT_SERVER_MIN_VERSION, ENV_PREFIX,
};
pub use tls_config::{
    build_client_config, build_server_config, insecure_client_config, insecure_server_config, ClientAuth,
    ClientTlsConfig, ServerTls, ServerTlsConfig, ServerVerification,
};
