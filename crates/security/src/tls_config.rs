//! TLS configuration builders for server and client endpoints.
//!
//! Server configurations accept both mutual-TLS and plain clients: a client
//! certificate is verified against the cluster CA when presented, but not
//! demanded. Client configurations always verify the server fully.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::sign::CertifiedKey;
use rustls::{ClientConfig, DigitallySignedStruct, InconsistentKeys, ServerConfig, SignatureScheme};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SecurityError, SecurityResult};
use crate::pool::TrustPool;
use crate::settings::{MinProtocolVersion, TlsSettings};

/// How a server treats client certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuth {
    /// Verify a client certificate if one is presented, accept clients without one.
    VerifyIfGiven,
    /// Reject clients that do not present a valid certificate.
    RequireAndVerify,
}

/// How a client treats the server's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerVerification {
    /// Chain and hostname are verified against the trust pool.
    Full,
    /// Nothing is verified. Development and test transports only.
    Disabled,
}

/// Server-side TLS configuration plus the policy it was built with.
#[derive(Debug, Clone)]
pub struct ServerTlsConfig {
    config: Arc<ServerConfig>,
    cert_chain: Arc<[CertificateDer<'static>]>,
    trust_pool: TrustPool,
    min_version: MinProtocolVersion,
    client_auth: ClientAuth,
    prefer_server_ciphers: bool,
}

impl ServerTlsConfig {
    /// The rustls configuration to hand to an acceptor.
    pub fn rustls(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.config)
    }

    /// Certificate chain presented to clients, leaf first.
    pub fn cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.cert_chain
    }

    /// The server's own certificate.
    pub fn leaf_certificate(&self) -> &CertificateDer<'static> {
        // Identity parsing rejects empty chains.
        &self.cert_chain[0]
    }

    /// Pool used to verify client certificates.
    pub fn trust_pool(&self) -> &TrustPool {
        &self.trust_pool
    }

    pub fn min_version(&self) -> MinProtocolVersion {
        self.min_version
    }

    pub fn client_auth(&self) -> ClientAuth {
        self.client_auth
    }

    pub fn prefers_server_ciphers(&self) -> bool {
        self.prefer_server_ciphers
    }
}

/// Server-side TLS mode.
///
/// `Disabled` is a deliberate choice to serve plaintext, never the result of
/// a configuration failure.
#[derive(Debug, Clone)]
pub enum ServerTls {
    Secure(ServerTlsConfig),
    Disabled,
}

impl ServerTls {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Secure(_))
    }

    /// The secure configuration, if TLS is enabled.
    pub fn config(&self) -> Option<&ServerTlsConfig> {
        match self {
            Self::Secure(config) => Some(config),
            Self::Disabled => None,
        }
    }
}

impl From<ServerTlsConfig> for ServerTls {
    fn from(config: ServerTlsConfig) -> Self {
        Self::Secure(config)
    }
}

/// Client-side TLS configuration plus the policy it was built with.
#[derive(Debug, Clone)]
pub struct ClientTlsConfig {
    config: Arc<ClientConfig>,
    cert_chain: Option<Arc<[CertificateDer<'static>]>>,
    trust_pool: Option<TrustPool>,
    min_version: MinProtocolVersion,
    verification: ServerVerification,
}

impl ClientTlsConfig {
    /// The rustls configuration to hand to a connector.
    pub fn rustls(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.config)
    }

    /// Client certificate chain offered for mutual TLS, if any.
    pub fn cert_chain(&self) -> Option<&[CertificateDer<'static>]> {
        self.cert_chain.as_deref()
    }

    pub fn leaf_certificate(&self) -> Option<&CertificateDer<'static>> {
        self.cert_chain().and_then(|chain| chain.first())
    }

    /// Pool used to verify the server, absent when verification is disabled.
    pub fn trust_pool(&self) -> Option<&TrustPool> {
        self.trust_pool.as_ref()
    }

    pub fn min_version(&self) -> MinProtocolVersion {
        self.min_version
    }

    pub fn verification(&self) -> ServerVerification {
        self.verification
    }
}

/// A certificate chain paired with the private key it belongs to.
struct Identity {
    cert_chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Identity {
    /// Parse and pair a PEM certificate chain with its PEM private key.
    ///
    /// Fails if either side carries no usable PEM material or the leaf
    /// certificate's public key does not belong to the private key.
    fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> SecurityResult<Self> {
        let cert_chain = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SecurityError::key_pair(format!("failed to parse certificate PEM: {}", e)))?;

        if cert_chain.is_empty() {
            return Err(SecurityError::key_pair("no certificate found in certificate PEM"));
        }

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| SecurityError::key_pair(format!("failed to parse private key PEM: {}", e)))?
            .ok_or_else(|| SecurityError::key_pair("no private key found in key PEM"))?;

        let signing_key = crypto_provider()
            .key_provider
            .load_private_key(key.clone_key())
            .map_err(|e| SecurityError::key_pair(format!("unusable private key: {}", e)))?;

        match CertifiedKey::new(cert_chain.clone(), signing_key).keys_match() {
            Ok(()) => {}
            Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {
                debug!("Private key does not expose its public key, skipping match check");
            }
            Err(e) => return Err(SecurityError::key_pair(e.to_string())),
        }

        debug!("Paired certificate chain of length {} with private key", cert_chain.len());
        Ok(Self { cert_chain, key })
    }
}

/// The ring provider backs every configuration built here, whatever the
/// process-wide default is.
fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn into_build_error(e: rustls::Error) -> SecurityError {
    match e {
        rustls::Error::InconsistentKeys(_) => SecurityError::key_pair(e.to_string()),
        other => SecurityError::tls_config(other.to_string()),
    }
}

/// Build a server configuration from PEM buffers.
///
/// The result:
/// - presents `cert_pem` with `key_pem` as the server identity
/// - verifies client certificates against `ca_pem` when given, without requiring them
/// - picks cipher suites in server preference order
/// - accepts TLS 1.2 and newer by default
///
/// # Errors
/// Returns [`SecurityError::KeyPairMismatch`] if the certificate and key do
/// not pair up, or [`SecurityError::CaParse`] if `ca_pem` holds no usable
/// certificate.
pub fn build_server_config(
    cert_pem: &[u8],
    key_pem: &[u8],
    ca_pem: &[u8],
    settings: &TlsSettings,
) -> SecurityResult<ServerTlsConfig> {
    info!("Building server TLS configuration");

    let identity = Identity::from_pem(cert_pem, key_pem)?;
    let trust_pool = TrustPool::from_pem(ca_pem)?;

    let client_auth = if settings.require_client_cert {
        ClientAuth::RequireAndVerify
    } else {
        ClientAuth::VerifyIfGiven
    };

    let provider = crypto_provider();

    let verifier_builder = WebPkiClientVerifier::builder_with_provider(trust_pool.roots(), provider.clone());
    let verifier_builder = match client_auth {
        ClientAuth::VerifyIfGiven => verifier_builder.allow_unauthenticated(),
        ClientAuth::RequireAndVerify => verifier_builder,
    };
    let client_verifier = verifier_builder
        .build()
        .map_err(|e| SecurityError::tls_config(format!("failed to build client verifier: {}", e)))?;

    let cert_chain: Arc<[CertificateDer<'static>]> = identity.cert_chain.clone().into();

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(settings.server_min_version.enabled_versions())
        .map_err(into_build_error)?
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(identity.cert_chain, identity.key)
        .map_err(into_build_error)?;
    config.ignore_client_order = settings.prefer_server_ciphers;

    info!(
        "Server TLS configuration ready (min_version={}, client_auth={:?}, {} CA certificate(s))",
        settings.server_min_version,
        client_auth,
        trust_pool.len()
    );

    Ok(ServerTlsConfig {
        config: Arc::new(config),
        cert_chain,
        trust_pool,
        min_version: settings.server_min_version,
        client_auth,
        prefer_server_ciphers: settings.prefer_server_ciphers,
    })
}

/// Build a client configuration from PEM buffers.
///
/// The result offers `cert_pem` with `key_pem` when the server asks for a
/// client certificate and fully verifies the server against `ca_pem`,
/// hostname included. It only negotiates TLS 1.3 by default.
///
/// # Errors
/// Returns [`SecurityError::KeyPairMismatch`] if the certificate and key do
/// not pair up, or [`SecurityError::CaParse`] if `ca_pem` holds no usable
/// certificate.
pub fn build_client_config(
    cert_pem: &[u8],
    key_pem: &[u8],
    ca_pem: &[u8],
    settings: &TlsSettings,
) -> SecurityResult<ClientTlsConfig> {
    info!("Building client TLS configuration");

    let identity = Identity::from_pem(cert_pem, key_pem)?;
    let trust_pool = TrustPool::from_pem(ca_pem)?;

    let cert_chain: Arc<[CertificateDer<'static>]> = identity.cert_chain.clone().into();

    let config = ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(settings.client_min_version.enabled_versions())
        .map_err(into_build_error)?
        .with_root_certificates(trust_pool.roots())
        .with_client_auth_cert(identity.cert_chain, identity.key)
        .map_err(into_build_error)?;

    info!(
        "Client TLS configuration ready (min_version={}, {} CA certificate(s))",
        settings.client_min_version,
        trust_pool.len()
    );

    Ok(ClientTlsConfig {
        config: Arc::new(config),
        cert_chain: Some(cert_chain),
        trust_pool: Some(trust_pool),
        min_version: settings.client_min_version,
        verification: ServerVerification::Full,
    })
}

/// Server mode for deployments without TLS: serve plaintext.
pub fn insecure_server_config() -> ServerTls {
    ServerTls::Disabled
}

/// Client configuration that skips all server certificate checks.
///
/// INSECURE: chain and hostname verification are both disabled and no
/// client certificate is offered. Only for development and test transports.
pub fn insecure_client_config() -> ClientTlsConfig {
    warn!("Building client TLS configuration with server verification DISABLED");

    let config = ClientConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(MinProtocolVersion::Tls12.enabled_versions())
        .expect("ring provider supports TLS 1.2 and 1.3")
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification))
        .with_no_client_auth();

    ClientTlsConfig {
        config: Arc::new(config),
        cert_chain: None,
        trust_pool: None,
        min_version: MinProtocolVersion::Tls12,
        verification: ServerVerification::Disabled,
    }
}

// Accepts any server certificate. Handshake signatures are still checked so
// the session keys are bound to whatever certificate was presented.
#[derive(Debug)]
struct SkipServerVerification;

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &crypto_provider().signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &crypto_provider().signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        crypto_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
