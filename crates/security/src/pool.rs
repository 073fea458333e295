//! Trust pool construction from PEM-encoded CA material.

use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::sync::Arc;
use tracing::debug;

use crate::error::{SecurityError, SecurityResult};

/// Set of trusted CA certificates.
///
/// The same pool validates peers in both directions: a server uses it to
/// check client certificates and a client uses it to check the server.
/// A pool is immutable once built and always holds at least one certificate.
#[derive(Debug, Clone)]
pub struct TrustPool {
    roots: Arc<RootCertStore>,
    certificates: Arc<[CertificateDer<'static>]>,
}

impl TrustPool {
    /// Build a trust pool from one or more concatenated PEM certificates.
    ///
    /// Parsing is permissive: blocks that fail to decode, or decode to
    /// something that is not a usable CA certificate, are skipped. Sections
    /// that are not certificates (keys, parameters) are ignored.
    ///
    /// # Errors
    /// Returns [`SecurityError::CaParse`] if no certificate could be added.
    pub fn from_pem(ca_pem: &[u8]) -> SecurityResult<Self> {
        let mut roots = RootCertStore::empty();
        let mut certificates = Vec::new();
        let mut skipped = 0usize;

        for block in rustls_pemfile::certs(&mut &ca_pem[..]) {
            let cert = match block {
                Ok(cert) => cert,
                Err(e) => {
                    debug!("Skipping undecodable PEM block in CA bundle: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            match roots.add(cert.clone()) {
                Ok(()) => certificates.push(cert),
                Err(e) => {
                    debug!("Skipping unusable CA certificate: {}", e);
                    skipped += 1;
                }
            }
        }

        if certificates.is_empty() {
            return Err(SecurityError::ca_parse(format!(
                "no valid certificate in CA bundle ({} block(s) skipped)",
                skipped
            )));
        }

        debug!(
            "Built trust pool with {} CA certificate(s), {} skipped",
            certificates.len(),
            skipped
        );

        Ok(Self {
            roots: Arc::new(roots),
            certificates: certificates.into(),
        })
    }

    /// Root store handed to rustls verifiers.
    pub fn roots(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }

    /// DER encodings of the accepted CA certificates, in input order.
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }

    /// Number of CA certificates in the pool.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}
