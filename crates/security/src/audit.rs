//! Peer certificate auditing for completed handshakes.
//!
//! Summaries are only meant for trace logging. Anything that cannot be read
//! from a certificate is left empty rather than reported as an error.

use rustls::pki_types::CertificateDer;
use rustls::CommonState;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::trace;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

use crate::pool::TrustPool;

/// Certificates seen during a completed handshake.
#[derive(Debug, Clone, Default)]
pub struct HandshakeState {
    /// Certificates the peer presented, leaf first.
    pub peer_certificates: Vec<CertificateDer<'static>>,
    /// Chains that were verified independently, each leaf to root.
    pub verified_chains: Vec<Vec<CertificateDer<'static>>>,
}

impl HandshakeState {
    pub fn new(
        peer_certificates: Vec<CertificateDer<'static>>,
        verified_chains: Vec<Vec<CertificateDer<'static>>>,
    ) -> Self {
        Self {
            peer_certificates,
            verified_chains,
        }
    }

    /// Capture the peer certificates of a finished rustls connection.
    ///
    /// rustls only completes a handshake after the presented chain passed
    /// verification against `trust_pool`, but it does not expose the chain it
    /// built. The single verified chain is the presented chain extended with
    /// its issuers from `trust_pool`, up to the root.
    pub fn from_connection(conn: &CommonState, trust_pool: &TrustPool) -> Self {
        let peer_certificates = conn
            .peer_certificates()
            .map(|certs| certs.to_vec())
            .unwrap_or_default();
        let verified_chains = if peer_certificates.is_empty() {
            Vec::new()
        } else {
            vec![complete_chain(&peer_certificates, trust_pool)]
        };

        Self {
            peer_certificates,
            verified_chains,
        }
    }
}

/// Identity fields of one presented certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateDescriptor {
    pub common_name: Option<String>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl CertificateDescriptor {
    /// Read the subject CN and SAN entries from a DER certificate.
    pub fn from_der(der: &[u8]) -> Self {
        let Ok((_, cert)) = X509Certificate::from_der(der) else {
            return Self::default();
        };

        let mut descriptor = Self {
            common_name: common_name(&cert),
            ..Self::default()
        };

        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => descriptor.dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            descriptor.ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        descriptor
    }
}

impl fmt::Display for CertificateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ips: Vec<String> = self.ip_addresses.iter().map(IpAddr::to_string).collect();
        write!(
            f,
            "{} ([{}], [{}])",
            self.common_name.as_deref().unwrap_or(""),
            self.dns_names.join(" "),
            ips.join(" ")
        )
    }
}

/// Trace-level summary of a peer's certificates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerCertificateSummary {
    /// One descriptor per presented certificate.
    pub certificates: Vec<CertificateDescriptor>,
    /// Per verified chain, the subject CNs from leaf to root joined by commas.
    /// A certificate without a readable CN keeps its slot as an empty string.
    pub verified_chains: Vec<String>,
}

impl PeerCertificateSummary {
    pub fn from_handshake(state: &HandshakeState) -> Self {
        let certificates = state
            .peer_certificates
            .iter()
            .map(|cert| CertificateDescriptor::from_der(cert.as_ref()))
            .collect();

        let verified_chains = state
            .verified_chains
            .iter()
            .map(|chain| {
                chain
                    .iter()
                    .map(|cert| {
                        X509Certificate::from_der(cert.as_ref())
                            .ok()
                            .and_then(|(_, parsed)| common_name(&parsed))
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();

        Self {
            certificates,
            verified_chains,
        }
    }
}

/// Log the peer certificates behind an inbound request at trace level.
///
/// `handshake` is `None` when the connection was not secured. Returns the
/// summary that was logged, if any.
pub fn log_request_certificates(
    method: &str,
    target: &str,
    handshake: Option<&HandshakeState>,
) -> Option<PeerCertificateSummary> {
    let Some(state) = handshake else {
        trace!("{} {}: no TLS", method, target);
        return None;
    };

    let summary = PeerCertificateSummary::from_handshake(state);
    let peer_certs: Vec<String> = summary.certificates.iter().map(ToString::to_string).collect();

    trace!(
        "{} {}: peer certs: {:?}, chain: {:?}",
        method,
        target,
        peer_certs,
        summary.verified_chains
    );

    Some(summary)
}

/// Append issuers from `trust_pool` to `presented` until a self-signed
/// certificate is reached or no issuer is found.
fn complete_chain(presented: &[CertificateDer<'static>], trust_pool: &TrustPool) -> Vec<CertificateDer<'static>> {
    let mut chain = presented.to_vec();

    // Bounded by the pool size so cross-signed CAs cannot loop.
    for _ in 0..trust_pool.len() {
        let issuer = {
            let Some(last) = chain.last() else { break };
            let Ok((_, last)) = X509Certificate::from_der(last.as_ref()) else {
                break;
            };
            if last.subject().as_raw() == last.issuer().as_raw() {
                break;
            }
            trust_pool
                .certificates()
                .iter()
                .find(|candidate| {
                    X509Certificate::from_der(candidate.as_ref())
                        .map(|(_, ca)| ca.subject().as_raw() == last.issuer().as_raw())
                        .unwrap_or(false)
                })
                .cloned()
        };

        match issuer {
            Some(cert) => chain.push(cert),
            None => break,
        }
    }

    chain
}

fn common_name(cert: &X509Certificate<'_>) -> Option<String> {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(|b| IpAddr::V4(Ipv4Addr::from(b))),
        16 => <[u8; 16]>::try_from(bytes).ok().map(|b| IpAddr::V6(Ipv6Addr::from(b))),
        _ => None,
    }
}
