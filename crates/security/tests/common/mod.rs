//! Shared fixtures for integration tests.

#![allow(dead_code)]

use rustls::pki_types::CertificateDer;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use strata_security::{CA_CERT_FILE, CLIENT_CERT_FILE, CLIENT_KEY_FILE, SERVER_CERT_FILE, SERVER_KEY_FILE};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

pub const CA_COMMON_NAME: &str = "Strata Test CA";
pub const SERVER_COMMON_NAME: &str = "node";
pub const CLIENT_COMMON_NAME: &str = "node-client";

/// A signed key pair in PEM and DER form.
pub struct TestIdentity {
    pub cert_pem: String,
    pub key_pem: String,
    pub cert_der: CertificateDer<'static>,
}

/// A CA plus server and client identities it signed.
pub struct TestPki {
    pub ca_pem: String,
    pub ca_der: CertificateDer<'static>,
    pub server: TestIdentity,
    pub client: TestIdentity,
}

impl TestPki {
    pub fn generate() -> Self {
        Self::generate_with_ca_name(CA_COMMON_NAME)
    }

    pub fn generate_with_ca_name(ca_name: &str) -> Self {
        let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        ca_params.distinguished_name.push(rcgen::DnType::CommonName, ca_name);
        let ca_key = rcgen::KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let server = issue(
            &ca_cert,
            &ca_key,
            SERVER_COMMON_NAME,
            vec!["localhost".to_string(), "127.0.0.1".to_string()],
        );
        let client = issue(&ca_cert, &ca_key, CLIENT_COMMON_NAME, Vec::new());

        Self {
            ca_pem: ca_cert.pem(),
            ca_der: ca_cert.der().clone(),
            server,
            client,
        }
    }

    /// Write the conventional certificate directory layout into `dir`.
    pub fn write_to(&self, dir: &Path) {
        std::fs::write(dir.join(CA_CERT_FILE), &self.ca_pem).unwrap();
        std::fs::write(dir.join(SERVER_CERT_FILE), &self.server.cert_pem).unwrap();
        std::fs::write(dir.join(SERVER_KEY_FILE), &self.server.key_pem).unwrap();
        std::fs::write(dir.join(CLIENT_CERT_FILE), &self.client.cert_pem).unwrap();
        std::fs::write(dir.join(CLIENT_KEY_FILE), &self.client.key_pem).unwrap();
    }
}

fn issue(ca_cert: &rcgen::Certificate, ca_key: &rcgen::KeyPair, cn: &str, sans: Vec<String>) -> TestIdentity {
    let mut params = rcgen::CertificateParams::new(sans).unwrap();
    params.distinguished_name.push(rcgen::DnType::CommonName, cn);
    let key = rcgen::KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, ca_cert, ca_key).unwrap();

    TestIdentity {
        cert_pem: cert.pem(),
        key_pem: key.serialize_pem(),
        cert_der: cert.der().clone(),
    }
}

/// Drive an in-memory handshake until both sides are done or one fails.
pub fn handshake(
    client: &mut rustls::ClientConnection,
    server: &mut rustls::ServerConnection,
) -> Result<(), rustls::Error> {
    for _ in 0..16 {
        let mut buf = Vec::new();
        while client.wants_write() {
            client.write_tls(&mut buf).unwrap();
        }
        let mut rd = &buf[..];
        while !rd.is_empty() {
            server.read_tls(&mut rd).unwrap();
            server.process_new_packets()?;
        }

        let mut buf = Vec::new();
        while server.wants_write() {
            server.write_tls(&mut buf).unwrap();
        }
        let mut rd = &buf[..];
        while !rd.is_empty() {
            client.read_tls(&mut rd).unwrap();
            client.process_new_packets()?;
        }

        if !client.is_handshaking() && !server.is_handshaking() {
            return Ok(());
        }
    }
    panic!("handshake did not complete");
}

/// Captured tracing event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Layer that records every event it sees.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    /// Events emitted from `target` or one of its submodules.
    pub fn events_for(&self, target: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.target.starts_with(target))
            .cloned()
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}
