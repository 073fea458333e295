//! Build TLS configurations from a certificate directory.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;
use strata_security::{
    CertificateDescriptor, CertificateLoader, ClientAuth, ServerVerification, TlsSettings, EMBEDDED_CERTS_PREFIX,
};

use crate::output::OutputFormatter;

/// Summary of a built server configuration
#[derive(Debug, Serialize)]
pub struct ServerReport {
    pub common_name: Option<String>,
    pub chain_length: usize,
    pub ca_certificates: usize,
    pub min_version: String,
    pub client_auth: String,
    pub prefer_server_ciphers: bool,
}

/// Summary of a built client configuration
#[derive(Debug, Serialize)]
pub struct ClientReport {
    pub common_name: Option<String>,
    pub chain_length: usize,
    pub ca_certificates: usize,
    pub min_version: String,
    pub verification: String,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub certs_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientReport>,
}

/// Build the requested configurations and report on them.
pub fn check_dir(dir: &Path, settings: &TlsSettings, server: bool, client: bool) -> Result<CheckReport> {
    if dir.to_string_lossy().starts_with(EMBEDDED_CERTS_PREFIX) {
        bail!(
            "{} is an embedded certificate set; it is resolved by the node, not from disk",
            dir.display()
        );
    }

    let loader = CertificateLoader::new();

    let server = if server {
        let config = loader
            .server_config_from_dir(dir, settings)
            .context("server configuration failed")?;
        Some(ServerReport {
            common_name: CertificateDescriptor::from_der(config.leaf_certificate().as_ref()).common_name,
            chain_length: config.cert_chain().len(),
            ca_certificates: config.trust_pool().len(),
            min_version: config.min_version().to_string(),
            client_auth: match config.client_auth() {
                ClientAuth::VerifyIfGiven => "verify if given".to_string(),
                ClientAuth::RequireAndVerify => "required".to_string(),
            },
            prefer_server_ciphers: config.prefers_server_ciphers(),
        })
    } else {
        None
    };

    let client = if client {
        let config = loader
            .client_config_from_dir(dir, settings)
            .context("client configuration failed")?;
        Some(ClientReport {
            common_name: config
                .leaf_certificate()
                .and_then(|cert| CertificateDescriptor::from_der(cert.as_ref()).common_name),
            chain_length: config.cert_chain().map_or(0, <[_]>::len),
            ca_certificates: config.trust_pool().map_or(0, |pool| pool.len()),
            min_version: config.min_version().to_string(),
            verification: match config.verification() {
                ServerVerification::Full => "full".to_string(),
                ServerVerification::Disabled => "disabled".to_string(),
            },
        })
    } else {
        None
    };

    Ok(CheckReport {
        certs_dir: dir.display().to_string(),
        server,
        client,
    })
}

/// Run the check subcommand
pub fn run(settings: &TlsSettings, formatter: &OutputFormatter, server: bool, client: bool) -> Result<()> {
    let dir = settings
        .certs_dir
        .as_deref()
        .context("no certificate directory; pass --certs-dir or set certs_dir")?;

    let report = check_dir(dir, settings, server, client)?;

    if formatter.json_mode {
        return formatter.json(&report);
    }

    formatter.header(&format!("Certificates in {}", report.certs_dir));

    if let Some(server) = &report.server {
        formatter.header("Server");
        formatter.kv("Common Name", server.common_name.as_deref().unwrap_or("-"));
        formatter.kv("Chain Length", &server.chain_length.to_string());
        formatter.kv("CA Certificates", &server.ca_certificates.to_string());
        formatter.kv("Min Version", &server.min_version);
        formatter.kv("Client Auth", &server.client_auth);
        formatter.kv("Prefer Server Ciphers", &formatter.format_bool(server.prefer_server_ciphers));
    }

    if let Some(client) = &report.client {
        formatter.header("Client");
        formatter.kv("Common Name", client.common_name.as_deref().unwrap_or("-"));
        formatter.kv("Chain Length", &client.chain_length.to_string());
        formatter.kv("CA Certificates", &client.ca_certificates.to_string());
        formatter.kv("Min Version", &client.min_version);
        formatter.kv("Server Verification", &client.verification);
    }

    println!();
    formatter.success("TLS configuration is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_certs(dir: &Path) {
        let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        ca_params.distinguished_name.push(rcgen::DnType::CommonName, "Strata CA");
        let ca_key = rcgen::KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();
        std::fs::write(dir.join("ca.crt"), ca_cert.pem()).unwrap();

        for (role, cn) in [("server", "node"), ("client", "root")] {
            let mut params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
            params.distinguished_name.push(rcgen::DnType::CommonName, cn);
            let key = rcgen::KeyPair::generate().unwrap();
            let cert = params.signed_by(&key, &ca_cert, &ca_key).unwrap();
            std::fs::write(dir.join(format!("node.{}.crt", role)), cert.pem()).unwrap();
            std::fs::write(dir.join(format!("node.{}.key", role)), key.serialize_pem()).unwrap();
        }
    }

    #[test]
    fn test_check_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        write_certs(dir.path());

        let report = check_dir(dir.path(), &TlsSettings::default(), true, true).unwrap();

        let server = report.server.unwrap();
        assert_eq!(server.common_name.as_deref(), Some("node"));
        assert_eq!(server.ca_certificates, 1);
        assert_eq!(server.min_version, "TLSv1.2");
        assert_eq!(server.client_auth, "verify if given");
        assert!(server.prefer_server_ciphers);

        let client = report.client.unwrap();
        assert_eq!(client.common_name.as_deref(), Some("root"));
        assert_eq!(client.min_version, "TLSv1.3");
        assert_eq!(client.verification, "full");
    }

    #[test]
    fn test_check_server_only_ignores_client_files() {
        let dir = tempfile::tempdir().unwrap();
        write_certs(dir.path());
        std::fs::remove_file(dir.path().join("node.client.key")).unwrap();

        let report = check_dir(dir.path(), &TlsSettings::default(), true, false).unwrap();
        assert!(report.server.is_some());
        assert!(report.client.is_none());
    }

    #[test]
    fn test_check_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        write_certs(dir.path());
        std::fs::remove_file(dir.path().join("ca.crt")).unwrap();

        let err = check_dir(dir.path(), &TlsSettings::default(), true, true).unwrap_err();
        assert!(format!("{:#}", err).contains("ca.crt"));
    }

    #[test]
    fn test_embedded_prefix_rejected() {
        let err = check_dir(Path::new("embedded=test_certs"), &TlsSettings::default(), true, true).unwrap_err();
        assert!(err.to_string().contains("embedded"));
    }
}
