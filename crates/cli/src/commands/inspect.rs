//! Describe the certificates in a PEM file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use strata_security::CertificateDescriptor;
use tabled::Tabled;

use crate::output::OutputFormatter;

/// One certificate row
#[derive(Debug, Serialize, Tabled)]
pub struct CertificateRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Common Name")]
    pub common_name: String,
    #[tabled(rename = "DNS Names")]
    pub dns_names: String,
    #[tabled(rename = "IP Addresses")]
    pub ip_addresses: String,
}

/// Parse every certificate block in `pem`, skipping blocks that fail to decode.
pub fn describe_pem(pem: &[u8], formatter: &OutputFormatter) -> Vec<CertificateRow> {
    rustls_pemfile::certs(&mut &pem[..])
        .filter_map(|block| match block {
            Ok(cert) => Some(cert),
            Err(e) => {
                formatter.warning(&format!("Skipping undecodable PEM block: {}", e));
                None
            }
        })
        .enumerate()
        .map(|(index, cert)| {
            let descriptor = CertificateDescriptor::from_der(cert.as_ref());
            let ips: Vec<String> = descriptor.ip_addresses.iter().map(ToString::to_string).collect();
            CertificateRow {
                index,
                common_name: descriptor.common_name.unwrap_or_else(|| "-".to_string()),
                dns_names: formatter.format_list(&descriptor.dns_names),
                ip_addresses: formatter.format_list(&ips),
            }
        })
        .collect()
}

/// Run the inspect subcommand
pub fn run(file: &Path, formatter: &OutputFormatter) -> Result<()> {
    let pem = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let rows = describe_pem(&pem, formatter);
    formatter.output(rows)
}
