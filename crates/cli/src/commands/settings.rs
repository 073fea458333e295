//! Show the effective TLS settings.

use anyhow::Result;
use strata_security::TlsSettings;

use crate::output::OutputFormatter;

/// Run the settings subcommand
pub fn show(settings: &TlsSettings, formatter: &OutputFormatter) -> Result<()> {
    if formatter.json_mode {
        return formatter.json(settings);
    }

    formatter.header("TLS Settings");
    formatter.kv(
        "Certificate Directory",
        &settings
            .certs_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    formatter.kv("Server Min Version", &settings.server_min_version.to_string());
    formatter.kv("Client Min Version", &settings.client_min_version.to_string());
    formatter.kv("Prefer Server Ciphers", &formatter.format_bool(settings.prefer_server_ciphers));
    formatter.kv("Require Client Cert", &formatter.format_bool(settings.require_client_cert));

    Ok(())
}
