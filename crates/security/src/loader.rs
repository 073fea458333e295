//! Certificate material loading from a conventional directory layout.
//!
//! A certificate directory holds the node identity and the cluster CA under
//! fixed file names:
//! - `ca.crt` -- the certificate of the cluster CA
//! - `node.server.crt` / `node.server.key` -- server identity, signed by the CA
//! - `node.client.crt` / `node.client.key` -- client identity, signed by the CA
//!
//! File access goes through a [`ReadFile`] capability owned by the loader,
//! so tests and embedded-asset resolvers can substitute their own source.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{SecurityError, SecurityResult};
use crate::settings::TlsSettings;
use crate::tls_config::{build_client_config, build_server_config, ClientTlsConfig, ServerTlsConfig};

/// File name of the cluster CA certificate.
pub const CA_CERT_FILE: &str = "ca.crt";
/// File name of the server certificate.
pub const SERVER_CERT_FILE: &str = "node.server.crt";
/// File name of the server private key.
pub const SERVER_KEY_FILE: &str = "node.server.key";
/// File name of the client certificate.
pub const CLIENT_CERT_FILE: &str = "node.client.crt";
/// File name of the client private key.
pub const CLIENT_KEY_FILE: &str = "node.client.key";

/// Path prefix reserved for the bundled certificate set.
///
/// Resolving it is up to the asset collaborator; plug the result in as a
/// [`ReadFile`] implementation.
pub const EMBEDDED_CERTS_PREFIX: &str = "embedded=";

/// Source of raw file contents.
pub trait ReadFile {
    /// Read the whole file at `path`.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl ReadFile for FsReader {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

impl<F> ReadFile for F
where
    F: Fn(&Path) -> io::Result<Vec<u8>>,
{
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self(path)
    }
}

/// Raw PEM buffers for one identity plus the CA.
#[derive(Clone)]
pub struct CertificateBundle {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
    pub ca_pem: Vec<u8>,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .field("ca_pem", &format_args!("{} bytes", self.ca_pem.len()))
            .finish()
    }
}

/// Loads certificate bundles from a directory.
#[derive(Debug, Clone, Default)]
pub struct CertificateLoader<R = FsReader> {
    reader: R,
}

impl CertificateLoader<FsReader> {
    /// Create a loader that reads from the filesystem.
    pub fn new() -> Self {
        Self { reader: FsReader }
    }
}

impl<R: ReadFile> CertificateLoader<R> {
    /// Create a loader that reads through `reader`.
    pub fn with_reader(reader: R) -> Self {
        Self { reader }
    }

    /// Load `node.server.crt`, `node.server.key` and `ca.crt` from `dir`.
    ///
    /// # Errors
    /// Returns [`SecurityError::FileRead`] naming the first file that could
    /// not be read.
    pub fn load_server_bundle(&self, dir: impl AsRef<Path>) -> SecurityResult<CertificateBundle> {
        self.load_bundle(dir.as_ref(), SERVER_CERT_FILE, SERVER_KEY_FILE)
    }

    /// Load `node.client.crt`, `node.client.key` and `ca.crt` from `dir`.
    ///
    /// # Errors
    /// Returns [`SecurityError::FileRead`] naming the first file that could
    /// not be read.
    pub fn load_client_bundle(&self, dir: impl AsRef<Path>) -> SecurityResult<CertificateBundle> {
        self.load_bundle(dir.as_ref(), CLIENT_CERT_FILE, CLIENT_KEY_FILE)
    }

    /// Load the server bundle from `dir` and build the server configuration.
    pub fn server_config_from_dir(
        &self,
        dir: impl AsRef<Path>,
        settings: &TlsSettings,
    ) -> SecurityResult<ServerTlsConfig> {
        let bundle = self.load_server_bundle(dir)?;
        build_server_config(&bundle.cert_pem, &bundle.key_pem, &bundle.ca_pem, settings)
    }

    /// Load the client bundle from `dir` and build the client configuration.
    pub fn client_config_from_dir(
        &self,
        dir: impl AsRef<Path>,
        settings: &TlsSettings,
    ) -> SecurityResult<ClientTlsConfig> {
        let bundle = self.load_client_bundle(dir)?;
        build_client_config(&bundle.cert_pem, &bundle.key_pem, &bundle.ca_pem, settings)
    }

    fn load_bundle(&self, dir: &Path, cert_file: &str, key_file: &str) -> SecurityResult<CertificateBundle> {
        info!("Loading certificate material from {}", dir.display());

        let cert_pem = self.read(dir.join(cert_file))?;
        let key_pem = self.read(dir.join(key_file))?;
        let ca_pem = self.read(dir.join(CA_CERT_FILE))?;

        Ok(CertificateBundle {
            cert_pem,
            key_pem,
            ca_pem,
        })
    }

    fn read(&self, path: PathBuf) -> SecurityResult<Vec<u8>> {
        match self.reader.read_file(&path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(source) => Err(SecurityError::FileRead { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn memory_reader(files: &[(&str, &str)]) -> impl Fn(&Path) -> io::Result<Vec<u8>> {
        let files: HashMap<PathBuf, Vec<u8>> = files
            .iter()
            .map(|(name, body)| (Path::new("/certs").join(name), body.as_bytes().to_vec()))
            .collect();
        move |path: &Path| {
            files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not found"))
        }
    }

    #[test]
    fn test_server_bundle_reads_conventional_names() {
        let loader = CertificateLoader::with_reader(memory_reader(&[
            ("node.server.crt", "cert"),
            ("node.server.key", "key"),
            ("ca.crt", "ca"),
        ]));

        let bundle = loader.load_server_bundle("/certs").unwrap();
        assert_eq!(bundle.cert_pem, b"cert");
        assert_eq!(bundle.key_pem, b"key");
        assert_eq!(bundle.ca_pem, b"ca");
    }

    #[test]
    fn test_client_bundle_reads_conventional_names() {
        let loader = CertificateLoader::with_reader(memory_reader(&[
            ("node.client.crt", "client-cert"),
            ("node.client.key", "client-key"),
            ("ca.crt", "ca"),
        ]));

        let bundle = loader.load_client_bundle("/certs").unwrap();
        assert_eq!(bundle.cert_pem, b"client-cert");
        assert_eq!(bundle.key_pem, b"client-key");
    }

    #[test]
    fn test_missing_file_is_named() {
        for missing in [SERVER_CERT_FILE, SERVER_KEY_FILE, CA_CERT_FILE] {
            let present: Vec<(&str, &str)> = [SERVER_CERT_FILE, SERVER_KEY_FILE, CA_CERT_FILE]
                .into_iter()
                .filter(|name| *name != missing)
                .map(|name| (name, "data"))
                .collect();
            let loader = CertificateLoader::with_reader(memory_reader(&present));

            match loader.load_server_bundle("/certs") {
                Err(SecurityError::FileRead { path, .. }) => {
                    assert_eq!(path, Path::new("/certs").join(missing));
                }
                other => panic!("expected FileRead for {}, got {:?}", missing, other),
            }
        }
    }

    #[test]
    fn test_stops_at_first_failure() {
        let calls = RefCell::new(Vec::new());
        let loader = CertificateLoader::with_reader(|path: &Path| -> io::Result<Vec<u8>> {
            calls.borrow_mut().push(path.to_path_buf());
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });

        assert!(loader.load_client_bundle("/certs").is_err());
        assert_eq!(*calls.borrow(), vec![Path::new("/certs").join(CLIENT_CERT_FILE)]);
    }

    #[test]
    fn test_bundle_debug_redacts_key() {
        let bundle = CertificateBundle {
            cert_pem: b"cert".to_vec(),
            key_pem: b"secret".to_vec(),
            ca_pem: b"ca".to_vec(),
        };
        let rendered = format!("{:?}", bundle);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
