use crate::base::neterror::NetError;
use crate::config::{SslConfig, TrustBundle};
use boring::error::ErrorStack;
use boring::ssl::{SslConnector, SslFiletype, SslMethod, SslVerifyMode};
use dashmap::DashMap;
use std::path::Path;
use tokio::net::TcpStream;
use tokio_boring::SslStream;

/// ALPN list in wire format. Only HTTP/1.1 is offered.
const ALPN_HTTP11: &[u8] = b"\x08http/1.1";

/// Build a connector for one [`SslConfig`].
pub fn build_connector(ssl: &SslConfig) -> Result<SslConnector, ErrorStack> {
    let mut builder = SslConnector::builder(SslMethod::tls())?;
    builder.set_alpn_protos(ALPN_HTTP11)?;

    if ssl.verify {
        builder.set_verify(SslVerifyMode::PEER);
    } else {
        builder.set_verify(SslVerifyMode::NONE);
    }

    match &ssl.trust_bundle {
        Some(TrustBundle::File(path)) => builder.set_ca_file(path)?,
        Some(TrustBundle::Dir(dir)) => {
            for path in certificate_files(dir) {
                // Hashed directories also carry CRLs and stray files.
                if let Err(e) = builder.set_ca_file(&path) {
                    tracing::debug!(path = %path.display(), error = %e, "skipping trust file");
                }
            }
        }
        None => builder.set_default_verify_paths()?,
    }

    if let Some(cert) = &ssl.client_cert {
        builder.set_certificate_chain_file(&cert.cert_chain)?;
        builder.set_private_key_file(&cert.private_key, SslFiletype::PEM)?;
        builder.check_private_key()?;
    }

    Ok(builder.build())
}

fn certificate_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Check if SNI should be set for this host.
/// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
pub fn should_set_sni(host: &str) -> bool {
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .is_err()
}

/// Connectors built so far, one per distinct [`SslConfig`].
#[derive(Default)]
pub struct TlsConnectorCache {
    connectors: DashMap<SslConfig, SslConnector>,
}

impl std::fmt::Debug for TlsConnectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnectorCache")
            .field("configs", &self.connectors.len())
            .finish()
    }
}

impl TlsConnectorCache {
    pub fn get(&self, ssl: &SslConfig) -> Result<SslConnector, ErrorStack> {
        if let Some(c) = self.connectors.get(ssl) {
            return Ok(c.clone());
        }
        let connector = build_connector(ssl)?;
        self.connectors.insert(ssl.clone(), connector.clone());
        Ok(connector)
    }

    /// Run the TLS handshake with `host` over an established stream.
    pub async fn handshake(
        &self,
        ssl: &SslConfig,
        host: &str,
        port: u16,
        stream: TcpStream,
    ) -> Result<SslStream<TcpStream>, NetError> {
        let origin = format!("{}:{}", host, port);
        let connector = self
            .get(ssl)
            .map_err(|e| NetError::connect(&origin, format!("tls setup: {}", e)))?;
        let mut config = connector
            .configure()
            .map_err(|e| NetError::connect(&origin, format!("tls setup: {}", e)))?;

        let domain = host.trim_start_matches('[').trim_end_matches(']');
        config.set_use_server_name_indication(should_set_sni(domain));
        if !ssl.verify {
            config.set_verify_hostname(false);
        }

        tokio_boring::connect(config, domain, stream)
            .await
            .map_err(|e| NetError::connect(&origin, format!("tls handshake: {}", e)))
    }
}
