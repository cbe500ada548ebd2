//! Client configuration values.
//!
//! All configuration is carried by immutable value types with explicit
//! defaults. They are passed down the dispatch chain by value; nothing here is
//! process-wide.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on redirect hops for a single `send`.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Default per-phase timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where to load trusted root certificates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrustBundle {
    /// A PEM file containing one or more CA certificates.
    File(PathBuf),
    /// A directory of hashed CA certificates.
    Dir(PathBuf),
}

/// Client certificate presented during the TLS handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientCert {
    /// PEM certificate chain.
    pub cert_chain: PathBuf,
    /// PEM private key.
    pub private_key: PathBuf,
}

/// TLS verification and trust settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SslConfig {
    /// Verify the server certificate chain and hostname.
    pub verify: bool,
    /// Trusted roots. `None` uses the TLS library's default store.
    pub trust_bundle: Option<TrustBundle>,
    /// Optional client certificate.
    pub client_cert: Option<ClientCert>,
}

impl Default for SslConfig {
    fn default() -> Self {
        Self {
            verify: true,
            trust_bundle: None,
            client_cert: None,
        }
    }
}

impl SslConfig {
    /// A config that skips certificate verification.
    pub fn insecure() -> Self {
        Self {
            verify: false,
            ..Self::default()
        }
    }

    /// Return a copy with the given trust bundle.
    pub fn with_trust_bundle(mut self, bundle: TrustBundle) -> Self {
        self.trust_bundle = Some(bundle);
        self
    }

    /// Return a copy with the given client certificate.
    pub fn with_client_cert(mut self, cert_chain: PathBuf, private_key: PathBuf) -> Self {
        self.client_cert = Some(ClientCert {
            cert_chain,
            private_key,
        });
        self
    }
}

/// Per-phase timeouts. `None` disables the timeout for that phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutConfig {
    pub connect: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
    pub pool: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::all(DEFAULT_TIMEOUT)
    }
}

impl TimeoutConfig {
    /// The same timeout for every phase.
    pub fn all(timeout: Duration) -> Self {
        Self {
            connect: Some(timeout),
            read: Some(timeout),
            write: Some(timeout),
            pool: Some(timeout),
        }
    }

    /// No timeouts at all.
    pub fn none() -> Self {
        Self {
            connect: None,
            read: None,
            write: None,
            pool: None,
        }
    }

    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = Some(timeout);
        self
    }

    pub fn read(mut self, timeout: Duration) -> Self {
        self.read = Some(timeout);
        self
    }

    pub fn write(mut self, timeout: Duration) -> Self {
        self.write = Some(timeout);
        self
    }

    pub fn pool(mut self, timeout: Duration) -> Self {
        self.pool = Some(timeout);
        self
    }
}

/// Connection pool bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Maximum connections, active plus idle, across all origins.
    pub max_connections: usize,
    /// Maximum idle connections retained for reuse.
    pub max_keepalive: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_connections: 100,
            max_keepalive: 10,
        }
    }
}

impl PoolLimits {
    pub fn new(max_connections: usize, max_keepalive: usize) -> Self {
        Self {
            max_connections: max_connections.max(1),
            max_keepalive: max_keepalive.min(max_connections.max(1)),
        }
    }
}

/// How 301 and 302 responses rewrite the request method.
///
/// 303 always becomes GET and 307/308 always preserve the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectMethodPolicy {
    /// Any method other than GET or HEAD becomes GET and loses its body.
    #[default]
    DowngradeToGet,
    /// Keep the original method and body.
    Preserve,
}
