//! The dispatch chain.
//!
//! Every layer implements [`Dispatch`] and owns the layer below it by value:
//!
//! ```text
//! EnvironmentAdapter -> RedirectAdapter -> AuthenticationAdapter -> CookieAdapter -> ConnectionPool
//! ```
//!
//! Per-call settings travel down the chain in [`SendOptions`].

pub mod auth;
pub mod cookies;
pub mod environment;
pub mod redirects;

pub use auth::AuthenticationAdapter;
pub use cookies::CookieAdapter;
pub use environment::{Environment, EnvironmentAdapter, ProcessEnvironment};
pub use redirects::RedirectAdapter;

use crate::base::neterror::NetError;
use crate::config::{SslConfig, TimeoutConfig};
use crate::http::{Auth, Request, Response};
use crate::socket::proxy::{Proxies, ProxySettings};
use async_trait::async_trait;
use url::Url;

/// One layer of the request pipeline.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Decorate a request before it is sent. Most layers pass it inward.
    fn prepare_request(&self, request: &mut Request);

    /// Send a request and return the response, possibly after issuing further
    /// inner requests (redirect hops, auth retries).
    async fn send(&self, request: Request, options: SendOptions) -> Result<Response, NetError>;

    /// Release every resource held by this layer and the layers below it.
    async fn close(&self);
}

/// How the connection for a request should be routed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyPolicy {
    /// Let the environment adapter decide from client and environment settings.
    #[default]
    Auto,
    /// Connect straight to the origin.
    Direct,
    /// Go through this proxy.
    Use(ProxySettings),
    /// Pick from these rules by the URL of each request, so every redirect
    /// hop is routed on its own scheme and host.
    Rules(Proxies),
}

impl ProxyPolicy {
    /// The proxy to use for `url`, or `None` to connect directly.
    pub fn select(&self, url: &Url) -> Option<&ProxySettings> {
        match self {
            ProxyPolicy::Use(p) => Some(p),
            ProxyPolicy::Rules(rules) => rules.select(url),
            ProxyPolicy::Auto | ProxyPolicy::Direct => None,
        }
    }
}

/// Per-call options.
///
/// `None` fields mean "not set by the caller"; outer layers fill them in.
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Return without reading the body; it is streamed from the connection.
    pub stream: bool,
    pub allow_redirects: bool,
    pub ssl: Option<SslConfig>,
    pub timeout: Option<TimeoutConfig>,
    pub proxy: ProxyPolicy,
    /// Overrides the client's configured strategy. `Some(Auth::None)`
    /// disables authentication for this call.
    pub auth: Option<Auth>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            stream: false,
            allow_redirects: true,
            ssl: None,
            timeout: None,
            proxy: ProxyPolicy::Auto,
            auth: None,
        }
    }
}

impl SendOptions {
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.allow_redirects = allow;
        self
    }

    pub fn ssl(mut self, ssl: SslConfig) -> Self {
        self.ssl = Some(ssl);
        self
    }

    pub fn timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: ProxyPolicy) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }
}
