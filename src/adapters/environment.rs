use super::{Dispatch, ProxyPolicy, SendOptions};
use crate::base::neterror::NetError;
use crate::config::{SslConfig, TrustBundle};
use crate::http::{Request, Response};
use crate::socket::proxy::Proxies;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Source of environment variables.
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Outermost layer: resolves TLS trust and proxy routing for each call.
///
/// Explicit per-call settings are never replaced. Client-configured proxies
/// take precedence over `*_PROXY` variables. The environment is consulted on
/// every call so changes take effect without rebuilding the client.
pub struct EnvironmentAdapter<D> {
    inner: D,
    ssl: SslConfig,
    proxies: Proxies,
    trust_env: bool,
    env: Arc<dyn Environment>,
}

impl<D: Dispatch> EnvironmentAdapter<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            ssl: SslConfig::default(),
            proxies: Proxies::default(),
            trust_env: true,
            env: Arc::new(ProcessEnvironment),
        }
    }

    pub fn ssl(mut self, ssl: SslConfig) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn proxies(mut self, proxies: Proxies) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn trust_env(mut self, trust_env: bool) -> Self {
        self.trust_env = trust_env;
        self
    }

    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn resolve_ssl(&self) -> SslConfig {
        let mut ssl = self.ssl.clone();
        if !self.trust_env || ssl.trust_bundle.is_some() {
            return ssl;
        }
        let non_empty = |key: &str| self.env.var(key).filter(|v| !v.trim().is_empty());
        if let Some(file) = non_empty("SSL_CERT_FILE") {
            ssl.trust_bundle = Some(TrustBundle::File(PathBuf::from(file)));
        } else if let Some(dir) = non_empty("SSL_CERT_DIR") {
            ssl.trust_bundle = Some(TrustBundle::Dir(PathBuf::from(dir)));
        }
        ssl
    }

    /// Routing rules for this call. The proxy itself is chosen per request
    /// URL further down, after redirects have been resolved.
    fn resolve_proxy(&self) -> ProxyPolicy {
        let rules = if !self.proxies.is_empty() {
            self.proxies.clone()
        } else if self.trust_env {
            Proxies::from_lookup(|key| self.env.var(key))
        } else {
            return ProxyPolicy::Direct;
        };
        if rules.is_empty() {
            ProxyPolicy::Direct
        } else {
            ProxyPolicy::Rules(rules)
        }
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for EnvironmentAdapter<D> {
    fn prepare_request(&self, request: &mut Request) {
        self.inner.prepare_request(request);
    }

    async fn send(&self, request: Request, mut options: SendOptions) -> Result<Response, NetError> {
        if options.ssl.is_none() {
            options.ssl = Some(self.resolve_ssl());
        }
        if options.proxy == ProxyPolicy::Auto {
            options.proxy = self.resolve_proxy();
        }
        self.inner.send(request, options).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
