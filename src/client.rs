//! HTTP client with builder pattern.
//!
//! A [`Client`] owns one dispatch chain and connection pool. Clones share
//! both, so a client is cheap to pass around and reuses connections across
//! every clone.
//!
//! # Example
//!
//! ```rust,no_run
//! use corenet::Client;
//!
//! # async fn run() -> Result<(), corenet::NetError> {
//! let client = Client::new();
//! let resp = client.get("https://example.com").send().await?;
//! println!("{} {}", resp.status(), resp.text().await?);
//! # Ok(())
//! # }
//! ```

use crate::adapters::{
    AuthenticationAdapter, CookieAdapter, Dispatch, Environment, EnvironmentAdapter, ProcessEnvironment,
    ProxyPolicy, RedirectAdapter, SendOptions,
};
use crate::base::neterror::NetError;
use crate::config::{PoolLimits, RedirectMethodPolicy, SslConfig, TimeoutConfig, DEFAULT_MAX_REDIRECTS};
use crate::cookies::CookieJar;
use crate::http::{Auth, Request, RequestBody, Response};
use crate::parallel::Parallel;
use crate::socket::pool::ConnectionPool;
use crate::socket::proxy::Proxies;
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use http::Method;
use std::future::Future;
use std::sync::Arc;

const DEFAULT_USER_AGENT: &str = concat!("corenet/", env!("CARGO_PKG_VERSION"));

type Chain = EnvironmentAdapter<RedirectAdapter<AuthenticationAdapter<CookieAdapter<ConnectionPool>>>>;

struct ClientInner {
    chain: Chain,
    pool: ConnectionPool,
    jar: CookieJar,
    headers: HeaderMap,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

/// HTTP client.
///
/// Use [`Client::builder()`] to configure and create a client.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("pool", &self.inner.pool)
            .field("cookies", &self.inner.jar)
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        ClientBuilder::default().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn options<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Start a HEAD request. Redirects are not followed unless re-enabled.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a request with a custom method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        let options = SendOptions::default().allow_redirects(method != Method::HEAD);
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            options,
            error: None,
        }
    }

    /// Apply client defaults and let each layer decorate `request`.
    pub fn prepare_request(&self, request: &mut Request) {
        let headers = request.headers_mut();
        for (name, value) in self.inner.headers.iter() {
            if !headers.contains_key(name) {
                headers.insert(name, value.clone());
            }
        }
        self.inner.chain.prepare_request(request);
    }

    /// Send a prepared request through the dispatch chain.
    pub async fn send(&self, request: Request, options: SendOptions) -> Result<Response, NetError> {
        self.inner.chain.send(request, options).await
    }

    /// Close every pooled connection. Later sends fail with `ClientClosed`.
    pub async fn close(&self) {
        self.inner.chain.close().await;
    }

    /// Run `f` with this client and close it afterwards, including when `f`
    /// panics or its future is dropped.
    pub async fn scope<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce(Client) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = CloseOnDrop(self.clone());
        let out = f(self.clone()).await;
        self.close().await;
        drop(guard);
        out
    }

    /// Cookies collected by this client.
    pub fn cookies(&self) -> &CookieJar {
        &self.inner.jar
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.inner.pool
    }

    /// Start a batch of concurrent requests on this client.
    pub fn parallel(&self) -> Parallel {
        Parallel::new(self.clone())
    }
}

struct CloseOnDrop(Client);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.inner.pool.shutdown();
    }
}

/// Builder for creating a [`Client`].
pub struct ClientBuilder {
    ssl: SslConfig,
    timeout: TimeoutConfig,
    pool_limits: PoolLimits,
    max_redirects: usize,
    redirect_method_policy: RedirectMethodPolicy,
    auth: Auth,
    proxies: Proxies,
    trust_env: bool,
    environment: Arc<dyn Environment>,
    cookie_jar: Option<CookieJar>,
    headers: HeaderMap,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        Self {
            ssl: SslConfig::default(),
            timeout: TimeoutConfig::default(),
            pool_limits: PoolLimits::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            redirect_method_policy: RedirectMethodPolicy::default(),
            auth: Auth::None,
            proxies: Proxies::default(),
            trust_env: true,
            environment: Arc::new(ProcessEnvironment),
            cookie_jar: None,
            headers,
        }
    }
}

impl ClientBuilder {
    pub fn ssl(mut self, ssl: SslConfig) -> Self {
        self.ssl = ssl;
        self
    }

    pub fn timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_limits(mut self, limits: PoolLimits) -> Self {
        self.pool_limits = limits;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// How 301/302 responses treat non-GET methods.
    pub fn redirect_method_policy(mut self, policy: RedirectMethodPolicy) -> Self {
        self.redirect_method_policy = policy;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Explicit proxies. These take precedence over `*_PROXY` variables.
    pub fn proxies(mut self, proxies: Proxies) -> Self {
        self.proxies = proxies;
        self
    }

    /// Whether to read proxies and trust roots from the environment.
    pub fn trust_env(mut self, trust_env: bool) -> Self {
        self.trust_env = trust_env;
        self
    }

    /// Replace the environment variable source.
    pub fn environment(mut self, env: impl Environment + 'static) -> Self {
        self.environment = Arc::new(env);
        self
    }

    /// Share an existing jar.
    pub fn cookie_jar(mut self, jar: CookieJar) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Header sent on every request unless the request sets its own.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn build(self) -> Client {
        let pool = ConnectionPool::with_defaults(self.pool_limits, self.timeout, self.ssl.clone());
        let jar = self.cookie_jar.unwrap_or_default();

        let cookies = CookieAdapter::new(pool.clone(), jar.clone());
        let auth = AuthenticationAdapter::new(cookies, self.auth);
        let redirects = RedirectAdapter::new(auth)
            .max_redirects(self.max_redirects)
            .method_policy(self.redirect_method_policy);
        let chain = EnvironmentAdapter::new(redirects)
            .ssl(self.ssl)
            .proxies(self.proxies)
            .trust_env(self.trust_env)
            .environment(self.environment);

        Client {
            inner: Arc::new(ClientInner {
                chain,
                pool,
                jar,
                headers: self.headers,
            }),
        }
    }
}

/// Builder for a single request.
pub struct RequestBuilder {
    pub(crate) client: Client,
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: RequestBody,
    options: SendOptions,
    error: Option<NetError>,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    /// Append query parameters.
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        self.query.extend(
            pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Add a header. An invalid name or value fails the request at send time.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match key.try_into() {
            Ok(name) => match value.try_into() {
                Ok(value) => {
                    self.headers.append(name, value);
                }
                Err(_) => {
                    self.error.get_or_insert(NetError::InvalidHeader {
                        name: name.to_string(),
                    });
                }
            },
            Err(_) => {
                self.error.get_or_insert(NetError::InvalidHeader {
                    name: "<invalid>".to_string(),
                });
            }
        }
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.append(name, value.clone());
        }
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `json` as the body with `Content-Type: application/json`.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        match serde_json::to_vec(json) {
            Ok(bytes) => {
                self.body = RequestBody::from(bytes);
                self.headers.insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
            }
            Err(e) => {
                self.error.get_or_insert(NetError::Json {
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Return once headers arrive; the body is read on demand.
    pub fn stream(mut self, stream: bool) -> Self {
        self.options.stream = stream;
        self
    }

    pub fn allow_redirects(mut self, allow: bool) -> Self {
        self.options.allow_redirects = allow;
        self
    }

    pub fn ssl(mut self, ssl: SslConfig) -> Self {
        self.options.ssl = Some(ssl);
        self
    }

    pub fn timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.options.auth = Some(auth);
        self
    }

    pub fn proxy(mut self, proxy: ProxyPolicy) -> Self {
        self.options.proxy = proxy;
        self
    }

    /// Build the request without sending it.
    pub fn build(self) -> Result<Request, NetError> {
        self.build_with_options().map(|(_, request, _)| request)
    }

    pub(crate) fn build_with_options(self) -> Result<(Client, Request, SendOptions), NetError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut request = Request::parse(self.method, &self.url)?;
        if !self.query.is_empty() {
            request.url_mut().query_pairs_mut().extend_pairs(self.query.iter());
        }
        *request.headers_mut() = self.headers;
        let mut request = request.with_body(self.body);
        self.client.prepare_request(&mut request);
        Ok((self.client, request, self.options))
    }

    pub async fn send(self) -> Result<Response, NetError> {
        let (client, request, options) = self.build_with_options()?;
        client.send(request, options).await
    }
}
