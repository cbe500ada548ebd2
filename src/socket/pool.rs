//! Connection pool.
//!
//! Connections are grouped by [`PoolKey`] and only reused within a group.
//! All bookkeeping lives behind one mutex that is never held across an
//! await. A [`Lease`] or [`Reservation`] owns one slot of `max_connections`
//! and gives it back on drop, so a cancelled request never leaks capacity.

use crate::adapters::{Dispatch, SendOptions};
use crate::base::neterror::{NetError, TimeoutPhase};
use crate::config::{PoolLimits, SslConfig, TimeoutConfig};
use crate::http::requestbody::WireBody;
use crate::http::{Request, Response, ResponseBody};
use crate::socket::client::{find_io_timeout, IoTimeouts, TimedSocket};
use crate::socket::connectjob::ConnectJob;
use crate::socket::proxy::ProxySettings;
use crate::socket::tls::TlsConnectorCache;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use http::header::{HeaderValue, CONNECTION, HOST, PROXY_AUTHORIZATION};
use http::{HeaderMap, Method};
use http_body::{Body, Frame, SizeHint};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use url::Url;

/// Identifies which connections may serve a request.
///
/// Origin (scheme, host, port) plus the proxy in use and, for https, the TLS
/// policy the connection was negotiated under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    scheme: String,
    host: String,
    port: u16,
    proxy: Option<ProxySettings>,
    ssl: Option<SslConfig>,
}

impl PoolKey {
    pub fn new(
        url: &Url,
        proxy: Option<&ProxySettings>,
        ssl: &SslConfig,
    ) -> Result<Self, NetError> {
        let host = url
            .host_str()
            .ok_or_else(|| NetError::invalid_url(url.as_str()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| NetError::invalid_url(url.as_str()))?;
        let https = url.scheme() == "https";
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_ascii_lowercase(),
            port,
            proxy: proxy.cloned(),
            ssl: https.then(|| ssl.clone()),
        })
    }

    /// Requests on this key use absolute-form targets (plain http via proxy).
    fn absolute_form(&self) -> bool {
        self.proxy.is_some() && self.scheme == "http"
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// One HTTP/1.1 connection.
struct Connection {
    id: u64,
    sender: http1::SendRequest<WireBody>,
    driver: AbortHandle,
    timeouts: Arc<IoTimeouts>,
    drivers: Arc<DashMap<u64, AbortHandle>>,
    released_at: Instant,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.drivers.remove(&self.id);
        self.driver.abort();
        tracing::debug!(conn = self.id, "connection closed");
    }
}

#[derive(Default)]
struct Group {
    /// Oldest release at the front.
    idle: VecDeque<Connection>,
    /// Leases and reservations.
    active: usize,
}

/// What a waiting acquirer receives.
enum Grant {
    Lease(Lease),
    Slot(Reservation),
    Closed,
}

struct Waiter {
    key: PoolKey,
    tx: oneshot::Sender<Grant>,
}

#[derive(Default)]
struct State {
    groups: HashMap<PoolKey, Group>,
    /// Active plus idle connections, counting reservations still connecting.
    total: usize,
    idle: usize,
    waiters: VecDeque<Waiter>,
    closed: bool,
}

impl State {
    fn group(&mut self, key: &PoolKey) -> &mut Group {
        self.groups.entry(key.clone()).or_default()
    }

    fn take_waiter(&mut self, pred: impl Fn(&PoolKey) -> bool) -> Option<Waiter> {
        self.waiters.retain(|w| !w.tx.is_closed());
        let pos = self.waiters.iter().position(|w| pred(&w.key))?;
        self.waiters.remove(pos)
    }

    fn pop_idle(&mut self, key: &PoolKey) -> Option<Connection> {
        let conn = self.groups.get_mut(key)?.idle.pop_back()?;
        self.idle -= 1;
        Some(conn)
    }

    /// Remove the least recently released idle connection of any group.
    fn evict_oldest_idle(&mut self) -> Option<Connection> {
        let key = self
            .groups
            .iter()
            .filter_map(|(k, g)| g.idle.front().map(|c| (c.released_at, k)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, k)| k.clone())?;
        let conn = self.groups.get_mut(&key)?.idle.pop_front()?;
        self.idle -= 1;
        self.drop_empty_group(&key);
        Some(conn)
    }

    fn drop_empty_group(&mut self, key: &PoolKey) {
        if self
            .groups
            .get(key)
            .is_some_and(|g| g.active == 0 && g.idle.is_empty())
        {
            self.groups.remove(key);
        }
    }
}

enum Handoff {
    Lease(oneshot::Sender<Grant>, PoolKey, Connection),
    Slot(oneshot::Sender<Grant>, PoolKey),
}

struct PoolInner {
    limits: PoolLimits,
    timeout: TimeoutConfig,
    ssl: SslConfig,
    state: Mutex<State>,
    drivers: Arc<DashMap<u64, AbortHandle>>,
    tls: TlsConnectorCache,
    next_id: AtomicU64,
    opened: AtomicU64,
}

impl PoolInner {
    /// Give a slot back, with or without a connection to keep.
    ///
    /// A reusable connection goes to a waiter for the same key, else to the
    /// idle list. A freed slot goes to the oldest waiter of any key.
    fn release(self: &Arc<Self>, key: PoolKey, conn: Option<Connection>, reusable: bool) {
        let mut evicted = Vec::new();
        let handoff = {
            let mut st = self.state.lock();
            st.group(&key).active -= 1;

            if st.closed {
                st.total -= 1;
                st.drop_empty_group(&key);
                None
            } else {
                match conn.filter(|c| reusable && !c.sender.is_closed()) {
                    Some(conn) => {
                        if let Some(w) = st.take_waiter(|k| *k == key) {
                            st.group(&key).active += 1;
                            Some(Handoff::Lease(w.tx, key, conn))
                        } else if let Some(w) = st.take_waiter(|_| true) {
                            // Another origin is waiting for capacity; this
                            // connection makes room for it.
                            evicted.push(conn);
                            st.group(&w.key).active += 1;
                            st.drop_empty_group(&key);
                            Some(Handoff::Slot(w.tx, w.key))
                        } else {
                            let mut conn = conn;
                            conn.released_at = Instant::now();
                            conn.timeouts.disarm();
                            tracing::debug!(conn = conn.id, key = %key, "connection idle");
                            st.group(&key).idle.push_back(conn);
                            st.idle += 1;
                            while st.idle > self.limits.max_keepalive {
                                match st.evict_oldest_idle() {
                                    Some(old) => {
                                        st.total -= 1;
                                        evicted.push(old);
                                    }
                                    None => break,
                                }
                            }
                            None
                        }
                    }
                    None => {
                        if let Some(w) = st.take_waiter(|_| true) {
                            st.group(&w.key).active += 1;
                            st.drop_empty_group(&key);
                            Some(Handoff::Slot(w.tx, w.key))
                        } else {
                            st.total -= 1;
                            st.drop_empty_group(&key);
                            None
                        }
                    }
                }
            }
        };
        // Dropped outside the lock.
        drop(evicted);

        // A grant that cannot be delivered comes back through its own Drop.
        match handoff {
            Some(Handoff::Lease(tx, key, conn)) => {
                let lease = Lease::new(self.clone(), key, conn, true);
                let _ = tx.send(Grant::Lease(lease));
            }
            Some(Handoff::Slot(tx, key)) => {
                let _ = tx.send(Grant::Slot(Reservation::new(self.clone(), key)));
            }
            None => {}
        }
    }

    async fn open(
        self: &Arc<Self>,
        reservation: Reservation,
        request: &Request,
        timeout: &TimeoutConfig,
        proxy: Option<&ProxySettings>,
        ssl: &SslConfig,
    ) -> Result<Lease, NetError> {
        let job = ConnectJob {
            url: request.url(),
            proxy,
            ssl,
            tls: &self.tls,
        };
        let socket = match timeout.connect {
            Some(limit) => tokio::time::timeout(limit, job.connect())
                .await
                .map_err(|_| NetError::Timeout {
                    phase: TimeoutPhase::Connect,
                    method: request.method().clone(),
                    url: request.url().clone(),
                    after: limit,
                })??,
            None => job.connect().await?,
        };

        let timeouts = Arc::new(IoTimeouts::default());
        let io = TokioIo::new(TimedSocket::new(socket, timeouts.clone()));
        let (sender, conn) = http1::handshake(io)
            .await
            .map_err(|e| NetError::connect(&reservation.key, e))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let driver = tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(conn = id, error = %e, "connection driver exited");
            }
        })
        .abort_handle();
        self.drivers.insert(id, driver.clone());
        self.opened.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(conn = id, key = %reservation.key, "connection opened");

        let conn = Connection {
            id,
            sender,
            driver,
            timeouts,
            drivers: self.drivers.clone(),
            released_at: Instant::now(),
        };
        if self.state.lock().closed {
            // Reservation drop frees the slot.
            return Err(NetError::ClientClosed);
        }
        Ok(reservation.into_lease(conn))
    }

    async fn acquire(
        self: &Arc<Self>,
        key: &PoolKey,
        request: &Request,
        timeout: &TimeoutConfig,
        proxy: Option<&ProxySettings>,
        ssl: &SslConfig,
    ) -> Result<Lease, NetError> {
        enum Next {
            Reuse(Lease),
            Open(Reservation),
            Wait(oneshot::Receiver<Grant>),
        }

        loop {
            let mut evicted = None;
            let next = {
                let mut st = self.state.lock();
                if st.closed {
                    return Err(NetError::ClientClosed);
                }
                if let Some(conn) = st.pop_idle(key) {
                    st.group(key).active += 1;
                    Next::Reuse(Lease::new(self.clone(), key.clone(), conn, true))
                } else if st.total < self.limits.max_connections {
                    st.total += 1;
                    st.group(key).active += 1;
                    Next::Open(Reservation::new(self.clone(), key.clone()))
                } else if let Some(old) = st.evict_oldest_idle() {
                    tracing::debug!(conn = old.id, "evicting idle connection for capacity");
                    evicted = Some(old);
                    st.group(key).active += 1;
                    Next::Open(Reservation::new(self.clone(), key.clone()))
                } else {
                    let (tx, rx) = oneshot::channel();
                    st.waiters.retain(|w| !w.tx.is_closed());
                    st.waiters.push_back(Waiter {
                        key: key.clone(),
                        tx,
                    });
                    Next::Wait(rx)
                }
            };
            drop(evicted);

            let grant = match next {
                Next::Reuse(lease) => Grant::Lease(lease),
                Next::Open(reservation) => Grant::Slot(reservation),
                Next::Wait(rx) => {
                    tracing::debug!(key = %key, "waiting for pool capacity");
                    self.wait(rx, request, timeout).await?
                }
            };

            match grant {
                Grant::Lease(mut lease) => {
                    let ready = match lease.conn.as_mut() {
                        Some(conn) => conn.sender.ready().await.is_ok(),
                        None => false,
                    };
                    if ready {
                        tracing::debug!(conn = lease.id(), key = %key, "reusing connection");
                        return Ok(lease);
                    }
                    // Closed by the peer while idle.
                    lease.reusable = false;
                }
                Grant::Slot(reservation) => {
                    return self.open(reservation, request, timeout, proxy, ssl).await;
                }
                Grant::Closed => return Err(NetError::ClientClosed),
            }
        }
    }

    async fn wait(
        &self,
        mut rx: oneshot::Receiver<Grant>,
        request: &Request,
        timeout: &TimeoutConfig,
    ) -> Result<Grant, NetError> {
        let received = match timeout.pool {
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(r) => r,
                Err(_) => {
                    // A grant may have raced the timer. Take it rather than
                    // let it drop.
                    rx.close();
                    match rx.try_recv() {
                        Ok(grant) => Ok(grant),
                        Err(_) => {
                            return Err(NetError::Timeout {
                                phase: TimeoutPhase::PoolAcquire,
                                method: request.method().clone(),
                                url: request.url().clone(),
                                after: limit,
                            })
                        }
                    }
                }
            },
            None => (&mut rx).await,
        };
        received.map_err(|_| NetError::ClientClosed)
    }

    fn shutdown(&self) {
        let (idle, waiters) = {
            let mut st = self.state.lock();
            st.closed = true;
            let mut idle = Vec::new();
            for group in st.groups.values_mut() {
                idle.extend(group.idle.drain(..));
            }
            st.total -= idle.len();
            st.idle = 0;
            (idle, std::mem::take(&mut st.waiters))
        };
        tracing::debug!(idle = idle.len(), waiters = waiters.len(), "closing pool");
        drop(idle);
        for waiter in waiters {
            let _ = waiter.tx.send(Grant::Closed);
        }
        for entry in self.drivers.iter() {
            entry.value().abort();
        }
    }
}

/// Exclusive use of one pooled connection.
///
/// On drop the connection is checked back in when `reusable`, else closed.
pub struct Lease {
    pool: Arc<PoolInner>,
    key: PoolKey,
    conn: Option<Connection>,
    reusable: bool,
}

impl Lease {
    fn new(pool: Arc<PoolInner>, key: PoolKey, conn: Connection, reusable: bool) -> Self {
        Self {
            pool,
            key,
            conn: Some(conn),
            reusable,
        }
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, NetError> {
        // Only taken in Drop.
        self.conn.as_mut().ok_or(NetError::ClientClosed)
    }

    pub fn id(&self) -> u64 {
        self.conn.as_ref().map_or(0, |c| c.id)
    }

    fn timeouts(&self) -> Option<&IoTimeouts> {
        self.conn.as_ref().map(|c| c.timeouts.as_ref())
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let conn = self.conn.take();
        self.pool.release(self.key.clone(), conn, self.reusable);
    }
}

/// A slot of `max_connections` held while a connection is being opened.
struct Reservation {
    pool: Arc<PoolInner>,
    key: PoolKey,
    armed: bool,
}

impl Reservation {
    fn new(pool: Arc<PoolInner>, key: PoolKey) -> Self {
        Self {
            pool,
            key,
            armed: true,
        }
    }

    fn into_lease(mut self, conn: Connection) -> Lease {
        self.armed = false;
        Lease::new(self.pool.clone(), self.key.clone(), conn, false)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            self.pool.release(self.key.clone(), None, false);
        }
    }
}

/// Streaming response body bound to its connection.
///
/// Reaching the end returns the connection to the pool. An error or an early
/// drop closes it.
pub struct PooledBody {
    incoming: Incoming,
    lease: Option<Lease>,
    keep_alive: bool,
    method: Method,
    url: Url,
}

impl fmt::Debug for PooledBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBody")
            .field("conn", &self.lease.as_ref().map(Lease::id))
            .field("done", &self.lease.is_none())
            .finish()
    }
}

impl PooledBody {
    fn new(incoming: Incoming, lease: Lease, keep_alive: bool, method: Method, url: Url) -> Self {
        let mut body = Self {
            incoming,
            lease: Some(lease),
            keep_alive,
            method,
            url,
        };
        if body.incoming.is_end_stream() {
            body.finish(true);
        }
        body
    }

    fn finish(&mut self, complete: bool) {
        if let Some(mut lease) = self.lease.take() {
            lease.reusable = complete && self.keep_alive;
        }
    }
}

impl Body for PooledBody {
    type Data = Bytes;
    type Error = NetError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, NetError>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.incoming).poll_frame(cx) {
            Poll::Ready(None) => {
                this.finish(true);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Ok(frame))) => {
                if this.incoming.is_end_stream() {
                    this.finish(true);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                let err = classify(&e, &this.method, &this.url, this.lease.as_ref().and_then(Lease::timeouts));
                this.finish(false);
                Poll::Ready(Some(Err(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.incoming.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.incoming.size_hint()
    }
}

/// Map a hyper failure to the crate taxonomy.
fn classify(
    err: &hyper::Error,
    method: &Method,
    url: &Url,
    timeouts: Option<&IoTimeouts>,
) -> NetError {
    let timeout = find_io_timeout(err).or_else(|| timeouts.and_then(IoTimeouts::fired));
    if let Some(t) = timeout {
        return NetError::Timeout {
            phase: t.phase,
            method: method.clone(),
            url: url.clone(),
            after: t.after,
        };
    }
    if err.is_parse() || err.is_parse_status() || err.is_parse_too_large() {
        return NetError::ProtocolError {
            method: method.clone(),
            url: url.clone(),
            reason: err.to_string(),
        };
    }
    NetError::ConnectionClosed {
        method: method.clone(),
        url: url.clone(),
    }
}

/// Whether a `Connection` header asks to close after this exchange.
fn wants_close(headers: &HeaderMap) -> bool {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|t| t.trim().eq_ignore_ascii_case("close"))
}

/// Build the hyper request, taking the body out of `request`.
fn to_wire(request: &mut Request, key: &PoolKey) -> Result<http::Request<WireBody>, NetError> {
    let target = if key.absolute_form() {
        let mut url = request.url().clone();
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.set_fragment(None);
        url.to_string()
    } else {
        request.path_and_query()
    };
    let mut headers = request.headers().clone();
    if !headers.contains_key(HOST) {
        let host = HeaderValue::from_str(&request.host_header()).map_err(|_| {
            NetError::InvalidHeader {
                name: HOST.to_string(),
            }
        })?;
        headers.insert(HOST, host);
    }
    if key.absolute_form() && !headers.contains_key(PROXY_AUTHORIZATION) {
        if let Some(auth) = key.proxy.as_ref().and_then(ProxySettings::authorization) {
            let mut value = HeaderValue::from_str(&auth).map_err(|_| NetError::InvalidHeader {
                name: PROXY_AUTHORIZATION.to_string(),
            })?;
            value.set_sensitive(true);
            headers.insert(PROXY_AUTHORIZATION, value);
        }
    }

    let mut wire = http::Request::builder()
        .method(request.method().clone())
        .uri(target.as_str())
        .body(request.take_body().into_wire())
        .map_err(|_| NetError::invalid_url(request.url().as_str()))?;
    *wire.headers_mut() = headers;
    Ok(wire)
}

/// A bounded pool of HTTP/1.1 connections. The innermost dispatch layer.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("limits", &self.inner.limits)
            .field("idle", &self.idle_count())
            .field("active", &self.active_count())
            .finish()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(PoolLimits::default())
    }
}

impl ConnectionPool {
    pub fn new(limits: PoolLimits) -> Self {
        Self::with_defaults(limits, TimeoutConfig::default(), SslConfig::default())
    }

    /// A pool using `timeout` and `ssl` when a call does not set its own.
    pub fn with_defaults(limits: PoolLimits, timeout: TimeoutConfig, ssl: SslConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                limits,
                timeout,
                ssl,
                state: Mutex::new(State::default()),
                drivers: Arc::new(DashMap::new()),
                tls: TlsConnectorCache::default(),
                next_id: AtomicU64::new(0),
                opened: AtomicU64::new(0),
            }),
        }
    }

    pub fn limits(&self) -> PoolLimits {
        self.inner.limits
    }

    /// Connections opened over the pool's lifetime.
    pub fn connections_opened(&self) -> u64 {
        self.inner.opened.load(Ordering::Relaxed)
    }

    pub fn idle_count(&self) -> usize {
        self.inner.state.lock().idle
    }

    /// Connections in use, including ones still being opened.
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().groups.values().map(|g| g.active).sum()
    }

    /// Acquirers waiting for capacity.
    pub fn pending_acquires(&self) -> usize {
        self.inner
            .state
            .lock()
            .waiters
            .iter()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Send one request over a pooled connection.
    pub async fn send(
        &self,
        mut request: Request,
        options: SendOptions,
    ) -> Result<Response, NetError> {
        let timeout = options.timeout.unwrap_or(self.inner.timeout);
        let ssl = options.ssl.as_ref().unwrap_or(&self.inner.ssl);
        let proxy = options.proxy.select(request.url());
        if let Some(proxy) = proxy {
            tracing::debug!(url = %request.url(), proxy = %proxy.url, "routing through proxy");
        }
        let key = PoolKey::new(request.url(), proxy, ssl)?;

        let mut lease = self
            .inner
            .acquire(&key, &request, &timeout, proxy, ssl)
            .await?;
        // Only a fully read body puts the connection back.
        lease.reusable = false;
        let conn_id = lease.id();
        let method = request.method().clone();
        let url = request.url().clone();
        let close_requested = wants_close(request.headers());

        let wire = to_wire(&mut request, &key)?;
        let conn = lease.conn_mut()?;
        conn.timeouts.arm(timeout.read, timeout.write);
        tracing::debug!(conn = conn_id, method = %method, url = %url, "sending request");

        let sent = conn.sender.send_request(wire).await;
        let response = match sent {
            Ok(r) => r,
            Err(e) => {
                lease.reusable = false;
                return Err(classify(&e, &method, &url, lease.timeouts()));
            }
        };

        let (parts, incoming) = response.into_parts();
        let keep_alive = !close_requested && !wants_close(&parts.headers);
        let body = PooledBody::new(incoming, lease, keep_alive, method, url);
        let mut response = Response::new(
            parts.status,
            parts.version,
            parts.headers,
            ResponseBody::Streaming(body),
            request,
        )
        .with_connection_id(conn_id);

        if !options.stream {
            response.read().await?;
        }
        Ok(response)
    }

    /// Close every connection and fail pending acquirers with `ClientClosed`.
    pub async fn close(&self) {
        self.shutdown();
    }

    /// [`close`](Self::close) for contexts that cannot await, such as `Drop`.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

#[async_trait]
impl Dispatch for ConnectionPool {
    fn prepare_request(&self, _request: &mut Request) {}

    async fn send(&self, request: Request, options: SendOptions) -> Result<Response, NetError> {
        ConnectionPool::send(self, request, options).await
    }

    async fn close(&self) {
        ConnectionPool::close(self).await;
    }
}
