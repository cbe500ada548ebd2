use crate::http::response::Response;
use http::Method;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// The phase of an exchange a timeout fired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutPhase {
    /// DNS, TCP connect, proxy tunnel and TLS handshake.
    Connect,
    /// Waiting for bytes from the peer.
    Read,
    /// Waiting for the socket to accept bytes.
    Write,
    /// Waiting for the pool to hand out a connection.
    PoolAcquire,
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeoutPhase::Connect => "connect",
            TimeoutPhase::Read => "read",
            TimeoutPhase::Write => "write",
            TimeoutPhase::PoolAcquire => "pool acquire",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    // Connection Errors
    #[error("Connection to {origin} failed: {reason}")]
    ConnectError { origin: String, reason: String },
    #[error("{phase} timeout after {after:?} for {method} {url}")]
    Timeout {
        phase: TimeoutPhase,
        method: Method,
        url: Url,
        after: Duration,
    },
    #[error("Connection closed while sending {method} {url}")]
    ConnectionClosed { method: Method, url: Url },
    #[error("Client closed")]
    ClientClosed,
    #[error("Protocol error for {method} {url}: {reason}")]
    ProtocolError {
        method: Method,
        url: Url,
        reason: String,
    },

    // Redirect Errors
    #[error("Too many redirects for {method} {url} (limit {max_redirects})")]
    TooManyRedirects {
        method: Method,
        url: Url,
        max_redirects: usize,
        history: Vec<Response>,
    },
    #[error("Redirect loop detected at {method} {url} after {hops} hops")]
    RedirectLoop { method: Method, url: Url, hops: usize },
    #[error("Invalid redirect location: {location}")]
    InvalidRedirect { location: String },

    // Request Errors
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Invalid header: {name}")]
    InvalidHeader { name: String },
    #[error("Request body is a stream and cannot be sent twice")]
    RequestBodyNotReplayable,
    #[error("Authentication failed for {url}: {reason}")]
    AuthenticationFailed { url: Url, reason: String },

    // Body Errors
    #[error("Response body error: {reason}")]
    Body { reason: String },
    #[error("Response body already consumed")]
    BodyConsumed,
    #[error("Invalid UTF-8 in response body")]
    InvalidUtf8,
    #[error("JSON error: {reason}")]
    Json { reason: String },
}

impl NetError {
    /// Create a connect error for an origin.
    pub fn connect(origin: impl fmt::Display, reason: impl fmt::Display) -> Self {
        NetError::ConnectError {
            origin: origin.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        NetError::InvalidUrl { url: url.into() }
    }

    /// Returns true for any timeout variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Timeout { .. })
    }

    /// The timeout phase, if this is a timeout.
    pub fn timeout_phase(&self) -> Option<TimeoutPhase> {
        match self {
            NetError::Timeout { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Returns true for redirect guard failures.
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            NetError::TooManyRedirects { .. }
                | NetError::RedirectLoop { .. }
                | NetError::InvalidRedirect { .. }
        )
    }

    /// Responses accumulated before a `TooManyRedirects` failure.
    pub fn redirect_history(&self) -> Option<&[Response]> {
        match self {
            NetError::TooManyRedirects { history, .. } => Some(history),
            _ => None,
        }
    }
}
