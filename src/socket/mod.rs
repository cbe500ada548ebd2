//! Socket and connection management.
//!
//! - [`pool`]: bounded HTTP/1.1 connection pool, the innermost dispatch layer
//! - [`connectjob`]: DNS → TCP → proxy tunnel → TLS connection flow
//! - [`client`]: socket types and per-operation IO timeouts
//! - [`proxy`]: proxy settings and per-scheme selection
//! - [`matcher`]: `NO_PROXY` rules
//! - [`tls`]: BoringSSL connector construction

pub mod client;
pub mod connectjob;
pub mod matcher;
pub mod pool;
pub mod proxy;
pub mod tls;

pub use pool::ConnectionPool;
pub use proxy::{Proxies, ProxySettings};
