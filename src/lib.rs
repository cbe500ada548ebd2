//! # corenet
//!
//! An async HTTP/1.1 client built around a layered dispatch pipeline.
//!
//! Each request passes through a fixed chain of adapters before it reaches
//! the connection pool:
//!
//! ```text
//! Client -> Environment -> Redirect -> Authentication -> Cookie -> Pool
//! ```
//!
//! ## Features
//!
//! - **Connection Pooling**: keep-alive reuse per origin, global and idle limits,
//!   FIFO waiting with a pool timeout
//! - **Cookies**: RFC 6265 jar with public-suffix validation
//! - **Authentication**: Basic, Bearer and Digest (RFC 7616)
//! - **Redirects**: method rewriting, loop detection, credential stripping
//! - **Environment**: `*_PROXY`, `NO_PROXY`, `SSL_CERT_FILE`, `SSL_CERT_DIR`
//! - **TLS**: BoringSSL with custom trust roots and client certificates
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corenet::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), corenet::NetError> {
//!     let client = Client::new();
//!     let response = client.get("https://example.com").send().await?;
//!     println!("Status: {}", response.status());
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error taxonomy
//! - [`config`] - TLS, timeout, pool and redirect settings
//! - [`http`] - Requests, responses, bodies and auth strategies
//! - [`socket`] - Connection pool, connect flow, proxies and TLS
//! - [`cookies`] - Cookie jar
//! - [`adapters`] - The dispatch chain
//! - [`client`] - The public client facade
//! - [`parallel`] - Concurrent batches

pub mod adapters;
pub mod base;
pub mod client;
pub mod config;
pub mod cookies;
pub mod http;
pub mod parallel;
pub mod socket;

pub use adapters::{Dispatch, ProxyPolicy, SendOptions};
pub use base::neterror::{NetError, TimeoutPhase};
pub use client::{Client, ClientBuilder, RequestBuilder};
pub use config::{PoolLimits, RedirectMethodPolicy, SslConfig, TimeoutConfig, TrustBundle};
pub use cookies::CookieJar;
pub use crate::http::{Auth, Request, RequestBody, Response};
pub use parallel::{Parallel, RequestHandle};
pub use socket::{ConnectionPool, Proxies, ProxySettings};
