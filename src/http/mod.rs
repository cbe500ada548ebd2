//! HTTP message types.
//!
//! - [`Request`]: method, URL, headers and a replayable or streaming body
//! - [`Response`]: status, headers, a buffered or pooled body and redirect history
//! - [`Auth`]: authentication strategies applied by the auth adapter

pub mod auth;
pub mod digestauth;
pub mod request;
pub mod requestbody;
pub mod response;
pub mod responsebody;

pub use auth::Auth;
pub use request::Request;
pub use requestbody::RequestBody;
pub use response::Response;
pub use responsebody::ResponseBody;

/// Error type carried by streaming bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
