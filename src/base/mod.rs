//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): the crate-wide error taxonomy
//! - [`IoResultExt`](context::IoResultExt): IO error context helpers

pub mod context;
pub mod neterror;
