//! Cookie storage.
//!
//! - [`CookieJar`](jar::CookieJar): in-memory jar shared by a client's clones
//! - [`CanonicalCookie`](canonical_cookie::CanonicalCookie): one stored cookie
//!   and the `Set-Cookie` interpretation rules
//! - [`psl`]: public-suffix checks that keep cookies off `.com` and friends
//!
//! The jar is only written by the cookie adapter and the explicit jar API.

pub mod canonical_cookie;
pub mod jar;
pub mod psl;

pub use canonical_cookie::{CanonicalCookie, CookieRejection, SameSite};
pub use jar::CookieJar;
