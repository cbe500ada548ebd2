//! Public Suffix List checks for cookie domains.
//!
//! Stops a response from setting a cookie on `.com`, `.co.uk` and the like.

use psl::{List, Psl};

/// Whether `domain` is itself a public suffix (e.g. `com`, `github.io`).
pub fn is_public_suffix(domain: &str) -> bool {
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    List.suffix(domain.as_bytes())
        .is_some_and(|suffix| suffix.is_known() && suffix.as_bytes() == domain.as_bytes())
}

/// The registrable domain (eTLD+1), or `None` for a bare public suffix.
pub fn registrable_domain(domain: &str) -> Option<String> {
    let domain = domain.to_ascii_lowercase();
    List.domain(domain.as_bytes())
        .and_then(|d| std::str::from_utf8(d.as_bytes()).ok())
        .map(str::to_string)
}

/// Whether `host` equals `domain` or is one of its subdomains.
pub fn domain_covers(domain: &str, host: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    if host.eq_ignore_ascii_case(domain) {
        return true;
    }
    let (host, domain) = (host.as_bytes(), domain.as_bytes());
    host.len() > domain.len()
        && host[host.len() - domain.len() - 1] == b'.'
        && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain)
}
