//! `NO_PROXY` matching.
//!
//! Follows curl's rules:
//! - entries are comma separated, surrounding whitespace ignored
//! - `*` bypasses every host
//! - a domain matches itself and its subdomains (`example.com`, `.example.com`
//!   and `*.example.com` are equivalent)
//! - IP addresses and CIDR ranges match literal IP hosts only
//! - any entry may carry a `:port` suffix restricting it to that port

use std::net::IpAddr;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rule {
    All,
    Domain { suffix: String, port: Option<u16> },
    Ip { addr: IpAddr, port: Option<u16> },
    Cidr { network: IpAddr, prefix: u8 },
}

/// Parsed `NO_PROXY` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyMatcher {
    rules: Vec<Rule>,
}

impl ProxyMatcher {
    pub fn from_string(no_proxy: &str) -> Self {
        let rules = no_proxy
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(parse_rule)
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether a request to `host:port` should go direct.
    pub fn should_bypass(&self, host: &str, port: Option<u16>) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let ip = host.parse::<IpAddr>().ok();
        let host = host.to_ascii_lowercase();
        let port_ok = |want: &Option<u16>| want.is_none() || *want == port;

        self.rules.iter().any(|rule| match rule {
            Rule::All => true,
            Rule::Ip { addr, port: want } => ip == Some(*addr) && port_ok(want),
            Rule::Cidr { network, prefix } => {
                ip.is_some_and(|ip| cidr_contains(*network, *prefix, ip))
            }
            Rule::Domain { suffix, port: want } => {
                ip.is_none()
                    && port_ok(want)
                    && (host == *suffix
                        || host
                            .strip_suffix(suffix.as_str())
                            .is_some_and(|rest| rest.ends_with('.')))
            }
        })
    }

    pub fn should_bypass_url(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| self.should_bypass(h, url.port_or_known_default()))
    }
}

fn parse_rule(entry: &str) -> Rule {
    if entry == "*" {
        return Rule::All;
    }
    if let Some((ip, prefix)) = entry.split_once('/') {
        if let (Ok(network), Ok(prefix)) = (ip.parse::<IpAddr>(), prefix.parse::<u8>()) {
            return Rule::Cidr { network, prefix };
        }
    }
    if let Ok(addr) = entry.trim_start_matches('[').trim_end_matches(']').parse() {
        return Rule::Ip { addr, port: None };
    }

    let (host, port) = split_port(entry);
    if let Ok(addr) = host.trim_start_matches('[').trim_end_matches(']').parse() {
        return Rule::Ip { addr, port };
    }
    let suffix = host
        .trim_start_matches('*')
        .trim_start_matches('.')
        .to_ascii_lowercase();
    Rule::Domain { suffix, port }
}

/// Split a trailing `:port`, leaving bare IPv6 literals intact.
fn split_port(entry: &str) -> (&str, Option<u16>) {
    match entry.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
            match port.parse() {
                Ok(p) => (host, Some(p)),
                Err(_) => (entry, None),
            }
        }
        _ => (entry, None),
    }
}

fn cidr_contains(network: IpAddr, prefix: u8, addr: IpAddr) -> bool {
    match (network, addr) {
        (IpAddr::V4(net), IpAddr::V4(ip)) if prefix <= 32 => {
            let mask = u32::MAX.checked_shl(32 - prefix as u32).unwrap_or(0);
            u32::from(net) & mask == u32::from(ip) & mask
        }
        (IpAddr::V6(net), IpAddr::V6(ip)) if prefix <= 128 => {
            let mask = u128::MAX.checked_shl(128 - prefix as u32).unwrap_or(0);
            u128::from(net) & mask == u128::from(ip) & mask
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard() {
        let m = ProxyMatcher::from_string("*");
        assert!(m.should_bypass("anything.com", Some(80)));
        assert!(m.should_bypass("10.0.0.1", None));
    }

    #[test]
    fn test_domain_forms_are_equivalent() {
        for entry in ["example.com", ".example.com", "*.example.com"] {
            let m = ProxyMatcher::from_string(entry);
            assert!(m.should_bypass("example.com", None), "{}", entry);
            assert!(m.should_bypass("API.Example.com", None), "{}", entry);
            assert!(!m.should_bypass("notexample.com", None), "{}", entry);
        }
    }

    #[test]
    fn test_port_qualified_entries() {
        let m = ProxyMatcher::from_string("internal.test:8080, 10.0.0.1:22");
        assert!(m.should_bypass("internal.test", Some(8080)));
        assert!(!m.should_bypass("internal.test", Some(80)));
        assert!(m.should_bypass("10.0.0.1", Some(22)));
        assert!(!m.should_bypass("10.0.0.1", Some(80)));
    }

    #[test]
    fn test_ip_and_cidr() {
        let m = ProxyMatcher::from_string("127.0.0.1, 192.168.0.0/16, ::1, 2001:db8::/32");
        assert!(m.should_bypass("127.0.0.1", Some(80)));
        assert!(m.should_bypass("192.168.44.2", None));
        assert!(!m.should_bypass("192.169.0.1", None));
        assert!(m.should_bypass("[::1]", Some(443)));
        assert!(m.should_bypass("2001:db8::7", None));
        assert!(!m.should_bypass("2001:db9::7", None));
    }

    #[test]
    fn test_url_matching_uses_default_port() {
        let m = ProxyMatcher::from_string("example.com:443");
        assert!(m.should_bypass_url(&Url::parse("https://example.com/").unwrap()));
        assert!(!m.should_bypass_url(&Url::parse("http://example.com/").unwrap()));
    }

    #[test]
    fn test_empty_list() {
        let m = ProxyMatcher::from_string(" , ");
        assert!(m.is_empty());
        assert!(!m.should_bypass("example.com", None));
    }
}
