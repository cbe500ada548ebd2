use crate::cookies::psl;
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

/// A cookie as stored in the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    /// Lower-case, without a leading dot.
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    /// `None` for session cookies.
    pub expiration_time: Option<OffsetDateTime>,
    pub last_access_time: OffsetDateTime,
    pub secure: bool,
    pub http_only: bool,
    /// Set when the cookie had no `Domain` attribute; it then matches its
    /// origin host exactly.
    pub host_only: bool,
    pub same_site: SameSite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Unspecified,
    NoRestriction,
    Lax,
    Strict,
}

/// Why a `Set-Cookie` header was ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CookieRejection {
    #[error("unparsable Set-Cookie header")]
    Unparsable,
    #[error("response URL has no host")]
    NoHost,
    #[error("domain {0} is a public suffix")]
    PublicSuffix(String),
    #[error("domain {domain} does not cover host {host}")]
    DomainMismatch { domain: String, host: String },
    #[error("cookie prefix requirements not met for {0}")]
    InvalidPrefix(String),
}

/// The effect of one `Set-Cookie` header on the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Store(CanonicalCookie),
    /// Zero or negative `Max-Age`, or an `Expires` in the past.
    Delete {
        domain: String,
        path: String,
        name: String,
    },
}

impl CanonicalCookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into().trim_start_matches('.').to_ascii_lowercase(),
            path: path.into(),
            creation_time: now,
            expiration_time: None,
            last_access_time: now,
            secure: false,
            http_only: false,
            host_only: true,
            same_site: SameSite::Unspecified,
        }
    }

    /// Interpret a `Set-Cookie` header received from `url` at time `now`.
    pub fn from_set_cookie(
        url: &Url,
        line: &str,
        now: OffsetDateTime,
    ) -> Result<CookieChange, CookieRejection> {
        let parsed = cookie::Cookie::parse(line).map_err(|_| CookieRejection::Unparsable)?;
        let host = url
            .host_str()
            .ok_or(CookieRejection::NoHost)?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain().filter(|d| !d.is_empty()) {
            Some(d) => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                // A cookie may name its own host even when that host is
                // itself listed as a public suffix.
                if d != host && psl::is_public_suffix(&d) {
                    return Err(CookieRejection::PublicSuffix(d));
                }
                if !psl::domain_covers(&d, &host) {
                    return Err(CookieRejection::DomainMismatch { domain: d, host });
                }
                (d, false)
            }
            None => (host, true),
        };

        let path = parsed
            .path()
            .filter(|p| p.starts_with('/'))
            .unwrap_or("/")
            .to_string();

        // Max-Age wins over Expires.
        let expiration_time = match parsed.max_age() {
            Some(age) if age <= time::Duration::ZERO => None,
            Some(age) => Some(now + age),
            None => parsed.expires().and_then(|e| e.datetime()),
        };
        let expired = match (parsed.max_age(), expiration_time) {
            (Some(age), _) => age <= time::Duration::ZERO,
            (None, Some(at)) => at <= now,
            (None, None) => false,
        };
        if expired {
            return Ok(CookieChange::Delete {
                domain,
                path,
                name: parsed.name().to_string(),
            });
        }

        let same_site = match parsed.same_site() {
            Some(cookie::SameSite::Lax) => SameSite::Lax,
            Some(cookie::SameSite::Strict) => SameSite::Strict,
            Some(cookie::SameSite::None) => SameSite::NoRestriction,
            None => SameSite::Unspecified,
        };

        let cookie = CanonicalCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            creation_time: now,
            expiration_time,
            last_access_time: now,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
            same_site,
        };
        if !cookie.has_valid_prefix(url.scheme() == "https") {
            return Err(CookieRejection::InvalidPrefix(cookie.name));
        }
        Ok(CookieChange::Store(cookie))
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expiration_time.is_some_and(|at| at <= now)
    }

    /// `__Secure-` cookies need `Secure` from a secure origin; `__Host-`
    /// cookies additionally need `Path=/` and no `Domain`.
    pub fn has_valid_prefix(&self, secure_origin: bool) -> bool {
        if self.name.starts_with("__Secure-") && !(self.secure && secure_origin) {
            return false;
        }
        if self.name.starts_with("__Host-")
            && !(self.secure && secure_origin && self.path == "/" && self.host_only)
        {
            return false;
        }
        true
    }

    /// RFC 6265 §5.1.3 domain matching.
    pub fn matches_host(&self, host: &str) -> bool {
        if self.host_only {
            self.domain.eq_ignore_ascii_case(host)
        } else {
            psl::domain_covers(&self.domain, host)
        }
    }

    /// RFC 6265 §5.1.4 path matching.
    pub fn matches_path(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        match request_path.strip_prefix(self.path.as_str()) {
            Some(rest) => self.path.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }

    /// Whether this cookie should be sent with a request to `url`.
    pub fn matches_url(&self, url: &Url, now: OffsetDateTime) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.matches_host(host)
            && self.matches_path(url.path())
            && (!self.secure || url.scheme() == "https")
            && !self.is_expired(now)
    }
}
