use crate::cookies::canonical_cookie::{CanonicalCookie, CookieChange, CookieRejection};
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Maximum cookies kept per domain.
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Maximum cookies kept across all domains.
const MAX_COOKIES_TOTAL: usize = 3000;

/// In-memory cookie store shared by every clone.
///
/// Cookies are grouped by domain; each update locks only that domain's entry.
#[derive(Clone, Default)]
pub struct CookieJar {
    store: Arc<DashMap<String, Vec<CanonicalCookie>>>,
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.len())
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing one with the same (domain, path, name).
    pub fn insert(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            let oldest = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.last_access_time)
                .map(|(i, _)| i);
            match oldest {
                Some(i) => {
                    entry.remove(i);
                }
                None => break,
            }
        }
        entry.push(cookie);
        drop(entry);

        self.enforce_global_limit();
    }

    /// Remove the cookie stored under (domain, path, name). Returns whether
    /// one existed.
    pub fn remove(&self, domain: &str, path: &str, name: &str) -> bool {
        let domain = domain.trim_start_matches('.').to_ascii_lowercase();
        let Some(mut entry) = self.store.get_mut(&domain) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|c| c.name != name || c.path != path);
        before != entry.len()
    }

    /// Apply one `Set-Cookie` header received from `url`.
    pub fn set_cookie(&self, url: &Url, line: &str) -> Result<(), CookieRejection> {
        match CanonicalCookie::from_set_cookie(url, line, OffsetDateTime::now_utc())? {
            CookieChange::Store(cookie) => {
                tracing::trace!(name = %cookie.name, domain = %cookie.domain, "storing cookie");
                self.insert(cookie);
            }
            CookieChange::Delete { domain, path, name } => {
                tracing::trace!(name = %name, domain = %domain, "deleting cookie");
                self.remove(&domain, &path, &name);
            }
        }
        Ok(())
    }

    /// Cookies to send to `url`: longest path first, then oldest first.
    pub fn cookies_for_url(&self, url: &Url) -> Vec<CanonicalCookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let host = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        let now = OffsetDateTime::now_utc();

        let mut result = Vec::new();
        for domain in candidate_domains(&host) {
            if let Some(mut entry) = self.store.get_mut(domain) {
                entry.retain(|c| !c.is_expired(now));
                for cookie in entry.iter_mut() {
                    if cookie.matches_url(url, now) {
                        cookie.last_access_time = now;
                        result.push(cookie.clone());
                    }
                }
            }
        }
        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });
        result
    }

    /// The `Cookie` header value for `url`, if any cookie matches.
    pub fn header_for_url(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for_url(url);
        if cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join("; "))
    }

    /// First live cookie named `name`, optionally restricted to `domain`.
    pub fn get(&self, name: &str, domain: Option<&str>) -> Option<CanonicalCookie> {
        let now = OffsetDateTime::now_utc();
        self.iter()
            .filter(|c| !c.is_expired(now))
            .filter(|c| domain.map_or(true, |d| c.domain.eq_ignore_ascii_case(d.trim_start_matches('.'))))
            .find(|c| c.name == name)
    }

    /// Snapshot of every stored cookie.
    pub fn iter(&self) -> impl Iterator<Item = CanonicalCookie> + '_ {
        self.store.iter().flat_map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    fn enforce_global_limit(&self) {
        while self.len() > MAX_COOKIES_TOTAL {
            let mut oldest: Option<(String, usize, OffsetDateTime)> = None;
            for entry in self.store.iter() {
                for (idx, cookie) in entry.value().iter().enumerate() {
                    if oldest
                        .as_ref()
                        .map_or(true, |(_, _, t)| cookie.last_access_time < *t)
                    {
                        oldest = Some((entry.key().clone(), idx, cookie.last_access_time));
                    }
                }
            }
            let Some((domain, idx, _)) = oldest else { break };
            if let Some(mut entry) = self.store.get_mut(&domain) {
                if idx < entry.len() {
                    entry.remove(idx);
                }
            }
        }
    }
}

/// The host itself and each parent domain, e.g. `a.b.example.com`,
/// `b.example.com`, `example.com`, `com`.
fn candidate_domains(host: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(host), |h| h.split_once('.').map(|(_, rest)| rest))
        .filter(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_set_and_match() {
        let jar = CookieJar::new();
        jar.set_cookie(&url("http://www.example.com/"), "host=1").unwrap();
        jar.set_cookie(&url("http://www.example.com/"), "wide=2; Domain=example.com")
            .unwrap();

        assert_eq!(
            jar.header_for_url(&url("http://www.example.com/x")).as_deref(),
            Some("host=1; wide=2")
        );
        assert_eq!(
            jar.header_for_url(&url("http://api.example.com/")).as_deref(),
            Some("wide=2")
        );
        assert_eq!(jar.header_for_url(&url("http://other.com/")), None);
    }

    #[test]
    fn test_replace_same_name_and_path() {
        let jar = CookieJar::new();
        let u = url("http://example.com/");
        jar.set_cookie(&u, "a=1").unwrap();
        jar.set_cookie(&u, "a=2").unwrap();
        jar.set_cookie(&u, "a=3; Path=/sub").unwrap();
        assert_eq!(jar.len(), 2);
        assert_eq!(
            jar.header_for_url(&url("http://example.com/sub/page")).as_deref(),
            Some("a=3; a=2")
        );
    }

    #[test]
    fn test_max_age_zero_deletes() {
        let jar = CookieJar::new();
        let u = url("http://example.com/");
        jar.set_cookie(&u, "a=1").unwrap();
        jar.set_cookie(&u, "a=gone; Max-Age=0").unwrap();
        assert!(jar.is_empty());
    }

    #[test]
    fn test_rejection_leaves_jar_untouched() {
        let jar = CookieJar::new();
        assert!(jar.set_cookie(&url("http://example.com/"), "a=1; Domain=com").is_err());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_get() {
        let jar = CookieJar::new();
        jar.set_cookie(&url("http://example.com/"), "sid=abc").unwrap();
        assert_eq!(jar.get("sid", None).unwrap().value, "abc");
        assert_eq!(jar.get("sid", Some("example.com")).unwrap().value, "abc");
        assert!(jar.get("sid", Some("other.com")).is_none());
    }

    #[test]
    fn test_per_domain_limit() {
        let jar = CookieJar::new();
        let u = url("http://example.com/");
        for i in 0..(MAX_COOKIES_PER_DOMAIN + 5) {
            jar.set_cookie(&u, &format!("c{}=v", i)).unwrap();
        }
        assert_eq!(jar.len(), MAX_COOKIES_PER_DOMAIN);
    }

    #[test]
    fn test_candidate_domains() {
        let got: Vec<_> = candidate_domains("a.example.com").collect();
        assert_eq!(got, vec!["a.example.com", "example.com", "com"]);
    }
}
