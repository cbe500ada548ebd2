use super::{Dispatch, SendOptions};
use crate::base::neterror::NetError;
use crate::cookies::CookieJar;
use crate::http::{Request, Response};
use async_trait::async_trait;
use http::header::{HeaderValue, COOKIE, SET_COOKIE};
use std::collections::HashSet;

/// Attaches jar cookies to outgoing requests and stores `Set-Cookie` replies.
pub struct CookieAdapter<D> {
    inner: D,
    jar: CookieJar,
}

impl<D: Dispatch> CookieAdapter<D> {
    pub fn new(inner: D, jar: CookieJar) -> Self {
        Self { inner, jar }
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Fold jar cookies into a single `Cookie` header. Names the caller
    /// already supplied are left alone.
    fn attach(&self, request: &mut Request) -> Result<(), NetError> {
        let Some(jar_header) = self.jar.header_for_url(request.url()) else {
            return Ok(());
        };

        let caller: Vec<String> = request
            .headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        let mut names: HashSet<&str> = caller
            .iter()
            .map(|p| p.split_once('=').map_or(p.as_str(), |(n, _)| n).trim())
            .collect();

        let mut pairs: Vec<&str> = caller.iter().map(String::as_str).collect();
        for pair in jar_header.split("; ") {
            let name = pair.split_once('=').map_or(pair, |(n, _)| n);
            if names.insert(name) {
                pairs.push(pair);
            }
        }

        let value = HeaderValue::from_str(&pairs.join("; ")).map_err(|_| NetError::InvalidHeader {
            name: COOKIE.to_string(),
        })?;
        request.headers_mut().insert(COOKIE, value);
        Ok(())
    }

    fn harvest(&self, response: &Response) {
        for value in response.headers().get_all(SET_COOKIE) {
            let Ok(line) = value.to_str() else {
                continue;
            };
            if let Err(reason) = self.jar.set_cookie(response.url(), line) {
                tracing::debug!(url = %response.url(), reason = %reason, "cookie rejected");
            }
        }
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for CookieAdapter<D> {
    fn prepare_request(&self, request: &mut Request) {
        self.inner.prepare_request(request);
    }

    async fn send(&self, mut request: Request, options: SendOptions) -> Result<Response, NetError> {
        self.attach(&mut request)?;
        let response = self.inner.send(request, options).await?;
        self.harvest(&response);
        Ok(response)
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::MockDispatch;
    use http::Method;

    fn get(url: &str) -> Request {
        Request::parse(Method::GET, url).unwrap()
    }

    #[tokio::test]
    async fn test_cookie_persists_to_next_request() {
        let mock = MockDispatch::new().reply(200, &[("set-cookie", "sid=abc; Path=/")], "");
        let adapter = CookieAdapter::new(mock, CookieJar::new());

        adapter
            .send(get("http://example.com/login"), SendOptions::default())
            .await
            .unwrap();
        adapter
            .send(get("http://example.com/home"), SendOptions::default())
            .await
            .unwrap();

        let seen = adapter.inner().seen();
        assert!(seen[0].headers.get(COOKIE).is_none());
        assert_eq!(seen[1].headers[COOKIE], "sid=abc");
    }

    #[tokio::test]
    async fn test_caller_cookie_wins_without_duplicates() {
        let jar = CookieJar::new();
        let url = url::Url::parse("http://example.com/").unwrap();
        jar.set_cookie(&url, "sid=jar").unwrap();
        jar.set_cookie(&url, "theme=dark").unwrap();
        let adapter = CookieAdapter::new(MockDispatch::new(), jar);

        let request = get("http://example.com/")
            .with_header(COOKIE, HeaderValue::from_static("sid=mine"));
        adapter.send(request, SendOptions::default()).await.unwrap();

        let seen = adapter.inner().seen();
        assert_eq!(seen[0].headers.get_all(COOKIE).iter().count(), 1);
        assert_eq!(seen[0].headers[COOKIE], "sid=mine; theme=dark");
    }

    #[tokio::test]
    async fn test_cookies_scoped_to_domain() {
        let mock = MockDispatch::new().reply(200, &[("set-cookie", "a=1")], "");
        let adapter = CookieAdapter::new(mock, CookieJar::new());
        adapter
            .send(get("http://one.test/"), SendOptions::default())
            .await
            .unwrap();
        adapter
            .send(get("http://two.test/"), SendOptions::default())
            .await
            .unwrap();
        assert!(adapter.inner().seen()[1].headers.get(COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_public_suffix_cookie_rejected() {
        let mock = MockDispatch::new().reply(200, &[("set-cookie", "a=1; Domain=co.uk")], "");
        let adapter = CookieAdapter::new(mock, CookieJar::new());
        adapter
            .send(get("http://shop.example.co.uk/"), SendOptions::default())
            .await
            .unwrap();
        assert!(adapter.jar().is_empty());
    }

    #[tokio::test]
    async fn test_expired_set_cookie_deletes() {
        let mock = MockDispatch::new()
            .reply(200, &[("set-cookie", "a=1")], "")
            .reply(200, &[("set-cookie", "a=; Max-Age=0")], "");
        let adapter = CookieAdapter::new(mock, CookieJar::new());
        adapter
            .send(get("http://example.com/"), SendOptions::default())
            .await
            .unwrap();
        assert_eq!(adapter.jar().len(), 1);
        adapter
            .send(get("http://example.com/"), SendOptions::default())
            .await
            .unwrap();
        assert!(adapter.jar().is_empty());
    }
}
