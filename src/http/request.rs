//! Outgoing request representation.

use crate::base::neterror::NetError;
use crate::http::requestbody::RequestBody;
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, Method};
use url::Url;

/// An HTTP request as it travels down the dispatch chain.
///
/// Adapters annotate headers in place before dispatch. Following a redirect or
/// answering an auth challenge always builds a new `Request` via
/// [`Request::try_clone`] rather than reusing a dispatched one.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: RequestBody,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Parse `url` and build a request with an empty body.
    pub fn parse(method: Method, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::invalid_url(url))?;
        match url.scheme() {
            "http" | "https" => {}
            _ => return Err(NetError::invalid_url(url.as_str())),
        }
        if url.host_str().is_none() {
            return Err(NetError::invalid_url(url.as_str()));
        }
        Ok(Self::new(method, url))
    }

    pub fn with_body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Take the body, leaving `Empty` behind.
    pub fn take_body(&mut self) -> RequestBody {
        std::mem::take(&mut self.body)
    }

    /// Replace the body with `Empty` and drop the headers describing it.
    pub fn clear_body(&mut self) {
        self.body = RequestBody::Empty;
        self.headers.remove(CONTENT_LENGTH);
        self.headers.remove(CONTENT_TYPE);
        self.headers.remove(TRANSFER_ENCODING);
    }

    /// Build an independent copy. Returns `None` when the body is a stream.
    pub fn try_clone(&self) -> Option<Request> {
        Some(Request {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Origin-form request target (`/path?query`).
    pub fn path_and_query(&self) -> String {
        match self.url.query() {
            Some(q) => format!("{}?{}", self.url.path(), q),
            None => self.url.path().to_string(),
        }
    }

    /// `Host` header value, omitting the port when it is the scheme default.
    pub fn host_header(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Whether `other` shares scheme, host and port with this request.
    pub fn same_origin(&self, other: &Url) -> bool {
        self.url.origin() == other.origin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_parse_rejects_non_http() {
        assert!(Request::parse(Method::GET, "ftp://example.com/").is_err());
        assert!(Request::parse(Method::GET, "not a url").is_err());
        assert!(Request::parse(Method::GET, "https://example.com/").is_ok());
    }

    #[test]
    fn test_try_clone_copies_bytes_body() {
        let req = Request::parse(Method::POST, "http://example.com/submit")
            .unwrap()
            .with_body(Bytes::from_static(b"payload"))
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        let copy = req.try_clone().unwrap();
        assert_eq!(copy.method(), Method::POST);
        assert_eq!(copy.body().len(), Some(7));
        assert_eq!(copy.headers()[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_clear_body_drops_body_headers() {
        let mut req = Request::parse(Method::POST, "http://example.com/")
            .unwrap()
            .with_body("x")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .with_header(CONTENT_LENGTH, HeaderValue::from_static("1"));
        req.clear_body();
        assert!(req.body().is_empty());
        assert!(req.headers().get(CONTENT_TYPE).is_none());
        assert!(req.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_targets() {
        let req = Request::parse(Method::GET, "http://example.com:8080/a/b?x=1").unwrap();
        assert_eq!(req.path_and_query(), "/a/b?x=1");
        assert_eq!(req.host_header(), "example.com:8080");

        let req = Request::parse(Method::GET, "https://example.com:443/").unwrap();
        assert_eq!(req.host_header(), "example.com");
    }

    #[test]
    fn test_same_origin() {
        let req = Request::parse(Method::GET, "http://example.com/a").unwrap();
        assert!(req.same_origin(&Url::parse("http://example.com:80/b").unwrap()));
        assert!(!req.same_origin(&Url::parse("https://example.com/b").unwrap()));
        assert!(!req.same_origin(&Url::parse("http://other.com/a").unwrap()));
    }
}
