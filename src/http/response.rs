//! HTTP Response with body access.

use crate::base::neterror::NetError;
use crate::http::request::Request;
use crate::http::responsebody::ResponseBody;
use bytes::Bytes;
use http::header::LOCATION;
use http::{HeaderMap, StatusCode, Version};
use std::fmt;

/// HTTP response returned by the dispatch chain.
///
/// Carries the request that produced it (with its body already sent) and,
/// when redirects were followed, every intermediate response in hop order.
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: ResponseBody,
    request: Request,
    history: Vec<Response>,
    connection_id: Option<u64>,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("method", self.request.method())
            .field("url", &self.request.url().as_str())
            .field("history", &self.history.len())
            .finish()
    }
}

impl Response {
    pub fn new(
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: ResponseBody,
        request: Request,
    ) -> Self {
        Self {
            status,
            version,
            headers,
            body,
            request,
            history: Vec::new(),
            connection_id: None,
        }
    }

    pub(crate) fn with_connection_id(mut self, id: u64) -> Self {
        self.connection_id = Some(id);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The request that produced this response.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Responses to earlier redirect hops, oldest first.
    pub fn history(&self) -> &[Response] {
        &self.history
    }

    pub(crate) fn set_history(&mut self, history: Vec<Response>) {
        self.history = history;
    }

    /// Identity of the pooled connection that carried this response.
    pub fn connection_id(&self) -> Option<u64> {
        self.connection_id
    }

    /// Final URL of the request that produced this response.
    pub fn url(&self) -> &url::Url {
        self.request.url()
    }

    /// Whether the status is a redirect this client knows how to follow.
    pub fn is_redirect(&self) -> bool {
        matches!(self.status.as_u16(), 301 | 302 | 303 | 307 | 308)
    }

    /// The raw `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut ResponseBody {
        &mut self.body
    }

    /// Read the whole body. The result is kept, so repeated reads are cheap.
    pub async fn read(&mut self) -> Result<Bytes, NetError> {
        self.body.read().await
    }

    /// Next chunk of the body.
    pub async fn chunk(&mut self) -> Option<Result<Bytes, NetError>> {
        self.body.chunk().await
    }

    /// Stop reading. An unfinished streaming body discards its connection.
    pub fn close(&mut self) {
        self.body.close();
    }

    /// Consume the response and return its body as bytes.
    pub async fn bytes(mut self) -> Result<Bytes, NetError> {
        self.body.read().await
    }

    /// Consume the response and return its body as UTF-8 text.
    pub async fn text(self) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Consume the response and deserialize its body as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| NetError::Json {
            reason: e.to_string(),
        })
    }
}
