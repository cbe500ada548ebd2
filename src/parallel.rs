//! Concurrent fan-out over one client.
//!
//! ```rust,no_run
//! # async fn run(client: corenet::Client) {
//! let mut batch = client.parallel();
//! let a = batch.submit(client.get("https://example.com/a"));
//! let b = batch.submit(client.get("https://example.com/b"));
//! let results = batch.gather().await;
//! println!("{:?} {:?}", results[a.index()], results[b.index()]);
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::client::{Client, RequestBuilder};
use crate::http::Response;
use futures::future::join_all;

/// Position of a submitted request in the next [`Parallel::gather`] result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHandle {
    index: usize,
}

impl RequestHandle {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A batch of pending requests bound to one [`Client`].
#[derive(Debug)]
pub struct Parallel {
    client: Client,
    pending: Vec<RequestBuilder>,
}

impl Parallel {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            pending: Vec::new(),
        }
    }

    /// Queue a request. No I/O starts until [`gather`](Self::gather).
    pub fn submit(&mut self, mut request: RequestBuilder) -> RequestHandle {
        request.client = self.client.clone();
        self.pending.push(request);
        RequestHandle {
            index: self.pending.len() - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drive every queued request concurrently on the calling task.
    ///
    /// Results come back in submission order; one failure does not affect the
    /// others. The batch is empty afterwards.
    pub async fn gather(&mut self) -> Vec<Result<Response, NetError>> {
        let batch = std::mem::take(&mut self.pending);
        tracing::debug!(requests = batch.len(), "gathering batch");
        join_all(batch.into_iter().map(RequestBuilder::send)).await
    }
}
