use super::{Dispatch, SendOptions};
use crate::base::neterror::NetError;
use crate::config::{RedirectMethodPolicy, DEFAULT_MAX_REDIRECTS};
use crate::http::{Auth, Request, Response};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, COOKIE, HOST};
use http::{Method, StatusCode};
use std::collections::HashSet;
use url::Url;

/// Follows 3xx responses, recording each hop in the final response's history.
pub struct RedirectAdapter<D> {
    inner: D,
    max_redirects: usize,
    policy: RedirectMethodPolicy,
}

impl<D: Dispatch> RedirectAdapter<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            policy: RedirectMethodPolicy::default(),
        }
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn method_policy(mut self, policy: RedirectMethodPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Method for the next hop and whether it carries the body.
    fn next_method(&self, status: StatusCode, method: &Method) -> (Method, bool) {
        let downgrade = || {
            if *method == Method::HEAD {
                (Method::HEAD, false)
            } else {
                (Method::GET, false)
            }
        };
        match status {
            StatusCode::SEE_OTHER => downgrade(),
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => match self.policy {
                RedirectMethodPolicy::DowngradeToGet
                    if *method != Method::GET && *method != Method::HEAD =>
                {
                    downgrade()
                }
                _ => (method.clone(), true),
            },
            _ => (method.clone(), true),
        }
    }
}

/// Resolve a `Location` value against the URL that produced it.
fn resolve_location(base: &Url, location: &str) -> Result<Url, NetError> {
    let invalid = || NetError::InvalidRedirect {
        location: location.to_string(),
    };
    let mut next = base.join(location.trim()).map_err(|_| invalid())?;
    if !matches!(next.scheme(), "http" | "https") || next.host_str().is_none() {
        return Err(invalid());
    }
    if next.fragment().is_none() {
        next.set_fragment(base.fragment());
    }
    Ok(next)
}

fn visit_key(method: &Method, url: &Url) -> (Method, String) {
    let mut url = url.clone();
    url.set_fragment(None);
    (method.clone(), url.into())
}

#[async_trait]
impl<D: Dispatch> Dispatch for RedirectAdapter<D> {
    fn prepare_request(&self, request: &mut Request) {
        self.inner.prepare_request(request);
    }

    async fn send(&self, request: Request, options: SendOptions) -> Result<Response, NetError> {
        if !options.allow_redirects {
            return self.inner.send(request, options).await;
        }

        let mut request = request;
        let mut options = options;
        let mut history: Vec<Response> = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(visit_key(request.method(), request.url()));

        loop {
            let method = request.method().clone();
            let url = request.url().clone();
            let headers = request.headers().clone();
            let replay_body = request.body().try_clone();

            let mut response = self.inner.send(request, options.clone()).await?;
            let location = if response.is_redirect() {
                response.location().map(str::to_string)
            } else {
                None
            };
            let Some(location) = location else {
                response.set_history(history);
                return Ok(response);
            };

            let next_url = resolve_location(&url, &location)?;
            let (next_method, keep_body) = self.next_method(response.status(), &method);
            tracing::debug!(
                status = response.status().as_u16(),
                from = %url,
                to = %next_url,
                method = %next_method,
                "following redirect"
            );

            response.read().await?;
            history.push(response);
            if history.len() > self.max_redirects {
                return Err(NetError::TooManyRedirects {
                    method: next_method,
                    url: next_url,
                    max_redirects: self.max_redirects,
                    history,
                });
            }
            if !visited.insert(visit_key(&next_method, &next_url)) {
                return Err(NetError::RedirectLoop {
                    method: next_method,
                    url: next_url,
                    hops: history.len(),
                });
            }

            let cross_origin = url.origin() != next_url.origin();
            let mut next = Request::new(next_method, next_url);
            *next.headers_mut() = headers;
            if keep_body {
                let body = replay_body.ok_or(NetError::RequestBodyNotReplayable)?;
                next = next.with_body(body);
            } else {
                next.clear_body();
            }
            if cross_origin {
                let dropped = next.headers_mut();
                dropped.remove(AUTHORIZATION);
                dropped.remove(COOKIE);
                dropped.remove(HOST);
                options.auth = Some(Auth::None);
            }
            request = next;
        }
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
