use super::{Dispatch, SendOptions};
use crate::base::neterror::NetError;
use crate::http::{Auth, Request, Response};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use http::StatusCode;

/// Applies the authentication strategy for each request.
///
/// Basic and Bearer decorate the request up front. Digest waits for a `401`
/// challenge and retries once with the computed response.
pub struct AuthenticationAdapter<D> {
    inner: D,
    auth: Auth,
}

impl<D: Dispatch> AuthenticationAdapter<D> {
    pub fn new(inner: D, auth: Auth) -> Self {
        Self { inner, auth }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Per-call override, then URL userinfo, then the configured strategy.
    fn strategy(&self, request: &Request, options: &SendOptions) -> Auth {
        match &options.auth {
            Some(auth) if !auth.is_none() => auth.clone(),
            explicit => Auth::from_url(request.url()).unwrap_or_else(|| match explicit {
                Some(auth) => auth.clone(),
                None => self.auth.clone(),
            }),
        }
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for AuthenticationAdapter<D> {
    fn prepare_request(&self, request: &mut Request) {
        self.inner.prepare_request(request);
    }

    async fn send(&self, mut request: Request, options: SendOptions) -> Result<Response, NetError> {
        let strategy = self.strategy(&request, &options);
        if request.headers().contains_key(AUTHORIZATION) {
            return self.inner.send(request, options).await;
        }
        if let Some(value) = strategy.pre_authorization() {
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        if !strategy.can_respond_to_challenge() {
            return self.inner.send(request, options).await;
        }

        let replay = request.try_clone();
        let mut response = self.inner.send(request, options.clone()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let challenges: Vec<String> = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        if challenges.is_empty() {
            return Ok(response);
        }

        let mut retry = replay.ok_or(NetError::RequestBodyNotReplayable)?;
        let challenge = challenges
            .iter()
            .find(|c| {
                c.trim_start()
                    .get(..6)
                    .is_some_and(|s| s.eq_ignore_ascii_case("digest"))
            })
            .ok_or_else(|| NetError::AuthenticationFailed {
                url: retry.url().clone(),
                reason: format!("no digest challenge in {:?}", challenges),
            })?;
        let authorization = strategy.respond_to_challenge(&retry, challenge)?;
        tracing::debug!(url = %retry.url(), "answering digest challenge");

        response.read().await?;
        drop(response);
        retry.headers_mut().insert(AUTHORIZATION, authorization);
        self.inner.send(retry, options).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
