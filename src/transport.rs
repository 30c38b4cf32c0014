//! HTTP execution seam and the retrying transport layered over it.

use std::{future::Future, pin::Pin, sync::Arc};

use reqwest::{Request, Response, StatusCode};
use tokio::time::sleep;

use crate::{Backoff, Context, Result, WocError};

/// Future returned by [`HttpExecutor::execute`].
pub type ExecuteFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Performs one HTTP round-trip under a [`Context`].
///
/// The client holds its executor as `Arc<dyn HttpExecutor>`; supply your own
/// with [`with_http_client`](crate::with_http_client) to stub the network in
/// tests or route requests through custom middleware.
pub trait HttpExecutor: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a Context, request: Request) -> ExecuteFuture<'a>;
}

impl HttpExecutor for reqwest::Client {
    fn execute<'a>(&'a self, ctx: &'a Context, request: Request) -> ExecuteFuture<'a> {
        Box::pin(async move {
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            tokio::select! {
                result = reqwest::Client::execute(self, request) => result.map_err(WocError::Transport),
                err = ctx.done() => Err(err),
            }
        })
    }
}

/// Wraps an executor with up to `retry_count` additional attempts.
///
/// An attempt is retried when the inner executor fails with anything other
/// than a context error, or when the status is 429, 500, 502, 503 or 504.
/// The last attempt is returned as-is. Buffered request bodies are replayed
/// byte-for-byte on every attempt; streaming bodies are rejected up front.
pub struct RetryingExecutor {
    inner: Arc<dyn HttpExecutor>,
    backoff: Backoff,
    retry_count: usize,
}

impl RetryingExecutor {
    pub fn new(inner: Arc<dyn HttpExecutor>, backoff: Backoff, retry_count: usize) -> Self {
        Self {
            inner,
            backoff,
            retry_count,
        }
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn retry_count(&self) -> usize {
        self.retry_count
    }

    async fn execute_with_retry(&self, ctx: &Context, request: Request) -> Result<Response> {
        let template = ReplayableRequest::drain(request)?;
        let mut attempt = 0usize;

        loop {
            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, url = %template.url, "sending request");

            let result = self.inner.execute(ctx, template.build()).await;

            if attempt >= self.retry_count {
                #[cfg(feature = "tracing")]
                if should_retry(&result) {
                    tracing::warn!(attempts = attempt + 1, "retries exhausted");
                }
                return result;
            }
            if !should_retry(&result) {
                return result;
            }

            // Dropping the discarded response closes its body.
            drop(result);

            let delay = self
                .backoff
                .delay(u32::try_from(attempt).unwrap_or(u32::MAX));

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying request");

            tokio::select! {
                _ = sleep(delay) => {}
                err = ctx.done() => return Err(err),
            }
            attempt += 1;
        }
    }
}

impl HttpExecutor for RetryingExecutor {
    fn execute<'a>(&'a self, ctx: &'a Context, request: Request) -> ExecuteFuture<'a> {
        Box::pin(self.execute_with_retry(ctx, request))
    }
}

/// Status codes that warrant another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn should_retry(result: &Result<Response>) -> bool {
    match result {
        Ok(response) => is_retryable_status(response.status()),
        Err(err) => !err.is_context(),
    }
}

/// Request parts captured once so each attempt gets a fresh copy.
struct ReplayableRequest {
    method: reqwest::Method,
    url: reqwest::Url,
    headers: reqwest::header::HeaderMap,
    timeout: Option<std::time::Duration>,
    version: reqwest::Version,
    body: Option<Vec<u8>>,
}

impl ReplayableRequest {
    fn drain(request: Request) -> Result<Self> {
        let body = match request.body() {
            Some(body) => Some(
                body.as_bytes()
                    .ok_or_else(|| {
                        WocError::RequestBody("streaming bodies cannot be buffered".to_owned())
                    })?
                    .to_vec(),
            ),
            None => None,
        };

        Ok(Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            timeout: request.timeout().copied(),
            version: request.version(),
            body,
        })
    }

    fn build(&self) -> Request {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        *request.timeout_mut() = self.timeout;
        *request.version_mut() = self.version;
        *request.body_mut() = self.body.clone().map(reqwest::Body::from);
        request
    }
}
