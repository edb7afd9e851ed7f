//! Forward execution.
//!
//! # Responsibilities
//! - Issue the outbound call described by a descriptor
//! - Enforce the target's per-call deadline over the whole exchange
//! - Stream the backend's status, headers, and body back verbatim
//!
//! # Design Decisions
//! - One attempt per request; retries are not part of the dispatcher
//!   contract
//! - One deadline covers connect, response head, and body; the body
//!   streams without buffering and is cut when the deadline fires
//! - Exactly one outcome per call: a response or a classified ProxyError

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::response::Response;
use http_body::{Body as HttpBody, Frame, SizeHint};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::time::{self, Instant, Sleep};

use crate::proxy::{OutboundRequest, ProxyError};

/// Executes outbound calls over a shared connection pool.
#[derive(Clone)]
pub struct ForwardExecutor {
    client: Client<HttpConnector, Body>,
}

impl ForwardExecutor {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// Perform the call, racing the whole exchange against the
    /// descriptor's timeout.
    ///
    /// Before the response head arrives the deadline surfaces as a
    /// `Timeout` error. After the head has been forwarded the status can
    /// no longer change, so a backend that stalls mid-body has its
    /// stream terminated at the deadline instead; the caller sees a
    /// truncated body, never a hang. On failure the error carries the
    /// target service name; the underlying cause is for logs only.
    pub async fn execute(
        &self,
        outbound: OutboundRequest,
        body: Body,
    ) -> Result<Response, ProxyError> {
        let service = outbound.service.clone();
        let timeout = outbound.timeout;
        let deadline = Instant::now() + timeout;

        let request = outbound.into_request(body).map_err(|e| ProxyError::Protocol {
            service: service.clone(),
            source: Box::new(e),
        })?;

        match time::timeout_at(deadline, self.client.request(request)).await {
            Ok(Ok(response)) => {
                Ok(response.map(|body| DeadlineBody::wrap(body, deadline, service)))
            }
            Ok(Err(e)) if e.is_connect() => Err(ProxyError::Unreachable { service, source: e }),
            Ok(Err(e)) => Err(ProxyError::Protocol {
                service,
                source: Box::new(e),
            }),
            Err(_) => Err(ProxyError::Timeout { service, timeout }),
        }
    }
}

impl Default for ForwardExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend response body raced against the remaining forward deadline.
///
/// The deadline is shared with the head phase: a slow head leaves less
/// time for the body. When it fires the stream ends with an error,
/// which tears down the client connection rather than leaving the read
/// pending forever.
struct DeadlineBody {
    inner: Pin<Box<Incoming>>,
    deadline: Pin<Box<Sleep>>,
    service: String,
}

impl DeadlineBody {
    fn wrap(inner: Incoming, deadline: Instant, service: String) -> Body {
        Body::new(Self {
            inner: Box::pin(inner),
            deadline: Box::pin(time::sleep_until(deadline)),
            service,
        })
    }
}

impl HttpBody for DeadlineBody {
    type Data = Bytes;
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.deadline.as_mut().poll(cx).is_ready() {
            let message = format!(
                "body from service `{}` cut at the forward deadline",
                this.service
            );
            return Poll::Ready(Some(Err(message.into())));
        }
        this.inner
            .as_mut()
            .poll_frame(cx)
            .map(|frame| frame.map(|result| result.map_err(Into::into)))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
