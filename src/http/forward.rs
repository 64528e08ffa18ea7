//! Upstream forwarding.
//!
//! # Responsibilities
//! - Build the upstream request from allow-listed headers
//! - Stream the client body upstream for every method but GET/HEAD
//! - Issue the request without following redirects
//! - Hand the response to `response.rs` for header rewriting and streaming
//!
//! # Design Decisions
//! - No retries: a failed fetch is reported once and the caller decides
//! - The optional response timeout covers only the wait for response
//!   headers; bodies stream for as long as they take
//! - One pooled client shared by all requests; it holds no per-request state

use std::time::Duration;

use axum::{
    body::Body,
    http::{request::Parts, Method, Uri},
    response::Response,
};
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::http::relay::relay;
use crate::http::response::relay_response;
use crate::http::target::{TargetError, UpstreamOrigin};
use crate::security::headers::upstream_headers;

/// Errors raised while talking to the upstream Git host.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream {url} sent no response within {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("upstream request to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Forwards allowed requests to their upstream host.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    upstream: UpstreamConfig,
}

impl Forwarder {
    pub fn new(upstream: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs));
        if !upstream.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            upstream,
        })
    }

    /// Where a request for `uri` would be sent.
    pub fn resolve(&self, uri: &Uri) -> Result<UpstreamOrigin, TargetError> {
        UpstreamOrigin::resolve(uri, &self.upstream)
    }

    /// Send the request upstream and stream the answer back.
    ///
    /// `parts` is only borrowed so the caller can still hand the request
    /// head to another handler if this fails.
    pub async fn forward(
        &self,
        parts: &Parts,
        body: Body,
        origin: &UpstreamOrigin,
    ) -> Result<Response, ForwardError> {
        let mut request = self
            .client
            .request(parts.method.clone(), origin.url.clone())
            .headers(upstream_headers(&parts.headers));

        if parts.method != Method::GET && parts.method != Method::HEAD {
            let stream = relay(body.into_data_stream(), self.upstream.relay_capacity, "request");
            request = request.body(reqwest::Body::wrap_stream(stream));
        }

        let sent = match self.upstream.response_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), request.send())
                .await
                .map_err(|_| ForwardError::Timeout {
                    url: origin.url.to_string(),
                    secs,
                })?,
            None => request.send().await,
        };
        let upstream = sent.map_err(|source| ForwardError::Upstream {
            url: origin.url.to_string(),
            source,
        })?;

        tracing::debug!(
            url = %origin.url,
            status = %upstream.status(),
            "Upstream responded"
        );

        Ok(relay_response(upstream, &origin.url, self.upstream.relay_capacity))
    }
}
