//! Upstream response transformation.
//!
//! # Responsibilities
//! - Relay the upstream status code verbatim (3xx included, never followed)
//! - Copy only expose-set headers; `content-length` is left to the transport
//! - Rewrite `Location` so redirects come back through the proxy
//! - Report a changed final URL in `x-redirected-url`
//! - Stream the body through a bounded relay
//!
//! # Design Decisions
//! - Headers are fully assembled before the body is attached, so nothing
//!   needs amending once the first byte is flushed

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use url::Url;

use crate::http::relay::relay;
use crate::security::headers::EXPOSE_HEADERS;

pub const X_REDIRECTED_URL: HeaderName = HeaderName::from_static("x-redirected-url");

/// Strip a leading `http:/` or `https:/` so `https://host/path` becomes
/// `/host/path`, a path on the proxy itself.
pub fn rewrite_location(location: &str) -> &str {
    location
        .strip_prefix("https:/")
        .or_else(|| location.strip_prefix("http:/"))
        .unwrap_or(location)
}

/// Select the expose-set headers from an upstream response.
pub fn exposed_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();

    for name in EXPOSE_HEADERS {
        if *name == header::CONTENT_LENGTH.as_str() {
            continue;
        }
        for value in upstream.get_all(*name) {
            out.append(HeaderName::from_static(*name), value.clone());
        }
    }

    if let Some(location) = out.get(header::LOCATION) {
        let rewritten = location
            .to_str()
            .ok()
            .map(rewrite_location)
            .and_then(|l| HeaderValue::from_str(l).ok());
        if let Some(value) = rewritten {
            out.insert(header::LOCATION, value);
        }
    }

    out
}

/// `x-redirected-url` value when the upstream ended up somewhere other than
/// where it was asked to go.
pub fn redirected_url(requested: &Url, final_url: &Url) -> Option<HeaderValue> {
    if final_url == requested {
        return None;
    }
    HeaderValue::from_str(final_url.as_str()).ok()
}

/// Turn an upstream response into the client response, streaming the body.
pub fn relay_response(upstream: reqwest::Response, requested: &Url, relay_capacity: usize) -> Response {
    let status = upstream.status();
    let mut headers = exposed_headers(upstream.headers());

    if let Some(value) = redirected_url(requested, upstream.url()) {
        headers.insert(X_REDIRECTED_URL, value);
    }

    let body = Body::from_stream(relay(upstream.bytes_stream(), relay_capacity, "response"));

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
