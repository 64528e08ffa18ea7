//! Header allow-lists.
//!
//! # Responsibilities
//! - Forward set: request headers relayed to the upstream Git host
//! - Expose set: response headers relayed back to the browser and
//!   advertised in `Access-Control-Expose-Headers`
//! - Case-insensitive membership tests and the forward-set filter
//!
//! # Design Decisions
//! - Both sets are constants; changing behavior means editing the lists
//! - Anything not listed is dropped in either direction

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Request headers the proxy relays upstream.
pub const FORWARD_HEADERS: &[&str] = &[
    "accept-encoding",
    "accept-language",
    "accept",
    "access-control-allow-origin",
    "authorization",
    "cache-control",
    "connection",
    "content-length",
    "content-type",
    "dnt",
    "git-protocol",
    "pragma",
    "range",
    "referer",
    "user-agent",
    "x-authorization",
    "x-http-method-override",
    "x-requested-with",
];

/// Response headers the proxy relays back to the client.
pub const EXPOSE_HEADERS: &[&str] = &[
    "accept-ranges",
    "age",
    "cache-control",
    "content-length",
    "content-language",
    "content-type",
    "date",
    "etag",
    "expires",
    "last-modified",
    "location",
    "pragma",
    "server",
    "transfer-encoding",
    "vary",
    "x-github-request-id",
    "x-redirected-url",
];

/// User agent sent upstream when the client's does not look like git.
///
/// Some hosts (GitHub) change behavior based on a `git/` user-agent prefix.
pub const GIT_USER_AGENT: &str = "git/@isomorphic-git/cors-proxy";

/// Content codings the upstream client decodes before relaying a body.
///
/// `content-encoding` is not exposed, so anything else would reach the
/// browser compressed and unlabelled.
pub const DECODABLE_ENCODINGS: &[&str] = &["gzip", "deflate", "br", "zstd", "identity"];

/// Keep only the codings of an `accept-encoding` value that can be decoded.
///
/// Returns `None` when nothing usable is left.
pub fn decodable_accept_encoding(value: &HeaderValue) -> Option<HeaderValue> {
    let raw = value.to_str().ok()?;
    let kept: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|coding| {
            let name = coding.split(';').next().unwrap_or("").trim();
            DECODABLE_ENCODINGS.iter().any(|e| name.eq_ignore_ascii_case(e))
        })
        .collect();

    if kept.is_empty() {
        None
    } else {
        HeaderValue::from_str(&kept.join(", ")).ok()
    }
}

pub fn is_forwarded(name: &str) -> bool {
    FORWARD_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

pub fn is_exposed(name: &str) -> bool {
    EXPOSE_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Comma-join a header list the way CORS list headers expect it.
pub fn joined(set: &[&str]) -> String {
    set.join(",")
}

/// Intersect `headers` with the forward set.
///
/// Repeated headers collapse to their last value.
pub fn forward_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in FORWARD_HEADERS {
        if let Some(value) = headers.get_all(*name).iter().last() {
            if !value.is_empty() {
                out.insert(HeaderName::from_static(*name), value.clone());
            }
        }
    }
    out
}

/// Build the upstream header map, forcing a `git/` user agent and
/// narrowing `accept-encoding` to what can be decoded.
pub fn upstream_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = forward_headers(headers);

    if let Some(accept) = out.remove(header::ACCEPT_ENCODING) {
        if let Some(narrowed) = decodable_accept_encoding(&accept) {
            out.insert(header::ACCEPT_ENCODING, narrowed);
        }
    }

    let is_git = out
        .get(header::USER_AGENT)
        .is_some_and(|ua| ua.as_bytes().starts_with(b"git/"));
    if !is_git {
        out.insert(header::USER_AGENT, HeaderValue::from_static(GIT_USER_AGENT));
    }
    out
}
