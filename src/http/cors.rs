//! CORS response annotation.
//!
//! Runs on every request before classification. Preflights (`OPTIONS`) are
//! answered here with 200 and an empty body; nothing downstream sees them.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::Response,
};

use crate::security::headers::{joined, EXPOSE_HEADERS, FORWARD_HEADERS};

/// Methods advertised in `Access-Control-Allow-Methods`.
pub const ALLOW_METHODS: &[&str] = &["POST", "GET", "OPTIONS"];

/// Preflight cache lifetime (24 hours).
pub const MAX_AGE_SECS: u64 = 60 * 60 * 24;

/// Credentials are never allowed.
const ALLOW_CREDENTIALS: bool = false;

/// Precomputed CORS header values, built once at startup.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    expose_headers: Option<HeaderValue>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
}

impl CorsPolicy {
    /// Build the policy for `allow_origin`.
    ///
    /// Fails only if the origin is not a valid header value, which config
    /// validation already rules out.
    pub fn new(allow_origin: &str) -> Result<Self, header::InvalidHeaderValue> {
        let expose_headers = if EXPOSE_HEADERS.is_empty() {
            None
        } else {
            Some(HeaderValue::from_str(&joined(EXPOSE_HEADERS))?)
        };

        Ok(Self {
            allow_origin: HeaderValue::from_str(allow_origin)?,
            expose_headers,
            allow_methods: HeaderValue::from_str(&joined(ALLOW_METHODS))?,
            allow_headers: HeaderValue::from_str(&joined(FORWARD_HEADERS))?,
            max_age: HeaderValue::from(MAX_AGE_SECS),
        })
    }

    /// Attach the CORS headers for a request with `method`.
    pub fn annotate(&self, method: &Method, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        if ALLOW_CREDENTIALS {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(expose) = &self.expose_headers {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }

        if is_preflight(method) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        }
    }

    /// The 200 answer to every preflight, whatever its target.
    pub fn preflight_response(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;
        self.annotate(&Method::OPTIONS, response.headers_mut());
        response
    }
}

pub fn is_preflight(method: &Method) -> bool {
    method == Method::OPTIONS
}
