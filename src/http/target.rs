//! Upstream target resolution.
//!
//! The first path segment names the upstream host, the rest is the path on
//! that host:
//!
//! ```text
//! /github.com/user/repo.git/info/refs?service=git-upload-pack
//!  └─ host ──┘└──────── path ───────┘└──────── query ────────┘
//! ```

use axum::http::Uri;
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    /// The path does not have the `/host/rest` shape.
    #[error("malformed target path '{0}'")]
    Malformed(String),

    /// The pieces did not assemble into a valid URL.
    #[error("invalid upstream url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Host and remaining path taken from the incoming request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTarget<'a> {
    pub host: &'a str,
    pub path: &'a str,
}

impl<'a> ParsedTarget<'a> {
    pub fn parse(path: &'a str) -> Result<Self, TargetError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| TargetError::Malformed(path.to_string()))?;

        match rest.split_once('/') {
            Some((host, path)) if !host.is_empty() => Ok(Self { host, path }),
            _ => Err(TargetError::Malformed(path.to_string())),
        }
    }
}

/// Fully resolved upstream location for one request.
#[derive(Debug, Clone)]
pub struct UpstreamOrigin {
    pub url: Url,
}

impl UpstreamOrigin {
    /// Resolve the upstream URL for `uri`, picking `http` for hosts in the
    /// insecure set and `https` otherwise.
    pub fn resolve(uri: &Uri, upstream: &UpstreamConfig) -> Result<Self, TargetError> {
        let target = ParsedTarget::parse(uri.path())?;
        let scheme = if upstream.is_insecure(target.host) { "http" } else { "https" };

        let mut raw = format!("{}://{}/{}", scheme, target.host, target.path);
        if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
            raw.push('?');
            raw.push_str(query);
        }

        match Url::parse(&raw) {
            Ok(url) => Ok(Self { url }),
            Err(source) => Err(TargetError::InvalidUrl { url: raw, source }),
        }
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }
}
