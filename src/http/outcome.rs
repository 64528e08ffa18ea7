//! Terminal outcomes and middleware fall-through.
//!
//! The engine runs either as the final handler of a server or as one
//! middleware in a larger axum stack. Whenever it decides not to answer a
//! request itself, the mode picks what happens next:
//!
//! | Rejection          | Terminal               | Chained      |
//! |--------------------|------------------------|--------------|
//! | `LandingPage`      | 400 + landing page     | next handler |
//! | `Disallowed`       | 403, empty             | next handler |
//! | `MalformedTarget`  | 400, empty             | next handler |
//! | `UpstreamFailed`   | 502, empty             | next handler |

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::landing::LandingPage;

/// How the engine is mounted.
pub enum Mode {
    /// Final handler: every rejection is answered with a status code.
    Terminal,
    /// Middleware: rejected requests go to the rest of the chain.
    Chained(Next),
}

impl Mode {
    pub fn is_chained(&self) -> bool {
        matches!(self, Mode::Chained(_))
    }
}

/// A request the engine will not forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `/` was requested.
    LandingPage,
    /// Not a Git smart-HTTP exchange.
    Disallowed,
    /// No `/host/path` in the request path.
    MalformedTarget,
    /// The upstream fetch failed before a response arrived.
    UpstreamFailed,
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::LandingPage | Rejection::MalformedTarget => StatusCode::BAD_REQUEST,
            Rejection::Disallowed => StatusCode::FORBIDDEN,
            Rejection::UpstreamFailed => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::LandingPage => "landing_page",
            Rejection::Disallowed => "disallowed",
            Rejection::MalformedTarget => "malformed_target",
            Rejection::UpstreamFailed => "upstream_failed",
        }
    }
}

/// Finish a rejected exchange according to `mode`.
pub async fn reject(
    mode: Mode,
    rejection: Rejection,
    request: Request<Body>,
    landing: &LandingPage,
) -> Response {
    match mode {
        Mode::Chained(next) => next.run(request).await,
        Mode::Terminal if rejection == Rejection::LandingPage => landing.response(),
        Mode::Terminal => empty(rejection.status()),
    }
}

/// A bodiless response; rejections never explain themselves.
pub fn empty(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
