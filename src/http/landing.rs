//! Static landing page served at `/`.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

const TEMPLATE: &str = include_str!("../../assets/index.html");
const ORIGIN_TOKEN: &str = "%allowed_origins%";

/// The rendered landing page, shared by all requests.
#[derive(Debug, Clone)]
pub struct LandingPage {
    html: Arc<str>,
}

impl LandingPage {
    pub fn render(allow_origin: &str) -> Self {
        Self {
            html: TEMPLATE.replace(ORIGIN_TOKEN, allow_origin).into(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// The page is answered with 400: `/` is never a valid proxy target.
    pub fn response(&self) -> Response {
        let mut response = Response::new(Body::from(self.html.to_string()));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        response
    }
}
