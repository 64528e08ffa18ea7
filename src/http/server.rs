//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Build the shared, read-only application state
//! - Create the Axum router and wire middleware (tracing, request id)
//! - Dispatch each request: CORS → classification → forwarding → outcome
//! - Expose the engine both as a terminal handler and as a middleware
//!
//! # Request Flow
//! ```text
//! request ─▶ OPTIONS? ──yes──▶ 200 + preflight headers
//!               │no
//!               ▼
//!            path "/"? ─yes─▶ landing page (400) / next
//!               │no
//!               ▼
//!            is_allowed? ─no─▶ 403 / next
//!               │yes
//!               ▼
//!            resolve target ─err─▶ 400 / next
//!               │
//!               ▼
//!            forward ─err─▶ 502 / next
//!               │
//!               ▼
//!            streamed upstream response
//! ```
//! CORS headers are attached to every response that leaves the engine.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::cors::{is_preflight, CorsPolicy};
use crate::http::forward::Forwarder;
use crate::http::landing::LandingPage;
use crate::http::outcome::{reject, Mode, Rejection};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::security::is_allowed;

/// Errors building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid allow origin: {0}")]
    AllowOrigin(#[from] InvalidHeaderValue),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into handlers.
///
/// Built once at startup and never mutated.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub cors: CorsPolicy,
    pub forwarder: Forwarder,
    pub landing: LandingPage,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, StateError> {
        let cors = CorsPolicy::new(&config.cors.allow_origin)?;
        let forwarder = Forwarder::new(config.upstream.clone())?;
        let landing = LandingPage::render(&config.cors.allow_origin);

        Ok(Self {
            config: Arc::new(config),
            cors,
            forwarder,
            landing,
        })
    }
}

/// What the engine did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Preflight,
    Forwarded,
    Rejected(Rejection),
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Preflight => "preflight",
            Outcome::Forwarded => "forwarded",
            Outcome::Rejected(r) => r.as_str(),
        }
    }
}

/// HTTP server for the CORS proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StateError> {
        let state = AppState::new(config)?;
        let config = state.config.clone();
        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// No router-wide timeout: it would cut off long pushes and answer
    /// without CORS headers. Upstream timeouts live in the forwarder.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving it some other way.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allow_origin = %self.config.cors.allow_origin,
            insecure_origins = ?self.config.upstream.insecure_origins,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Mount the proxy in front of `app`.
///
/// Requests the proxy will not forward fall through to `app` instead of
/// being answered with an error status.
pub fn mount(app: Router, state: AppState) -> Router {
    app.layer(middleware::from_fn_with_state(state, cors_proxy_middleware))
}

/// Terminal handler: the proxy answers every request itself.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    handle(&state, request, Mode::Terminal).await
}

/// Middleware entry point: rejected requests continue down the chain.
pub async fn cors_proxy_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    handle(&state, request, Mode::Chained(next)).await
}

/// Run one exchange through the engine.
pub async fn handle(state: &AppState, request: Request<Body>, mode: Mode) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let chained = mode.is_chained();

    let (outcome, mut response) = dispatch(state, request, mode).await;

    let delegated = chained && matches!(outcome, Outcome::Rejected(_));
    if delegated {
        // The downstream handler's own CORS headers win.
        let mut cors = HeaderMap::new();
        state.cors.annotate(&method, &mut cors);
        let headers = response.headers_mut();
        for (name, value) in cors.iter() {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
    } else {
        state.cors.annotate(&method, response.headers_mut());
    }

    metrics::record_request(
        method.as_str(),
        if delegated { "delegated" } else { outcome.as_str() },
        response.status().as_u16(),
        start,
    );
    response
}

async fn dispatch(state: &AppState, request: Request<Body>, mode: Mode) -> (Outcome, Response) {
    if is_preflight(request.method()) {
        return (Outcome::Preflight, state.cors.preflight_response());
    }

    if request.uri().path() == "/" {
        let rejection = Rejection::LandingPage;
        return (Outcome::Rejected(rejection), reject(mode, rejection, request, &state.landing).await);
    }

    let request_id = request_id(request.headers()).to_string();

    if !is_allowed(request.method(), request.uri(), request.headers()) {
        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
            "Request is not a Git smart-HTTP exchange"
        );
        let rejection = Rejection::Disallowed;
        return (Outcome::Rejected(rejection), reject(mode, rejection, request, &state.landing).await);
    }

    if state.config.observability.debug {
        tracing::info!(request_id = %request_id, "{} {}", request.method(), request.uri());
    }

    let origin = match state.forwarder.resolve(request.uri()) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Cannot resolve upstream target");
            let rejection = Rejection::MalformedTarget;
            return (Outcome::Rejected(rejection), reject(mode, rejection, request, &state.landing).await);
        }
    };

    let (parts, body) = request.into_parts();
    match state.forwarder.forward(&parts, body, &origin).await {
        Ok(response) => (Outcome::Forwarded, response),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            let rejection = Rejection::UpstreamFailed;
            // The body went upstream; the rest of the chain sees the head only.
            let request = Request::from_parts(parts, Body::empty());
            (Outcome::Rejected(rejection), reject(mode, rejection, request, &state.landing).await)
        }
    }
}
