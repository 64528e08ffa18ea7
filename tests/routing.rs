//! Dispatch decisions in terminal and middleware mode.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use git_cors_proxy::http::mount;
use git_cors_proxy::{AppState, HttpServer, ProxyConfig};
use tower::ServiceExt;

mod common;

const FALLBACK_STATUS: StatusCode = StatusCode::IM_A_TEAPOT;

fn terminal(config: ProxyConfig) -> Router {
    HttpServer::new(config).unwrap().router()
}

fn chained(config: ProxyConfig) -> Router {
    let app = Router::new().fallback(|| async { (FALLBACK_STATUS, "from the app") });
    mount(app, AppState::new(config).unwrap())
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_preflight_always_succeeds() {
    for uri in [
        "/github.com/user/repo.git/info/refs?service=git-upload-pack",
        "/github.com/user/repo.git/git-upload-pack",
        "/",
        "/not/a/git/path",
    ] {
        let request = Request::options(uri)
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = send(terminal(common::proxy_config(&[])), request).await;

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let headers = response.headers().clone();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "POST,GET,OPTIONS");
        assert_eq!(headers["access-control-max-age"], "86400");
        assert!(headers["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .contains("git-protocol"));
        assert!(body_text(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_preflight_is_answered_in_middleware_mode() {
    let request = Request::options("/anything").body(Body::empty()).unwrap();
    let response = send(chained(common::proxy_config(&[])), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("access-control-max-age"));
}

#[tokio::test]
async fn test_landing_page() {
    let mut config = common::proxy_config(&[]);
    config.cors.allow_origin = "https://app.example.com".into();

    let response = send(terminal(config), get("/")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["content-type"], "text/html");
    assert_eq!(response.headers()["access-control-allow-origin"], "https://app.example.com");
    let html = body_text(response).await;
    assert!(html.contains("https://app.example.com"));
    assert!(!html.contains("%allowed_origins%"));
}

#[tokio::test]
async fn test_landing_page_falls_through_in_middleware_mode() {
    let response = send(chained(common::proxy_config(&[])), get("/")).await;

    assert_eq!(response.status(), FALLBACK_STATUS);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_text(response).await, "from the app");
}

#[tokio::test]
async fn test_disallowed_requests_are_forbidden() {
    let requests = vec![
        get("/github.com/user/repo.git/info/refs"),
        get("/github.com/user/repo.git/info/refs?service=git-archive"),
        get("/github.com/user/repo.git/objects/info/packs"),
        Request::post("/github.com/user/repo.git/git-upload-pack")
            .header("content-type", "application/x-git-receive-pack-request")
            .body(Body::empty())
            .unwrap(),
        Request::put("/github.com/user/repo.git/git-upload-pack")
            .header("content-type", "application/x-git-upload-pack-request")
            .body(Body::empty())
            .unwrap(),
    ];

    for request in requests {
        let uri = request.uri().clone();
        let response = send(terminal(common::proxy_config(&[])), request).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert!(body_text(response).await.is_empty(), "{uri}");
    }
}

#[tokio::test]
async fn test_disallowed_falls_through_in_middleware_mode() {
    let response = send(chained(common::proxy_config(&[])), get("/static/app.js")).await;
    assert_eq!(response.status(), FALLBACK_STATUS);
}

#[tokio::test]
async fn test_malformed_target_is_bad_request() {
    let request = Request::post("/git-upload-pack")
        .header("content-type", "application/x-git-upload-pack-request")
        .body(Body::empty())
        .unwrap();
    let response = send(terminal(common::proxy_config(&[])), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_falls_through_in_middleware_mode() {
    let dead = common::closed_port().await;
    let uri = format!("/{}/repo.git/info/refs?service=git-upload-pack", dead);

    let response = send(chained(common::proxy_config(&[dead])), get(&uri)).await;
    assert_eq!(response.status(), FALLBACK_STATUS);

    let response = send(terminal(common::proxy_config(&[dead])), get(&uri)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(body_text(response).await.is_empty());
}
