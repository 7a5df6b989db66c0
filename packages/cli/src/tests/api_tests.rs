use super::{FakeProvider, VIDEO_BYTES};
use crate::api::{self, AppState};
use crate::config::Config;
use animbox_dataset::{PromptDataset, PromptEntry};
use animbox_sandbox::RenderOrchestrator;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const CIRCLE_CODE: &str = "from manim import *\n\nclass DrawCircle(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n";
const BROKEN_CODE: &str = "from manim import *\n\nclass Broken:\n    circle = Circl()\n";

fn setup(config: Config) -> (Router, Arc<FakeProvider>) {
    let dataset = PromptDataset::from_entries(vec![
        PromptEntry::new("Draw a circle on screen", CIRCLE_CODE),
        PromptEntry::new("Broken square animation", BROKEN_CODE),
    ]);
    let provider = Arc::new(FakeProvider::default());
    let orchestrator = RenderOrchestrator::new(provider.clone());
    let app = api::create_router(AppState::new(dataset, orchestrator, config));
    (app, provider)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup(Config::default());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_prompts_endpoint_with_limit() {
    let (app, _) = setup(Config::default());

    let request = Request::builder()
        .uri("/prompts?limit=1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["prompts"], json!(["Draw a circle on screen"]));
}

#[tokio::test]
async fn test_code_endpoint_never_renders() {
    let (app, provider) = setup(Config::default());

    let response = app
        .oneshot(json_request(Method::POST, "/code", json!({"prompt": "CIRCLE"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["prompt"], "Draw a circle on screen");
    assert_eq!(json["code"], CIRCLE_CODE);
    assert_eq!(provider.sessions(), 0);
}

#[tokio::test]
async fn test_generate_streams_video() {
    let (app, provider) = setup(Config::default());

    let response = app
        .oneshot(json_request(Method::POST, "/generate", json!({"prompt": "circle"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"manim_animation_"));
    assert!(disposition.ends_with(".mp4\""));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], VIDEO_BYTES);
    assert_eq!(&bytes[4..8], b"ftyp");
    assert_eq!(provider.sessions(), 1);
    assert_eq!(provider.destroyed(), 1);
}

#[tokio::test]
async fn test_generate_lookup_miss_skips_execution() {
    let (app, provider) = setup(Config::default());

    let response = app
        .oneshot(json_request(Method::POST, "/generate", json!({"prompt": "hexagon"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "No matching code found in database");
    assert_eq!(provider.sessions(), 0);
}

#[tokio::test]
async fn test_generate_failure_returns_diagnostics() {
    let (app, provider) = setup(Config::default());

    let response = app
        .oneshot(json_request(Method::POST, "/generate", json!({"prompt": "broken"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    let details = &json["error"]["details"];
    assert_eq!(json["error"]["code"], "RENDER_FAILED");
    assert_eq!(details["prompt"], "Broken square animation");
    assert_eq!(details["code"], BROKEN_CODE);
    assert!(details["stderr"].as_str().unwrap().contains("NameError"));
    assert!(details.get("provisioning").is_none());
    assert_eq!(provider.destroyed(), 1);
}

#[tokio::test]
async fn test_generate_failure_surfaces_provisioning_when_enabled() {
    let config = Config {
        surface_provisioning_logs: true,
        ..Config::default()
    };
    let (app, _) = setup(config);

    let response = app
        .oneshot(json_request(Method::POST, "/generate", json!({"prompt": "broken"})))
        .await
        .unwrap();

    let json = body_json(response).await;
    let provisioning = json["error"]["details"]["provisioning"].as_str().unwrap();
    assert!(provisioning.starts_with("ready"));
}

#[tokio::test]
async fn test_generate_without_body_picks_random_entry() {
    let (app, provider) = setup(Config::default());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status() == StatusCode::OK
            || response.status() == StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(provider.sessions(), 1);
    assert_eq!(provider.destroyed(), 1);
}

#[tokio::test]
async fn test_generate_rejects_malformed_json() {
    let (app, provider) = setup(Config::default());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"prompt\":"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.sessions(), 0);
}

#[tokio::test]
async fn test_random_endpoint_on_empty_dataset_is_not_found() {
    let provider = Arc::new(FakeProvider::default());
    let app = api::create_router(AppState::new(
        PromptDataset::default(),
        RenderOrchestrator::new(provider.clone()),
        Config::default(),
    ));

    let request = Request::builder()
        .uri("/generate/random")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(provider.sessions(), 0);
}
