#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, TimeDelta, Utc};
use recipe_catalog::handlers::router;
use recipe_catalog::{AppState, Clock, MemoryStore, RateLimiter, RatePolicies};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

// Hand-driven clock shared between a test and the limiter it feeds
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += TimeDelta::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn sarma_body() -> Value {
    json!({
        "title": "Sarma",
        "lead": "Tradicionalna sarma od kiselog kupusa",
        "imageId": "/recipes/sarma/hero.jpg",
        "prepTime": 180,
        "servings": 8,
        "difficulty": "HARD",
        "mealGroup": "MAIN_DISH",
        "prepMethod": "COOKING",
        "tags": ["tradicionalno", "zimsko"],
        "ingredients": [{ "name": "Kiseli kupus", "quantity": "1", "unit": "glavica" }],
        "steps": [{ "order": 1, "instruction": "Oprati listove kupusa" }]
    })
}

pub fn titled(title: &str) -> Value {
    let mut body = sarma_body();
    body["title"] = json!(title);
    body
}

pub fn test_app(policies: RatePolicies) -> (Router, AppState) {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(RateLimiter::new()),
        policies,
    );
    (router(state.clone()), state)
}

pub fn request(method: &str, uri: &str, client: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", client);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// Body sent verbatim, for payloads that are not valid JSON
pub fn raw_request(
    method: &str,
    uri: &str,
    client: &str,
    content_type: Option<&str>,
    body: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
