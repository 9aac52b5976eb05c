use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crate::memory_store::MemoryStore;
use crate::service::ServiceState;
use crate::{app, SESSION_TOKEN_HEADER};

pub struct TestApp {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header(header::LOCATION.as_str())
    }
}

impl TestApp {
    pub fn new() -> Self {
        let state = Arc::new(ServiceState::new(MemoryStore::default()));
        Self { router: app(state) }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, headers, body }
    }
}

fn request(method: Method, path: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(path);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(path: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, path, token).body(Body::empty()).unwrap()
}

pub fn post(path: &str, token: Option<&str>) -> Request<Body> {
    request(Method::POST, path, token).body(Body::empty()).unwrap()
}

pub fn form_post(path: &str, token: Option<&str>, body: &str) -> Request<Body> {
    request(Method::POST, path, token)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Signs a user up and returns their session token.
pub async fn signup(app: &TestApp, username: &str) -> String {
    let body = format!(
        "username={username}&email={username}%40test.com&password1=correcthorse&password2=correcthorse"
    );
    let response = app.send(form_post("/accounts/signup", None, &body)).await;
    assert_eq!(response.status, StatusCode::FOUND, "signup of {username} failed: {}", response.body);
    response.header(SESSION_TOKEN_HEADER).unwrap().to_string()
}
