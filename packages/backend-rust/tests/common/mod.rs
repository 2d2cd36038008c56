#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use repitis_backend::auth::sign_jwt_hs256;
use repitis_backend::config::Config;

pub const TEST_SECRET: &str = "test-secret-for-integration";

pub struct TestApp {
    pub router: Router,
    _dir: TempDir,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

pub async fn create_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("repitis-test.db");

    let mut config = Config {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        jwt_secret: Some(TEST_SECRET.to_string()),
        ..Config::default()
    };
    customize(&mut config);

    let router = repitis_backend::create_app(config)
        .await
        .expect("test app should build");
    TestApp { router, _dir: dir }
}

pub fn token(user_id: &str) -> String {
    sign_jwt_hs256(user_id, TEST_SECRET, 3600).expect("sign token")
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(user)));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        read_json(response).await
    }

    pub async fn post_json(&self, uri: &str, user: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token(user)))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        read_json(self.send(request).await).await
    }

    pub async fn next_card(&self, user: &str) -> Value {
        let (status, body) = self.get("/api/v1/cards/next", Some(user)).await;
        assert_eq!(status, StatusCode::OK, "next card failed: {body}");
        body
    }

    pub async fn review(&self, user: &str, card_id: &str, rating: u8) -> (StatusCode, Value) {
        self.post_json(
            &format!("/api/v1/cards/{card_id}/review"),
            user,
            &format!("{{\"rating\": {rating}}}"),
        )
        .await
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
