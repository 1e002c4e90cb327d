use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use courier_db::Database;
use courier_gateway::dispatcher::Dispatcher;

use crate::auth::{AppState, AppStateInner, create_token};
use crate::routes::router;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub state: AppState,
    app: Router,
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            jwt_secret: SECRET.into(),
            token_ttl: chrono::Duration::days(1),
            max_thread_depth: 100,
            dispatcher: Dispatcher::new(),
        });
        Self {
            app: router(state.clone()),
            state,
        }
    }

    /// Seed a user straight into the database, skipping password hashing.
    pub fn user(&self, first_name: &str) -> TestUser {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", first_name.to_lowercase());
        self.state
            .db
            .create_user(&id.to_string(), first_name, "Tester", &email, "not-a-real-hash")
            .unwrap();
        TestUser {
            id,
            token: create_token(SECRET, id, chrono::Duration::days(1)).unwrap(),
        }
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(&user.token), None).await
    }
}
