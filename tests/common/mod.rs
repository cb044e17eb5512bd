#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use forum_core::{
    AppState,
    auth::issue_session,
    cache::MemoryCache,
    config::Config,
    create_app,
    models::{Account, ContentRecord, UserRole},
    stores::MemoryStore,
};
use serde_json::Value;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn test_app() -> TestApp {
    test_app_with(Config::in_memory(JWT_SECRET))
}

pub fn test_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, store.clone(), Arc::new(MemoryCache::new()));
    TestApp {
        router: create_app(state.clone()),
        state,
        store,
    }
}

impl TestApp {
    /// Seeds an account and signs it in.
    pub async fn account(&self, username: &str, role: UserRole) -> (Account, String) {
        let account = Account::new(username, role);
        self.store.insert_account(account.clone()).unwrap();
        let token = issue_session(
            self.state.cache.as_ref(),
            &account,
            self.state.config.session_ttl_secs,
            &self.state.config.jwt_secret,
        )
        .await
        .unwrap();
        (account, token)
    }

    pub fn post_by(&self, author: &Account) -> ContentRecord {
        let post = ContentRecord::post(author.id);
        self.store.insert_content(post.clone()).unwrap();
        post
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }
}
