#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use server::routes;
use server::state::ServerState;
use service::auth::repository::mock::MockAuthRepository;
use service::auth::{AuthService, AuthSettings};
use service::feed::FeedHub;
use service::media::mock::MemoryImageHost;
use service::notify::mock::MemoryMailer;
use service::notify::Sender;
use service::visitors::repository::mock::MockVisitorRepository;
use service::visitors::VisitorService;

pub struct TestApp {
    pub app: Router,
    pub mailer: Arc<MemoryMailer>,
    pub images: Arc<MemoryImageHost>,
}

pub fn build_app() -> TestApp {
    build_app_with(MemoryMailer::default())
}

pub fn build_app_with(mailer: MemoryMailer) -> TestApp {
    let users = Arc::new(MockAuthRepository::default());
    let mailer = Arc::new(mailer);
    let images = Arc::new(MemoryImageHost::default());
    let sender = Sender { name: "GateLog Notifications".into(), address: "noreply@example.com".into() };
    let auth = AuthService::new(
        users.clone(),
        AuthSettings { jwt_secret: "test-secret".into(), token_ttl_hours: 1, password_min_len: 6, password_algorithm: "argon2".into() },
    );
    let visitors = VisitorService::new(
        Arc::new(MockVisitorRepository::default()),
        users,
        FeedHub::new(32),
        mailer.clone(),
        sender.clone(),
    );
    let state = ServerState { auth, visitors, images: images.clone(), mailer: mailer.clone(), sender };
    let app = routes::build_router(state, tower_http::cors::CorsLayer::very_permissive());
    TestApp { app, mailer, images }
}

pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Pulls the verification token out of the last verification email sent.
pub fn last_verification_token(mailer: &MemoryMailer) -> String {
    let sent = mailer.sent();
    let msg = sent
        .iter()
        .rev()
        .find(|m| m.subject.starts_with("Verify"))
        .expect("verification email sent");
    msg.text
        .lines()
        .map(str::trim)
        .find(|l| l.len() == 32 && l.chars().all(|c| c.is_ascii_alphanumeric()))
        .expect("token line")
        .to_string()
}

/// Registers, verifies and logs in; returns the bearer token.
pub async fn signed_in(t: &TestApp, body: Value) -> String {
    let email = body["email"].as_str().unwrap().to_string();
    let password = body["password"].as_str().unwrap().to_string();
    let resp = send(&t.app, json_request("POST", "/auth/register", &body, None)).await;
    assert_eq!(resp.status(), 200);
    let token = last_verification_token(&t.mailer);
    let resp = send(&t.app, json_request("POST", "/auth/verify-email", &serde_json::json!({ "token": token }), None)).await;
    assert_eq!(resp.status(), 200);
    let resp = send(&t.app, json_request("POST", "/auth/login", &serde_json::json!({ "email": email, "password": password }), None)).await;
    assert_eq!(resp.status(), 200);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

pub fn watchman_form(email: &str, society: &str) -> Value {
    serde_json::json!({
        "email": email, "name": "Gate Keeper", "role": "watchman", "phoneNumber": "9000000001",
        "societyId": society, "password": "secret1", "confirmPassword": "secret1"
    })
}

pub fn resident_form(email: &str, name: &str, society: &str, resident_id: &str) -> Value {
    serde_json::json!({
        "email": email, "name": name, "role": "resident", "phoneNumber": "9000000002",
        "residentId": resident_id, "societyId": society, "password": "secret1", "confirmPassword": "secret1"
    })
}
