mod support;

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use serde_json::json;

use support::*;

#[tokio::test]
async fn health_is_public() {
    let t = build_app();
    let resp = send(&t.app, get_request("/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn register_sends_verification_and_blocks_login_until_verified() {
    let t = build_app();
    let form = watchman_form("gate@example.com", "s1");

    let resp = send(&t.app, json_request("POST", "/auth/register", &form, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["email"], "gate@example.com");
    assert_eq!(body["emailVerified"], false);

    let login = json!({ "email": "gate@example.com", "password": "secret1" });
    let resp = send(&t.app, json_request("POST", "/auth/login", &login, None)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["code"], 1005);

    let token = last_verification_token(&t.mailer);
    let resp = send(&t.app, json_request("POST", "/auth/verify-email", &json!({ "token": token }), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&t.app, json_request("POST", "/auth/login", &login, None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));
    let body = body_json(resp).await;
    assert_eq!(body["role"], "watchman");
    assert_eq!(body["societyId"], "s1");
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let t = build_app();
    let form = watchman_form("gate@example.com", "s1");
    assert_eq!(send(&t.app, json_request("POST", "/auth/register", &form, None)).await.status(), StatusCode::OK);
    let resp = send(&t.app, json_request("POST", "/auth/register", &form, None)).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn mismatched_passwords_are_rejected() {
    let t = build_app();
    let mut form = watchman_form("gate@example.com", "s1");
    form["confirmPassword"] = json!("secret2");
    let resp = send(&t.app, json_request("POST", "/auth/register", &form, None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(t.mailer.sent().is_empty());
}

#[tokio::test]
async fn resend_after_verification_is_rejected() {
    let t = build_app();
    let _ = signed_in(&t, watchman_form("gate@example.com", "s1")).await;
    let resp = send(&t.app, json_request("POST", "/auth/resend-verification", &json!({ "email": "gate@example.com" }), None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let t = build_app();
    let _ = signed_in(&t, watchman_form("gate@example.com", "s1")).await;
    let login = json!({ "email": "gate@example.com", "password": "nope-nope" });
    let resp = send(&t.app, json_request("POST", "/auth/login", &login, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let t = build_app();

    let resp = send(&t.app, get_request("/auth/me", None)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Missing Token");

    let resp = send(&t.app, get_request("/auth/me", Some("not-a-jwt"))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&t.app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let t = build_app();
    let token = signed_in(&t, watchman_form("gate@example.com", "s1")).await;

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::COOKIE, format!("auth_token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = send(&t.app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    assert_eq!(me["email"], "gate@example.com");
    assert_eq!(me["emailVerified"], true);
}

#[tokio::test]
async fn deleted_account_token_stops_working() {
    let t = build_app();
    let token = signed_in(&t, watchman_form("gate@example.com", "s1")).await;
    let relief = signed_in(&t, watchman_form("relief@example.com", "s1")).await;
    let visitor = json!({ "name": "Ravi", "phoneNumber": "9876543210", "purpose": "Delivery", "residentId": "101" });
    for gate in [&token, &token, &relief] {
        let resp = send(&t.app, json_request("POST", "/api/visitors", &visitor, Some(gate))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&t.app, json_request("DELETE", "/api/users/me", &json!({}), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Account deleted");
    assert_eq!(body["deletedVisitors"], 2);

    let resp = send(&t.app, get_request("/api/visitors", Some(&relief))).await;
    assert_eq!(body_json(resp).await["total"], 1);

    let resp = send(&t.app, get_request("/auth/me", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_image_upload_updates_account() {
    let t = build_app();
    let token = signed_in(&t, watchman_form("gate@example.com", "s1")).await;

    let req = Request::builder()
        .method("PUT")
        .uri("/api/users/me/image")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(vec![0x89u8, b'P', b'N', b'G']))
        .unwrap();
    let resp = send(&t.app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    let url = me["imageUrl"].as_str().unwrap();
    assert!(url.starts_with("https://images.test/"));
    assert!(url.ends_with(".png"));

    let req = Request::builder()
        .method("PUT")
        .uri("/api/users/me/image")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&t.app, req).await.status(), StatusCode::BAD_REQUEST);
}
