use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use common::types::{LoginRequest, LoginResponse};
use service::auth::domain::{AuthUser, LoginInput, RegisterInput};
use service::notify::verification_email;

use crate::errors::JsonApiError;
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutput {
    pub user_id: Uuid,
    pub email: String,
    pub email_verified: bool,
}

#[derive(Deserialize)]
pub struct VerifyEmailInput {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ResendInput {
    pub email: String,
}

#[derive(Serialize)]
pub struct MessageOutput {
    pub message: &'static str,
}

/// Mails the verification token; a delivery failure leaves the account usable via resend.
async fn send_verification(state: &ServerState, user: &AuthUser, token: &str) {
    let msg = verification_email(&state.sender, &user.name, &user.email, token);
    if let Err(e) = state.mailer.send(&msg).await {
        warn!(user_id = %user.id, error = %e, "verification email failed");
    }
}

#[utoipa::path(post, path = "/auth/register", tag = "auth", request_body = crate::openapi::RegisterRequest, responses((status = 200, description = "Registered; verification email sent"), (status = 400, description = "Validation Error"), (status = 409, description = "Conflict")))]
pub async fn register(State(state): State<ServerState>, WithRejection(Json(input), _): WithRejection<Json<RegisterInput>, JsonApiError>) -> Result<Json<RegisterOutput>, JsonApiError> {
    let reg = state.auth.register(input).await?;
    send_verification(&state, &reg.user, &reg.verification_token).await;
    Ok(Json(RegisterOutput { user_id: reg.user.id, email: reg.user.email, email_verified: reg.user.email_verified }))
}

#[utoipa::path(post, path = "/auth/verify-email", tag = "auth", request_body = crate::openapi::VerifyEmailRequest, responses((status = 200, description = "Verified"), (status = 404, description = "Unknown token")))]
pub async fn verify_email(State(state): State<ServerState>, WithRejection(Json(input), _): WithRejection<Json<VerifyEmailInput>, JsonApiError>) -> Result<Json<MessageOutput>, JsonApiError> {
    state.auth.verify_email(&input.token).await?;
    Ok(Json(MessageOutput { message: "Email verified" }))
}

#[utoipa::path(post, path = "/auth/resend-verification", tag = "auth", request_body = crate::openapi::ResendVerificationRequest, responses((status = 200, description = "Sent"), (status = 400, description = "Already verified"), (status = 404, description = "Unknown email")))]
pub async fn resend_verification(State(state): State<ServerState>, WithRejection(Json(input), _): WithRejection<Json<ResendInput>, JsonApiError>) -> Result<Json<MessageOutput>, JsonApiError> {
    let reg = state.auth.resend_verification(&input.email).await?;
    send_verification(&state, &reg.user, &reg.verification_token).await;
    Ok(Json(MessageOutput { message: "Verification email sent" }))
}

fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE, token);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

#[utoipa::path(post, path = "/auth/login", tag = "auth", request_body = crate::openapi::LoginRequestDoc, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized"), (status = 403, description = "Email not verified")))]
pub async fn login(State(state): State<ServerState>, jar: CookieJar, WithRejection(Json(input), _): WithRejection<Json<LoginRequest>, JsonApiError>) -> Result<(CookieJar, Json<LoginResponse>), JsonApiError> {
    let session = state.auth.login(LoginInput { email: input.email, password: input.password }).await?;
    let user = session.user;
    let jar = jar.add(session_cookie(session.token.clone()));
    Ok((
        jar,
        Json(LoginResponse {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            society_id: user.society_id,
            token: session.token,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let mut gone = Cookie::from(AUTH_COOKIE);
    gone.set_path("/");
    (jar.remove(gone), StatusCode::NO_CONTENT)
}

#[utoipa::path(get, path = "/auth/me", tag = "auth", responses((status = 200, description = "Current user"), (status = 401, description = "Unauthorized")))]
pub async fn me(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    Json(user)
}

fn bearer_or_cookie(req: &Request) -> Result<Option<String>, ()> {
    if let Some(h) = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => Ok(Some(t.trim().to_string())),
            _ => Err(()),
        };
    }
    let jar = CookieJar::from_headers(req.headers());
    Ok(jar.get(AUTH_COOKIE).map(|c| c.value().to_string()).filter(|t| !t.is_empty()))
}

/// Bearer header or `auth_token` cookie. Missing token is 400, bad or expired is 401.
/// On success the token's claims and the current account are added to request extensions.
pub async fn require_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let token = match bearer_or_cookie(&req) {
        Ok(Some(t)) => t,
        Ok(None) => {
            warn!(path = %path, "missing Authorization header and auth_token cookie");
            return JsonApiError::new(StatusCode::BAD_REQUEST, "Missing Token", None).into_response();
        }
        Err(()) => {
            warn!(path = %path, "invalid Authorization format (expect Bearer)");
            return JsonApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some("expected Bearer token".into())).into_response();
        }
    };
    let claims = match state.auth.decode_token(&token) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path, err = %e, "token validation failed");
            return JsonApiError::from(e).into_response();
        }
    };
    let user = match state.auth.current_user(claims.uid).await {
        Ok(u) => u,
        Err(e) => {
            info!(path = %path, user_id = %claims.uid, err = %e, "token for unknown account");
            return JsonApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some("account no longer exists".into())).into_response();
        }
    };
    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(user);
    next.run(req).await
}
