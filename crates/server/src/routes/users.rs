use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap},
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use service::auth::domain::AuthUser;

use crate::errors::JsonApiError;
use crate::routes::auth::AUTH_COOKIE;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[derive(Serialize)]
pub struct UploadOutput {
    pub url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDeleted {
    pub message: &'static str,
    pub deleted_visitors: usize,
}

/// File name for the image host, derived from the content type when none is given.
fn upload_name(headers: &HeaderMap, explicit: Option<String>, stem: &str) -> String {
    if let Some(name) = explicit.filter(|n| !n.trim().is_empty()) {
        return name;
    }
    let ext = match headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => "jpg",
    };
    format!("{stem}.{ext}")
}

#[utoipa::path(
    put, path = "/api/users/me/image", tag = "users",
    responses((status = 200, description = "Profile updated"), (status = 400, description = "Empty body"), (status = 502, description = "Image host failed"))
)]
pub async fn set_profile_image(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AuthUser>, JsonApiError> {
    let name = upload_name(&headers, None, &format!("profile-{}", user.id));
    let url = state.images.upload(body.to_vec(), &name).await?;
    let updated = state.auth.set_profile_image(user.id, &url).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete, path = "/api/users/me", tag = "users",
    responses((status = 200, description = "Account and the visitors it logged are deleted"))
)]
pub async fn delete_me(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AccountDeleted>), JsonApiError> {
    state.auth.delete_account(user.id).await?;
    // the account is gone either way; a failed purge can be retried via /api/delete-visitor-data
    let deleted_visitors = state.visitors.delete_by_added_by(user.id).await.map_err(|e| {
        error!(user_id = %user.id, error = %e, "visitor purge after account removal failed");
        e
    })?;
    info!(user_id = %user.id, deleted_visitors, "account_removed");
    let mut gone = Cookie::from(AUTH_COOKIE);
    gone.set_path("/");
    Ok((jar.remove(gone), Json(AccountDeleted { message: "Account deleted", deleted_visitors })))
}

#[utoipa::path(
    post, path = "/api/uploads/image", tag = "users",
    params(("filename" = Option<String>, Query, description = "Name to store the image under")),
    responses((status = 200, description = "Uploaded; body carries the public URL"), (status = 400, description = "Empty body"))
)]
pub async fn upload_image(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<UploadQuery>, JsonApiError>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadOutput>, JsonApiError> {
    let name = upload_name(&headers, q.filename, &format!("visitor-{}", chrono::Utc::now().timestamp_millis()));
    let url = state.images.upload(body.to_vec(), &name).await?;
    info!(user_id = %user.id, url = %url, "visitor_image_uploaded");
    Ok(Json(UploadOutput { url }))
}
