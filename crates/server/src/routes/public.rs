//! The two unauthenticated maintenance endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use service::notify::{visitor_notification, VisitorNotice};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVisitorDataInput {
    #[serde(default)]
    pub society_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct DeletedOutput {
    pub message: &'static str,
    pub deleted: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    #[serde(default)]
    pub visitor: Option<Value>,
    #[serde(default)]
    pub resident_email: Option<String>,
}

#[derive(Serialize)]
pub struct SentOutput {
    pub message: &'static str,
}

fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[utoipa::path(
    post, path = "/api/delete-visitor-data", tag = "maintenance",
    request_body = crate::openapi::DeleteVisitorDataDoc,
    responses(
        (status = 200, description = "Visitor data deleted successfully"),
        (status = 400, description = "societyId or userId is required"),
        (status = 500, description = "Failed to delete visitor data")
    )
)]
pub async fn delete_visitor_data(
    State(state): State<ServerState>,
    payload: Result<Json<DeleteVisitorDataInput>, JsonRejection>,
) -> Result<Json<DeletedOutput>, JsonApiError> {
    let Json(input) = payload.map_err(|rejection| {
        error!(error = %rejection.body_text(), "delete visitor data failed");
        JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete visitor data", None)
    })?;
    let result = match (present(input.society_id), present(input.user_id)) {
        (Some(society_id), _) => state.visitors.delete_by_society(&society_id).await,
        (None, Some(user_id)) => match Uuid::parse_str(&user_id) {
            Ok(uid) => state.visitors.delete_by_added_by(uid).await,
            // no visitor can have been added by an id that is not a user id
            Err(_) => Ok(0),
        },
        (None, None) => {
            return Err(JsonApiError::new(StatusCode::BAD_REQUEST, "societyId or userId is required", None));
        }
    };
    match result {
        Ok(deleted) => {
            info!(deleted, "visitor_data_deleted");
            Ok(Json(DeletedOutput { message: "Visitor data deleted successfully", deleted }))
        }
        Err(e) => {
            error!(error = %e, "delete visitor data failed");
            Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete visitor data", None))
        }
    }
}

#[utoipa::path(
    post, path = "/api/send-visitor-notification", tag = "maintenance",
    request_body = crate::openapi::NotificationRequestDoc,
    responses(
        (status = 200, description = "Email sent successfully"),
        (status = 400, description = "Missing visitor or residentEmail"),
        (status = 500, description = "Failed to send email")
    )
)]
pub async fn send_visitor_notification(
    State(state): State<ServerState>,
    payload: Result<Json<NotificationInput>, JsonRejection>,
) -> Result<Json<SentOutput>, JsonApiError> {
    let Json(input) = payload.map_err(|rejection| {
        error!(error = %rejection.body_text(), "visitor notification email failed");
        JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email", Some(rejection.body_text()))
    })?;
    let missing = || JsonApiError::new(StatusCode::BAD_REQUEST, "Missing visitor or residentEmail", None);
    let visitor = match input.visitor {
        Some(v) if !v.is_null() => v,
        _ => return Err(missing()),
    };
    let email = present(input.resident_email).ok_or_else(missing)?;
    let notice: VisitorNotice = serde_json::from_value(visitor).map_err(|_| missing())?;

    let msg = visitor_notification(&state.sender, &notice, &email);
    match state.mailer.send(&msg).await {
        Ok(()) => Ok(Json(SentOutput { message: "Email sent successfully" })),
        Err(e) => {
            error!(error = %e, "visitor notification email failed");
            Err(JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send email", Some(e.to_string())))
        }
    }
}
