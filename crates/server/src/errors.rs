use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use models::errors::ModelError;
use service::auth::errors::AuthError;
use service::errors::ServiceError;

/// JSON error body: `{"error": title, "details"?: message, "code"?: n}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub title: String,
    pub details: Option<String>,
    pub code: Option<u16>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u16>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, title: impl Into<String>, details: Option<String>) -> Self {
        Self { status, title: title.into(), details, code: None }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, title = %self.title, details = ?self.details, "request failed");
        }
        let body = ErrorBody { error: &self.title, details: self.details.as_deref(), code: self.code };
        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let (status, title) = match &e {
            ServiceError::Validation(_) | ServiceError::Model(ModelError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "Validation Error")
            }
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ServiceError::NotFound(_) | ServiceError::Model(ModelError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Not Found")
            }
            ServiceError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream Error"),
            ServiceError::Db(_) | ServiceError::Model(ModelError::Db(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        };
        JsonApiError::new(status, title, Some(e.to_string()))
    }
}

/// Extractor rejections keep axum's status and message, rendered as a JSON body.
macro_rules! from_rejection {
    ($($rejection:ty),+) => {$(
        impl From<$rejection> for JsonApiError {
            fn from(r: $rejection) -> Self {
                JsonApiError::new(r.status(), "Invalid Request", Some(r.body_text()))
            }
        }
    )+};
}

from_rejection!(JsonRejection, QueryRejection, PathRejection);

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        let (status, title) = match &e {
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error"),
            AuthError::Conflict => (StatusCode::CONFLICT, "Conflict"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "Not Found"),
            AuthError::Unauthorized | AuthError::TokenError(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AuthError::EmailNotVerified => (StatusCode::FORBIDDEN, "Email Not Verified"),
            AuthError::HashError(_) | AuthError::Repository(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Error")
            }
        };
        let code = e.code();
        JsonApiError::new(status, title, Some(e.to_string())).with_code(code)
    }
}
