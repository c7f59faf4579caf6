use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    /// resident | watchman | committee
    pub role: String,
    pub phone_number: String,
    pub apartment: Option<String>,
    /// Apartment number, required for residents
    pub resident_id: Option<String>,
    pub society_id: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(ToSchema)]
pub struct LoginRequestDoc { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct VerifyEmailRequest { pub token: String }

#[derive(ToSchema)]
pub struct ResendVerificationRequest { pub email: String }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct VisitorSubmissionDoc {
    pub name: String,
    pub phone_number: String,
    pub purpose: String,
    pub vehicle_number: Option<String>,
    pub resident_id: String,
    pub resident_name: Option<String>,
    pub image_url: Option<String>,
    /// Capture time, only for offline replays
    pub timestamp: Option<String>,
}

#[derive(ToSchema)]
pub struct StatusUpdateDoc {
    /// approved | rejected
    pub status: String,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct DeleteVisitorDataDoc { pub society_id: Option<String>, pub user_id: Option<String> }

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct NotificationRequestDoc {
    #[schema(value_type = Object)]
    pub visitor: serde_json::Value,
    pub resident_email: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::verify_email,
        crate::routes::auth::resend_verification,
        crate::routes::auth::me,
        crate::routes::visitors::list,
        crate::routes::visitors::create,
        crate::routes::visitors::get,
        crate::routes::visitors::set_status,
        crate::routes::visitors::sync,
        crate::routes::visitors::export_csv,
        crate::routes::users::set_profile_image,
        crate::routes::users::delete_me,
        crate::routes::users::upload_image,
        crate::routes::public::delete_visitor_data,
        crate::routes::public::send_visitor_notification,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequestDoc,
            VerifyEmailRequest,
            ResendVerificationRequest,
            VisitorSubmissionDoc,
            StatusUpdateDoc,
            DeleteVisitorDataDoc,
            NotificationRequestDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "visitors"),
        (name = "users"),
        (name = "maintenance")
    )
)]
pub struct ApiDoc;
