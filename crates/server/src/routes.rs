use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{TraceLayer, DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, DefaultOnFailure},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;
use service::media::MAX_IMAGE_BYTES;

use crate::openapi::ApiDoc;
use crate::state::ServerState;

pub mod auth;
pub mod public;
pub mod users;
pub mod visitors;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

/// Build the full application router: public, authenticated and docs routes.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/api/delete-visitor-data", post(public::delete_visitor_data))
        .route("/api/send-visitor-notification", post(public::send_visitor_notification));

    let uploads = Router::new()
        .route("/api/users/me/image", put(users::set_profile_image))
        .route("/api/uploads/image", post(users::upload_image))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/api/users/me", delete(users::delete_me))
        .route("/api/visitors", get(visitors::list).post(visitors::create))
        .route("/api/visitors/sync", post(visitors::sync))
        .route("/api/visitors/stats", get(visitors::stats))
        .route("/api/visitors/heatmap", get(visitors::heatmap))
        .route("/api/visitors/purposes", get(visitors::purposes))
        .route("/api/visitors/export.csv", get(visitors::export_csv))
        .route("/api/visitors/feed", get(visitors::feed))
        .route("/api/visitors/:id", get(visitors::get))
        .route("/api/visitors/:id/status", put(visitors::set_status))
        .route("/api/residents", get(visitors::residents))
        .merge(uploads)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth));

    public
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
