use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{sse::{Event, KeepAlive, Sse}, IntoResponse},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use axum_extra::extract::WithRejection;
use futures::stream::{self, Stream};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use common::types::{SyncOutcome, VisitorRecord, VisitorStatus, VisitorSubmission};
use service::auth::domain::AuthUser;
use service::pagination::{Page, Pagination};
use service::visitors::domain::{Caller, Heatmap, ResidentEntry, VisitorFilter, VisitorStats};

use crate::errors::JsonApiError;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<VisitorStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: VisitorStatus,
}

#[derive(Debug, Deserialize)]
pub struct PrefixQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub today: Option<NaiveDate>,
}

#[utoipa::path(
    get, path = "/api/visitors", tag = "visitors",
    params(
        ("status" = Option<String>, Query, description = "pending | approved | rejected"),
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("per_page" = Option<u32>, Query, description = "1..=100, default 20")
    ),
    responses((status = 200, description = "Visitors in the caller's scope, newest first"))
)]
pub async fn list(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<ListQuery>, JsonApiError>,
) -> Result<Json<Page<VisitorRecord>>, JsonApiError> {
    let defaults = Pagination::default();
    let page = Pagination { page: q.page.unwrap_or(defaults.page), per_page: q.per_page.unwrap_or(defaults.per_page) };
    let out = state.visitors.list(&Caller::from(&user), VisitorFilter { status: q.status }, page).await?;
    Ok(Json(out))
}

#[utoipa::path(
    post, path = "/api/visitors", tag = "visitors",
    request_body = crate::openapi::VisitorSubmissionDoc,
    responses(
        (status = 201, description = "Created"),
        (status = 400, description = "Validation Error"),
        (status = 403, description = "Residents cannot add visitors")
    )
)]
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(input), _): WithRejection<Json<VisitorSubmission>, JsonApiError>,
) -> Result<(StatusCode, Json<VisitorRecord>), JsonApiError> {
    let v = state.visitors.create(&Caller::from(&user), input).await?;
    Ok((StatusCode::CREATED, Json(v)))
}

#[utoipa::path(
    get, path = "/api/visitors/{id}", tag = "visitors",
    params(("id" = Uuid, Path, description = "Visitor ID")),
    responses((status = 200, description = "OK"), (status = 404, description = "Not Found"))
)]
pub async fn get(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
) -> Result<Json<VisitorRecord>, JsonApiError> {
    Ok(Json(state.visitors.get(&Caller::from(&user), id).await?))
}

#[utoipa::path(
    put, path = "/api/visitors/{id}/status", tag = "visitors",
    params(("id" = Uuid, Path, description = "Visitor ID")),
    request_body = crate::openapi::StatusUpdateDoc,
    responses(
        (status = 200, description = "Updated"),
        (status = 400, description = "Status must be approved or rejected"),
        (status = 403, description = "Already decided"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_status(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, JsonApiError>,
    WithRejection(Json(input), _): WithRejection<Json<StatusInput>, JsonApiError>,
) -> Result<Json<VisitorRecord>, JsonApiError> {
    Ok(Json(state.visitors.set_status(&Caller::from(&user), id, input.status).await?))
}

#[utoipa::path(
    post, path = "/api/visitors/sync", tag = "visitors",
    request_body = [crate::openapi::VisitorSubmissionDoc],
    responses((status = 200, description = "Per-entry outcome, in submission order"))
)]
pub async fn sync(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(batch), _): WithRejection<Json<Vec<VisitorSubmission>>, JsonApiError>,
) -> Json<Vec<SyncOutcome>> {
    Json(state.visitors.sync_offline(&Caller::from(&user), batch).await)
}

pub async fn stats(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<VisitorStats>, JsonApiError> {
    Ok(Json(state.visitors.stats(&Caller::from(&user)).await?))
}

pub async fn heatmap(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<HeatmapQuery>, JsonApiError>,
) -> Result<Json<Heatmap>, JsonApiError> {
    let today = q.today.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.visitors.heatmap(&Caller::from(&user), today).await?))
}

pub async fn purposes(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<PrefixQuery>, JsonApiError>,
) -> Result<Json<Vec<String>>, JsonApiError> {
    Ok(Json(state.visitors.purpose_suggestions(&Caller::from(&user), &q.prefix).await?))
}

pub async fn residents(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Query(q), _): WithRejection<Query<PrefixQuery>, JsonApiError>,
) -> Result<Json<Vec<ResidentEntry>>, JsonApiError> {
    Ok(Json(state.visitors.resident_directory(&Caller::from(&user), &q.prefix).await?))
}

#[utoipa::path(
    get, path = "/api/visitors/export.csv", tag = "visitors",
    responses((status = 200, description = "CSV of visitors in scope", content_type = "text/csv"), (status = 400, description = "No visitors to export"))
)]
pub async fn export_csv(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, JsonApiError> {
    let csv = state.visitors.export_csv(&Caller::from(&user)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"visitors.csv\""),
        ],
        csv,
    ))
}

/// Live feed as Server-Sent Events, filtered to the caller's scope.
pub async fn feed(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, JsonApiError> {
    let sub = state.visitors.subscribe(&Caller::from(&user))?;
    let events = stream::unfold(sub, |mut sub| async move {
        loop {
            let ev = sub.next().await?;
            match Event::default().event(ev.kind()).json_data(&ev) {
                Ok(event) => return Some((Ok(event), sub)),
                Err(e) => warn!(error = %e, "skipping unserializable feed event"),
            }
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
