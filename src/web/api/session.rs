use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::cache::CacheSnapshot;
use crate::session::{activity_options, ActivityOption, ActivityType, SessionStatus, StopSummary};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivityRequest {
    pub activity_type: ActivityType,
}

#[utoipa::path(
    post,
    path = "/api/session/start",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Recording started", body = SessionStatus),
        (status = 409, description = "Already recording", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<SessionStatus>> {
    require_permission(&user, Permission::Control)?;
    let mut session = state.session.lock().await;
    Ok(Json(session.start()?))
}

#[utoipa::path(
    post,
    path = "/api/session/stop",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Recording stopped", body = StopSummary),
        (status = 409, description = "Not recording", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn stop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<StopSummary>> {
    require_permission(&user, Permission::Control)?;
    let mut session = state.session.lock().await;
    Ok(Json(session.stop().await?))
}

#[utoipa::path(
    put,
    path = "/api/session/activity",
    request_body = SetActivityRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Activity type changed", body = SessionStatus),
        (status = 409, description = "Stop recording first", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn set_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<SetActivityRequest>,
) -> ApiResult<Json<SessionStatus>> {
    require_permission(&user, Permission::Control)?;
    let mut session = state.session.lock().await;
    Ok(Json(session.set_activity_type(request.activity_type)?))
}

#[utoipa::path(
    get,
    path = "/api/session/status",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Session state", body = SessionStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn status(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<SessionStatus>> {
    let session = state.session.lock().await;
    Ok(Json(session.status()))
}

#[utoipa::path(
    get,
    path = "/api/session/samples",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Latest cached sample per channel", body = CacheSnapshot),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "session"
)]
pub async fn samples(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> ApiResult<Json<CacheSnapshot>> {
    let session = state.session.lock().await;
    Ok(Json(session.latest_samples()))
}

#[utoipa::path(
    get,
    path = "/api/activities",
    responses(
        (status = 200, description = "Selectable activity types", body = Vec<ActivityOption>)
    ),
    tag = "session"
)]
pub async fn activities() -> Json<Vec<ActivityOption>> {
    Json(activity_options())
}
