use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::{LocationSample, MotionSample};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

fn push_disabled() -> ApiError {
    ApiError::Conflict(
        "push_source_disabled",
        "samples are produced locally; set `source: push` to ingest them".into(),
    )
}

#[utoipa::path(
    post,
    path = "/api/samples/location",
    request_body = LocationSample,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Fix queued for the cache"),
        (status = 403, description = "Location permission denied", body = ErrorResponse),
        (status = 409, description = "Push source disabled", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "samples"
)]
pub async fn push_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(sample): Json<LocationSample>,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::Ingest)?;
    let hub = state.push.as_ref().ok_or_else(push_disabled)?;
    hub.push_location(sample)?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    post,
    path = "/api/samples/motion/{channel}",
    params(("channel" = String, Path, description = "Motion channel name, e.g. accelerometer")),
    request_body = MotionSample,
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Sample queued for the cache"),
        (status = 404, description = "Channel has no subscription", body = ErrorResponse),
        (status = 409, description = "Push source disabled", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "samples"
)]
pub async fn push_motion(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(channel): Path<String>,
    Json(sample): Json<MotionSample>,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::Ingest)?;
    let hub = state.push.as_ref().ok_or_else(push_disabled)?;
    hub.push_motion(&channel, sample)?;
    Ok(StatusCode::ACCEPTED)
}
