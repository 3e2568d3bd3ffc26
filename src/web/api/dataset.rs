use axum::{extract::State, http::StatusCode, Json};

use crate::session::CompositeRecord;
use crate::storage::ExportReceipt;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[utoipa::path(
    get,
    path = "/api/dataset",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "All records of this device as a JSON array, oldest first"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions")
    ),
    tag = "dataset"
)]
pub async fn read_all(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<CompositeRecord>>> {
    require_permission(&user, Permission::Export)?;
    let session = state.session.lock().await;
    Ok(Json(session.read_dataset()?))
}

#[utoipa::path(
    delete,
    path = "/api/dataset",
    security(("api_key" = [])),
    responses(
        (status = 204, description = "Dataset cleared"),
        (status = 409, description = "Stop recording first", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "dataset"
)]
pub async fn reset(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::Control)?;
    let mut session = state.session.lock().await;
    session.reset_dataset()?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/dataset/export",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Dataset handed to the share target", body = ExportReceipt),
        (status = 409, description = "Stop recording first", body = ErrorResponse),
        (status = 503, description = "Sharing is not available", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "dataset"
)]
pub async fn export(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ExportReceipt>> {
    require_permission(&user, Permission::Export)?;
    let session = state.session.lock().await;
    Ok(Json(session.export()?))
}
