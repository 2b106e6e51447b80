use axum::Json;
use axum::extract::{Extension, State};
use seatkeeper_core::RequestContext;

use crate::dto::{CheckPermissionRequest, CheckPermissionResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn check_permission_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<CheckPermissionRequest>,
) -> ApiResult<Json<CheckPermissionResponse>> {
    let decision = state
        .access_service
        .check_permission(&context, payload.into())
        .await?;

    Ok(Json(CheckPermissionResponse {
        result: decision.is_allowed(),
    }))
}
