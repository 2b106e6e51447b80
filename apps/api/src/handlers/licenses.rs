use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use seatkeeper_application::{ModifySeatsInput, SeatAssignmentQuery, SeatFilter};
use seatkeeper_core::{AppError, RequestContext};

use crate::dto::{
    EmptyResponse, GetLicenseResponse, GetSeatsQuery, GetSeatsResponse, ModifySeatsRequest,
    SeatUserResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get_license_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((org_id, service_id)): Path<(String, String)>,
) -> ApiResult<Json<GetLicenseResponse>> {
    let counts = state
        .license_service
        .get_seat_counts(&context, org_id.as_str(), service_id.as_str())
        .await?;

    Ok(Json(GetLicenseResponse::from(counts)))
}

pub async fn get_seats_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((org_id, service_id)): Path<(String, String)>,
    Query(query): Query<GetSeatsQuery>,
) -> ApiResult<Json<GetSeatsResponse>> {
    let filter = match query.filter.as_deref() {
        None | Some("") => SeatFilter::default(),
        Some(value) => SeatFilter::parse(value).ok_or_else(|| {
            AppError::Validation(format!("unknown seat filter '{value}'"))
        })?,
    };
    let assigned = filter == SeatFilter::Assigned;

    let principals = state
        .license_service
        .get_seat_assignments(
            &context,
            SeatAssignmentQuery {
                org_id,
                service_id,
                include_users: query.include_users.unwrap_or(true),
                filter,
            },
        )
        .await?;

    Ok(Json(GetSeatsResponse {
        users: principals
            .into_iter()
            .map(|principal| SeatUserResponse::from_principal(principal, assigned))
            .collect(),
    }))
}

pub async fn modify_seats_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path((org_id, service_id)): Path<(String, String)>,
    Json(payload): Json<ModifySeatsRequest>,
) -> ApiResult<Json<EmptyResponse>> {
    state
        .license_service
        .modify_seats(
            &context,
            ModifySeatsInput {
                org_id,
                service_id,
                assign: payload.assign,
                unassign: payload.unassign,
            },
        )
        .await?;

    Ok(Json(EmptyResponse::default()))
}
