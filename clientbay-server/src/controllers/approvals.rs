use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clientbay_core::models::{ApprovalRequest, CreateApprovalRequest, RespondRequest};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(request))
        .route("/{id}", get(detail))
        .route("/{id}/respond", post(respond))
}

async fn request(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateApprovalRequest>,
) -> ApiResult<(StatusCode, Json<ApprovalRequest>)> {
    let approval = state.approvals.request(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(approval)))
}

async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApprovalRequest>> {
    Ok(Json(state.approvals.get(user.id, id).await?))
}

async fn respond(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<Json<ApprovalRequest>> {
    Ok(Json(state.approvals.respond(user.id, id, req).await?))
}
