use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use clientbay_core::models::{
    CreateWorkspaceRequest, InviteMemberRequest, MemberView, UpdateWorkspaceRequest, Workspace,
    WorkspaceMember,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/mine", get(mine))
        .route("/{id}", axum::routing::patch(update))
        .route("/{id}/members", get(members).post(invite))
        .route("/members/{member_id}", delete(remove_member))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<Workspace>)> {
    let workspace = state.workspaces.create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

async fn mine(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<Workspace>> {
    Ok(Json(state.workspaces.get_mine(user.id).await?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> ApiResult<Json<Workspace>> {
    Ok(Json(state.workspaces.update(user.id, id, req).await?))
}

async fn members(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MemberView>>> {
    Ok(Json(state.workspaces.members(user.id, id).await?))
}

async fn invite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<(StatusCode, Json<WorkspaceMember>)> {
    let member = state.workspaces.invite(user.id, id, req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn remove_member(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(member_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.workspaces.remove_member(user.id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
