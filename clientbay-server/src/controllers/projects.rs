//! Projects and the content that hangs off them: messages, updates, files,
//! and per-project approval listings.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use clientbay_core::models::{
    ApprovalRequest, CreateProjectRequest, FileUpload, Message, MessageView, PostMessageRequest,
    PostUpdateRequest, Project, ProjectUpdate, StoredFile, UpdateProjectRequest,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).patch(update).delete(remove))
        .route("/{id}/messages", get(list_messages).post(post_message))
        .route("/{id}/updates", get(list_updates).post(post_update))
        .route("/{id}/files", get(list_files).post(upload_file))
        .route("/{id}/approvals", get(list_approvals))
}

/// Separate because file deletion is addressed by file id, not project id.
pub fn files_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(remove_file))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    client_id: Option<Uuid>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list(user.id, query.client_id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.projects.create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get(user.id, id).await?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.update(user.id, id, req).await?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.projects.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<MessageView>>> {
    Ok(Json(state.content.list_messages(user.id, id).await?))
}

async fn post_message(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let message = state.content.post_message(user.id, id, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_updates(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectUpdate>>> {
    Ok(Json(state.content.list_updates(user.id, id).await?))
}

async fn post_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<PostUpdateRequest>,
) -> ApiResult<(StatusCode, Json<ProjectUpdate>)> {
    let update = state.content.post_update(user.id, id, req).await?;
    Ok((StatusCode::CREATED, Json(update)))
}

async fn list_files(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<StoredFile>>> {
    Ok(Json(state.content.list_files(user.id, id).await?))
}

#[derive(Deserialize)]
struct UploadQuery {
    name: String,
}

/// Raw-body upload: the file name rides in the query string and the type
/// in the Content-Type header.
async fn upload_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StoredFile>)> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_owned();
    let file = state
        .content
        .upload(
            user.id,
            FileUpload { project_id: id, name: query.name, content_type, bytes: body.to_vec() },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(file)))
}

async fn remove_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.content.delete_file(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_approvals(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ApprovalRequest>>> {
    Ok(Json(state.approvals.list_for_project(user.id, id).await?))
}
