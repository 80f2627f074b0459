use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::models::{Client, ClientDetail, CreateClientRequest, UpdateClientRequest};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).patch(update).delete(remove))
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.clients.list(user.id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<ClientDetail>)> {
    let detail = state.clients.create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClientDetail>> {
    Ok(Json(state.clients.get(user.id, id).await?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.clients.update(user.id, id, req).await?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.clients.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
