use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clientbay_core::models::{CreateInvoiceRequest, Invoice, InvoiceDetail, UpdateInvoiceRequest};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(detail).patch(update).delete(remove))
        .route("/{id}/send", post(send))
        .route("/{id}/pay", post(mark_paid))
        .route("/{id}/cancel", post(cancel))
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.list(user.id).await?))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<InvoiceDetail>)> {
    let detail = state.invoices.create(user.id, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InvoiceDetail>> {
    Ok(Json(state.invoices.get(user.id, id).await?))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateInvoiceRequest>,
) -> ApiResult<Json<InvoiceDetail>> {
    Ok(Json(state.invoices.update(user.id, id, req).await?))
}

async fn send(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.send(user.id, id).await?))
}

async fn mark_paid(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.mark_paid(user.id, id).await?))
}

async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.invoices.cancel(user.id, id).await?))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.invoices.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
