//! Client-side read surface. Everything here is scoped through the
//! caller's contact rows, never through a workspace membership.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::models::{ApprovalRequest, Invoice, Project};

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(my_projects))
        .route("/invoices", get(my_invoices))
        .route("/approvals", get(my_pending_approvals))
}

async fn my_projects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_for_contact(user.id).await?))
}

async fn my_invoices(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Invoice>>> {
    Ok(Json(state.invoices.list_for_contact(user.id).await?))
}

async fn my_pending_approvals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<ApprovalRequest>>> {
    Ok(Json(state.approvals.pending_for_contact(user.id).await?))
}
