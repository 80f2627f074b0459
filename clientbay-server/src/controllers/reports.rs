use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::services::{Report, ReportQuery};

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(generate))
}

async fn generate(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<Report>> {
    Ok(Json(state.reports.generate(user.id, query).await?))
}
