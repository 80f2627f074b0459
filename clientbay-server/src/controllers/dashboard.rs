use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::services::DashboardStats;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

async fn stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.dashboard.stats(user.id).await?))
}
