use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::services::{SearchFilter, SearchResults};

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

async fn search(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(filter): Query<SearchFilter>,
) -> ApiResult<Json<SearchResults>> {
    Ok(Json(state.search.search(user.id, filter).await?))
}
