use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use clientbay_core::models::ActivityEntry;
use clientbay_core::services::ActivityFilter;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityQuery {
    project_id: Option<Uuid>,
    client_id: Option<Uuid>,
    limit: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityEntry>>> {
    let filter = ActivityFilter {
        project_id: query.project_id,
        client_id: query.client_id,
        limit: query.limit,
    };
    Ok(Json(state.activity.list(user.id, filter).await?))
}
