use axum::extract::State;
use axum::routing::patch;
use axum::{Json, Router};
use clientbay_core::models::{UpdateProfileRequest, User};

use crate::error::ApiResult;
use crate::identity::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", patch(update_profile))
}

async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.update_profile(user.id, req).await?))
}
