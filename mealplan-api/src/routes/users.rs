/// Caller profile endpoints
///
/// - `GET /users/me` - Caller's id, username and group cards
/// - `PUT /users/name` - Change the caller's username

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::models::user::User;
use mealplan_shared::services::users::Profile;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RenameUserRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1-64 characters"))]
    pub username: String,
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.users().profile(auth.user_id).await?))
}

/// # Errors
///
/// - `409 Conflict`: Username taken
/// - `422 Unprocessable Entity`: Validation failed
pub async fn rename(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RenameUserRequest>,
) -> ApiResult<Json<User>> {
    req.validate()?;

    Ok(Json(state.users().rename(auth.user_id, &req.username).await?))
}
