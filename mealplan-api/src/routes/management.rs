/// Moderation and role management
///
/// - `POST /management/users/kick` - Remove a member (`can_kick_users`)
/// - `POST /management/users/ban` - Remove a member and bar re-joining (`can_ban_users`)
/// - `POST /management/users/unban` - Lift a ban (`can_unban_user`)
/// - `POST /management/roles/add` - Grant a role (`can_promote_to_<role>`)
/// - `POST /management/roles/remove` - Revoke a role (`can_demote_from_<role>`)

use crate::{app::AppState, error::ApiResult, routes::ChangeResponse};
use axum::{extract::State, http::StatusCode, Extension, Json};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::permissions::Role;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationRequest {
    pub group_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRequest {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

pub async fn kick_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ModerationRequest>,
) -> ApiResult<StatusCode> {
    state.membership().kick(auth.user_id, req.group_id, req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ban_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ModerationRequest>,
) -> ApiResult<StatusCode> {
    state.membership().ban(auth.user_id, req.group_id, req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unban_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ModerationRequest>,
) -> ApiResult<Json<ChangeResponse>> {
    let outcome = state.membership().unban(auth.user_id, req.group_id, req.user_id).await?;
    Ok(Json(outcome.into()))
}

pub async fn add_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<ChangeResponse>> {
    let outcome = state
        .membership()
        .assign_role(auth.user_id, req.group_id, req.user_id, req.role)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn remove_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<ChangeResponse>> {
    let outcome = state
        .membership()
        .revoke_role(auth.user_id, req.group_id, req.user_id, req.role)
        .await?;
    Ok(Json(outcome.into()))
}
