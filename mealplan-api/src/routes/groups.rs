/// Group endpoints
///
/// - `POST   /groups` - Create a group (caller becomes admin)
/// - `GET    /groups/:groupId?weekOf=` - Group detail with a week of meals
/// - `GET    /groups/:groupId/members` - Active members and their roles
/// - `PUT    /groups/:groupId/name` - Rename (`can_update_group`)
/// - `DELETE /groups/:groupId` - Delete with everything in it (`can_delete_group`)
/// - `DELETE /groups/:groupId/leave` - Leave the group

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::models::group::Group;
use mealplan_shared::services::membership::{GroupDetail, Member};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create or rename a group
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GroupNameRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub group_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetailQuery {
    /// Any instant in the week to show; defaults to now
    pub week_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    pub group_id: Uuid,

    /// Preferences removed from open meals
    pub cleared_preferences: i64,
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<GroupNameRequest>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    req.validate()?;

    let group = state.membership().create_group(auth.user_id, &req.group_name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn group_detail(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<GroupDetailQuery>,
) -> ApiResult<Json<GroupDetail>> {
    let week_of = query.week_of.unwrap_or_else(Utc::now);

    Ok(Json(
        state.membership().group_detail(auth.user_id, group_id, week_of).await?,
    ))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Member>>> {
    Ok(Json(state.membership().list_members(auth.user_id, group_id).await?))
}

pub async fn rename_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<GroupNameRequest>,
) -> ApiResult<Json<Group>> {
    req.validate()?;

    Ok(Json(
        state
            .membership()
            .rename_group(auth.user_id, group_id, &req.group_name)
            .await?,
    ))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.membership().delete_group(auth.user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<LeaveResponse>> {
    let cleared_preferences = state.membership().leave(group_id, auth.user_id).await?;

    Ok(Json(LeaveResponse {
        group_id,
        cleared_preferences,
    }))
}
