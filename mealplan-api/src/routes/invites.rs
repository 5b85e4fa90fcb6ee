/// Invite link endpoints
///
/// - `POST   /groups/invite` - Create an invite (`can_create_invite_links`)
/// - `GET    /groups/:groupId/invites` - Usable invites (`can_view_invite_links`)
/// - `POST   /groups/invite/join/:token` - Join the invite's group
/// - `DELETE /groups/invite/:token` - Void an invite (`can_void_invite_links`)
///
/// # Example
///
/// ```text
/// POST /groups/invite
/// Authorization: Bearer <jwt_token>
///
/// { "groupId": "uuid", "expirationDateTime": "2026-01-01T00:00:00Z" }
/// ```
///
/// ```json
/// {
///   "token": "inv_4fQ...",
///   "groupId": "uuid",
///   "createdBy": "uuid",
///   "createdAt": "2025-12-30T12:00:00Z",
///   "expiresAt": "2026-01-01T00:00:00Z"
/// }
/// ```

use crate::{app::AppState, error::ApiResult, routes::ChangeResponse};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::models::invite::Invite;
use mealplan_shared::services::membership::JoinResult;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    pub group_id: Uuid,

    /// Defaults to now plus the configured invite lifetime
    pub expiration_date_time: Option<DateTime<Utc>>,
}

pub async fn create_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<Invite>)> {
    let expires_at = req.expiration_date_time.unwrap_or_else(|| {
        Utc::now() + Duration::hours(state.config.invites.default_ttl_hours)
    });

    let invite = state
        .invites()
        .create_invite(auth.user_id, req.group_id, expires_at)
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

pub async fn list_invites(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(group_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Invite>>> {
    Ok(Json(state.invites().list_invites(auth.user_id, group_id).await?))
}

/// Joining a group the caller already belongs to succeeds with outcome `alreadyMember`
pub async fn join_via_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<JoinResult>> {
    Ok(Json(state.invites().join_via_invite(&token, auth.user_id).await?))
}

/// Voiding an unknown or already-voided invite is a success with `changed: false`
pub async fn void_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(token): Path<String>,
) -> ApiResult<Json<ChangeResponse>> {
    let outcome = state.invites().void_invite(auth.user_id, &token).await?;
    Ok(Json(outcome.into()))
}
