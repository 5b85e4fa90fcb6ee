/// Incremental sync endpoints
///
/// Each endpoint takes an optional `lastUpdated` watermark. Without it the response is
/// a full snapshot of live items; with it, only items changed after the watermark and
/// the ids of items deleted since.
///
/// ```text
/// GET /sync/groups?lastUpdated=2025-01-03T12:00:00Z
/// GET /sync/group/meals?groupId=uuid&startDate=...&endDate=...&lastUpdated=...
/// GET /sync/group/meal?mealId=uuid&lastUpdated=...
/// ```
///
/// ```json
/// { "items": [ ... ], "deletedIds": [ "uuid" ] }
/// ```
///
/// Clients should use the server time of their request as the next watermark.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::models::group::GroupCard;
use mealplan_shared::models::meal::MealCard;
use mealplan_shared::models::meal_preference::PreferenceRecord;
use mealplan_shared::sync::SyncDelta;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupsSyncQuery {
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMealsSyncQuery {
    pub group_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSyncQuery {
    pub meal_id: Uuid,
    pub last_updated: Option<DateTime<Utc>>,
}

pub async fn sync_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<GroupsSyncQuery>,
) -> ApiResult<Json<SyncDelta<GroupCard>>> {
    Ok(Json(state.sync().sync_groups(auth.user_id, query.last_updated).await?))
}

pub async fn sync_group_meals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<GroupMealsSyncQuery>,
) -> ApiResult<Json<SyncDelta<MealCard>>> {
    let delta = state
        .sync()
        .sync_group_meals(
            auth.user_id,
            query.group_id,
            query.start_date,
            query.end_date,
            query.last_updated,
        )
        .await?;
    Ok(Json(delta))
}

pub async fn sync_meal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<MealSyncQuery>,
) -> ApiResult<Json<SyncDelta<PreferenceRecord>>> {
    Ok(Json(
        state
            .sync()
            .sync_meal(auth.user_id, query.meal_id, query.last_updated)
            .await?,
    ))
}
