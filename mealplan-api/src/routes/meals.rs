/// Meal endpoints
///
/// - `POST   /meals` - Create a meal (`can_create_meal`)
/// - `GET    /meals/:mealId` - Meal card plus the full participant roster
/// - `PUT    /meals/:mealId` - Edit title/type/notes/time (`can_update_meal`)
/// - `DELETE /meals/:mealId` - Delete (`can_delete_meal`)
/// - `PUT    /meals/:mealId/flags` - Set closed/fulfilled (`can_change_meal_flags`)
/// - `PUT    /meals/preferences` - Set a member's preference and/or cook flag
/// - `DELETE /meals/cooks` - Remove a member's cook flag
///
/// Members may change their own preference and cook flag; changing someone else's
/// requires `can_force_meal_preference_and_cooking`.
///
/// # Example
///
/// ```text
/// PUT /meals/preferences
/// Authorization: Bearer <jwt_token>
///
/// { "mealId": "uuid", "userId": "uuid", "preference": "opt-in", "isCook": true }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use mealplan_shared::auth::middleware::AuthContext;
use mealplan_shared::models::meal::{Meal, MealCard, MealChanges};
use mealplan_shared::models::meal_preference::Preference;
use mealplan_shared::services::meals::{
    CreateMeal, MealDetail, Participation, ParticipationChange,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub group_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64, message = "Type must be 1-64 characters"))]
    pub meal_type: String,

    pub scheduled_at: DateTime<Utc>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64, message = "Type must be 1-64 characters"))]
    pub meal_type: Option<String>,

    pub notes: Option<String>,

    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealFlagsRequest {
    pub closed: Option<bool>,
    pub fulfilled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRequest {
    pub meal_id: Uuid,
    pub user_id: Uuid,
    pub preference: Option<Preference>,
    pub is_cook: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookRequest {
    pub meal_id: Uuid,
    pub user_id: Uuid,
}

pub async fn create_meal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateMealRequest>,
) -> ApiResult<(StatusCode, Json<MealCard>)> {
    req.validate()?;

    let card = state
        .meals()
        .create_meal(
            auth.user_id,
            CreateMeal {
                group_id: req.group_id,
                title: req.title,
                meal_type: req.meal_type,
                notes: req.notes,
                date_time: req.scheduled_at,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn meal_detail(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(meal_id): Path<Uuid>,
) -> ApiResult<Json<MealDetail>> {
    Ok(Json(state.meals().meal_detail(auth.user_id, meal_id).await?))
}

pub async fn update_meal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(meal_id): Path<Uuid>,
    Json(req): Json<UpdateMealRequest>,
) -> ApiResult<Json<MealCard>> {
    req.validate()?;

    let changes = MealChanges {
        title: req.title,
        meal_type: req.meal_type,
        notes: req.notes,
        date_time: req.scheduled_at,
    };
    Ok(Json(state.meals().update_meal(auth.user_id, meal_id, changes).await?))
}

pub async fn delete_meal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(meal_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.meals().delete_meal(auth.user_id, meal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_flags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(meal_id): Path<Uuid>,
    Json(req): Json<MealFlagsRequest>,
) -> ApiResult<Json<Meal>> {
    Ok(Json(
        state
            .meals()
            .set_flags(auth.user_id, meal_id, req.closed, req.fulfilled)
            .await?,
    ))
}

/// Returns the member's preference and cook state after the change
///
/// Un-cooking a member who is not a cook is a success with nothing changed.
///
/// # Errors
///
/// - `400 Bad Request`: Neither `preference` nor `isCook` given
/// - `403 Forbidden`: Changing another member without the force permission
/// - `404 Not Found`: Meal gone, or the target is not an active member
pub async fn update_participation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ParticipationRequest>,
) -> ApiResult<Json<Participation>> {
    let change = ParticipationChange {
        preference: req.preference,
        is_cook: req.is_cook,
    };

    Ok(Json(
        state
            .meals()
            .update_participation(auth.user_id, req.meal_id, req.user_id, change)
            .await?,
    ))
}

pub async fn remove_cook(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CookRequest>,
) -> ApiResult<StatusCode> {
    state.meals().remove_cook(auth.user_id, req.meal_id, req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
