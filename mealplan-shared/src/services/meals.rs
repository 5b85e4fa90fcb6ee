/// Meals, preferences and cooks
///
/// Meal CRUD and flag changes are gated by the meal's group permissions. Preference
/// and cook changes are open to every member for their own row; changing someone
/// else's needs `CanForceMealPreferenceAndCooking`.
///
/// Preferences are upserts: setting a preference never fails because one already
/// exists, and a meal being closed does not block it. Every preference or cook change
/// bumps the meal's `updated_at` so its card re-syncs.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgExecutor, PgPool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::authorization::{authorize, require_self_or_action, resolve_roles};
use crate::error::{DomainError, DomainResult, Outcome};
use crate::models::meal::{Meal, MealCard, MealChanges, NewMeal};
use crate::models::meal_preference::{Preference, PreferenceRecord};
use crate::models::membership::Membership;
use crate::participants::{merge_and_sort_participants, Participant};
use crate::permissions::{Action, PermissionMatrix, Role};

/// Longest accepted meal title (matches the column width)
pub const MAX_TITLE_LEN: usize = 255;

/// Longest accepted meal type
pub const MAX_MEAL_TYPE_LEN: usize = 64;

/// Monday 00:00:00 through Sunday 23:59:59 (UTC) of the week containing `day`
pub fn week_window(day: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let monday = day.date_naive() - Duration::days(day.weekday().num_days_from_monday() as i64);
    let start = monday.and_time(NaiveTime::MIN).and_utc();
    let end = start + Duration::days(7) - Duration::seconds(1);
    (start, end)
}

/// Builds cards for `meals` as seen by `viewer_id`
pub(crate) async fn load_cards<'e, E: PgExecutor<'e>>(
    executor: E,
    meals: Vec<Meal>,
    viewer_id: Uuid,
) -> DomainResult<Vec<MealCard>> {
    if meals.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = meals.iter().map(|m| m.id).collect();
    let preferences = PreferenceRecord::list_for_meals(executor, &ids).await?;

    Ok(meals
        .into_iter()
        .map(|meal| MealCard::build(meal, &preferences, viewer_id))
        .collect())
}

fn validate_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::InvalidInput(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max {
        return Err(DomainError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Input for creating a meal
#[derive(Debug, Clone)]
pub struct CreateMeal {
    pub group_id: Uuid,
    pub title: String,
    pub meal_type: String,
    pub notes: Option<String>,
    pub date_time: DateTime<Utc>,
}

/// Requested change to one member's participation
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipationChange {
    pub preference: Option<Preference>,
    pub is_cook: Option<bool>,
}

/// A member's standing for one meal
///
/// Returned after participation changes. Members without a live row are reported
/// with their implicit state: `undecided` and not cooking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participation {
    pub meal_id: Uuid,
    pub user_id: Uuid,
    pub preference: Preference,
    pub is_cook: bool,
}

impl Participation {
    pub fn implicit(meal_id: Uuid, user_id: Uuid) -> Self {
        Self {
            meal_id,
            user_id,
            preference: Preference::Undecided,
            is_cook: false,
        }
    }
}

impl From<&PreferenceRecord> for Participation {
    fn from(record: &PreferenceRecord) -> Self {
        Self {
            meal_id: record.meal_id,
            user_id: record.user_id,
            preference: record.preference,
            is_cook: record.is_cook,
        }
    }
}

/// Meal detail: the caller's card, the full roster and what the caller may do
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDetail {
    pub meal: MealCard,
    pub participants: Vec<Participant>,
    pub user_roles: Vec<Role>,
    pub capabilities: Vec<Action>,
}

/// Meal and participation operations
#[derive(Clone)]
pub struct MealService {
    pool: PgPool,
    permissions: Arc<PermissionMatrix>,
}

impl MealService {
    pub fn new(pool: PgPool, permissions: Arc<PermissionMatrix>) -> Self {
        Self { pool, permissions }
    }

    async fn find_meal<'e, E: PgExecutor<'e>>(executor: E, meal_id: Uuid) -> DomainResult<Meal> {
        Meal::find_active(executor, meal_id)
            .await?
            .ok_or(DomainError::NotFound("meal"))
    }

    pub async fn create_meal(&self, caller: Uuid, input: CreateMeal) -> DomainResult<MealCard> {
        let title = validate_text("title", &input.title, MAX_TITLE_LEN)?;
        let meal_type = validate_text("type", &input.meal_type, MAX_MEAL_TYPE_LEN)?;

        authorize(&self.pool, &self.permissions, input.group_id, caller, Action::CanCreateMeal)
            .await?;

        let meal = Meal::create(
            &self.pool,
            NewMeal {
                group_id: input.group_id,
                created_by: caller,
                title,
                meal_type,
                notes: input.notes.unwrap_or_default(),
                date_time: input.date_time,
            },
        )
        .await?;

        info!(meal_id = %meal.id, group_id = %meal.group_id, "Meal created");
        Ok(MealCard::build(meal, &[], caller))
    }

    pub async fn update_meal(
        &self,
        caller: Uuid,
        meal_id: Uuid,
        mut changes: MealChanges,
    ) -> DomainResult<MealCard> {
        if changes.is_empty() {
            return Err(DomainError::InvalidInput("nothing to update".to_string()));
        }
        if let Some(title) = changes.title.take() {
            changes.title = Some(validate_text("title", &title, MAX_TITLE_LEN)?);
        }
        if let Some(meal_type) = changes.meal_type.take() {
            changes.meal_type = Some(validate_text("type", &meal_type, MAX_MEAL_TYPE_LEN)?);
        }

        let meal = Self::find_meal(&self.pool, meal_id).await?;
        authorize(&self.pool, &self.permissions, meal.group_id, caller, Action::CanUpdateMeal)
            .await?;

        let meal = Meal::update(&self.pool, meal_id, changes)
            .await?
            .ok_or(DomainError::NotFound("meal"))?;

        let mut cards = load_cards(&self.pool, vec![meal], caller).await?;
        cards.pop().ok_or(DomainError::NotFound("meal"))
    }

    /// Soft-deletes a meal together with its preferences
    pub async fn delete_meal(&self, caller: Uuid, meal_id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        let meal = Self::find_meal(&mut *tx, meal_id).await?;
        authorize(&mut *tx, &self.permissions, meal.group_id, caller, Action::CanDeleteMeal)
            .await?;

        let preferences = PreferenceRecord::soft_delete_for_meal(&mut *tx, meal_id).await?;
        Meal::soft_delete(&mut *tx, meal_id).await?;

        tx.commit().await?;

        info!(meal_id = %meal_id, preferences, "Meal deleted");
        Ok(())
    }

    /// Sets `closed` and/or `fulfilled`; preferences are left as they are
    pub async fn set_flags(
        &self,
        caller: Uuid,
        meal_id: Uuid,
        closed: Option<bool>,
        fulfilled: Option<bool>,
    ) -> DomainResult<Meal> {
        if closed.is_none() && fulfilled.is_none() {
            return Err(DomainError::InvalidInput("no flag given".to_string()));
        }

        let meal = Self::find_meal(&self.pool, meal_id).await?;
        authorize(&self.pool, &self.permissions, meal.group_id, caller, Action::CanChangeMealFlags)
            .await?;

        let meal = Meal::set_flags(&self.pool, meal_id, closed, fulfilled)
            .await?
            .ok_or(DomainError::NotFound("meal"))?;

        info!(meal_id = %meal_id, closed = meal.closed, fulfilled = meal.fulfilled, "Meal flags changed");
        Ok(meal)
    }

    /// Meal card for the caller plus the roster of every member
    pub async fn meal_detail(&self, caller: Uuid, meal_id: Uuid) -> DomainResult<MealDetail> {
        let meal = Self::find_meal(&self.pool, meal_id).await?;
        let roles = resolve_roles(&self.pool, meal.group_id, caller).await?;

        let preferences = PreferenceRecord::list_for_meal(&self.pool, meal_id).await?;
        let members = Membership::list_members(&self.pool, meal.group_id).await?;

        let decided: HashSet<Uuid> = preferences.iter().map(|p| p.user_id).collect();
        let without: Vec<Participant> = members
            .into_iter()
            .filter(|m| !decided.contains(&m.user_id))
            .map(Participant::from)
            .collect();

        let card = MealCard::build(meal, &preferences, caller);
        let with: Vec<Participant> = preferences.into_iter().map(Participant::from).collect();

        Ok(MealDetail {
            meal: card,
            participants: merge_and_sort_participants(with, without),
            capabilities: self.permissions.allowed_actions(&roles).into_iter().collect(),
            user_roles: roles,
        })
    }

    /// Sets a member's preference for a meal
    pub async fn set_preference(
        &self,
        caller: Uuid,
        meal_id: Uuid,
        target: Uuid,
        preference: Preference,
    ) -> DomainResult<PreferenceRecord> {
        let mut tx = self.pool.begin().await?;

        let (meal, membership) = self.prepare(&mut tx, caller, meal_id, target).await?;
        let record =
            PreferenceRecord::upsert_preference(&mut *tx, meal.id, &membership, preference).await?;
        Meal::touch(&mut *tx, meal.id).await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Marks or unmarks a member as cook
    ///
    /// Unmarking someone who is not a cook is a no-op.
    pub async fn set_is_cook(
        &self,
        caller: Uuid,
        meal_id: Uuid,
        target: Uuid,
        is_cook: bool,
    ) -> DomainResult<Outcome> {
        let mut tx = self.pool.begin().await?;

        let (meal, membership) = self.prepare(&mut tx, caller, meal_id, target).await?;
        let outcome = apply_cook(&mut tx, meal.id, &membership, is_cook).await?;
        if outcome.is_applied() {
            Meal::touch(&mut *tx, meal.id).await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Applies a preference and/or cook change in one transaction
    ///
    /// Un-cooking a member who is not a cook succeeds without writing anything.
    ///
    /// # Returns
    ///
    /// The member's standing after the change
    pub async fn update_participation(
        &self,
        caller: Uuid,
        meal_id: Uuid,
        target: Uuid,
        change: ParticipationChange,
    ) -> DomainResult<Participation> {
        if change.preference.is_none() && change.is_cook.is_none() {
            return Err(DomainError::InvalidInput(
                "either preference or isCook is required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let (meal, membership) = self.prepare(&mut tx, caller, meal_id, target).await?;

        let mut outcome = Outcome::Unchanged;
        if let Some(preference) = change.preference {
            PreferenceRecord::upsert_preference(&mut *tx, meal.id, &membership, preference)
                .await?;
            outcome = Outcome::Applied;
        }
        if let Some(is_cook) = change.is_cook {
            if apply_cook(&mut tx, meal.id, &membership, is_cook).await?.is_applied() {
                outcome = Outcome::Applied;
            }
        }
        if outcome.is_applied() {
            Meal::touch(&mut *tx, meal.id).await?;
        }

        let participation = PreferenceRecord::find(&mut *tx, meal.id, target)
            .await?
            .map(|record| Participation::from(&record))
            .unwrap_or_else(|| Participation::implicit(meal.id, target));

        tx.commit().await?;

        debug!(
            meal_id = %meal_id,
            target = %target,
            preference = ?change.preference,
            is_cook = ?change.is_cook,
            "Participation updated"
        );
        Ok(participation)
    }

    /// Removes a member's cook flag
    ///
    /// # Errors
    ///
    /// `UserWasntACook` if the member was not cooking
    pub async fn remove_cook(&self, caller: Uuid, meal_id: Uuid, target: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        let (meal, _) = self.prepare(&mut tx, caller, meal_id, target).await?;

        if !PreferenceRecord::clear_cook(&mut *tx, meal.id, target).await?.is_applied() {
            return Err(DomainError::UserWasntACook {
                meal_id,
                user_id: target,
            });
        }
        Meal::touch(&mut *tx, meal.id).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Loads the meal, checks the caller may act on `target` and loads the target's
    /// membership
    async fn prepare(
        &self,
        conn: &mut PgConnection,
        caller: Uuid,
        meal_id: Uuid,
        target: Uuid,
    ) -> DomainResult<(Meal, Membership)> {
        let meal = Self::find_meal(&mut *conn, meal_id).await?;

        let roles = resolve_roles(&mut *conn, meal.group_id, caller).await?;
        require_self_or_action(
            &self.permissions,
            &roles,
            caller,
            target,
            Action::CanForceMealPreferenceAndCooking,
        )?;

        let membership = Membership::find_active(&mut *conn, meal.group_id, target)
            .await?
            .ok_or(DomainError::NoMatchingMembership {
                group_id: meal.group_id,
                user_id: target,
            })?;

        Ok((meal, membership))
    }
}

async fn apply_cook(
    conn: &mut PgConnection,
    meal_id: Uuid,
    membership: &Membership,
    is_cook: bool,
) -> DomainResult<Outcome> {
    if is_cook {
        PreferenceRecord::upsert_cook(&mut *conn, meal_id, membership).await?;
        Ok(Outcome::Applied)
    } else {
        Ok(PreferenceRecord::clear_cook(&mut *conn, meal_id, membership.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn test_week_window_starts_monday() {
        // Wednesday 2025-01-15 18:30
        let day = Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0).unwrap();
        let (start, end) = week_window(day);

        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 19, 23, 59, 59).unwrap());
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!(end.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_week_window_on_boundaries() {
        let monday = Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap();
        assert_eq!(week_window(monday).0, monday);

        let sunday_night = Utc.with_ymd_and_hms(2025, 1, 19, 23, 59, 59).unwrap();
        assert_eq!(week_window(sunday_night).0, monday);
    }

    #[test]
    fn test_implicit_participation_is_undecided_non_cook() {
        let meal_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let participation = Participation::implicit(meal_id, user_id);

        assert_eq!(participation.preference, Preference::Undecided);
        assert!(!participation.is_cook);

        let json = serde_json::to_value(participation).unwrap();
        assert_eq!(json["mealId"], serde_json::json!(meal_id));
        assert_eq!(json["preference"], "undecided");
        assert_eq!(json["isCook"], false);
    }

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("title", " Tacos ", MAX_TITLE_LEN).unwrap(), "Tacos");
        assert!(validate_text("title", "", MAX_TITLE_LEN).is_err());
        assert!(validate_text("type", &"x".repeat(65), MAX_MEAL_TYPE_LEN).is_err());
    }
}
