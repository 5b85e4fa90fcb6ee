/// Meal model and database operations
///
/// A meal belongs to one group and carries two independent flags: `closed` (planning
/// finished) and `fulfilled` (the meal happened). Flipping either flag never touches
/// preferences.
///
/// `updated_at` is bumped by every change to the meal itself and by every preference or
/// cook change on it, so a meal card re-syncs whenever its summary could have changed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE meals (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     group_id UUID NOT NULL REFERENCES groups(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     title VARCHAR(255) NOT NULL,
///     meal_type VARCHAR(64) NOT NULL,
///     notes TEXT NOT NULL DEFAULT '',
///     date_time TIMESTAMPTZ NOT NULL,
///     closed BOOLEAN NOT NULL DEFAULT FALSE,
///     fulfilled BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::meal_preference::{Preference, PreferenceRecord};
use crate::models::RowState;
use crate::participants::participant_count;
use crate::sync::Versioned;

/// Meal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    #[serde(rename = "mealId")]
    pub id: Uuid,
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub meal_type: String,
    pub notes: String,
    pub date_time: DateTime<Utc>,
    pub closed: bool,
    pub fulfilled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a meal
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub meal_type: String,
    pub notes: String,
    pub date_time: DateTime<Utc>,
}

/// Partial update of a meal's descriptive fields
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct MealChanges {
    pub title: Option<String>,
    pub meal_type: Option<String>,
    pub notes: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
}

impl MealChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.meal_type.is_none()
            && self.notes.is_none()
            && self.date_time.is_none()
    }
}

const MEAL_COLUMNS: &str = "id, group_id, created_by, title, meal_type, notes, date_time, \
                            closed, fulfilled, created_at, updated_at, deleted_at";

impl Meal {
    pub fn state(&self) -> RowState {
        RowState::from_deleted_at(self.deleted_at)
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: NewMeal,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO meals (group_id, created_by, title, meal_type, notes, date_time)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MEAL_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Meal>(&sql)
            .bind(data.group_id)
            .bind(data.created_by)
            .bind(data.title)
            .bind(data.meal_type)
            .bind(data.notes)
            .bind(data.date_time)
            .fetch_one(executor)
            .await
    }

    /// Finds a meal that is not deleted and whose group is not deleted
    pub async fn find_active<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT m.id, m.group_id, m.created_by, m.title, m.meal_type, m.notes, m.date_time,
                   m.closed, m.fulfilled, m.created_at, m.updated_at, m.deleted_at
            FROM meals m
            JOIN groups g ON g.id = m.group_id
            WHERE m.id = $1 AND m.deleted_at IS NULL AND g.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Applies a partial update to a live meal
    ///
    /// # Returns
    ///
    /// The updated meal, or None if the meal is absent or deleted
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        changes: MealChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE meals
            SET title = COALESCE($2, title),
                meal_type = COALESCE($3, meal_type),
                notes = COALESCE($4, notes),
                date_time = COALESCE($5, date_time),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {MEAL_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Meal>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.meal_type)
            .bind(changes.notes)
            .bind(changes.date_time)
            .fetch_optional(executor)
            .await
    }

    /// Sets the `closed` and/or `fulfilled` flags
    pub async fn set_flags<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        closed: Option<bool>,
        fulfilled: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE meals
            SET closed = COALESCE($2, closed),
                fulfilled = COALESCE($3, fulfilled),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {MEAL_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Meal>(&sql)
            .bind(id)
            .bind(closed)
            .bind(fulfilled)
            .fetch_optional(executor)
            .await
    }

    pub async fn soft_delete<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE meals
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn soft_delete_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE meals
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE group_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Bumps `updated_at` after a preference or cook change
    pub async fn touch<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE meals SET updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Live meals of a group scheduled within `[start, end]`, in date order
    pub async fn list_in_window<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE group_id = $1 AND date_time BETWEEN $2 AND $3 AND deleted_at IS NULL
            ORDER BY date_time, id
            "#
        );

        sqlx::query_as::<_, Meal>(&sql)
            .bind(group_id)
            .bind(start)
            .bind(end)
            .fetch_all(executor)
            .await
    }

    /// Meals of a group within `[start, end]` changed or deleted since `since`
    ///
    /// With a watermark, meals outside the window that changed since it are returned
    /// as deleted (`deleted_at` set to their `updated_at`): a meal rescheduled out of
    /// the window must leave the client's copy of that window.
    pub async fn sync_candidates<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(
            r#"
            SELECT id, group_id, created_by, title, meal_type, notes, date_time,
                   closed, fulfilled, created_at, updated_at,
                   CASE
                       WHEN date_time BETWEEN $2 AND $3 THEN deleted_at
                       ELSE COALESCE(deleted_at, updated_at)
                   END AS deleted_at
            FROM meals
            WHERE group_id = $1
              AND (
                    (
                        date_time BETWEEN $2 AND $3
                        AND (
                              ($4::timestamptz IS NULL AND deleted_at IS NULL)
                           OR updated_at > $4
                           OR deleted_at >= $4
                        )
                    )
                 OR (
                        $4::timestamptz IS NOT NULL
                        AND date_time NOT BETWEEN $2 AND $3
                        AND updated_at > $4
                    )
              )
            ORDER BY date_time, id
            "#,
        )
        .bind(group_id)
        .bind(start)
        .bind(end)
        .bind(since)
        .fetch_all(executor)
        .await
    }
}

/// Meal summary as seen by one member
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCard {
    pub meal_id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub meal_type: String,
    pub notes: String,
    pub date_time: DateTime<Utc>,
    pub closed: bool,
    pub fulfilled: bool,

    /// Members whose preference is not `undecided`
    pub participant_count: usize,

    /// The viewer's own preference (`undecided` without a row)
    pub user_preference: Preference,

    /// Whether the viewer cooks
    pub is_cook: bool,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MealCard {
    /// Summarizes `meal` for `viewer_id`
    ///
    /// `preferences` may contain rows of other meals; only rows of this meal are used.
    pub fn build(meal: Meal, preferences: &[PreferenceRecord], viewer_id: Uuid) -> Self {
        let rows: Vec<&PreferenceRecord> = preferences
            .iter()
            .filter(|p| p.meal_id == meal.id && p.state().is_active())
            .collect();

        let own = rows.iter().find(|p| p.user_id == viewer_id);

        MealCard {
            meal_id: meal.id,
            group_id: meal.group_id,
            participant_count: participant_count(rows.iter().map(|p| &p.preference)),
            user_preference: own.map(|p| p.preference).unwrap_or_default(),
            is_cook: own.map(|p| p.is_cook).unwrap_or(false),
            title: meal.title,
            meal_type: meal.meal_type,
            notes: meal.notes,
            date_time: meal.date_time,
            closed: meal.closed,
            fulfilled: meal.fulfilled,
            updated_at: meal.updated_at,
            deleted_at: meal.deleted_at,
        }
    }
}

impl Versioned for MealCard {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.meal_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal() -> Meal {
        let now = Utc::now();
        Meal {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            title: "Lasagne".to_string(),
            meal_type: "dinner".to_string(),
            notes: String::new(),
            date_time: now,
            closed: false,
            fulfilled: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn record(meal_id: Uuid, user_id: Uuid, preference: Preference, is_cook: bool) -> PreferenceRecord {
        PreferenceRecord {
            id: Uuid::new_v4(),
            meal_id,
            user_id,
            membership_id: Uuid::new_v4(),
            username: user_id.to_string(),
            preference,
            is_cook,
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_card_counts_decided_preferences_of_this_meal() {
        let meal = meal();
        let viewer = Uuid::new_v4();
        let other_meal = Uuid::new_v4();

        let mut removed = record(meal.id, Uuid::new_v4(), Preference::OptIn, false);
        removed.deleted_at = Some(Utc::now());

        let preferences = vec![
            record(meal.id, viewer, Preference::EatLater, true),
            record(meal.id, Uuid::new_v4(), Preference::OptOut, false),
            record(meal.id, Uuid::new_v4(), Preference::Undecided, true),
            record(other_meal, Uuid::new_v4(), Preference::OptIn, false),
            removed,
        ];

        let card = MealCard::build(meal, &preferences, viewer);
        assert_eq!(card.participant_count, 2);
        assert_eq!(card.user_preference, Preference::EatLater);
        assert!(card.is_cook);
    }

    #[test]
    fn test_card_defaults_for_viewer_without_row() {
        let meal = meal();
        let card = MealCard::build(meal, &[], Uuid::new_v4());

        assert_eq!(card.participant_count, 0);
        assert_eq!(card.user_preference, Preference::Undecided);
        assert!(!card.is_cook);

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["userPreference"], "undecided");
        assert_eq!(json["mealType"], "dinner");
    }

    #[test]
    fn test_meal_changes_is_empty() {
        assert!(MealChanges::default().is_empty());
        assert!(!MealChanges {
            notes: Some(String::new()),
            ..Default::default()
        }
        .is_empty());
    }
}
