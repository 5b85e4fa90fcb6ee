/// Meal preference model and database operations
///
/// One row per (meal, user) holds the user's attendance choice and whether they cook.
/// A group member without a live row is implicitly `undecided` and not a cook.
///
/// Rows are soft-deleted when the member leaves (open meals only) or the meal is
/// deleted; writing to a soft-deleted row revives it. A revived row starts from the
/// defaults for the field that was not written, so stale cook or preference state
/// never comes back with it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE meal_preference AS ENUM ('undecided', 'opt-in', 'opt-out', 'eat-later');
///
/// CREATE TABLE meal_preferences (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     meal_id UUID NOT NULL REFERENCES meals(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     membership_id UUID NOT NULL REFERENCES memberships(id),
///     preference meal_preference NOT NULL DEFAULT 'undecided',
///     is_cook BOOLEAN NOT NULL DEFAULT FALSE,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     CONSTRAINT meal_preferences_meal_user_key UNIQUE (meal_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::Outcome;
use crate::models::membership::Membership;
use crate::models::RowState;
use crate::sync::Versioned;

/// Attendance choice for a meal
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "meal_preference", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Preference {
    #[default]
    Undecided,
    OptIn,
    OptOut,
    EatLater,
}

impl Preference {
    pub const ALL: [Preference; 4] = [
        Preference::Undecided,
        Preference::OptIn,
        Preference::OptOut,
        Preference::EatLater,
    ];

    /// Wire and database spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Undecided => "undecided",
            Preference::OptIn => "opt-in",
            Preference::OptOut => "opt-out",
            Preference::EatLater => "eat-later",
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Preference::Undecided)
    }
}

/// Preference row joined with the user's display name
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceRecord {
    #[serde(rename = "preferenceId")]
    pub id: Uuid,
    pub meal_id: Uuid,
    pub user_id: Uuid,
    pub membership_id: Uuid,
    pub username: String,
    pub preference: Preference,
    pub is_cook: bool,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PreferenceRecord {
    pub fn state(&self) -> RowState {
        RowState::from_deleted_at(self.deleted_at)
    }
}

/// Meal-scope sync is keyed by user: a meal has at most one row per user.
impl Versioned for PreferenceRecord {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.user_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

const RECORD_COLUMNS: &str = "p.id, p.meal_id, p.user_id, p.membership_id, u.username, \
                              p.preference, p.is_cook, p.updated_at, p.deleted_at";

impl PreferenceRecord {
    /// Sets the member's preference, inserting or reviving the row as needed
    ///
    /// Cook state is kept on a live row and reset on a revived one.
    pub async fn upsert_preference<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
        membership: &Membership,
        preference: Preference,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            WITH upserted AS (
                INSERT INTO meal_preferences (meal_id, user_id, membership_id, preference)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (meal_id, user_id) DO UPDATE
                SET preference = EXCLUDED.preference,
                    membership_id = EXCLUDED.membership_id,
                    is_cook = meal_preferences.is_cook AND meal_preferences.deleted_at IS NULL,
                    deleted_at = NULL,
                    updated_at = NOW()
                RETURNING *
            )
            SELECT {RECORD_COLUMNS}
            FROM upserted p
            JOIN users u ON u.id = p.user_id
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_id)
            .bind(membership.user_id)
            .bind(membership.id)
            .bind(preference)
            .fetch_one(executor)
            .await
    }

    /// Marks the member as a cook, inserting or reviving the row as needed
    ///
    /// Preference is kept on a live row and reset to `undecided` on a revived one.
    pub async fn upsert_cook<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
        membership: &Membership,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            WITH upserted AS (
                INSERT INTO meal_preferences (meal_id, user_id, membership_id, is_cook)
                VALUES ($1, $2, $3, TRUE)
                ON CONFLICT (meal_id, user_id) DO UPDATE
                SET is_cook = TRUE,
                    membership_id = EXCLUDED.membership_id,
                    preference = CASE
                        WHEN meal_preferences.deleted_at IS NULL THEN meal_preferences.preference
                        ELSE 'undecided'::meal_preference
                    END,
                    deleted_at = NULL,
                    updated_at = NOW()
                RETURNING *
            )
            SELECT {RECORD_COLUMNS}
            FROM upserted p
            JOIN users u ON u.id = p.user_id
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_id)
            .bind(membership.user_id)
            .bind(membership.id)
            .fetch_one(executor)
            .await
    }

    /// Clears the cook flag on a live row
    ///
    /// # Returns
    ///
    /// `Unchanged` if the user had no live row or was not a cook
    pub async fn clear_cook<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Outcome, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE meal_preferences
            SET is_cook = FALSE, updated_at = NOW()
            WHERE meal_id = $1 AND user_id = $2 AND is_cook AND deleted_at IS NULL
            "#,
        )
        .bind(meal_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Finds the live row for (meal, user)
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM meal_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.meal_id = $1 AND p.user_id = $2 AND p.deleted_at IS NULL
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Live rows of one meal
    pub async fn list_for_meal<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM meal_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.meal_id = $1 AND p.deleted_at IS NULL
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_id)
            .fetch_all(executor)
            .await
    }

    /// Live rows of several meals, for building meal cards
    pub async fn list_for_meals<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM meal_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.meal_id = ANY($1) AND p.deleted_at IS NULL
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_ids)
            .fetch_all(executor)
            .await
    }

    /// Rows of one meal changed or deleted since `since`, including tombstones
    pub async fn sync_candidates<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM meal_preferences p
            JOIN users u ON u.id = p.user_id
            WHERE p.meal_id = $1
              AND (
                    ($2::timestamptz IS NULL AND p.deleted_at IS NULL)
                 OR p.updated_at > $2
                 OR p.deleted_at >= $2
              )
            ORDER BY u.username
            "#
        );

        sqlx::query_as::<_, PreferenceRecord>(&sql)
            .bind(meal_id)
            .bind(since)
            .fetch_all(executor)
            .await
    }

    /// Soft-deletes the user's rows on open meals of a group and bumps those meals
    ///
    /// Closed and deleted meals keep their history.
    ///
    /// # Returns
    ///
    /// Number of preference rows cleared
    pub async fn clear_open_for_member<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            WITH cleared AS (
                UPDATE meal_preferences p
                SET deleted_at = NOW(), updated_at = NOW()
                FROM meals m
                WHERE p.meal_id = m.id
                  AND m.group_id = $1
                  AND p.user_id = $2
                  AND m.closed = FALSE
                  AND m.deleted_at IS NULL
                  AND p.deleted_at IS NULL
                RETURNING p.meal_id
            ), touched AS (
                UPDATE meals SET updated_at = NOW()
                WHERE id IN (SELECT meal_id FROM cleared)
                RETURNING id
            )
            SELECT COUNT(*) FROM cleared
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Bumps `updated_at` on the user's live rows, so a new username re-syncs
    pub async fn touch_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE meal_preferences SET updated_at = NOW() WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-deletes all live rows of a meal
    pub async fn soft_delete_for_meal<'e, E: PgExecutor<'e>>(
        executor: E,
        meal_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE meal_preferences
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE meal_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(meal_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Soft-deletes all live rows on meals of a group
    pub async fn soft_delete_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE meal_preferences p
            SET deleted_at = NOW(), updated_at = NOW()
            FROM meals m
            WHERE p.meal_id = m.id AND m.group_id = $1 AND p.deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
