/// Membership model and database operations
///
/// A membership links one user to one group. There is exactly one row per
/// (group, user) pair for the lifetime of the pair: leaving, being kicked or being
/// banned only sets `deleted_at`, and joining again clears it. Because the row keeps
/// its ID, role assignments and meal preferences that point at it survive a
/// leave/re-join cycle.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     group_id UUID NOT NULL REFERENCES groups(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     CONSTRAINT memberships_group_user_key UNIQUE (group_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use mealplan_shared::models::membership::{Membership, Upserted};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// match Membership::activate(&pool, group_id, user_id).await? {
///     Some(Upserted { membership, inserted }) => {
///         println!("joined {} (new row: {})", membership.id, inserted);
///     }
///     None => println!("already a member"),
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::RowState;

/// Membership row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,

    /// Time of the most recent (re-)join
    pub joined_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row returned by [`Membership::activate`]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Upserted {
    #[sqlx(flatten)]
    pub membership: Membership,

    /// True for a brand new row, false for a resurrected one
    pub inserted: bool,
}

/// Active member together with their display name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberRow {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn state(&self) -> RowState {
        RowState::from_deleted_at(self.deleted_at)
    }

    /// Creates or resurrects the membership for (group, user) in one statement
    ///
    /// - No row: inserts one.
    /// - Soft-deleted row: clears `deleted_at` and resets `joined_at`, keeping the ID.
    /// - Active row: leaves it untouched and returns None.
    ///
    /// Concurrent callers serialize on the unique constraint, so exactly one of them
    /// sees `Some`.
    pub async fn activate<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Upserted>, sqlx::Error> {
        sqlx::query_as::<_, Upserted>(
            r#"
            INSERT INTO memberships (group_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, user_id) DO UPDATE
            SET deleted_at = NULL, joined_at = NOW(), updated_at = NOW()
            WHERE memberships.deleted_at IS NOT NULL
            RETURNING id, group_id, user_id, joined_at, updated_at, deleted_at,
                      (xmax = 0) AS inserted
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Locks the (group, user) row, if any, until the transaction ends
    ///
    /// Waits for any transaction that is removing the member.
    pub async fn lock<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1 FROM memberships WHERE group_id = $1 AND user_id = $2 FOR UPDATE")
            .bind(group_id)
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

        Ok(())
    }

    /// Finds the membership row for (group, user) regardless of state
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, group_id, user_id, joined_at, updated_at, deleted_at
            FROM memberships
            WHERE group_id = $1 AND user_id = $2
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Finds an active membership in a live group
    pub async fn find_active<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT m.id, m.group_id, m.user_id, m.joined_at, m.updated_at, m.deleted_at
            FROM memberships m
            JOIN groups g ON g.id = m.group_id
            WHERE m.group_id = $1 AND m.user_id = $2
              AND m.deleted_at IS NULL AND g.deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Soft-deletes an active membership
    ///
    /// # Returns
    ///
    /// The deleted row, or None if there was no active membership
    pub async fn soft_delete<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            UPDATE memberships
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE group_id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING id, group_id, user_id, joined_at, updated_at, deleted_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Soft-deletes every active membership of a group
    pub async fn soft_delete_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE group_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists active members of a group ordered by username
    pub async fn list_members<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<Vec<MemberRow>, sqlx::Error> {
        sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT m.id AS membership_id, m.user_id, u.username, m.joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1 AND m.deleted_at IS NULL
            ORDER BY u.username
            "#,
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
    }

    /// Counts active members of a group
    pub async fn count_active<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE group_id = $1 AND deleted_at IS NULL",
        )
        .bind(group_id)
        .fetch_one(executor)
        .await
    }
}
