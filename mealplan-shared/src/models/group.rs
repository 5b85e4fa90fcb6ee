/// Group model and database operations
///
/// A group is the unit of sharing: members, invites and meals all hang off it.
/// Deleting a group is a soft delete that cascades to its memberships, roles,
/// invites, meals and preferences (see `services::membership`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::RowState;
use crate::sync::Versioned;

/// Group row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,

    /// Bumped on rename and on every membership change
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn state(&self) -> RowState {
        RowState::from_deleted_at(self.deleted_at)
    }

    /// Inserts a new group
    ///
    /// The creator's membership and admin role are added by the caller in the same
    /// transaction.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        name: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (name, created_by)
            VALUES ($1, $2)
            RETURNING id, name, created_by, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    /// Finds a group that has not been deleted
    pub async fn find_active<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT id, name, created_by, created_at, updated_at, deleted_at
            FROM groups
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Renames a live group
    ///
    /// # Returns
    ///
    /// The updated group, or None if it is absent or deleted
    pub async fn rename<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        name: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Group>(
            r#"
            UPDATE groups
            SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, name, created_by, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(executor)
        .await
    }

    /// Marks a live group deleted
    ///
    /// # Returns
    ///
    /// Number of rows affected (0 if already deleted)
    pub async fn soft_delete<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE groups
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Bumps `updated_at` so group cards re-sync (member count changed)
    pub async fn touch<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE groups SET updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }
}

/// Summary of a group as seen by one of its members
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupCard {
    pub group_id: Uuid,
    pub group_name: String,

    /// Active members
    pub user_count: i64,

    /// Latest of the group's and the viewer's membership `updated_at`
    pub updated_at: DateTime<Utc>,

    /// Set if either the group or the viewer's membership is deleted
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Versioned for GroupCard {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.group_id
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

impl GroupCard {
    /// Group cards for every group the user has ever belonged to that changed since
    /// `since`
    ///
    /// Leaving (or being removed from) a group surfaces as a deleted card for that user,
    /// so the client drops it like a deleted group. With `since = None` only live cards
    /// are returned.
    pub async fn sync_candidates<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GroupCard>(
            r#"
            SELECT g.id AS group_id,
                   g.name AS group_name,
                   (SELECT COUNT(*) FROM memberships c
                    WHERE c.group_id = g.id AND c.deleted_at IS NULL) AS user_count,
                   GREATEST(g.updated_at, m.updated_at) AS updated_at,
                   GREATEST(g.deleted_at, m.deleted_at) AS deleted_at
            FROM memberships m
            JOIN groups g ON g.id = m.group_id
            WHERE m.user_id = $1
              AND (
                    ($2::timestamptz IS NULL AND g.deleted_at IS NULL AND m.deleted_at IS NULL)
                 OR GREATEST(g.updated_at, m.updated_at) > $2
                 OR GREATEST(g.deleted_at, m.deleted_at) >= $2
              )
            ORDER BY g.name, g.id
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(executor)
        .await
    }
}
