/// Group invite model and database operations
///
/// An invite is usable while it is not voided (`deleted_at IS NULL`), has not expired
/// and its group is live. Voiding is a soft delete and is never undone.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE group_invites (
///     token VARCHAR(64) PRIMARY KEY,
///     group_id UUID NOT NULL REFERENCES groups(id),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL,
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::Outcome;
use crate::models::RowState;

/// Invite row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub token: String,
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Invite {
    pub fn state(&self) -> RowState {
        RowState::from_deleted_at(self.deleted_at)
    }

    /// Whether the invite can still be redeemed at `now` (ignores group state)
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state().is_active() && self.expires_at > now
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
        group_id: Uuid,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO group_invites (token, group_id, created_by, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING token, group_id, created_by, created_at, expires_at, deleted_at
            "#,
        )
        .bind(token)
        .bind(group_id)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Finds an invite regardless of state
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invite>(
            r#"
            SELECT token, group_id, created_by, created_at, expires_at, deleted_at
            FROM group_invites
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(executor)
        .await
    }

    /// Finds an invite that can be redeemed right now
    ///
    /// Expiry is evaluated against the database clock.
    pub async fn find_usable<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invite>(
            r#"
            SELECT i.token, i.group_id, i.created_by, i.created_at, i.expires_at, i.deleted_at
            FROM group_invites i
            JOIN groups g ON g.id = i.group_id
            WHERE i.token = $1
              AND i.deleted_at IS NULL
              AND i.expires_at > NOW()
              AND g.deleted_at IS NULL
            "#,
        )
        .bind(token)
        .fetch_optional(executor)
        .await
    }

    /// Voids a live invite
    ///
    /// # Returns
    ///
    /// `Unchanged` if the invite was already voided
    pub async fn void<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
    ) -> Result<Outcome, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE group_invites SET deleted_at = NOW() WHERE token = $1 AND deleted_at IS NULL",
        )
        .bind(token)
        .execute(executor)
        .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Voids every live invite of a group
    pub async fn void_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE group_invites SET deleted_at = NOW() WHERE group_id = $1 AND deleted_at IS NULL",
        )
        .bind(group_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists non-voided, unexpired invites of a group, soonest expiry first
    pub async fn list_usable<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invite>(
            r#"
            SELECT token, group_id, created_by, created_at, expires_at, deleted_at
            FROM group_invites
            WHERE group_id = $1 AND deleted_at IS NULL AND expires_at > NOW()
            ORDER BY expires_at, token
            "#,
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
    }
}
