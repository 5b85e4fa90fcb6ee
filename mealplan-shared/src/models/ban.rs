/// Group bans
///
/// A ban row blocks the user from joining the group again, whether by invite or
/// directly. Unbanning deletes the row; it does not restore the membership.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::Outcome;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Ban {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub banned_by: Uuid,
    pub banned_at: DateTime<Utc>,
}

impl Ban {
    /// Records a ban; a repeated ban keeps the original row
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
        banned_by: Uuid,
    ) -> Result<Outcome, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO group_bans (group_id, user_id, banned_by)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, user_id) DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(banned_by)
        .execute(executor)
        .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    pub async fn exists<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM group_bans WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Outcome, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_bans WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Removes all bans of a group
    pub async fn delete_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM group_bans WHERE group_id = $1")
            .bind(group_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
