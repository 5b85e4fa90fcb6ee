/// User model and database operations
///
/// Accounts are created and authenticated by the identity service; this table only
/// anchors foreign keys and carries the display name shown on participant lists.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(64) NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// User row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name, unique across all users
    pub username: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Set when the account was removed upstream
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Registers a user row
    ///
    /// Called when the identity service provisions an account.
    ///
    /// # Errors
    ///
    /// Returns a unique violation on `users_username_key` if the name is taken.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id, username, created_at, updated_at, deleted_at
            "#,
        )
        .bind(username)
        .fetch_one(executor)
        .await
    }

    /// Finds a live user by ID
    ///
    /// # Returns
    ///
    /// The user if found and not deleted, None otherwise
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a live user by username
    pub async fn find_by_username<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, created_at, updated_at, deleted_at
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(executor)
        .await
    }

    /// Changes a user's display name
    ///
    /// # Returns
    ///
    /// The updated user, or None if the user does not exist
    ///
    /// # Errors
    ///
    /// Returns a unique violation if another user already has `username`.
    pub async fn update_username<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, username, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(username)
        .fetch_optional(executor)
        .await
    }
}
