/// Role assignments held through a membership
///
/// Rows are keyed by (membership_id, role), so granting a role twice is a no-op.
/// Role rows are not removed when a member leaves voluntarily; resurrecting the
/// membership brings them back. Moderation (kick/ban) strips elevated roles.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE role_assignments (
///     membership_id UUID NOT NULL REFERENCES memberships(id),
///     group_id UUID NOT NULL REFERENCES groups(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role group_role NOT NULL,
///     granted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (membership_id, role)
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::Outcome;
use crate::models::membership::Membership;
use crate::permissions::Role;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoleAssignment {
    pub membership_id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub granted_at: DateTime<Utc>,
}

/// One row of the caller-role lookup
#[derive(Debug, sqlx::FromRow)]
struct MemberRole {
    role: Option<Role>,
}

impl RoleAssignment {
    /// Grants `role` through `membership`
    ///
    /// # Returns
    ///
    /// `Applied` if the role was added, `Unchanged` if it was already held
    pub async fn grant<'e, E: PgExecutor<'e>>(
        executor: E,
        membership: &Membership,
        role: Role,
    ) -> Result<Outcome, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_assignments (membership_id, group_id, user_id, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (membership_id, role) DO NOTHING
            "#,
        )
        .bind(membership.id)
        .bind(membership.group_id)
        .bind(membership.user_id)
        .bind(role)
        .execute(executor)
        .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Removes `role` from a membership
    pub async fn revoke<'e, E: PgExecutor<'e>>(
        executor: E,
        membership_id: Uuid,
        role: Role,
    ) -> Result<Outcome, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM role_assignments WHERE membership_id = $1 AND role = $2")
                .bind(membership_id)
                .bind(role)
                .execute(executor)
                .await?;

        Ok(Outcome::from_rows_affected(result.rows_affected()))
    }

    /// Removes every role above plain membership
    pub async fn revoke_elevated<'e, E: PgExecutor<'e>>(
        executor: E,
        membership_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM role_assignments WHERE membership_id = $1 AND role <> 'member'",
        )
        .bind(membership_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes all role rows of a group
    pub async fn delete_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM role_assignments WHERE group_id = $1")
            .bind(group_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Resolves the roles of an active member of a live group
    ///
    /// # Returns
    ///
    /// - `None` if the user has no active membership (or the group is deleted)
    /// - `Some(roles)` otherwise, sorted; may be empty
    pub async fn active_roles<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Vec<Role>>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MemberRole>(
            r#"
            SELECT r.role
            FROM memberships m
            JOIN groups g ON g.id = m.group_id
            LEFT JOIN role_assignments r ON r.membership_id = m.id
            WHERE m.group_id = $1 AND m.user_id = $2
              AND m.deleted_at IS NULL AND g.deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut roles: Vec<Role> = rows.into_iter().filter_map(|row| row.role).collect();
        roles.sort();
        Ok(Some(roles))
    }

    /// Roles of every active member of a group, ordered by user
    pub async fn list_for_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<Vec<RoleAssignment>, sqlx::Error> {
        sqlx::query_as::<_, RoleAssignment>(
            r#"
            SELECT r.membership_id, r.group_id, r.user_id, r.role, r.granted_at
            FROM role_assignments r
            JOIN memberships m ON m.id = r.membership_id
            WHERE r.group_id = $1 AND m.deleted_at IS NULL
            ORDER BY r.user_id, r.role
            "#,
        )
        .bind(group_id)
        .fetch_all(executor)
        .await
    }
}
