/// Membership lifecycle
///
/// Creating, joining, leaving and deleting groups, plus moderation (kick, ban, unban)
/// and role management. Multi-step operations run in one transaction; a failure at
/// any step rolls the whole operation back.
///
/// # State machine
///
/// ```text
///            join                 leave / kick / ban
///   (none) ──────▶ Active ◀──────────────────────────▶ Deleted
///                    ▲                join (not banned)   │
///                    └────────────────────────────────────┘
/// ```
///
/// Re-joining resurrects the same membership row, so its ID, and the role rows and
/// closed-meal history that point at it, are preserved.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{authorize, resolve_roles};
use crate::error::{DomainError, DomainResult, Outcome};
use crate::models::ban::Ban;
use crate::models::group::Group;
use crate::models::invite::Invite;
use crate::models::meal::{Meal, MealCard};
use crate::models::meal_preference::PreferenceRecord;
use crate::models::membership::Membership;
use crate::models::role_assignment::RoleAssignment;
use crate::permissions::{Action, PermissionMatrix, Role};
use crate::services::meals::{load_cards, week_window};

/// Longest accepted group name (matches the column width)
pub const MAX_GROUP_NAME_LEN: usize = 100;

/// What `join` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinOutcome {
    /// A new membership row was inserted
    Created,
    /// A soft-deleted membership was reactivated
    Resurrected,
    /// The user was already an active member; nothing changed
    AlreadyMember,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResult {
    pub outcome: JoinOutcome,
    pub membership: Membership,
}

/// An active member with their roles
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: Uuid,
    pub username: String,
    pub joined_at: DateTime<Utc>,
    pub user_roles: Vec<Role>,
}

/// Group as seen by one member: identity, the member's standing and a week of meals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub group_id: Uuid,
    pub group_name: String,
    pub user_count: i64,
    pub user_roles: Vec<Role>,
    pub capabilities: Vec<Action>,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    pub meals: Vec<MealCard>,
}

/// Trims a group name and checks its length
pub fn validate_group_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("group name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(DomainError::InvalidInput(format!(
            "group name must be at most {} characters",
            MAX_GROUP_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Creates or resurrects `user_id`'s membership in `group_id` on an open transaction
///
/// Shared by direct joins and invite redemption.
pub(crate) async fn join_group(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> DomainResult<JoinResult> {
    Group::find_active(&mut *conn, group_id)
        .await?
        .ok_or(DomainError::NotFound("group"))?;

    // A ban in flight holds this row until it commits; checking after the lock sees it.
    Membership::lock(&mut *conn, group_id, user_id).await?;
    if Ban::exists(&mut *conn, group_id, user_id).await? {
        return Err(DomainError::Banned { group_id, user_id });
    }

    let Some(upserted) = Membership::activate(&mut *conn, group_id, user_id).await? else {
        let membership = Membership::find_active(&mut *conn, group_id, user_id)
            .await?
            .ok_or(DomainError::NoMatchingMembership { group_id, user_id })?;
        return Ok(JoinResult {
            outcome: JoinOutcome::AlreadyMember,
            membership,
        });
    };

    RoleAssignment::grant(&mut *conn, &upserted.membership, Role::Member).await?;
    Group::touch(&mut *conn, group_id).await?;

    let outcome = if upserted.inserted {
        JoinOutcome::Created
    } else {
        JoinOutcome::Resurrected
    };

    info!(group_id = %group_id, user_id = %user_id, outcome = ?outcome, "Member joined group");

    Ok(JoinResult {
        outcome,
        membership: upserted.membership,
    })
}

/// Group membership operations
#[derive(Clone)]
pub struct MembershipService {
    pool: PgPool,
    permissions: Arc<PermissionMatrix>,
}

impl MembershipService {
    pub fn new(pool: PgPool, permissions: Arc<PermissionMatrix>) -> Self {
        Self { pool, permissions }
    }

    /// Creates a group with `creator` as its first member, holding `admin` and `member`
    pub async fn create_group(&self, creator: Uuid, name: &str) -> DomainResult<Group> {
        let name = validate_group_name(name)?;

        let mut tx = self.pool.begin().await?;

        let group = Group::create(&mut *tx, &name, creator).await?;
        let membership = Membership::activate(&mut *tx, group.id, creator)
            .await?
            .map(|upserted| upserted.membership)
            .ok_or(DomainError::NoMatchingMembership {
                group_id: group.id,
                user_id: creator,
            })?;
        RoleAssignment::grant(&mut *tx, &membership, Role::Admin).await?;
        RoleAssignment::grant(&mut *tx, &membership, Role::Member).await?;

        tx.commit().await?;

        info!(group_id = %group.id, user_id = %creator, "Group created");
        Ok(group)
    }

    /// Joins a group directly
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group is absent or deleted
    /// - `Banned` if the user is banned from the group
    pub async fn join(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<JoinResult> {
        let mut tx = self.pool.begin().await?;
        let result = join_group(&mut tx, group_id, user_id).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Leaves a group
    ///
    /// The user's preferences on still-open meals are removed; closed meals keep them.
    /// Role rows stay and come back if the user re-joins.
    ///
    /// # Returns
    ///
    /// Number of open-meal preferences that were cleared
    pub async fn leave(&self, group_id: Uuid, user_id: Uuid) -> DomainResult<i64> {
        let mut tx = self.pool.begin().await?;

        let cleared = remove_member(&mut tx, group_id, user_id).await?;

        tx.commit().await?;

        info!(group_id = %group_id, user_id = %user_id, cleared, "Member left group");
        Ok(cleared)
    }

    /// Removes another member from the group
    pub async fn kick(&self, caller: Uuid, group_id: Uuid, target: Uuid) -> DomainResult<()> {
        self.moderate(caller, group_id, target, Action::CanKickUsers).await
    }

    /// Removes another member and bars them from re-joining
    pub async fn ban(&self, caller: Uuid, group_id: Uuid, target: Uuid) -> DomainResult<()> {
        self.moderate(caller, group_id, target, Action::CanBanUsers).await
    }

    async fn moderate(
        &self,
        caller: Uuid,
        group_id: Uuid,
        target: Uuid,
        action: Action,
    ) -> DomainResult<()> {
        if caller == target {
            return Err(DomainError::SelfModeration);
        }

        let mut tx = self.pool.begin().await?;

        authorize(&mut *tx, &self.permissions, group_id, caller, action).await?;

        let membership = Membership::find_active(&mut *tx, group_id, target)
            .await?
            .ok_or(DomainError::NoMatchingMembership {
                group_id,
                user_id: target,
            })?;

        remove_member(&mut tx, group_id, target).await?;
        RoleAssignment::revoke_elevated(&mut *tx, membership.id).await?;

        if action == Action::CanBanUsers {
            Ban::create(&mut *tx, group_id, target, caller).await?;
        }

        tx.commit().await?;

        info!(
            group_id = %group_id,
            caller = %caller,
            target = %target,
            action = action.as_str(),
            "Member removed from group"
        );
        Ok(())
    }

    /// Lifts a ban; the user may join again but is not re-added
    pub async fn unban(&self, caller: Uuid, group_id: Uuid, target: Uuid) -> DomainResult<Outcome> {
        if caller == target {
            return Err(DomainError::SelfModeration);
        }

        authorize(&self.pool, &self.permissions, group_id, caller, Action::CanUnbanUser).await?;

        let outcome = Ban::delete(&self.pool, group_id, target).await?;
        info!(group_id = %group_id, target = %target, outcome = ?outcome, "Unban");
        Ok(outcome)
    }

    /// Grants `role` to an active member
    pub async fn assign_role(
        &self,
        caller: Uuid,
        group_id: Uuid,
        target: Uuid,
        role: Role,
    ) -> DomainResult<Outcome> {
        let mut tx = self.pool.begin().await?;

        authorize(&mut *tx, &self.permissions, group_id, caller, Action::promote_to(role)).await?;

        let membership = Membership::find_active(&mut *tx, group_id, target)
            .await?
            .ok_or(DomainError::NoMatchingMembership {
                group_id,
                user_id: target,
            })?;
        let outcome = RoleAssignment::grant(&mut *tx, &membership, role).await?;

        tx.commit().await?;

        info!(group_id = %group_id, target = %target, role = role.as_str(), outcome = ?outcome, "Role assigned");
        Ok(outcome)
    }

    /// Removes `role` from an active member
    pub async fn revoke_role(
        &self,
        caller: Uuid,
        group_id: Uuid,
        target: Uuid,
        role: Role,
    ) -> DomainResult<Outcome> {
        let mut tx = self.pool.begin().await?;

        authorize(&mut *tx, &self.permissions, group_id, caller, Action::demote_from(role)).await?;

        let membership = Membership::find_active(&mut *tx, group_id, target)
            .await?
            .ok_or(DomainError::NoMatchingMembership {
                group_id,
                user_id: target,
            })?;
        let outcome = RoleAssignment::revoke(&mut *tx, membership.id, role).await?;

        tx.commit().await?;

        info!(group_id = %group_id, target = %target, role = role.as_str(), outcome = ?outcome, "Role revoked");
        Ok(outcome)
    }

    /// Renames a group
    pub async fn rename_group(&self, caller: Uuid, group_id: Uuid, name: &str) -> DomainResult<Group> {
        let name = validate_group_name(name)?;

        authorize(&self.pool, &self.permissions, group_id, caller, Action::CanUpdateGroup).await?;

        Group::rename(&self.pool, group_id, &name)
            .await?
            .ok_or(DomainError::NotFound("group"))
    }

    /// Deletes a group and everything that hangs off it
    ///
    /// Preferences, meals and memberships are soft-deleted (they stay visible to sync as
    /// tombstones), invites are voided, and role and ban rows are removed.
    pub async fn delete_group(&self, caller: Uuid, group_id: Uuid) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        authorize(&mut *tx, &self.permissions, group_id, caller, Action::CanDeleteGroup).await?;

        let preferences = PreferenceRecord::soft_delete_for_group(&mut *tx, group_id).await?;
        let meals = Meal::soft_delete_for_group(&mut *tx, group_id).await?;
        let invites = Invite::void_for_group(&mut *tx, group_id).await?;
        RoleAssignment::delete_for_group(&mut *tx, group_id).await?;
        Ban::delete_for_group(&mut *tx, group_id).await?;
        let memberships = Membership::soft_delete_for_group(&mut *tx, group_id).await?;
        Group::soft_delete(&mut *tx, group_id).await?;

        tx.commit().await?;

        info!(
            group_id = %group_id,
            caller = %caller,
            preferences,
            meals,
            invites,
            memberships,
            "Group deleted"
        );
        Ok(())
    }

    /// Active members with their roles, ordered by username
    pub async fn list_members(&self, caller: Uuid, group_id: Uuid) -> DomainResult<Vec<Member>> {
        resolve_roles(&self.pool, group_id, caller).await?;

        let rows = Membership::list_members(&self.pool, group_id).await?;
        let mut roles: BTreeMap<Uuid, Vec<Role>> = BTreeMap::new();
        for assignment in RoleAssignment::list_for_group(&self.pool, group_id).await? {
            roles.entry(assignment.user_id).or_default().push(assignment.role);
        }

        Ok(rows
            .into_iter()
            .map(|row| Member {
                user_roles: roles.remove(&row.user_id).unwrap_or_default(),
                user_id: row.user_id,
                username: row.username,
                joined_at: row.joined_at,
            })
            .collect())
    }

    /// Group overview for one member, with meal cards for the week containing `week_of`
    pub async fn group_detail(
        &self,
        caller: Uuid,
        group_id: Uuid,
        week_of: DateTime<Utc>,
    ) -> DomainResult<GroupDetail> {
        let roles = resolve_roles(&self.pool, group_id, caller).await?;

        let group = Group::find_active(&self.pool, group_id)
            .await?
            .ok_or(DomainError::NotFound("group"))?;
        let user_count = Membership::count_active(&self.pool, group_id).await?;

        let (week_start, week_end) = week_window(week_of);
        let meals = Meal::list_in_window(&self.pool, group_id, week_start, week_end).await?;
        let meals = load_cards(&self.pool, meals, caller).await?;

        Ok(GroupDetail {
            group_id: group.id,
            group_name: group.name,
            user_count,
            capabilities: self.permissions.allowed_actions(&roles).into_iter().collect(),
            user_roles: roles,
            week_start,
            week_end,
            meals,
        })
    }
}

/// Soft-deletes an active membership, clears open-meal preferences and bumps the group
async fn remove_member(conn: &mut PgConnection, group_id: Uuid, user_id: Uuid) -> DomainResult<i64> {
    Membership::soft_delete(&mut *conn, group_id, user_id)
        .await?
        .ok_or(DomainError::NoMatchingMembership { group_id, user_id })?;

    let cleared = PreferenceRecord::clear_open_for_member(&mut *conn, group_id, user_id).await?;
    Group::touch(&mut *conn, group_id).await?;

    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_validate_group_name() {
        assert_eq!(validate_group_name("  Dinner Club ").unwrap(), "Dinner Club");
        assert_eq!(
            validate_group_name("   ").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(validate_group_name(&"x".repeat(MAX_GROUP_NAME_LEN)).is_ok());
        assert!(validate_group_name(&"x".repeat(MAX_GROUP_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_join_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&JoinOutcome::AlreadyMember).unwrap(),
            "\"alreadyMember\""
        );
    }
}
