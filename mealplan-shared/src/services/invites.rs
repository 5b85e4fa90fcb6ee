/// Invite links
///
/// An invite is a random token bound to a group with an expiry. Lookups never tell the
/// caller why a token is unusable: absent, expired, voided and deleted-group tokens
/// all come back as NotFound.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{authorize, require_action, resolve_roles};
use crate::auth::invite_token::{generate_invite_token, validate_invite_token_format};
use crate::error::{DomainError, DomainResult, Outcome};
use crate::models::invite::Invite;
use crate::permissions::{Action, PermissionMatrix};
use crate::services::membership::{join_group, JoinResult};

/// Invite operations
#[derive(Clone)]
pub struct InviteService {
    pool: PgPool,
    permissions: Arc<PermissionMatrix>,
}

impl InviteService {
    pub fn new(pool: PgPool, permissions: Arc<PermissionMatrix>) -> Self {
        Self { pool, permissions }
    }

    /// Creates an invite for `group_id` valid until `expires_at`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `expires_at` is not in the future
    /// - `Forbidden` without `CanCreateInviteLinks`
    pub async fn create_invite(
        &self,
        caller: Uuid,
        group_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<Invite> {
        if expires_at <= Utc::now() {
            return Err(DomainError::InvalidInput(
                "expiration must be in the future".to_string(),
            ));
        }

        authorize(&self.pool, &self.permissions, group_id, caller, Action::CanCreateInviteLinks)
            .await?;

        let token = generate_invite_token();
        let invite = Invite::create(&self.pool, &token, group_id, caller, expires_at)
            .await
            .map_err(|e| DomainError::from_write(e, "invite"))?;

        info!(group_id = %group_id, expires_at = %invite.expires_at, "Invite created");
        Ok(invite)
    }

    /// Resolves a token to its group
    ///
    /// Read-only; the caller does not need to be authenticated against the group.
    pub async fn validate_invite(&self, token: &str) -> DomainResult<Uuid> {
        if !validate_invite_token_format(token) {
            return Err(DomainError::NotFound("invite"));
        }

        Invite::find_usable(&self.pool, token)
            .await?
            .map(|invite| invite.group_id)
            .ok_or(DomainError::NotFound("invite"))
    }

    /// Redeems a token; already being a member counts as success
    pub async fn join_via_invite(&self, token: &str, user_id: Uuid) -> DomainResult<JoinResult> {
        if !validate_invite_token_format(token) {
            return Err(DomainError::NotFound("invite"));
        }

        let mut tx = self.pool.begin().await?;

        let invite = Invite::find_usable(&mut *tx, token)
            .await?
            .ok_or(DomainError::NotFound("invite"))?;
        let result = join_group(&mut tx, invite.group_id, user_id).await?;

        tx.commit().await?;
        Ok(result)
    }

    /// Voids a token
    ///
    /// Unknown and already-voided tokens are a soft success, and so is a live token of
    /// a group the caller is not in: outsiders cannot tell the cases apart. Members
    /// need `CanVoidInviteLinks` on the token's group.
    pub async fn void_invite(&self, caller: Uuid, token: &str) -> DomainResult<Outcome> {
        let Some(invite) = Invite::find(&self.pool, token).await? else {
            return Ok(Outcome::Unchanged);
        };
        if !invite.state().is_active() {
            return Ok(Outcome::Unchanged);
        }

        let roles = match resolve_roles(&self.pool, invite.group_id, caller).await {
            Ok(roles) => roles,
            Err(DomainError::NoMatchingMembership { .. }) => return Ok(Outcome::Unchanged),
            Err(err) => return Err(err),
        };
        require_action(&self.permissions, &roles, Action::CanVoidInviteLinks)?;

        let outcome = Invite::void(&self.pool, token).await?;
        info!(group_id = %invite.group_id, outcome = ?outcome, "Invite voided");
        Ok(outcome)
    }

    /// Usable invites of a group, soonest expiry first
    pub async fn list_invites(&self, caller: Uuid, group_id: Uuid) -> DomainResult<Vec<Invite>> {
        authorize(&self.pool, &self.permissions, group_id, caller, Action::CanViewInviteLinks)
            .await?;

        Ok(Invite::list_usable(&self.pool, group_id).await?)
    }
}
