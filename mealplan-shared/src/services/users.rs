/// User profile
///
/// Accounts themselves belong to the identity service; this only reads the profile
/// and lets users change their display name.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::group::GroupCard;
use crate::models::meal_preference::PreferenceRecord;
use crate::models::user::User;

/// Longest accepted username (matches the column width)
pub const MAX_USERNAME_LEN: usize = 64;

/// The caller's profile with the groups they belong to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub username: String,
    pub groups: Vec<GroupCard>,
}

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn profile(&self, user_id: Uuid) -> DomainResult<Profile> {
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(DomainError::NotFound("user"))?;
        let groups = GroupCard::sync_candidates(&self.pool, user_id, None).await?;

        Ok(Profile {
            user_id: user.id,
            username: user.username,
            groups,
        })
    }

    /// Changes the caller's display name
    ///
    /// Preference rows carry the username, so the caller's live rows are bumped in the
    /// same transaction and meal sync picks up the new name.
    ///
    /// # Errors
    ///
    /// `Conflict` if the name is taken by another user
    pub async fn rename(&self, user_id: Uuid, username: &str) -> DomainResult<User> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::InvalidInput(format!(
                "username must be 1 to {} characters",
                MAX_USERNAME_LEN
            )));
        }

        let mut tx = self.pool.begin().await?;

        let user = User::update_username(&mut *tx, user_id, username)
            .await
            .map_err(|e| DomainError::from_write(e, "username"))?
            .ok_or(DomainError::NotFound("user"))?;
        let preferences = PreferenceRecord::touch_for_user(&mut *tx, user_id).await?;

        tx.commit().await?;

        info!(user_id = %user_id, preferences, "Username changed");
        Ok(user)
    }
}
