/// Incremental sync queries
///
/// Each scope fetches its candidate rows (changed or deleted since the watermark) and
/// hands them to [`SyncDelta::partition`]. Scopes inside a group require an active
/// membership; non-members get NotFound.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::auth::authorization::resolve_roles;
use crate::error::{DomainError, DomainResult};
use crate::models::group::GroupCard;
use crate::models::meal::{Meal, MealCard};
use crate::models::meal_preference::PreferenceRecord;
use crate::services::meals::load_cards;
use crate::sync::SyncDelta;

/// Sync operations
#[derive(Clone)]
pub struct SyncService {
    pool: PgPool,
}

impl SyncService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Group cards of the caller
    ///
    /// Groups the caller left or was removed from come back as deleted ids.
    pub async fn sync_groups(
        &self,
        user_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> DomainResult<SyncDelta<GroupCard>> {
        let candidates = GroupCard::sync_candidates(&self.pool, user_id, since).await?;
        let delta = SyncDelta::partition(candidates, since);

        debug!(
            user_id = %user_id,
            items = delta.items.len(),
            deleted = delta.deleted_ids.len(),
            "Group sync"
        );
        Ok(delta)
    }

    /// Meal cards of a group scheduled within `[start, end]`
    pub async fn sync_group_meals(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        since: Option<DateTime<Utc>>,
    ) -> DomainResult<SyncDelta<MealCard>> {
        if start > end {
            return Err(DomainError::InvalidInput(
                "startDate must not be after endDate".to_string(),
            ));
        }

        resolve_roles(&self.pool, group_id, user_id).await?;

        let meals = Meal::sync_candidates(&self.pool, group_id, start, end, since).await?;
        let cards = load_cards(&self.pool, meals, user_id).await?;
        let delta = SyncDelta::partition(cards, since);

        debug!(
            group_id = %group_id,
            items = delta.items.len(),
            deleted = delta.deleted_ids.len(),
            "Meal sync"
        );
        Ok(delta)
    }

    /// Preference rows of one meal, keyed by user
    pub async fn sync_meal(
        &self,
        user_id: Uuid,
        meal_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> DomainResult<SyncDelta<PreferenceRecord>> {
        let meal = Meal::find_active(&self.pool, meal_id)
            .await?
            .ok_or(DomainError::NotFound("meal"))?;

        resolve_roles(&self.pool, meal.group_id, user_id).await?;

        let rows = PreferenceRecord::sync_candidates(&self.pool, meal_id, since).await?;
        Ok(SyncDelta::partition(rows, since))
    }
}
