/// Database models for the meal planner
///
/// This module contains all database models and their query functions. Query functions
/// are generic over [`sqlx::PgExecutor`] so the same call works against the pool or
/// inside a transaction (`&mut *tx`).
///
/// # Models
///
/// - `user`: Users referenced by memberships (owned by the identity service)
/// - `group`: Meal planning groups
/// - `membership`: User-group relationship with soft-delete/resurrection
/// - `role_assignment`: Roles held through a membership
/// - `ban`: Users barred from re-joining a group
/// - `invite`: Time-limited invite tokens
/// - `meal`: Planned meals and their flags
/// - `meal_preference`: Per-user attendance and cook state for a meal
///
/// # Soft deletion
///
/// Deletable rows carry a nullable `deleted_at` column. In Rust code the column is read
/// through [`RowState`] so that "deleted" is an explicit state rather than a null check.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod ban;
pub mod group;
pub mod invite;
pub mod meal;
pub mod meal_preference;
pub mod membership;
pub mod role_assignment;
pub mod user;

/// Lifecycle state of a soft-deletable row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RowState {
    Active,
    Deleted { at: DateTime<Utc> },
}

impl RowState {
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => RowState::Deleted { at },
            None => RowState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, RowState::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            RowState::Active => None,
            RowState::Deleted { at } => Some(*at),
        }
    }
}
