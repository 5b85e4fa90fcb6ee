/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `users`: Caller profile
/// - `groups`: Group lifecycle and membership
/// - `invites`: Invite links
/// - `management`: Moderation and roles
/// - `meals`: Meals, preferences and cooks
/// - `sync`: Incremental sync

pub mod groups;
pub mod health;
pub mod invites;
pub mod management;
pub mod meals;
pub mod sync;
pub mod users;

use mealplan_shared::error::Outcome;
use serde::Serialize;

/// Body of idempotent mutations: whether anything changed
#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    pub changed: bool,
}

impl From<Outcome> for ChangeResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            changed: outcome.is_applied(),
        }
    }
}
