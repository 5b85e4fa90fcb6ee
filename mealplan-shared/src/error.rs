/// Domain error taxonomy
///
/// Every service operation returns [`DomainResult`]. Variants fall into five categories
/// (see [`ErrorKind`]) which the HTTP layer maps onto status codes. Named variants such
/// as [`DomainError::NoMatchingMembership`] exist so callers and logs can tell cases
/// apart, but they never leak more than their category to clients.

use uuid::Uuid;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Group, meal, invite or user is absent, deleted or expired
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No active membership for (group, user)
    #[error("no active membership for user {user_id} in group {group_id}")]
    NoMatchingMembership { group_id: Uuid, user_id: Uuid },

    /// Caller's roles lack the required action
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// User is banned from the group
    #[error("user {user_id} is banned from group {group_id}")]
    Banned { group_id: Uuid, user_id: Uuid },

    /// Unique constraint violation
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or semantically invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Kick, ban or unban aimed at the caller themself
    #[error("you can't moderate yourself, leave the group instead")]
    SelfModeration,

    /// Explicit cook removal found nothing to remove
    #[error("user {user_id} wasn't a cook for meal {meal_id}")]
    UserWasntACook { meal_id: Uuid, user_id: Uuid },

    /// Store failure
    #[error("database error: {0}")]
    Internal(#[from] sqlx::Error),
}

/// Client-visible category of a [`DomainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Conflict,
    InvalidInput,
    Internal,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(_) | DomainError::NoMatchingMembership { .. } => {
                ErrorKind::NotFound
            }
            DomainError::Forbidden(_) | DomainError::Banned { .. } => ErrorKind::Forbidden,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvalidInput(_)
            | DomainError::SelfModeration
            | DomainError::UserWasntACook { .. } => ErrorKind::InvalidInput,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Maps a unique-constraint violation to `Conflict`, everything else to `Internal`
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DomainError::Conflict(format!("{} already exists", what));
            }
        }
        DomainError::Internal(err)
    }
}

/// Result of an idempotent mutation
///
/// `Unchanged` means the desired end state already held; callers report it as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Unchanged,
}

impl Outcome {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows > 0 {
            Outcome::Applied
        } else {
            Outcome::Unchanged
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}
