/// Group-scoped authorization
///
/// Every mutation inside a group runs the same two steps before touching any data:
///
/// 1. Resolve the caller's roles from their active membership. A caller who is not an
///    active member of a live group gets `NoMatchingMembership`, reported as NotFound so
///    outsiders cannot probe which groups exist.
/// 2. Ask the [`PermissionMatrix`] whether those roles allow the action; `Forbidden`
///    otherwise.
///
/// # Example
///
/// ```no_run
/// use mealplan_shared::auth::authorization::authorize;
/// use mealplan_shared::permissions::{Action, PermissionMatrix};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, group_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let matrix = PermissionMatrix::standard();
/// let roles = authorize(&pool, &matrix, group_id, user_id, Action::CanDeleteGroup).await?;
/// println!("caller holds {:?}", roles);
/// # Ok(())
/// # }
/// ```

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::role_assignment::RoleAssignment;
use crate::permissions::{Action, PermissionMatrix, Role};

/// Resolves the roles of an active member
///
/// # Errors
///
/// - `NoMatchingMembership` if the user is not an active member of a live group
/// - `Internal` on database failure
pub async fn resolve_roles<'e, E: PgExecutor<'e>>(
    executor: E,
    group_id: Uuid,
    user_id: Uuid,
) -> DomainResult<Vec<Role>> {
    RoleAssignment::active_roles(executor, group_id, user_id)
        .await?
        .ok_or(DomainError::NoMatchingMembership { group_id, user_id })
}

/// Checks already-resolved roles against the matrix
pub fn require_action(
    matrix: &PermissionMatrix,
    roles: &[Role],
    action: Action,
) -> DomainResult<()> {
    if matrix.can_perform_action(roles, action) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!("missing {}", action.as_str())))
    }
}

/// Resolves the caller's roles and requires `action`
///
/// # Returns
///
/// The caller's roles, for callers that also report capabilities
pub async fn authorize<'e, E: PgExecutor<'e>>(
    executor: E,
    matrix: &PermissionMatrix,
    group_id: Uuid,
    user_id: Uuid,
    action: Action,
) -> DomainResult<Vec<Role>> {
    let roles = resolve_roles(executor, group_id, user_id).await?;

    if let Err(err) = require_action(matrix, &roles, action) {
        tracing::debug!(
            group_id = %group_id,
            user_id = %user_id,
            action = action.as_str(),
            "Action denied"
        );
        return Err(err);
    }

    Ok(roles)
}

/// Acting on one's own state needs only membership; acting on someone else's needs
/// `action`
pub fn require_self_or_action(
    matrix: &PermissionMatrix,
    roles: &[Role],
    caller_id: Uuid,
    target_id: Uuid,
    action: Action,
) -> DomainResult<()> {
    if caller_id == target_id {
        return Ok(());
    }
    require_action(matrix, roles, action)
}
