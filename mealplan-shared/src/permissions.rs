/// Role-based permission engine
///
/// Every mutation inside a group is gated by an [`Action`]. Whether a caller may perform
/// an action is answered by a [`PermissionMatrix`]: an immutable `Action × Role → bool`
/// table built once at start-up and shared (behind an `Arc`) by every request.
///
/// Actions without a matrix entry are denied. Promotion/demotion actions are derived from
/// the target role through [`Action::promote_to`] / [`Action::demote_from`], so there is
/// no way to spell an action the matrix does not know about.
///
/// # Example
///
/// ```
/// use mealplan_shared::permissions::{Action, PermissionMatrix, Role};
///
/// let matrix = PermissionMatrix::standard();
///
/// assert!(matrix.can_perform_action(&[Role::Admin, Role::Member], Action::CanDeleteGroup));
/// assert!(!matrix.can_perform_action(&[Role::Member], Action::CanDeleteGroup));
///
/// let caps = matrix.allowed_actions(&[Role::Manager]);
/// assert!(caps.contains(&Action::CanCreateMeal));
/// ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Roles a member can hold inside a group
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control over the group
    Admin,

    /// Plans meals on behalf of the group
    Manager,

    /// Regular participant
    Member,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// Parses a role name as sent by clients
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    /// Roles above plain membership; stripped when a member is removed by a moderator
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Role::Member)
    }
}

/// Permission-gated operations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CanCreateMeal,
    CanUpdateMeal,
    CanDeleteMeal,
    CanChangeMealFlags,
    CanForceMealPreferenceAndCooking,
    CanUpdateGroup,
    CanDeleteGroup,
    CanBanUsers,
    CanUnbanUser,
    CanKickUsers,
    CanCreateInviteLinks,
    CanVoidInviteLinks,
    CanViewInviteLinks,
    CanSendNotifications,
    CanPromoteToAdmin,
    CanDemoteFromAdmin,
    CanPromoteToManager,
    CanDemoteFromManager,
    CanPromoteToMember,
    CanDemoteFromMember,
}

impl Action {
    /// Every action, in declaration order
    pub const ALL: [Action; 20] = [
        Action::CanCreateMeal,
        Action::CanUpdateMeal,
        Action::CanDeleteMeal,
        Action::CanChangeMealFlags,
        Action::CanForceMealPreferenceAndCooking,
        Action::CanUpdateGroup,
        Action::CanDeleteGroup,
        Action::CanBanUsers,
        Action::CanUnbanUser,
        Action::CanKickUsers,
        Action::CanCreateInviteLinks,
        Action::CanVoidInviteLinks,
        Action::CanViewInviteLinks,
        Action::CanSendNotifications,
        Action::CanPromoteToAdmin,
        Action::CanDemoteFromAdmin,
        Action::CanPromoteToManager,
        Action::CanDemoteFromManager,
        Action::CanPromoteToMember,
        Action::CanDemoteFromMember,
    ];

    /// Action required to grant `role` to someone
    pub fn promote_to(role: Role) -> Action {
        match role {
            Role::Admin => Action::CanPromoteToAdmin,
            Role::Manager => Action::CanPromoteToManager,
            Role::Member => Action::CanPromoteToMember,
        }
    }

    /// Action required to take `role` away from someone
    pub fn demote_from(role: Role) -> Action {
        match role {
            Role::Admin => Action::CanDemoteFromAdmin,
            Role::Manager => Action::CanDemoteFromManager,
            Role::Member => Action::CanDemoteFromMember,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CanCreateMeal => "can_create_meal",
            Action::CanUpdateMeal => "can_update_meal",
            Action::CanDeleteMeal => "can_delete_meal",
            Action::CanChangeMealFlags => "can_change_meal_flags",
            Action::CanForceMealPreferenceAndCooking => "can_force_meal_preference_and_cooking",
            Action::CanUpdateGroup => "can_update_group",
            Action::CanDeleteGroup => "can_delete_group",
            Action::CanBanUsers => "can_ban_users",
            Action::CanUnbanUser => "can_unban_user",
            Action::CanKickUsers => "can_kick_users",
            Action::CanCreateInviteLinks => "can_create_invite_links",
            Action::CanVoidInviteLinks => "can_void_invite_links",
            Action::CanViewInviteLinks => "can_view_invite_links",
            Action::CanSendNotifications => "can_send_notifications",
            Action::CanPromoteToAdmin => "can_promote_to_admin",
            Action::CanDemoteFromAdmin => "can_demote_from_admin",
            Action::CanPromoteToManager => "can_promote_to_manager",
            Action::CanDemoteFromManager => "can_demote_from_manager",
            Action::CanPromoteToMember => "can_promote_to_member",
            Action::CanDemoteFromMember => "can_demote_from_member",
        }
    }
}

/// Immutable `Action × Role → bool` table
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    grants: BTreeMap<Action, BTreeSet<Role>>,
}

impl PermissionMatrix {
    /// Builds a matrix from explicit grants; anything not listed is denied
    pub fn new<'a, I>(grants: I) -> Self
    where
        I: IntoIterator<Item = (Action, &'a [Role])>,
    {
        let mut map: BTreeMap<Action, BTreeSet<Role>> = BTreeMap::new();
        for (action, roles) in grants {
            map.entry(action).or_default().extend(roles.iter().copied());
        }
        Self { grants: map }
    }

    /// The production capability table
    ///
    /// | Action | admin | manager | member |
    /// |---|---|---|---|
    /// | meal create/update/delete/flags | ✓ | ✓ | |
    /// | force preference & cooking | ✓ | ✓ | |
    /// | update group | ✓ | ✓ | |
    /// | send notifications | ✓ | ✓ | |
    /// | delete group | ✓ | | |
    /// | ban/unban/kick | ✓ | | |
    /// | invite create/void/view | ✓ | | |
    /// | promote/demote admin & manager | ✓ | | |
    ///
    /// Promoting to or demoting from `member` has no entry: membership is managed through
    /// join/leave/kick, never through role assignment.
    pub fn standard() -> Self {
        use Action::*;

        const ADMIN: &[Role] = &[Role::Admin];
        const PLANNERS: &[Role] = &[Role::Admin, Role::Manager];

        Self::new([
            (CanCreateMeal, PLANNERS),
            (CanUpdateMeal, PLANNERS),
            (CanDeleteMeal, PLANNERS),
            (CanChangeMealFlags, PLANNERS),
            (CanForceMealPreferenceAndCooking, PLANNERS),
            (CanUpdateGroup, PLANNERS),
            (CanSendNotifications, PLANNERS),
            (CanDeleteGroup, ADMIN),
            (CanBanUsers, ADMIN),
            (CanUnbanUser, ADMIN),
            (CanKickUsers, ADMIN),
            (CanCreateInviteLinks, ADMIN),
            (CanVoidInviteLinks, ADMIN),
            (CanViewInviteLinks, ADMIN),
            (CanPromoteToAdmin, ADMIN),
            (CanDemoteFromAdmin, ADMIN),
            (CanPromoteToManager, ADMIN),
            (CanDemoteFromManager, ADMIN),
        ])
    }

    /// Whether any of `roles` is granted `action`
    pub fn can_perform_action(&self, roles: &[Role], action: Action) -> bool {
        match self.grants.get(&action) {
            Some(granted) => roles.iter().any(|role| granted.contains(role)),
            None => false,
        }
    }

    /// Union of all actions permitted to any of `roles`
    pub fn allowed_actions(&self, roles: &[Role]) -> BTreeSet<Action> {
        self.grants
            .iter()
            .filter(|(_, granted)| roles.iter().any(|role| granted.contains(role)))
            .map(|(action, _)| *action)
            .collect()
    }
}
