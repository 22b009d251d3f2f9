//! Role-based permission model for operator requests.

use crate::intent::IntentAction;
use std::str::FromStr;
use tracing::debug;

/// Caller role. Roles form a strict superset hierarchy:
/// `Viewer ⊆ Operator ⊆ Admin`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// Read-only access to basic server health
    Viewer,
    /// Operational access: diagnostics, tools, device control
    Operator,
    /// Full access, including service lifecycle and chat-platform administration
    Admin,
}

/// The permission catalog.
///
/// Permissions outside this catalog do not exist; the string boundary
/// ([`has_permission`]) fails closed on anything that does not parse.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Permission {
    /// View server/service status
    ViewStatus,
    /// View uptime
    ViewUptime,
    /// View disk, memory, and process usage
    ViewResources,
    /// Run diagnostic tools
    RunDiagnostics,
    /// Control attached devices
    ControlDevices,
    /// View system and service logs
    ViewLogs,
    /// Start, stop, and restart services
    ManageServices,
    /// Deploy code (pull/install)
    Deploy,
    /// Maintenance operations (reboot, shutdown, upgrades)
    Maintenance,
    /// Manage chat-platform roles
    ManageRoles,
    /// Manage chat-platform channels
    ManageChannels,
    /// Moderate chat-platform members (kick/ban/timeout)
    ManageMembers,
    /// Manage chat-platform settings
    ManageSettings,
    /// Manage bot users
    ManageUsers,
    /// Manage bot configuration
    ManageConfig,
}

impl Role {
    /// Whether this role holds the given permission.
    pub fn allows(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            // Admin holds the entire catalog.
            Role::Admin => true,
            Role::Operator => matches!(
                permission,
                ViewStatus | ViewUptime | ViewResources | RunDiagnostics | ControlDevices
            ),
            Role::Viewer => matches!(permission, ViewStatus | ViewUptime | ViewResources),
        }
    }
}

impl Permission {
    /// The permission required to carry out an intent, if the intent is
    /// recognized. [`IntentAction::Unknown`] has no permission and can never
    /// be authorized.
    pub fn required_for(action: IntentAction) -> Option<Permission> {
        use IntentAction::*;
        match action {
            Unknown => None,
            Status | Uptime | ServiceStatus => Some(Permission::ViewStatus),
            DiskUsage | MemoryUsage => Some(Permission::ViewResources),
            ViewLogs => Some(Permission::ViewLogs),
            ServiceRestart | ServiceStop => Some(Permission::ManageServices),
            Deploy => Some(Permission::Deploy),
            Update | Reboot | Shutdown => Some(Permission::Maintenance),
            RoleList | RoleAssign | RoleRemove => Some(Permission::ManageRoles),
            ChannelLock | ChannelUnlock => Some(Permission::ManageChannels),
            MemberKick | MemberBan | MemberTimeout => Some(Permission::ManageMembers),
            SettingsView => Some(Permission::ManageSettings),
        }
    }
}

/// String-boundary permission check.
///
/// Returns `false` for any role or permission name outside the catalog;
/// malformed input never grants access.
pub fn has_permission(role: &str, permission: &str) -> bool {
    let Ok(role) = Role::from_str(role.trim()) else {
        debug!(role, "Unknown role name");
        return false;
    };
    let Ok(permission) = Permission::from_str(permission.trim()) else {
        debug!(permission, "Unknown permission name");
        return false;
    };
    role.allows(permission)
}
