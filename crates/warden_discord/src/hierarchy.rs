//! Role and channel hierarchy guards.
//!
//! Every check fails closed: missing guilds, roles, or membership records
//! yield a denial with a reason rather than an error the caller could
//! mistake for success.

use crate::{
    ChannelView, GuildView, ModerationError, ModerationErrorKind, ModerationResult, RoleView,
    SendOverride,
};
use serde::Serialize;
use tracing::{debug, instrument};

/// Outcome of a hierarchy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManageVerdict {
    /// Whether the bot may perform the mutation
    pub allowed: bool,
    /// Denial reason, absent when allowed
    pub reason: Option<String>,
}

impl ManageVerdict {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Whether the bot may mutate a role.
///
/// Denies on a missing guild or role, an unavailable bot membership record,
/// a missing manage-roles capability, a target at or above the bot's
/// highest role position, or the guild's base role, which is never
/// manageable.
#[instrument(skip(guild, role))]
pub fn can_manage_role(guild: Option<&GuildView>, role: Option<&RoleView>) -> ManageVerdict {
    let Some(guild) = guild else {
        return ManageVerdict::deny("no guild");
    };
    let Some(role) = role else {
        return ManageVerdict::deny("no role");
    };
    let Some(bot) = guild.bot_member() else {
        debug!(guild_id = %guild.id, "Bot membership record unavailable");
        return ManageVerdict::deny("bot membership record unavailable");
    };
    if !bot.manage_roles {
        return ManageVerdict::deny("bot lacks the manage-roles capability");
    }
    let bot_top = guild.top_position(bot);
    if role.position >= bot_top {
        return ManageVerdict::deny(format!(
            "role '{}' (position {}) is at or above the bot's highest role (position {})",
            role.name, role.position, bot_top
        ));
    }
    if role.id == guild.everyone_role_id {
        return ManageVerdict::deny("the base role is never manageable");
    }
    ManageVerdict::allow()
}

/// Whether the bot may mutate channels in a guild.
#[instrument(skip(guild))]
pub fn can_manage_channels(guild: Option<&GuildView>) -> ManageVerdict {
    let Some(guild) = guild else {
        return ManageVerdict::deny("no guild");
    };
    let Some(bot) = guild.bot_member() else {
        debug!(guild_id = %guild.id, "Bot membership record unavailable");
        return ManageVerdict::deny("bot membership record unavailable");
    };
    if !bot.manage_channels {
        return ManageVerdict::deny("bot lacks the manage-channels capability");
    }
    ManageVerdict::allow()
}

/// Resolve a role by exact id, then by case-insensitive name.
pub fn find_role<'a>(guild: &'a GuildView, identifier: &str) -> Option<&'a RoleView> {
    guild
        .roles
        .iter()
        .find(|role| role.id == identifier)
        .or_else(|| {
            guild
                .roles
                .iter()
                .find(|role| role.name.eq_ignore_ascii_case(identifier))
        })
}

/// Resolve a channel by exact id, then by case-insensitive name. A leading
/// `#` on the identifier is ignored.
pub fn find_channel<'a>(guild: &'a GuildView, identifier: &str) -> Option<&'a ChannelView> {
    let index = find_channel_index(guild, identifier)?;
    Some(&guild.channels[index])
}

fn find_channel_index(guild: &GuildView, identifier: &str) -> Option<usize> {
    let identifier = identifier.strip_prefix('#').unwrap_or(identifier);
    guild
        .channels
        .iter()
        .position(|channel| channel.id == identifier)
        .or_else(|| {
            guild
                .channels
                .iter()
                .position(|channel| channel.name.eq_ignore_ascii_case(identifier))
        })
}

/// Lock a channel: set the base role's send override to explicit deny.
#[instrument(skip(guild))]
pub fn lock_channel(guild: &mut GuildView, identifier: &str) -> ModerationResult<()> {
    set_everyone_send(guild, identifier, SendOverride::Deny)
}

/// Unlock a channel: reset the base role's send override to inherit.
///
/// Deliberately asymmetric with [`lock_channel`]: restoring inherit brings
/// back whatever per-role overrides existed before the lock, where an
/// explicit allow would grant send to everyone unconditionally.
#[instrument(skip(guild))]
pub fn unlock_channel(guild: &mut GuildView, identifier: &str) -> ModerationResult<()> {
    set_everyone_send(guild, identifier, SendOverride::Inherit)
}

fn set_everyone_send(
    guild: &mut GuildView,
    identifier: &str,
    state: SendOverride,
) -> ModerationResult<()> {
    let verdict = can_manage_channels(Some(guild));
    if !verdict.allowed {
        return Err(ModerationError::new(ModerationErrorKind::HierarchyViolation {
            target: identifier.to_string(),
            reason: verdict.reason.unwrap_or_else(|| "denied".to_string()),
        }));
    }
    let Some(index) = find_channel_index(guild, identifier) else {
        return Err(ModerationError::new(ModerationErrorKind::NotFound {
            kind: "channel".to_string(),
            identifier: identifier.to_string(),
        }));
    };
    guild.channels[index].everyone_send = state;
    debug!(channel = %guild.channels[index].name, %state, "Base role send override updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemberView;

    fn guild(manage_roles: bool, manage_channels: bool) -> GuildView {
        GuildView {
            id: "g1".to_string(),
            name: "ops".to_string(),
            everyone_role_id: "g1".to_string(),
            bot_user_id: "bot".to_string(),
            roles: vec![
                RoleView {
                    id: "g1".to_string(),
                    name: "@everyone".to_string(),
                    position: 0,
                },
                RoleView {
                    id: "r-low".to_string(),
                    name: "Member".to_string(),
                    position: 3,
                },
                RoleView {
                    id: "r-high".to_string(),
                    name: "Admin".to_string(),
                    position: 20,
                },
                RoleView {
                    id: "r-bot".to_string(),
                    name: "Bot".to_string(),
                    position: 10,
                },
            ],
            channels: vec![
                ChannelView {
                    id: "c1".to_string(),
                    name: "general".to_string(),
                    everyone_send: SendOverride::Inherit,
                },
                ChannelView {
                    id: "c2".to_string(),
                    name: "Ops-Room".to_string(),
                    everyone_send: SendOverride::Inherit,
                },
            ],
            members: vec![MemberView {
                user_id: "bot".to_string(),
                username: "warden".to_string(),
                role_ids: vec!["r-bot".to_string()],
                manage_roles,
                manage_channels,
            }],
        }
    }

    fn role_of<'a>(guild: &'a GuildView, id: &str) -> &'a RoleView {
        find_role(guild, id).unwrap()
    }

    #[test]
    fn test_manage_role_below_bot_allowed() {
        let guild = guild(true, true);
        let verdict = can_manage_role(Some(&guild), Some(role_of(&guild, "r-low")));
        assert!(verdict.allowed);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_manage_role_at_or_above_bot_denied() {
        let guild = guild(true, true);
        // Equal position counts as unmanageable.
        let peer = RoleView {
            id: "r-peer".to_string(),
            name: "Peer".to_string(),
            position: 10,
        };
        assert!(!can_manage_role(Some(&guild), Some(&peer)).allowed);
        assert!(!can_manage_role(Some(&guild), Some(role_of(&guild, "r-high"))).allowed);
    }

    #[test]
    fn test_everyone_role_always_denied() {
        let guild = guild(true, true);
        let verdict = can_manage_role(Some(&guild), Some(role_of(&guild, "g1")));
        assert!(!verdict.allowed);
        assert!(verdict.reason.unwrap().contains("base role"));
    }

    #[test]
    fn test_missing_inputs_fail_closed() {
        let guild = guild(true, true);
        assert!(!can_manage_role(None, Some(role_of(&guild, "r-low"))).allowed);
        assert!(!can_manage_role(Some(&guild), None).allowed);

        let mut no_bot = guild.clone();
        no_bot.members.clear();
        assert!(!can_manage_role(Some(&no_bot), Some(role_of(&guild, "r-low"))).allowed);
        assert!(!can_manage_channels(Some(&no_bot)).allowed);
        assert!(!can_manage_channels(None).allowed);
    }

    #[test]
    fn test_missing_capability_denied() {
        let guild = guild(false, false);
        assert!(!can_manage_role(Some(&guild), Some(role_of(&guild, "r-low"))).allowed);
        assert!(!can_manage_channels(Some(&guild)).allowed);
    }

    #[test]
    fn test_find_role_by_id_then_name() {
        let guild = guild(true, true);
        assert_eq!(find_role(&guild, "r-low").unwrap().name, "Member");
        assert_eq!(find_role(&guild, "admin").unwrap().id, "r-high");
        assert!(find_role(&guild, "nothing").is_none());
    }

    #[test]
    fn test_find_channel_strips_hash() {
        let guild = guild(true, true);
        assert_eq!(find_channel(&guild, "c1").unwrap().name, "general");
        assert_eq!(find_channel(&guild, "#general").unwrap().id, "c1");
        assert_eq!(find_channel(&guild, "ops-room").unwrap().id, "c2");
        assert!(find_channel(&guild, "#missing").is_none());
    }

    #[test]
    fn test_lock_and_unlock_are_asymmetric() {
        let mut guild = guild(true, true);
        lock_channel(&mut guild, "#general").unwrap();
        assert_eq!(guild.channels[0].everyone_send, SendOverride::Deny);

        // Unlock resets to inherit, never to explicit allow.
        unlock_channel(&mut guild, "general").unwrap();
        assert_eq!(guild.channels[0].everyone_send, SendOverride::Inherit);
    }

    #[test]
    fn test_lock_requires_capability() {
        let mut guild = guild(true, false);
        let err = lock_channel(&mut guild, "general").unwrap_err();
        assert!(matches!(
            err.kind,
            ModerationErrorKind::HierarchyViolation { .. }
        ));
        assert_eq!(guild.channels[0].everyone_send, SendOverride::Inherit);
    }

    #[test]
    fn test_lock_unknown_channel() {
        let mut guild = guild(true, true);
        let err = lock_channel(&mut guild, "#missing").unwrap_err();
        assert!(matches!(err.kind, ModerationErrorKind::NotFound { .. }));
    }
}
