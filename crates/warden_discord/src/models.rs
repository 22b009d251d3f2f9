//! Read-only snapshots of guild state.
//!
//! The chat-platform collaborator supplies these views; the guards here
//! consume them without mutating platform state (channel lock/unlock edits
//! the snapshot, and the hosting layer pushes the change back out).

use serde::{Deserialize, Serialize};

/// A guild role with its hierarchy position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    /// Platform role id
    pub id: String,
    /// Display name
    pub name: String,
    /// Ordinal hierarchy position; higher outranks lower
    pub position: i64,
}

/// Send-permission override state for the base role on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SendOverride {
    /// Explicitly allowed
    Allow,
    /// Explicitly denied (channel locked)
    Deny,
    /// No override; per-role permissions apply
    #[default]
    Inherit,
}

/// A guild text channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelView {
    /// Platform channel id
    pub id: String,
    /// Display name, without the leading `#`
    pub name: String,
    /// Send-permission override for the base role
    pub everyone_send: SendOverride,
}

/// A guild member with its capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    /// Platform user id
    pub user_id: String,
    /// Display name
    pub username: String,
    /// Ids of the roles held by this member
    pub role_ids: Vec<String>,
    /// Whether this member may manage roles
    pub manage_roles: bool,
    /// Whether this member may manage channels
    pub manage_channels: bool,
}

/// A guild snapshot: roles, channels, members, and the bot's own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildView {
    /// Platform guild id
    pub id: String,
    /// Display name
    pub name: String,
    /// Id of the base role applied to every member
    pub everyone_role_id: String,
    /// User id of the bot's own account
    pub bot_user_id: String,
    /// Guild roles
    pub roles: Vec<RoleView>,
    /// Guild channels
    pub channels: Vec<ChannelView>,
    /// Guild members
    pub members: Vec<MemberView>,
}

impl GuildView {
    /// The bot's own membership record, when available.
    pub fn bot_member(&self) -> Option<&MemberView> {
        self.member(&self.bot_user_id)
    }

    /// Look up a member by user id.
    pub fn member(&self, user_id: &str) -> Option<&MemberView> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// The position of the highest role held by a member. A member holding
    /// no listed roles sits at the base position.
    pub fn top_position(&self, member: &MemberView) -> i64 {
        self.roles
            .iter()
            .filter(|role| member.role_ids.contains(&role.id))
            .map(|role| role.position)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildView {
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
                    id: "r-mod".to_string(),
                    name: "Moderator".to_string(),
                    position: 5,
                },
                RoleView {
                    id: "r-bot".to_string(),
                    name: "Bot".to_string(),
                    position: 10,
                },
            ],
            channels: vec![],
            members: vec![MemberView {
                user_id: "bot".to_string(),
                username: "warden".to_string(),
                role_ids: vec!["r-bot".to_string()],
                manage_roles: true,
                manage_channels: true,
            }],
        }
    }

    #[test]
    fn test_bot_member_lookup() {
        let guild = guild();
        assert_eq!(guild.bot_member().unwrap().username, "warden");
        assert!(guild.member("missing").is_none());
    }

    #[test]
    fn test_top_position() {
        let guild = guild();
        let bot = guild.bot_member().unwrap().clone();
        assert_eq!(guild.top_position(&bot), 10);

        let roleless = MemberView {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            role_ids: vec![],
            manage_roles: false,
            manage_channels: false,
        };
        assert_eq!(guild.top_position(&roleless), 0);
    }
}
