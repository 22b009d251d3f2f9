//! Natural-language intent parsing for operator requests.
//!
//! The parser matches free text against a fixed catalog of recognized
//! intents; there is no general NLU. Unmatched, empty, or whitespace-only
//! input yields [`Intent::unknown`] rather than an error.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Confidence bump applied when the phrasing carries a politeness marker.
const POLITENESS_BONUS: f64 = 0.05;

/// Category of a recognized intent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum IntentCategory {
    /// Server health and resource inspection
    ServerStatus,
    /// Service lifecycle (status/restart/stop)
    ServiceManagement,
    /// Code deployment
    Deployment,
    /// Maintenance (updates, reboot, shutdown)
    Maintenance,
    /// Chat-platform role administration
    DiscordRoles,
    /// Chat-platform channel administration
    DiscordChannels,
    /// Chat-platform member moderation
    DiscordMembers,
    /// Chat-platform settings
    DiscordSettings,
}

/// Recognized intent actions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum IntentAction {
    /// No recognized intent (sentinel)
    Unknown,
    /// Overall server status
    Status,
    /// Server uptime
    Uptime,
    /// Disk usage
    DiskUsage,
    /// Memory usage
    MemoryUsage,
    /// View recent logs
    ViewLogs,
    /// Check whether a service is running
    ServiceStatus,
    /// Restart a service
    ServiceRestart,
    /// Stop a service
    ServiceStop,
    /// Deploy latest code
    Deploy,
    /// Update/upgrade installed packages
    Update,
    /// Reboot the host
    Reboot,
    /// Shut the host down
    Shutdown,
    /// List chat-platform roles
    RoleList,
    /// Assign a role to a member
    RoleAssign,
    /// Remove a role from a member
    RoleRemove,
    /// Lock a channel
    ChannelLock,
    /// Unlock a channel
    ChannelUnlock,
    /// Kick a member
    MemberKick,
    /// Ban a member
    MemberBan,
    /// Time out a member
    MemberTimeout,
    /// View chat-platform settings
    SettingsView,
}

/// Parameters extracted from the query text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentParams {
    /// Mentioned user id (`<@123...>`)
    pub user_id: Option<String>,
    /// Requested log line count ("last N logs")
    pub count: Option<u32>,
    /// Named role ("role <name>")
    pub role_name: Option<String>,
    /// Named service ("restart <service>")
    pub service: Option<String>,
    /// Named channel ("#general")
    pub channel_name: Option<String>,
    /// Raw duration text ("for 10m")
    pub duration: Option<String>,
}

/// Structured interpretation of a natural-language admin request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Matched action
    pub action: IntentAction,
    /// Category of the matched action
    pub category: Option<IntentCategory>,
    /// Match confidence in `[0, 1]`
    pub confidence: f64,
    /// Extracted parameters
    pub params: IntentParams,
}

impl Intent {
    /// The "no match" sentinel: `Unknown` action with zero confidence.
    pub fn unknown() -> Self {
        Self {
            action: IntentAction::Unknown,
            category: None,
            confidence: 0.0,
            params: IntentParams::default(),
        }
    }

    /// Whether this intent targets the chat platform rather than the server.
    pub fn is_platform_action(&self) -> bool {
        matches!(
            self.category,
            Some(
                IntentCategory::DiscordRoles
                    | IntentCategory::DiscordChannels
                    | IntentCategory::DiscordMembers
                    | IntentCategory::DiscordSettings
            )
        )
    }

    /// Derive the concrete shell command for server-side actions.
    ///
    /// Chat-platform intents have no shell command and return `None`; they
    /// are routed through the moderation guards instead.
    pub fn command(&self, default_service: &str) -> Option<String> {
        let service = self
            .params
            .service
            .as_deref()
            .unwrap_or(default_service);
        match self.action {
            IntentAction::Status | IntentAction::Uptime => Some("uptime".to_string()),
            IntentAction::DiskUsage => Some("df -h".to_string()),
            IntentAction::MemoryUsage => Some("free -h".to_string()),
            IntentAction::ViewLogs => {
                let count = self.params.count.unwrap_or(50);
                Some(format!("journalctl -n {}", count))
            }
            IntentAction::ServiceStatus => Some(format!("systemctl status {}", service)),
            IntentAction::ServiceRestart => Some(format!("systemctl restart {}", service)),
            IntentAction::ServiceStop => Some(format!("systemctl stop {}", service)),
            IntentAction::Deploy => Some("git pull".to_string()),
            IntentAction::Update => Some("apt upgrade -y".to_string()),
            IntentAction::Reboot => Some("shutdown -r +1".to_string()),
            IntentAction::Shutdown => Some("shutdown -h +1".to_string()),
            _ => None,
        }
    }
}

/// A single match rule in the catalog.
struct Rule {
    regex: Regex,
    action: IntentAction,
    category: IntentCategory,
    confidence: f64,
}

/// Intent parser over the fixed catalog of recognized phrasings.
pub struct IntentParser {
    rules: Vec<Rule>,
    mention: Regex,
    log_count: Regex,
    role_name: Regex,
    service: Regex,
    channel: Regex,
    duration: Regex,
}

impl IntentParser {
    /// Build the parser, compiling the catalog.
    pub fn new() -> Self {
        use IntentAction::*;
        use IntentCategory::*;

        let rule = |pattern: &str, action, category, confidence| Rule {
            regex: Regex::new(pattern).expect("valid intent pattern"),
            action,
            category,
            confidence,
        };

        // Order matters: the first matching rule wins, so moderation verbs
        // and channel lock/unlock come before the broader server phrasings.
        let rules = vec![
            rule(r"(?i)\bkick\b", MemberKick, DiscordMembers, 0.9),
            rule(r"(?i)\bban\b", MemberBan, DiscordMembers, 0.9),
            rule(
                r"(?i)\b(time\s*out|timeout|mute)\b",
                MemberTimeout,
                DiscordMembers,
                0.85,
            ),
            rule(
                r"(?i)\b(give|assign|grant|add)\b.*\brole\b",
                RoleAssign,
                DiscordRoles,
                0.85,
            ),
            rule(
                r"(?i)\b(remove|take|revoke)\b.*\brole\b",
                RoleRemove,
                DiscordRoles,
                0.85,
            ),
            rule(r"(?i)\b(list|show)\b.*\broles\b", RoleList, DiscordRoles, 0.8),
            rule(r"(?i)\bunlock\b", ChannelUnlock, DiscordChannels, 0.85),
            rule(r"(?i)\block\b.*\bchannel\b", ChannelLock, DiscordChannels, 0.85),
            rule(
                r"(?i)\b(server\s+settings|settings)\b",
                SettingsView,
                DiscordSettings,
                0.75,
            ),
            rule(
                r"(?i)\b(deploy|pull\s+(the\s+)?latest|latest\s+code)\b",
                Deploy,
                Deployment,
                0.9,
            ),
            rule(r"(?i)\brestart\b", ServiceRestart, ServiceManagement, 0.9),
            rule(r"(?i)\bstop\b", ServiceStop, ServiceManagement, 0.85),
            rule(
                r"(?i)\bis\s+\S+\s+running\b",
                ServiceStatus,
                ServiceManagement,
                0.85,
            ),
            rule(r"(?i)\breboot\b", Reboot, Maintenance, 0.9),
            rule(r"(?i)\bshut\s*down\b", Shutdown, Maintenance, 0.9),
            rule(r"(?i)\b(update|upgrade)\b", Update, Maintenance, 0.8),
            rule(r"(?i)\blogs?\b", ViewLogs, ServerStatus, 0.8),
            rule(r"(?i)\b(disk|storage)\b", DiskUsage, ServerStatus, 0.8),
            rule(r"(?i)\b(memory|ram)\b", MemoryUsage, ServerStatus, 0.8),
            rule(r"(?i)\buptime\b", Uptime, ServerStatus, 0.85),
            rule(
                r"(?i)\b(status|health|how.?s\s+the\s+server)\b",
                Status,
                ServerStatus,
                0.8,
            ),
        ];

        Self {
            rules,
            mention: Regex::new(r"<@!?(\d+)>").expect("valid mention pattern"),
            log_count: Regex::new(r"(?i)(?:last\s+)?(\d+)\s+(?:lines|logs?)")
                .expect("valid log count pattern"),
            role_name: Regex::new(r#"(?i)\brole\s+"?([A-Za-z0-9_-]+)"#)
                .expect("valid role name pattern"),
            service: Regex::new(r"(?i)\b(?:restart|stop|start)\s+(?:the\s+)?([A-Za-z0-9_-]+)")
                .expect("valid service pattern"),
            channel: Regex::new(r"#([a-z0-9_-]+)").expect("valid channel pattern"),
            duration: Regex::new(r"(?i)\bfor\s+(\d+\s*[smhdw]?)\b").expect("valid duration pattern"),
        }
    }

    /// Parse a raw query into an [`Intent`]. Never fails: anything outside
    /// the catalog comes back as the unknown sentinel.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn parse(&self, text: &str) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            debug!("Empty query");
            return Intent::unknown();
        }

        let Some(rule) = self.rules.iter().find(|r| r.regex.is_match(text)) else {
            debug!("No rule matched");
            return Intent::unknown();
        };

        let mut confidence = rule.confidence;
        if text.to_lowercase().contains("please") {
            confidence = (confidence + POLITENESS_BONUS).min(1.0);
        }

        let intent = Intent {
            action: rule.action,
            category: Some(rule.category),
            confidence,
            params: self.extract_params(text),
        };
        debug!(action = %intent.action, confidence, "Matched intent");
        intent
    }

    fn extract_params(&self, text: &str) -> IntentParams {
        let capture = |regex: &Regex| {
            regex
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        };

        IntentParams {
            user_id: capture(&self.mention),
            count: capture(&self.log_count).and_then(|n| n.parse().ok()),
            role_name: capture(&self.role_name),
            service: capture(&self.service),
            channel_name: capture(&self.channel),
            duration: capture(&self.duration),
        }
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_unknown() {
        let parser = IntentParser::new();
        assert_eq!(parser.parse(""), Intent::unknown());
        assert_eq!(parser.parse("   "), Intent::unknown());
    }

    #[test]
    fn test_unmatched_input_is_unknown() {
        let parser = IntentParser::new();
        let intent = parser.parse("sing me a song");
        assert_eq!(intent.action, IntentAction::Unknown);
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_restart_the_bot() {
        let parser = IntentParser::new();
        let intent = parser.parse("restart the bot");
        assert_eq!(intent.action, IntentAction::ServiceRestart);
        assert_eq!(intent.category, Some(IntentCategory::ServiceManagement));
        assert_eq!(intent.params.service.as_deref(), Some("bot"));
        assert_eq!(
            intent.command("bot").as_deref(),
            Some("systemctl restart bot")
        );
    }

    #[test]
    fn test_politeness_is_monotone() {
        let parser = IntentParser::new();
        let plain = parser.parse("restart the bot");
        let polite = parser.parse("please restart the bot");
        assert_eq!(plain.action, polite.action);
        assert!(polite.confidence >= plain.confidence);
        assert!(polite.confidence <= 1.0);
    }

    #[test]
    fn test_log_count_extraction() {
        let parser = IntentParser::new();
        let intent = parser.parse("show me the last 20 logs");
        assert_eq!(intent.action, IntentAction::ViewLogs);
        assert_eq!(intent.params.count, Some(20));
        assert_eq!(intent.command("bot").as_deref(), Some("journalctl -n 20"));
    }

    #[test]
    fn test_mention_extraction() {
        let parser = IntentParser::new();
        let intent = parser.parse("kick <@123456789012345678> for spamming");
        assert_eq!(intent.action, IntentAction::MemberKick);
        assert_eq!(
            intent.params.user_id.as_deref(),
            Some("123456789012345678")
        );
        assert!(intent.is_platform_action());
        assert!(intent.command("bot").is_none());
    }

    #[test]
    fn test_role_name_extraction() {
        let parser = IntentParser::new();
        let intent = parser.parse("give <@123456789012345678> the role moderator");
        assert_eq!(intent.action, IntentAction::RoleAssign);
        assert_eq!(intent.params.role_name.as_deref(), Some("moderator"));
    }

    #[test]
    fn test_deploy_latest_code() {
        let parser = IntentParser::new();
        let intent = parser.parse("deploy latest code");
        assert_eq!(intent.action, IntentAction::Deploy);
        assert_eq!(intent.command("bot").as_deref(), Some("git pull"));
    }

    #[test]
    fn test_unlock_not_confused_with_lock() {
        let parser = IntentParser::new();
        assert_eq!(
            parser.parse("unlock #general").action,
            IntentAction::ChannelUnlock
        );
        assert_eq!(
            parser.parse("lock the channel #general").action,
            IntentAction::ChannelLock
        );
    }

    #[test]
    fn test_confidence_bounds() {
        let parser = IntentParser::new();
        for query in ["restart the bot", "please please restart", "uptime please"] {
            let intent = parser.parse(query);
            assert!(intent.confidence >= 0.0 && intent.confidence <= 1.0);
        }
    }
}
