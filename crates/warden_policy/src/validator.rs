//! Command whitelist/blacklist validation.
//!
//! Commands are checked in fixed order: the dangerous-pattern scan runs
//! first and wins unconditionally; only commands that survive it are then
//! matched against the whitelist. Anything else is blocked.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Static description of a whitelisted operation family.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    /// Stable name of the operation family
    pub name: &'static str,
    /// Human description, shown in confirmation prompts
    pub description: Option<&'static str>,
    /// Whether execution is gated behind a confirmation
    pub requires_confirmation: bool,
    /// Whether execution requires the stronger double confirmation
    pub requires_double_confirmation: bool,
    /// Whether execution interrupts running services
    pub causes_downtime: bool,
}

/// Result of validating a single command string. Computed fresh per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whitelisted and not dangerous
    pub valid: bool,
    /// Explicitly refused (dangerous match, empty input, or not whitelisted)
    pub blocked: bool,
    /// Name of the matched whitelist entry
    pub matched_whitelist: Option<&'static str>,
    /// Name of the matched dangerous pattern
    pub matched_dangerous: Option<&'static str>,
    /// Human-readable reason when blocked
    pub reason: Option<String>,
    /// Whether the matched entry is confirmation-gated
    pub requires_approval: bool,
}

impl ValidationResult {
    fn blocked(reason: impl Into<String>, dangerous: Option<&'static str>) -> Self {
        Self {
            valid: false,
            blocked: true,
            matched_whitelist: None,
            matched_dangerous: dangerous,
            reason: Some(reason.into()),
            requires_approval: false,
        }
    }
}

struct DangerousPattern {
    name: &'static str,
    regex: Regex,
}

struct WhitelistEntry {
    spec: CommandSpec,
    regex: Regex,
}

/// Validator over the static dangerous and whitelist tables.
pub struct CommandValidator {
    dangerous: Vec<DangerousPattern>,
    whitelist: Vec<WhitelistEntry>,
    chain: Regex,
}

impl CommandValidator {
    /// Build the validator, compiling both tables.
    pub fn new() -> Self {
        let danger = |name: &'static str, pattern: &str| DangerousPattern {
            name,
            regex: Regex::new(pattern).expect("valid dangerous pattern"),
        };

        let dangerous = vec![
            danger("recursive delete", r"\brm\s+-\w*[rf]"),
            danger("raw device write", r"\bdd\b.*\bof=/dev/"),
            danger("filesystem format", r"\bmkfs"),
            danger("device redirection", r">\s*/dev/(sd|hd|nvme|mmcblk)"),
            danger(
                "fork bomb",
                r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
            ),
            danger("world-writable chmod", r"\bchmod\s+(-R\s+)?777\b"),
            danger("piped remote script", r"\b(curl|wget)\b.*\|\s*(ba|z|da)?sh\b"),
            danger("partition tool", r"\b(fdisk|parted)\b"),
            danger("disk format", r"(?i)\bformat\s+[a-z]:"),
            danger("registry deletion", r"(?i)\breg\s+delete\b"),
        ];

        // POSIX entries match case-sensitively; the PowerShell family is
        // case-insensitive via inline (?i).
        let entry = |name: &'static str,
                     pattern: &str,
                     description: Option<&'static str>,
                     requires_confirmation: bool,
                     requires_double_confirmation: bool,
                     causes_downtime: bool| WhitelistEntry {
            spec: CommandSpec {
                name,
                description,
                requires_confirmation,
                requires_double_confirmation,
                causes_downtime,
            },
            regex: Regex::new(pattern).expect("valid whitelist pattern"),
        };

        let whitelist = vec![
            entry(
                "service-status",
                r"^systemctl status \S+$",
                Some("Show service status"),
                false,
                false,
                false,
            ),
            entry(
                "service-restart",
                r"^systemctl restart \S+$",
                Some("Restart a service"),
                true,
                false,
                true,
            ),
            entry(
                "service-stop",
                r"^systemctl stop \S+$",
                Some("Stop a service"),
                true,
                false,
                true,
            ),
            entry(
                "view-logs",
                r"^journalctl(\s+-u\s+\S+)?(\s+-n\s+\d+)?$",
                Some("View recent logs"),
                false,
                false,
                false,
            ),
            entry("disk-usage", r"^df(\s+-h)?$", Some("Disk usage"), false, false, false),
            entry(
                "memory-usage",
                r"^free(\s+-[mh])?$",
                Some("Memory usage"),
                false,
                false,
                false,
            ),
            entry("uptime", r"^uptime$", Some("Server uptime"), false, false, false),
            entry(
                "processes",
                r"^(top -bn1|ps aux)$",
                Some("Process inspection"),
                false,
                false,
                false,
            ),
            entry(
                "git-pull",
                r"^git pull(\s+\S+)*$",
                Some("Deploy latest code"),
                true,
                false,
                false,
            ),
            entry(
                "git-inspect",
                r"^git (status|log)(\s+\S+)*$",
                Some("Version control inspection"),
                false,
                false,
                false,
            ),
            entry(
                "package-install",
                r"^(sudo )?apt(-get)? install( -y)? [A-Za-z0-9.+-]+$",
                Some("Install a package"),
                true,
                false,
                false,
            ),
            entry(
                "package-update",
                r"^(sudo )?apt(-get)? update$",
                Some("Refresh package lists"),
                false,
                false,
                false,
            ),
            entry(
                "package-upgrade",
                r"^(sudo )?apt(-get)? upgrade( -y)?$",
                Some("Upgrade installed packages"),
                true,
                false,
                false,
            ),
            entry(
                "package-list",
                r"^apt list( --installed| --upgradable)?$",
                Some("List packages"),
                false,
                false,
                false,
            ),
            entry(
                "shutdown",
                r"^shutdown -h \+\d+$",
                Some("Shut the host down"),
                true,
                false,
                true,
            ),
            entry(
                "reboot",
                r"^(shutdown -r \+\d+|reboot)$",
                Some("Reboot the host"),
                true,
                true,
                true,
            ),
            entry(
                "ps-service-status",
                r"(?i)^get-service(\s+-name)?\s+\S+$",
                Some("Show service status (PowerShell)"),
                false,
                false,
                false,
            ),
            entry(
                "ps-service-restart",
                r"(?i)^restart-service(\s+-name)?\s+\S+$",
                Some("Restart a service (PowerShell)"),
                true,
                false,
                true,
            ),
            entry(
                "ps-service-stop",
                r"(?i)^stop-service(\s+-name)?\s+\S+$",
                Some("Stop a service (PowerShell)"),
                true,
                false,
                true,
            ),
            entry(
                "ps-processes",
                r"(?i)^get-process$",
                Some("Process inspection (PowerShell)"),
                false,
                false,
                false,
            ),
            entry(
                "ps-eventlog",
                r"(?i)^get-eventlog\s+.+$",
                Some("View event log (PowerShell)"),
                false,
                false,
                false,
            ),
            entry(
                "ps-reboot",
                r"(?i)^restart-computer(\s+-force)?$",
                Some("Reboot the host (PowerShell)"),
                true,
                true,
                true,
            ),
        ];

        Self {
            dangerous,
            whitelist,
            chain: Regex::new(r"(;|&&|\|\||\|)").expect("valid chain pattern"),
        }
    }

    /// Validate a concrete command string for the given caller.
    #[instrument(skip(self), fields(user_id))]
    pub fn validate(&self, command: &str, user_id: &str) -> ValidationResult {
        let command = command.trim();
        if command.is_empty() {
            debug!("Empty command");
            return ValidationResult::blocked("empty command", None);
        }

        // Dangerous scan first; a match wins regardless of the whitelist.
        // Compound commands are split so a safe prefix cannot smuggle a
        // dangerous suffix past the scan.
        if let Some(name) = self.scan_dangerous(command) {
            warn!(user_id, pattern = name, "Dangerous command blocked");
            return ValidationResult::blocked(
                format!("matched dangerous pattern: {}", name),
                Some(name),
            );
        }

        let Some(entry) = self.match_whitelist(command) else {
            debug!(user_id, "Command not in whitelist");
            return ValidationResult::blocked("command is not in whitelist", None);
        };

        debug!(user_id, entry = entry.spec.name, "Command whitelisted");
        ValidationResult {
            valid: true,
            blocked: false,
            matched_whitelist: Some(entry.spec.name),
            matched_dangerous: None,
            reason: None,
            requires_approval: entry.spec.requires_confirmation,
        }
    }

    /// Whether the command is confirmation-gated. Non-whitelisted commands
    /// never reach approval, so they report `false` here.
    pub fn requires_approval(&self, command: &str) -> bool {
        self.match_whitelist(command.trim())
            .map(|e| e.spec.requires_confirmation)
            .unwrap_or(false)
    }

    /// Look up the [`CommandSpec`] for a whitelisted command.
    pub fn spec_for(&self, command: &str) -> Option<&CommandSpec> {
        self.match_whitelist(command.trim()).map(|e| &e.spec)
    }

    fn scan_dangerous(&self, command: &str) -> Option<&'static str> {
        for pattern in &self.dangerous {
            if pattern.regex.is_match(command) {
                return Some(pattern.name);
            }
        }
        for segment in self.chain.split(command) {
            let segment = segment.trim();
            for pattern in &self.dangerous {
                if pattern.regex.is_match(segment) {
                    return Some(pattern.name);
                }
            }
        }
        None
    }

    fn match_whitelist(&self, command: &str) -> Option<&WhitelistEntry> {
        self.whitelist.iter().find(|e| e.regex.is_match(command))
    }
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}
