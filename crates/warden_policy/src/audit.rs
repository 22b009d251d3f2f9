//! Append-only audit logging.
//!
//! [`AuditLog::record`] is the single write path; entries are immutable
//! once written and always carry a non-empty id, a user id, a command, and
//! a positive timestamp, even when the optional context is missing. The
//! in-memory store backs the durable append-only collaborator.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Longest output retained verbatim before truncation.
pub const MAX_OUTPUT_LEN: usize = 4_000;

/// Marker appended when output is truncated; never silently dropped.
pub const TRUNCATION_MARKER: &str = "... (truncated)";

/// Default identity for entries missing caller context.
const UNKNOWN: &str = "unknown";

/// An immutable record of a requested or executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id
    pub id: String,
    /// Caller user id (`"unknown"` when absent)
    pub user_id: String,
    /// Caller display name (`"unknown"` when absent)
    pub username: String,
    /// Command that was requested
    pub command: String,
    /// Matched intent action, if any
    pub intent: Option<String>,
    /// Intent category, if any
    pub category: Option<String>,
    /// Target of the action (service, member, channel)
    pub target: Option<String>,
    /// Stated reason for the action
    pub reason: Option<String>,
    /// Whether the command passed the gating pipeline
    pub approved: bool,
    /// Whether execution was attempted
    pub executed: bool,
    /// Whether execution succeeded
    pub success: bool,
    /// Captured output, truncated to [`MAX_OUTPUT_LEN`]
    pub output: Option<String>,
    /// Execution error text, preserved verbatim
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: Option<u64>,
    /// Originating platform ("server" or "discord")
    pub platform: Option<String>,
    /// Guild the request came from
    pub guild_id: Option<String>,
    /// Channel the request came from
    pub channel_id: Option<String>,
    /// Record time, millis since epoch (always positive)
    pub timestamp: u64,
}

/// Draft for a new audit entry. Only `command` is required; everything else
/// defaults (`user_id`/`username` to `"unknown"`, the outcome flags to
/// `true`).
#[derive(Debug, Clone, Default)]
pub struct AuditDraft {
    /// Command being audited
    pub command: String,
    /// Caller user id
    pub user_id: Option<String>,
    /// Caller display name
    pub username: Option<String>,
    /// Matched intent action
    pub intent: Option<String>,
    /// Intent category
    pub category: Option<String>,
    /// Target of the action
    pub target: Option<String>,
    /// Stated reason
    pub reason: Option<String>,
    /// Gating outcome (defaults true)
    pub approved: Option<bool>,
    /// Whether execution was attempted (defaults true)
    pub executed: Option<bool>,
    /// Execution outcome (defaults true)
    pub success: Option<bool>,
    /// Captured output
    pub output: Option<String>,
    /// Execution error text
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: Option<u64>,
    /// Originating platform
    pub platform: Option<String>,
    /// Guild id
    pub guild_id: Option<String>,
    /// Channel id
    pub channel_id: Option<String>,
}

impl AuditDraft {
    /// Start a draft for a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Attach caller identity.
    pub fn by(mut self, user_id: impl Into<String>, username: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.username = Some(username.into());
        self
    }

    /// Mark the gating outcome.
    pub fn approved(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }

    /// Mark whether execution was attempted.
    pub fn executed(mut self, executed: bool) -> Self {
        self.executed = Some(executed);
        self
    }

    /// Mark the execution outcome.
    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Attach a stated reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attach a target.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Filter for [`AuditLog::history`].
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Restrict to a single user
    pub user_id: Option<String>,
    /// Strict bound on result count
    pub limit: Option<usize>,
}

fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_LEN {
        return output;
    }
    // Cut on a char boundary below the cap.
    let mut cut = MAX_OUTPUT_LEN;
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &output[..cut], TRUNCATION_MARKER)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(1)
}

/// Append-only audit store.
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append an entry, assigning its id and timestamp.
    #[instrument(skip(self, draft), fields(command = %draft.command))]
    pub fn record(&self, draft: AuditDraft) -> AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            user_id: draft.user_id.unwrap_or_else(|| UNKNOWN.to_string()),
            username: draft.username.unwrap_or_else(|| UNKNOWN.to_string()),
            command: draft.command,
            intent: draft.intent,
            category: draft.category,
            target: draft.target,
            reason: draft.reason,
            approved: draft.approved.unwrap_or(true),
            executed: draft.executed.unwrap_or(true),
            success: draft.success.unwrap_or(true),
            output: draft.output.map(truncate_output),
            error: draft.error,
            duration_ms: draft.duration_ms,
            platform: draft.platform,
            guild_id: draft.guild_id,
            channel_id: draft.channel_id,
            timestamp: now_millis(),
        };
        debug!(id = %entry.id, "Audit entry recorded");
        self.entries
            .lock()
            .expect("audit log lock")
            .push(entry.clone());
        entry
    }

    /// Fetch an entry by id.
    pub fn entry(&self, id: &str) -> Option<AuditEntry> {
        self.entries
            .lock()
            .expect("audit log lock")
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Most-recent-first history for one user, strictly bounded by `limit`.
    pub fn user_history(&self, user_id: &str, limit: usize) -> Vec<AuditEntry> {
        self.history(AuditFilter {
            user_id: Some(user_id.to_string()),
            limit: Some(limit),
        })
    }

    /// Most-recent-first filtered history.
    pub fn history(&self, filter: AuditFilter) -> Vec<AuditEntry> {
        let entries = self.entries.lock().expect("audit log lock");
        let mut matches: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| {
                filter
                    .user_id
                    .as_deref()
                    .map(|user| e.user_id == user)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        matches.reverse();
        if let Some(limit) = filter.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("audit log lock").len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an entry as a single human-readable line, prefixed with a
/// success/failure glyph. A missing entry renders a sentinel instead of
/// panicking.
pub fn format_entry(entry: Option<&AuditEntry>) -> String {
    let Some(entry) = entry else {
        return "(no audit entry)".to_string();
    };
    let glyph = if entry.success { "✅" } else { "❌" };
    let mut line = format!("{} {} ran `{}`", glyph, entry.username, entry.command);
    if !entry.approved {
        line.push_str(" [rejected]");
    } else if !entry.executed {
        line.push_str(" [not executed]");
    }
    if let Some(error) = &entry.error {
        line.push_str(&format!(": {}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_draft_gets_defaults() {
        let log = AuditLog::new();
        let before = now_millis();
        let entry = log.record(AuditDraft::new("test"));
        let after = now_millis();

        assert!(!entry.id.is_empty());
        assert_eq!(entry.user_id, "unknown");
        assert_eq!(entry.username, "unknown");
        assert_eq!(entry.command, "test");
        assert!(entry.approved);
        assert!(entry.executed);
        assert!(entry.success);
        assert!(entry.timestamp >= before && entry.timestamp <= after);
        assert!(entry.timestamp > 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let log = AuditLog::new();
        let a = log.record(AuditDraft::new("a"));
        let b = log.record(AuditDraft::new("b"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_output_truncation_has_marker() {
        let log = AuditLog::new();
        let mut draft = AuditDraft::new("noisy");
        draft.output = Some("x".repeat(MAX_OUTPUT_LEN + 100));
        let entry = log.record(draft);

        let output = entry.output.unwrap();
        assert!(output.ends_with(TRUNCATION_MARKER));
        assert!(output.len() <= MAX_OUTPUT_LEN + TRUNCATION_MARKER.len());

        let mut short = AuditDraft::new("quiet");
        short.output = Some("hello".to_string());
        assert_eq!(log.record(short).output.as_deref(), Some("hello"));
    }

    #[test]
    fn test_lookup_by_id() {
        let log = AuditLog::new();
        let entry = log.record(AuditDraft::new("test").by("u1", "alice"));
        let fetched = log.entry(&entry.id).unwrap();
        assert_eq!(fetched, entry);
        assert!(log.entry("missing").is_none());
    }

    #[test]
    fn test_user_history_limit() {
        let log = AuditLog::new();
        for i in 0..5 {
            log.record(AuditDraft::new(format!("cmd{i}")).by("u1", "alice"));
        }
        log.record(AuditDraft::new("other").by("u2", "bob"));

        let history = log.user_history("u1", 3);
        assert_eq!(history.len(), 3);
        // Most recent first.
        assert_eq!(history[0].command, "cmd4");
        assert!(history.iter().all(|e| e.user_id == "u1"));

        assert_eq!(log.history(AuditFilter::default()).len(), 6);
    }

    #[test]
    fn test_entries_round_trip_through_json() {
        // The durable audit collaborator stores entries as JSON documents.
        let log = AuditLog::new();
        let entry = log.record(AuditDraft::new("df -h").by("u1", "alice"));
        let json = serde_json::to_string(&entry).unwrap();
        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_format_entry() {
        let log = AuditLog::new();
        let ok = log.record(AuditDraft::new("uptime").by("u1", "alice"));
        let formatted = format_entry(Some(&ok));
        assert!(formatted.starts_with("✅"));
        assert!(formatted.contains("uptime"));

        let mut draft = AuditDraft::new("git pull").by("u1", "alice");
        draft.success = Some(false);
        draft.error = Some("merge conflict".to_string());
        let failed = log.record(draft);
        let formatted = format_entry(Some(&failed));
        assert!(formatted.starts_with("❌"));
        assert!(formatted.contains("merge conflict"));

        assert_eq!(format_entry(None), "(no audit entry)");
    }
}
