//! Approval-gated moderation actions.
//!
//! Every kick, ban, timeout, role deletion, and channel deletion passes
//! through the approval manager before the platform effector runs, and
//! every attempt, denied or executed, produces an audit entry naming the
//! target, action, reason, and executor.

use crate::{
    GuildView, ModerationError, ModerationErrorKind, ModerationResult, can_manage_role,
    find_channel, find_role, format_duration,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use warden_policy::{
    ApprovalManager, ApprovalSpec, AuditDraft, AuditEntry, AuditLog, Caller, ConfirmationPrompt,
    Resolution,
};

/// A moderation action awaiting approval and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    /// Remove a member from the guild
    Kick {
        /// Target member user id
        user_id: String,
    },
    /// Remove and bar a member from the guild
    Ban {
        /// Target member user id
        user_id: String,
    },
    /// Temporarily mute a member
    Timeout {
        /// Target member user id
        user_id: String,
        /// Mute duration in milliseconds
        duration_ms: u64,
    },
    /// Delete a guild role
    DeleteRole {
        /// Role id or name
        role_id: String,
    },
    /// Delete a guild channel
    DeleteChannel {
        /// Channel id or name (leading `#` accepted)
        channel_id: String,
    },
}

impl ModerationAction {
    /// The id or name of whatever the action targets.
    pub fn target(&self) -> &str {
        match self {
            Self::Kick { user_id } | Self::Ban { user_id } | Self::Timeout { user_id, .. } => {
                user_id
            }
            Self::DeleteRole { role_id } => role_id,
            Self::DeleteChannel { channel_id } => channel_id,
        }
    }

    /// Short action label for audit entries and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kick { .. } => "kick",
            Self::Ban { .. } => "ban",
            Self::Timeout { .. } => "timeout",
            Self::DeleteRole { .. } => "delete_role",
            Self::DeleteChannel { .. } => "delete_channel",
        }
    }

    /// One-line description shown in the confirmation prompt.
    pub fn describe(&self) -> String {
        match self {
            Self::Kick { user_id } => format!("kick member {user_id}"),
            Self::Ban { user_id } => format!("ban member {user_id}"),
            Self::Timeout {
                user_id,
                duration_ms,
            } => format!(
                "timeout member {user_id} for {}",
                format_duration(*duration_ms)
            ),
            Self::DeleteRole { role_id } => format!("delete role {role_id}"),
            Self::DeleteChannel { channel_id } => format!("delete channel {channel_id}"),
        }
    }
}

/// Result of applying a moderation action against the platform.
#[derive(Debug, Clone, Default)]
pub struct ModerationOutcome {
    /// Whether the platform accepted the mutation
    pub success: bool,
    /// Human-readable detail, shown in the confirmation reply
    pub detail: Option<String>,
    /// Platform error text, preserved verbatim
    pub error: Option<String>,
}

/// Platform collaborator that applies an approved action.
#[async_trait]
pub trait ModerationEffector: Send + Sync {
    /// Apply the action. Failures are reported in the outcome, not raised,
    /// so they land in the audit entry.
    async fn apply(&self, guild: &GuildView, action: &ModerationAction) -> ModerationOutcome;
}

/// A proposed action with its stored approval request.
#[derive(Debug, Clone)]
pub struct ModerationTicket {
    /// Approval request id
    pub id: String,
    /// Renderable confirmation payload
    pub prompt: ConfirmationPrompt,
    /// The gated action
    pub action: ModerationAction,
    /// Stated reason, carried into the audit entry
    pub reason: Option<String>,
}

/// Gatekeeper for moderation actions.
pub struct Moderator {
    approvals: Arc<ApprovalManager>,
    audit: Arc<AuditLog>,
}

impl Moderator {
    /// Create a moderator sharing the engine's approval table and audit log.
    pub fn new(approvals: Arc<ApprovalManager>, audit: Arc<AuditLog>) -> Self {
        Self { approvals, audit }
    }

    /// Validate an action against the guild hierarchy and store its
    /// approval request.
    ///
    /// Hierarchy rejections are audited with `approved = false`; nothing is
    /// stored for them.
    #[instrument(skip(self, guild), fields(guild_id = %guild.id, action = action.label()))]
    pub fn propose(
        &self,
        caller: &Caller,
        guild: &GuildView,
        action: ModerationAction,
        reason: Option<String>,
    ) -> ModerationResult<ModerationTicket> {
        if let Err(error) = self.check_target(guild, &action) {
            warn!(target = action.target(), "Moderation target rejected");
            self.audit_denied(caller, guild, &action, reason.as_deref(), &error);
            return Err(error);
        }

        let spec = ApprovalSpec {
            command: action.describe(),
            description: reason.clone(),
            ..Default::default()
        };
        let prompt = self.approvals.render_prompt(&spec)?;
        let id = Uuid::new_v4().to_string();
        self.approvals
            .store_pending(&id, &spec.command, &caller.user_id);
        debug!(%id, "Moderation approval stored");

        Ok(ModerationTicket {
            id,
            prompt,
            action,
            reason,
        })
    }

    /// Run an approved ticket through the platform effector and audit the
    /// result.
    ///
    /// Refuses tickets that were never resolved, or resolved to anything
    /// but approval. Effector failures are folded into the audit entry, not
    /// raised.
    #[instrument(skip(self, guild, ticket, effector), fields(id = %ticket.id))]
    pub async fn execute(
        &self,
        caller: &Caller,
        guild: &GuildView,
        ticket: &ModerationTicket,
        effector: &dyn ModerationEffector,
    ) -> ModerationResult<AuditEntry> {
        let approved = self
            .approvals
            .get_pending(&ticket.id)
            .and_then(|record| record.resolution)
            == Some(Resolution::Approved);
        if !approved {
            return Err(ModerationError::new(ModerationErrorKind::ApprovalRequired {
                action: ticket.action.describe(),
            }));
        }

        let outcome = effector.apply(guild, &ticket.action).await;
        info!(
            action = ticket.action.label(),
            success = outcome.success,
            "Moderation action applied"
        );

        let mut draft = AuditDraft::new(ticket.action.describe())
            .by(&caller.user_id, &caller.username)
            .target(ticket.action.target())
            .success(outcome.success);
        if let Some(reason) = &ticket.reason {
            draft = draft.reason(reason);
        }
        draft.intent = Some(ticket.action.label().to_string());
        draft.output = outcome.detail;
        draft.error = outcome.error;
        draft.platform = Some("discord".to_string());
        draft.guild_id = Some(guild.id.clone());
        Ok(self.audit.record(draft))
    }

    /// Full gate: propose, await the human decision, then execute.
    ///
    /// A denial or timeout is audited with `approved = false` before the
    /// error propagates.
    pub async fn moderate(
        &self,
        caller: &Caller,
        guild: &GuildView,
        action: ModerationAction,
        reason: Option<String>,
        effector: &dyn ModerationEffector,
    ) -> ModerationResult<AuditEntry> {
        let ticket = self.propose(caller, guild, action, reason)?;
        if let Err(error) = self.approvals.await_decision(&ticket.id).await {
            let error = ModerationError::from(error);
            self.audit_denied(caller, guild, &ticket.action, ticket.reason.as_deref(), &error);
            return Err(error);
        }
        self.execute(caller, guild, &ticket, effector).await
    }

    fn check_target(&self, guild: &GuildView, action: &ModerationAction) -> ModerationResult<()> {
        match action {
            ModerationAction::Kick { user_id }
            | ModerationAction::Ban { user_id }
            | ModerationAction::Timeout { user_id, .. } => {
                let Some(bot) = guild.bot_member() else {
                    return Err(ModerationError::new(
                        ModerationErrorKind::HierarchyViolation {
                            target: user_id.clone(),
                            reason: "bot membership record unavailable".to_string(),
                        },
                    ));
                };
                let Some(target) = guild.member(user_id) else {
                    return Err(ModerationError::new(ModerationErrorKind::NotFound {
                        kind: "member".to_string(),
                        identifier: user_id.clone(),
                    }));
                };
                // Same position rule as role management: the bot may only
                // moderate members whose highest role sits below its own.
                let bot_top = guild.top_position(bot);
                let target_top = guild.top_position(target);
                if target_top >= bot_top {
                    return Err(ModerationError::new(
                        ModerationErrorKind::HierarchyViolation {
                            target: user_id.clone(),
                            reason: format!(
                                "member's highest role (position {}) is at or above the bot's (position {})",
                                target_top, bot_top
                            ),
                        },
                    ));
                }
                Ok(())
            }
            ModerationAction::DeleteRole { role_id } => {
                let Some(role) = find_role(guild, role_id) else {
                    return Err(ModerationError::new(ModerationErrorKind::NotFound {
                        kind: "role".to_string(),
                        identifier: role_id.clone(),
                    }));
                };
                let verdict = can_manage_role(Some(guild), Some(role));
                if !verdict.allowed {
                    return Err(ModerationError::new(
                        ModerationErrorKind::HierarchyViolation {
                            target: role.name.clone(),
                            reason: verdict.reason.unwrap_or_else(|| "denied".to_string()),
                        },
                    ));
                }
                Ok(())
            }
            ModerationAction::DeleteChannel { channel_id } => {
                let verdict = crate::can_manage_channels(Some(guild));
                if !verdict.allowed {
                    return Err(ModerationError::new(
                        ModerationErrorKind::HierarchyViolation {
                            target: channel_id.clone(),
                            reason: verdict.reason.unwrap_or_else(|| "denied".to_string()),
                        },
                    ));
                }
                if find_channel(guild, channel_id).is_none() {
                    return Err(ModerationError::new(ModerationErrorKind::NotFound {
                        kind: "channel".to_string(),
                        identifier: channel_id.clone(),
                    }));
                }
                Ok(())
            }
        }
    }

    fn audit_denied(
        &self,
        caller: &Caller,
        guild: &GuildView,
        action: &ModerationAction,
        reason: Option<&str>,
        error: &ModerationError,
    ) {
        let mut draft = AuditDraft::new(action.describe())
            .by(&caller.user_id, &caller.username)
            .target(action.target())
            .approved(false)
            .executed(false)
            .success(false);
        if let Some(reason) = reason {
            draft = draft.reason(reason);
        }
        draft.intent = Some(action.label().to_string());
        draft.error = Some(error.kind.to_string());
        draft.platform = Some("discord".to_string());
        draft.guild_id = Some(guild.id.clone());
        self.audit.record(draft);
    }
}
