//! The gating pipeline.
//!
//! `PolicyEngine` owns every stateful component (approval table, rate
//! limiter, audit log) as an explicitly-owned container, so multiple
//! isolated instances can coexist and tests stay deterministic. The
//! pipeline per request is strictly sequential: permission check, then
//! validation, then (conditionally) approval, then rate limiting, then
//! execution, then audit; a later stage never runs once an earlier stage
//! rejects, and every rejection still writes an audit entry.

use crate::{
    ApprovalManager, ApprovalSpec, AuditDraft, AuditEntry, AuditLog, CommandValidator,
    ConfirmationPrompt, Intent, IntentParser, Permission, PolicyConfig, PolicyError,
    PolicyErrorKind, PolicyResult, RateLimiter, Role,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Identity of the requesting operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Chat-platform user id
    pub user_id: String,
    /// Display name
    pub username: String,
    /// Assigned role
    pub role: Role,
}

impl Caller {
    /// Convenience constructor.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
        }
    }
}

/// Result handed back by the external command transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Whether the command exited successfully
    pub success: bool,
    /// Captured stdout
    pub output: Option<String>,
    /// Error text, preserved verbatim in the audit entry
    pub error: Option<String>,
    /// Process exit code, when known
    pub exit_code: Option<i32>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// External command transport (SSH, local shell); out of scope here beyond
/// this seam.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a validated command with a timeout and report the outcome.
    /// Implementations report failures in the [`ExecutionReport`] rather
    /// than panicking; transport errors are execution failures, not policy
    /// failures.
    async fn run(&self, command: &str, timeout: Duration) -> ExecutionReport;
}

/// A request that has cleared permission and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Authorized {
    /// Concrete command to execute
    pub command: String,
    /// Intent the command was derived from
    pub intent: Intent,
}

/// Outcome of submitting a query to the gating pipeline.
#[derive(Debug)]
pub enum Submission {
    /// Cleared every synchronous gate; ready for rate limiting + execution
    Ready(Authorized),
    /// Confirmation-gated: render the prompt and await a decision
    NeedsApproval {
        /// Pending-request id
        id: String,
        /// Renderable confirmation payload
        prompt: ConfirmationPrompt,
        /// The request to execute once approved
        authorized: Authorized,
    },
    /// Chat-platform intent; routed to the moderation guards instead of the
    /// command transport
    Deferred(Intent),
}

/// The policy engine: parser, validator, approvals, limiter, and audit log
/// behind one explicitly-owned container.
pub struct PolicyEngine {
    config: PolicyConfig,
    parser: IntentParser,
    validator: CommandValidator,
    approvals: ApprovalManager,
    limiter: RateLimiter,
    audit: AuditLog,
}

impl PolicyEngine {
    /// Build an engine from configuration.
    pub fn new(config: PolicyConfig) -> Self {
        let approvals =
            ApprovalManager::with_timeout(Duration::from_millis(config.approval_timeout_ms));
        let limiter = RateLimiter::with_config(config.rate_limit.clone());
        Self {
            config,
            parser: IntentParser::new(),
            validator: CommandValidator::new(),
            approvals,
            limiter,
            audit: AuditLog::new(),
        }
    }

    /// Run the synchronous gates: intent parsing, permission check, command
    /// validation, and (when gated) pending-approval creation.
    #[instrument(skip(self, text), fields(user_id = %caller.user_id))]
    pub fn submit(&self, caller: &Caller, text: &str) -> PolicyResult<Submission> {
        let intent = self.parser.parse(text);
        let Some(permission) = Permission::required_for(intent.action) else {
            debug!("No recognized intent");
            return Err(PolicyError::new(PolicyErrorKind::UnknownIntent {
                query: text.to_string(),
            }));
        };

        if !caller.role.allows(permission) {
            warn!(role = %caller.role, permission = %permission, "Permission denied");
            self.audit.record(
                AuditDraft::new(text)
                    .by(&caller.user_id, &caller.username)
                    .approved(false)
                    .executed(false)
                    .success(false)
                    .reason(format!("role '{}' lacks '{}'", caller.role, permission)),
            );
            return Err(PolicyError::new(PolicyErrorKind::PermissionDenied {
                action: intent.action.to_string(),
                role: caller.role.to_string(),
                permission: permission.to_string(),
            }));
        }

        if intent.is_platform_action() {
            debug!(action = %intent.action, "Deferring to moderation guards");
            return Ok(Submission::Deferred(intent));
        }

        let command = intent.command(&self.config.default_service).ok_or_else(|| {
            PolicyError::new(PolicyErrorKind::Configuration(format!(
                "no command mapping for action '{}'",
                intent.action
            )))
        })?;

        let result = self.validator.validate(&command, &caller.user_id);
        if !result.valid {
            let reason = result
                .reason
                .unwrap_or_else(|| "command blocked".to_string());
            warn!(command, reason, "Validation blocked");
            self.audit.record(
                AuditDraft::new(&command)
                    .by(&caller.user_id, &caller.username)
                    .approved(false)
                    .executed(false)
                    .success(false)
                    .reason(&reason),
            );
            return Err(PolicyError::new(PolicyErrorKind::ValidationBlocked {
                command,
                reason,
            }));
        }

        let authorized = Authorized {
            command: command.clone(),
            intent,
        };

        if result.requires_approval {
            let spec = self.validator.spec_for(&command);
            let approval = ApprovalSpec {
                command: command.clone(),
                description: spec.and_then(|s| s.description.map(str::to_string)),
                causes_downtime: spec.map(|s| s.causes_downtime).unwrap_or(false),
                requires_double_confirmation: spec
                    .map(|s| s.requires_double_confirmation)
                    .unwrap_or(false),
            };
            let prompt = self.approvals.render_prompt(&approval)?;
            let id = Uuid::new_v4().to_string();
            self.approvals
                .store_pending(&id, &command, &caller.user_id);
            info!(id, command, "Approval required");
            return Ok(Submission::NeedsApproval {
                id,
                prompt,
                authorized,
            });
        }

        Ok(Submission::Ready(authorized))
    }

    /// Await the decision for a pending approval. Denial and timeout both
    /// leave an audit entry with `approved = false`.
    #[instrument(skip(self), fields(id))]
    pub async fn await_approval(&self, id: &str) -> PolicyResult<()> {
        match self.approvals.await_decision(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(pending) = self.approvals.get_pending(id) {
                    self.audit.record(
                        AuditDraft::new(&pending.command)
                            .by(&pending.user_id, "unknown")
                            .approved(false)
                            .executed(false)
                            .success(false)
                            .reason(err.kind.to_string()),
                    );
                }
                Err(err)
            }
        }
    }

    /// Rate-limit, execute, and audit an authorized request.
    ///
    /// Transport failures are folded into the audit entry with
    /// `success = false` and the error text preserved verbatim; they are
    /// not engine errors.
    #[instrument(skip(self, executor), fields(user_id = %caller.user_id, command = %authorized.command))]
    pub async fn execute(
        &self,
        caller: &Caller,
        authorized: &Authorized,
        executor: &dyn CommandExecutor,
    ) -> PolicyResult<AuditEntry> {
        let decision = self.limiter.record(&caller.user_id);
        if !decision.allowed {
            warn!(reset_ms = decision.reset_ms, "Rate limit exceeded");
            self.audit.record(
                AuditDraft::new(&authorized.command)
                    .by(&caller.user_id, &caller.username)
                    .approved(false)
                    .executed(false)
                    .success(false)
                    .reason("rate limit exceeded"),
            );
            return Err(PolicyError::new(PolicyErrorKind::RateLimitExceeded {
                user_id: caller.user_id.clone(),
                reset_ms: decision.reset_ms,
            }));
        }

        let timeout = Duration::from_millis(self.config.execution_timeout_ms);
        let report = executor.run(&authorized.command, timeout).await;
        info!(success = report.success, "Command executed");

        let mut draft = AuditDraft::new(&authorized.command)
            .by(&caller.user_id, &caller.username)
            .approved(true)
            .executed(true)
            .success(report.success);
        draft.intent = Some(authorized.intent.action.to_string());
        draft.category = authorized.intent.category.map(|c| c.to_string());
        draft.output = report.output;
        draft.error = report.error;
        draft.duration_ms = Some(report.duration_ms);
        draft.platform = Some("server".to_string());
        Ok(self.audit.record(draft))
    }

    /// Full end-to-end pipeline: submit, wait out the approval gate when
    /// required, then execute. Chat-platform intents come back as
    /// [`Outcome::Deferred`] for the moderation guards.
    pub async fn handle(
        &self,
        caller: &Caller,
        text: &str,
        executor: &dyn CommandExecutor,
    ) -> PolicyResult<Outcome> {
        match self.submit(caller, text)? {
            Submission::Ready(authorized) => {
                let entry = self.execute(caller, &authorized, executor).await?;
                Ok(Outcome::Executed(entry))
            }
            Submission::NeedsApproval { id, authorized, .. } => {
                self.await_approval(&id).await?;
                let entry = self.execute(caller, &authorized, executor).await?;
                Ok(Outcome::Executed(entry))
            }
            Submission::Deferred(intent) => Ok(Outcome::Deferred(intent)),
        }
    }

    /// The approval manager (for the chat layer's accept/deny controls).
    pub fn approvals(&self) -> &ApprovalManager {
        &self.approvals
    }

    /// The audit log.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The command validator.
    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    /// The intent parser.
    pub fn parser(&self) -> &IntentParser {
        &self.parser
    }

    /// The engine configuration.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}

/// Terminal outcome of [`PolicyEngine::handle`].
#[derive(Debug)]
pub enum Outcome {
    /// Command executed; the audit entry holds the result
    Executed(AuditEntry),
    /// Chat-platform intent, to be handled by the moderation guards
    Deferred(Intent),
}
