//! Command safety and moderation policy engine.
//!
//! This crate turns free-text operator requests ("restart the bot") into
//! vetted, auditable actions. It protects against dangerous commands,
//! privilege escalation, and abuse while maintaining a permanent audit
//! trail.
//!
//! # Architecture
//!
//! A request passes through a strictly sequential gating pipeline:
//!
//! 1. **Intent Parser** - free text to a typed intent
//! 2. **Permission Checker** - role-based gate on the intent
//! 3. **Command Validator** - whitelist and dangerous-pattern tables
//! 4. **Approval Manager** - timed human-in-the-loop confirmation
//! 5. **Rate Limiter** - per-user rolling quota
//!
//! Execution is handed to an external [`CommandExecutor`]; regardless of
//! outcome, the [`AuditLog`] records a permanent entry. A later stage never
//! runs once an earlier stage rejects, and every component fails closed on
//! missing or malformed input.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod approval;
mod audit;
mod config;
mod engine;
mod error;
mod intent;
mod permission;
mod rate_limit;
mod validator;

pub use approval::{
    APPROVAL_TIMEOUT, ApprovalManager, ApprovalSpec, ConfirmationPrompt, PendingApproval,
    Resolution,
};
pub use audit::{
    AuditDraft, AuditEntry, AuditFilter, AuditLog, MAX_OUTPUT_LEN, TRUNCATION_MARKER, format_entry,
};
pub use config::PolicyConfig;
pub use engine::{
    Authorized, Caller, CommandExecutor, ExecutionReport, Outcome, PolicyEngine, Submission,
};
pub use error::{PolicyError, PolicyErrorKind, PolicyResult};
pub use intent::{Intent, IntentAction, IntentCategory, IntentParams, IntentParser};
pub use permission::{Permission, Role, has_permission};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use validator::{CommandSpec, CommandValidator, ValidationResult};
