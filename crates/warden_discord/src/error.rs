//! Moderation error types.

use warden_policy::PolicyError;

/// Specific moderation error conditions.
#[derive(Debug, Clone, derive_more::Display)]
pub enum ModerationErrorKind {
    /// The bot may not manage the target (protected role, insufficient
    /// position, or missing capability)
    #[display("Hierarchy violation on '{}': {}", target, reason)]
    HierarchyViolation {
        /// Role, channel, or member the action targeted
        target: String,
        /// Human-readable denial reason
        reason: String,
    },

    /// The named role, channel, or member does not exist in the guild
    #[display("No {} matching '{}'", kind, identifier)]
    NotFound {
        /// What was looked up ("role", "channel", "member")
        kind: String,
        /// Identifier that failed to resolve
        identifier: String,
    },

    /// The action was attempted without a recorded approval
    #[display("Action '{}' requires approval before execution", action)]
    ApprovalRequired {
        /// Action that was attempted
        action: String,
    },

    /// An underlying policy failure (approval denied/timed out)
    #[display("{}", _0)]
    Policy(PolicyError),
}

/// Moderation error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Moderation Error: {} at line {} in {}", kind, line, file)]
pub struct ModerationError {
    /// The specific error kind
    pub kind: ModerationErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl ModerationError {
    /// Create a new moderation error with location tracking.
    #[track_caller]
    pub fn new(kind: ModerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ModerationErrorKind {
        &self.kind
    }
}

impl From<PolicyError> for ModerationError {
    #[track_caller]
    fn from(error: PolicyError) -> Self {
        Self::new(ModerationErrorKind::Policy(error))
    }
}

/// Result type for moderation operations.
pub type ModerationResult<T> = Result<T, ModerationError>;
