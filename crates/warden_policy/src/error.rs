//! Policy error types.

/// Specific policy error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum PolicyErrorKind {
    /// Command blocked by validation
    #[display("Command blocked: '{}' ({})", command, reason)]
    ValidationBlocked {
        /// Command that was blocked
        command: String,
        /// Reason for the block
        reason: String,
    },

    /// Caller role insufficient for the requested action
    #[display("Permission denied for '{}': role '{}' lacks '{}'", action, role, permission)]
    PermissionDenied {
        /// Action that was requested
        action: String,
        /// Role of the caller
        role: String,
        /// Permission the role lacks
        permission: String,
    },

    /// Per-user rate limit exceeded
    #[display("Rate limit exceeded for user '{}', resets in {}ms", user_id, reset_ms)]
    RateLimitExceeded {
        /// User that exceeded the limit
        user_id: String,
        /// Milliseconds until the window resets
        reset_ms: u64,
    },

    /// Approval request expired before a decision arrived
    #[display("Approval request '{}' timed out", request_id)]
    ApprovalTimeout {
        /// Pending request that expired
        request_id: String,
    },

    /// Approval request was explicitly denied
    #[display("Approval request '{}' denied: {}", request_id, reason)]
    ApprovalDenied {
        /// Pending request that was denied
        request_id: String,
        /// Reason for the denial
        reason: String,
    },

    /// Approval request exists but has not been decided
    #[display("Approval request '{}' is still pending", request_id)]
    ApprovalPending {
        /// Pending request awaiting a decision
        request_id: String,
    },

    /// Query text did not match any recognized intent
    #[display("No recognized intent in query: {}", query)]
    UnknownIntent {
        /// Raw query text
        query: String,
    },

    /// Configuration error
    #[display("Configuration error: {}", _0)]
    Configuration(String),
}

/// Policy error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Policy Error: {} at line {} in {}", kind, line, file)]
pub struct PolicyError {
    /// The specific error kind
    pub kind: PolicyErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// File where error occurred
    pub file: &'static str,
}

impl PolicyError {
    /// Create a new policy error with location tracking.
    #[track_caller]
    pub fn new(kind: PolicyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PolicyErrorKind {
        &self.kind
    }
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
