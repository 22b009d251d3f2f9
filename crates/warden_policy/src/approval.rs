//! Human-in-the-loop approval for confirmation-gated commands.
//!
//! A pending request transitions `pending → {approved, denied, timed_out}`
//! exactly once. Resolution is a race between an explicit decision and the
//! timeout timer; [`ApprovalManager::resolve`] is a compare-and-set under
//! the table lock, so the losing path is a no-op rather than an overwrite.

use crate::{PolicyError, PolicyErrorKind, PolicyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

/// Fixed approval timeout.
pub const APPROVAL_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Terminal state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Resolution {
    /// Explicitly approved
    Approved,
    /// Explicitly denied
    Denied,
    /// Timer fired before a decision arrived
    TimedOut,
}

/// Renderable confirmation payload handed to the chat layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPrompt {
    /// Prompt title
    pub title: String,
    /// Literal command text awaiting confirmation
    pub command: String,
    /// Optional command description
    pub description: Option<String>,
    /// Warnings (downtime, critical)
    pub warnings: Vec<String>,
    /// Footer naming the timeout
    pub footer: String,
}

/// What the prompt is asking the caller to confirm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalSpec {
    /// Literal command text
    pub command: String,
    /// Optional description
    pub description: Option<String>,
    /// Whether execution interrupts running services
    pub causes_downtime: bool,
    /// Whether the stronger critical warning applies
    pub requires_double_confirmation: bool,
}

/// A stored pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Command awaiting a decision
    pub command: String,
    /// User who requested the command
    pub user_id: String,
    /// Whether a terminal state has been reached
    pub resolved: bool,
    /// Terminal state, once reached
    pub resolution: Option<Resolution>,
    /// Creation time, millis since epoch
    pub created_at: u64,
    /// Resolution time, millis since epoch
    pub resolved_at: Option<u64>,
}

struct PendingSlot {
    record: PendingApproval,
    notify: Option<oneshot::Sender<Resolution>>,
    waiter: Option<oneshot::Receiver<Resolution>>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Owner of the pending-request table.
pub struct ApprovalManager {
    pending: Mutex<HashMap<String, PendingSlot>>,
    timeout: Duration,
}

impl ApprovalManager {
    /// Create a manager with the fixed 60 s timeout.
    pub fn new() -> Self {
        Self::with_timeout(APPROVAL_TIMEOUT)
    }

    /// Create a manager with an explicit timeout (shortened in tests).
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Build the renderable confirmation payload for a gated command.
    ///
    /// Fails on an empty command: a prompt that cannot name what it gates
    /// must never be shown.
    pub fn render_prompt(&self, spec: &ApprovalSpec) -> PolicyResult<ConfirmationPrompt> {
        if spec.command.trim().is_empty() {
            return Err(PolicyError::new(PolicyErrorKind::Configuration(
                "approval spec has no command".to_string(),
            )));
        }

        let mut warnings = Vec::new();
        if spec.causes_downtime {
            warnings.push("⚠️ This command causes downtime.".to_string());
        }
        if spec.requires_double_confirmation {
            warnings.push("🚨 CRITICAL: this command requires double confirmation.".to_string());
        }

        Ok(ConfirmationPrompt {
            title: "Confirmation required".to_string(),
            command: spec.command.clone(),
            description: spec.description.clone(),
            warnings,
            footer: format!(
                "Approve or deny within {} seconds.",
                self.timeout.as_secs()
            ),
        })
    }

    /// Insert a pending request under an opaque id (e.g. the confirmation
    /// message id).
    #[instrument(skip(self), fields(id, user_id))]
    pub fn store_pending(&self, id: &str, command: &str, user_id: &str) {
        let (tx, rx) = oneshot::channel();
        let slot = PendingSlot {
            record: PendingApproval {
                command: command.to_string(),
                user_id: user_id.to_string(),
                resolved: false,
                resolution: None,
                created_at: now_millis(),
                resolved_at: None,
            },
            notify: Some(tx),
            waiter: Some(rx),
        };
        debug!("Storing pending approval");
        self.pending
            .lock()
            .expect("approval table lock")
            .insert(id.to_string(), slot);
    }

    /// Fetch a snapshot of a pending request.
    pub fn get_pending(&self, id: &str) -> Option<PendingApproval> {
        self.pending
            .lock()
            .expect("approval table lock")
            .get(id)
            .map(|slot| slot.record.clone())
    }

    /// Drive a pending request to a terminal state.
    ///
    /// Returns `true` if this call performed the transition and `false` if
    /// the request was unknown or already resolved; exactly one caller ever
    /// wins, and the loser changes nothing.
    #[instrument(skip(self), fields(id, resolution = %resolution))]
    pub fn resolve(&self, id: &str, resolution: Resolution) -> bool {
        let mut pending = self.pending.lock().expect("approval table lock");
        let Some(slot) = pending.get_mut(id) else {
            debug!("Unknown approval id");
            return false;
        };
        if slot.record.resolved {
            debug!("Already resolved, ignoring");
            return false;
        }
        slot.record.resolved = true;
        slot.record.resolution = Some(resolution);
        slot.record.resolved_at = Some(now_millis());
        if let Some(tx) = slot.notify.take() {
            // The waiter may have been dropped (fire-and-forget resolution).
            let _ = tx.send(resolution);
        }
        debug!("Approval resolved");
        true
    }

    /// Await the decision for a stored request, racing the timeout.
    ///
    /// On timeout the record is transitioned to `TimedOut` through the same
    /// compare-and-set as manual resolution; a decision that wins the race
    /// inside the timer's window is honored rather than reported as a
    /// timeout, so the record and the caller always agree. A concurrent
    /// second awaiter gets `ApprovalPending` instead of a duplicate waiter.
    #[instrument(skip(self), fields(id))]
    pub async fn await_decision(&self, id: &str) -> PolicyResult<()> {
        let waiter = {
            let mut pending = self.pending.lock().expect("approval table lock");
            let Some(slot) = pending.get_mut(id) else {
                return Err(PolicyError::new(PolicyErrorKind::Configuration(format!(
                    "no pending approval '{}'",
                    id
                ))));
            };
            slot.waiter.take()
        };
        let Some(waiter) = waiter else {
            // Another task holds the waiter; report the current state.
            return self.recorded_outcome(id).unwrap_or_else(|| {
                Err(PolicyError::new(PolicyErrorKind::ApprovalPending {
                    request_id: id.to_string(),
                }))
            });
        };

        match tokio::time::timeout(self.timeout, waiter).await {
            Ok(Ok(Resolution::Approved)) => {
                debug!("Approved");
                Ok(())
            }
            Ok(Ok(Resolution::Denied)) => {
                debug!("Denied");
                Err(PolicyError::new(PolicyErrorKind::ApprovalDenied {
                    request_id: id.to_string(),
                    reason: "denied by operator".to_string(),
                }))
            }
            Ok(Ok(Resolution::TimedOut)) => {
                Err(PolicyError::new(PolicyErrorKind::ApprovalTimeout {
                    request_id: id.to_string(),
                }))
            }
            Ok(Err(_)) => {
                // The notify channel was severed without a value reaching
                // the waiter; fall back to whatever the record says.
                self.recorded_outcome(id).unwrap_or_else(|| {
                    Err(PolicyError::new(PolicyErrorKind::ApprovalTimeout {
                        request_id: id.to_string(),
                    }))
                })
            }
            Err(_) => {
                if self.resolve(id, Resolution::TimedOut) {
                    warn!("Approval timed out");
                    return Err(PolicyError::new(PolicyErrorKind::ApprovalTimeout {
                        request_id: id.to_string(),
                    }));
                }
                // A decision beat the timer to the compare-and-set; honor
                // the recorded resolution instead of reporting a timeout.
                self.recorded_outcome(id).unwrap_or_else(|| {
                    Err(PolicyError::new(PolicyErrorKind::ApprovalTimeout {
                        request_id: id.to_string(),
                    }))
                })
            }
        }
    }

    /// Map a request's recorded terminal state to an outcome, if it has one.
    fn recorded_outcome(&self, id: &str) -> Option<PolicyResult<()>> {
        match self.get_pending(id).and_then(|record| record.resolution) {
            Some(Resolution::Approved) => Some(Ok(())),
            Some(Resolution::Denied) => {
                Some(Err(PolicyError::new(PolicyErrorKind::ApprovalDenied {
                    request_id: id.to_string(),
                    reason: "denied by operator".to_string(),
                })))
            }
            Some(Resolution::TimedOut) => {
                Some(Err(PolicyError::new(PolicyErrorKind::ApprovalTimeout {
                    request_id: id.to_string(),
                })))
            }
            None => None,
        }
    }

    /// Ids of unresolved requests, in no particular order.
    pub fn pending_ids(&self) -> Vec<String> {
        self.pending
            .lock()
            .expect("approval table lock")
            .iter()
            .filter(|(_, slot)| !slot.record.resolved)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Count of unresolved requests.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("approval table lock")
            .values()
            .filter(|slot| !slot.record.resolved)
            .count()
    }

    /// Administrative reset: drop every stored request.
    pub fn clear_pending(&self) {
        self.pending.lock().expect("approval table lock").clear();
    }
}

impl Default for ApprovalManager {
    fn default() -> Self {
        Self::new()
    }
}
