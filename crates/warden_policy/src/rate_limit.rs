//! Per-user fixed-window rate limiting.
//!
//! Each user gets an isolated window of `max_commands` admissions; the
//! window rolls over once `window_ms` has elapsed since it opened. The
//! store is serialized behind a mutex so two commands from the same user
//! cannot race an increment.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Rate limit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admissions per window
    #[serde(default = "default_max_commands")]
    pub max_commands: u32,

    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_max_commands() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    3_600_000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_commands: default_max_commands(),
            window_ms: default_window_ms(),
        }
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the command is admitted
    pub allowed: bool,
    /// Admissions left in the active window
    pub remaining: u32,
    /// Milliseconds until the active window resets
    pub reset_ms: u64,
}

impl RateLimitDecision {
    fn denied() -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Record {
    count: u32,
    window_start: Option<Instant>,
}

/// Per-user fixed-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    records: Mutex<HashMap<String, Record>>,
}

impl RateLimiter {
    /// Create a limiter with the fixed defaults (10 commands per hour).
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a limiter with explicit configuration.
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_millis(self.config.window_ms)
    }

    fn decision(&self, record: &Record, now: Instant) -> RateLimitDecision {
        match record.window_start {
            Some(start) if now.duration_since(start) <= self.window() => {
                let remaining = self.config.max_commands.saturating_sub(record.count);
                let reset_ms = self
                    .window()
                    .saturating_sub(now.duration_since(start))
                    .as_millis() as u64;
                RateLimitDecision {
                    allowed: remaining > 0,
                    remaining,
                    reset_ms,
                }
            }
            // No window open, or the prior one elapsed.
            _ => RateLimitDecision {
                allowed: self.config.max_commands > 0,
                remaining: self.config.max_commands,
                reset_ms: 0,
            },
        }
    }

    /// Non-mutating read of the caller's quota. A missing or empty user id
    /// is always denied.
    #[instrument(skip(self), fields(user_id))]
    pub fn check(&self, user_id: &str) -> RateLimitDecision {
        if user_id.trim().is_empty() {
            debug!("Empty user id, denying");
            return RateLimitDecision::denied();
        }
        let records = self.records.lock().expect("rate limit lock");
        let now = Instant::now();
        match records.get(user_id) {
            Some(record) => self.decision(record, now),
            None => self.decision(
                &Record {
                    count: 0,
                    window_start: None,
                },
                now,
            ),
        }
    }

    /// Admit and count a command for the caller, rolling the window if the
    /// prior one elapsed. Exactly the first `max_commands` calls per window
    /// are allowed; the next is denied with `remaining = 0`.
    #[instrument(skip(self), fields(user_id))]
    pub fn record(&self, user_id: &str) -> RateLimitDecision {
        if user_id.trim().is_empty() {
            debug!("Empty user id, denying");
            return RateLimitDecision::denied();
        }
        let mut records = self.records.lock().expect("rate limit lock");
        let now = Instant::now();
        let record = records.entry(user_id.to_string()).or_insert(Record {
            count: 0,
            window_start: None,
        });

        let elapsed = match record.window_start {
            Some(start) => now.duration_since(start) > self.window(),
            None => true,
        };
        if elapsed {
            record.count = 0;
            record.window_start = Some(now);
        }

        if record.count >= self.config.max_commands {
            debug!(count = record.count, "Rate limit exhausted");
            let mut decision = self.decision(record, now);
            decision.allowed = false;
            decision.remaining = 0;
            return decision;
        }

        record.count += 1;
        let decision = self.decision(record, now);
        debug!(count = record.count, remaining = decision.remaining, "Command recorded");
        RateLimitDecision {
            allowed: true,
            ..decision
        }
    }

    /// Read-only status for a user, identical in shape to [`Self::check`].
    pub fn status(&self, user_id: &str) -> RateLimitDecision {
        self.check(user_id)
    }

    /// Drop a single user's window.
    pub fn reset(&self, user_id: &str) {
        self.records
            .lock()
            .expect("rate limit lock")
            .remove(user_id);
    }

    /// Administrative reset of the whole store.
    pub fn clear_all(&self) {
        self.records.lock().expect("rate limit lock").clear();
    }

    /// Number of users with stored state.
    pub fn store_size(&self) -> usize {
        self.records.lock().expect("rate limit lock").len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
