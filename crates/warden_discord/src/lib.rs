//! Discord-side guards for the warden policy engine.
//!
//! Chat-platform administration has its own hazards beyond shell commands:
//! a bot can only safely mutate roles below its own highest role, the base
//! "everyone" role must never be touched, and destructive member actions
//! (kick, ban, timeout) deserve the same human confirmation gate as a
//! server reboot. This crate layers those guards over snapshots of guild
//! state supplied by the hosting platform layer:
//!
//! - [`can_manage_role`] / [`can_manage_channels`] enforce the position and
//!   capability hierarchy, failing closed on any missing input.
//! - [`lock_channel`] / [`unlock_channel`] flip the base role's
//!   send-permission override (explicit deny to lock, inherit to unlock).
//! - [`parse_duration`] / [`format_duration`] convert user-facing timeout
//!   durations.
//! - [`Moderator`] routes every destructive action through the shared
//!   [`warden_policy::ApprovalManager`] and writes an audit entry for every
//!   attempt, denied or executed.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod duration;
mod error;
mod hierarchy;
mod models;
mod moderator;

pub use duration::{format_duration, parse_duration};
pub use error::{ModerationError, ModerationErrorKind, ModerationResult};
pub use hierarchy::{
    ManageVerdict, can_manage_channels, can_manage_role, find_channel, find_role, lock_channel,
    unlock_channel,
};
pub use models::{ChannelView, GuildView, MemberView, RoleView, SendOverride};
pub use moderator::{
    ModerationAction, ModerationEffector, ModerationOutcome, ModerationTicket, Moderator,
};
