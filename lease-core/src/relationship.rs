//! Per-direction lease relationship state.
//!
//! A [`LeaseRelationship`] is pure data: deadlines, durations, and bookkeeping flags. It
//! owns none of the seven timers directly. Those live in the owning lease agent's
//! [`crate::timer::TimerQueue`], keyed by [`crate::timer::TimerId`], so this type never
//! needs a lock or a timer-queue handle of its own.

use std::time::Duration;

use lease_wire::InstanceId;

use crate::clock::Ticks;
use crate::config::LeaseConfig;

/// The lifecycle of one direction of a lease relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionState {
    Inactive,
    Active,
    Expired,
    Failed,
}

impl DirectionState {
    pub fn is_active(self) -> bool {
        matches!(self, DirectionState::Active)
    }
}

/// Per-remote-lease-agent relationship state.
#[derive(Debug, Clone)]
pub struct LeaseRelationship {
    pub subject_state: DirectionState,
    pub monitor_state: DirectionState,

    pub subject_expire_time: Option<Ticks>,
    pub subject_fail_time: Option<Ticks>,
    pub subject_suspend_time: Option<Ticks>,
    pub monitor_expire_time: Option<Ticks>,

    pub duration: Duration,
    pub lease_suspend_duration: Duration,
    pub arbitration_duration: Duration,
    pub remote_duration: Option<Duration>,
    pub is_duration_updated: bool,

    pub subject_identifier: InstanceId,
    pub monitor_identifier: InstanceId,

    pub lease_message_sent: bool,
    pub is_renew_retry: bool,
    pub renew_retry_count: u32,
    pub indirect_lease_count: u32,
}

impl LeaseRelationship {
    pub fn new(config: &LeaseConfig) -> Self {
        LeaseRelationship {
            subject_state: DirectionState::Inactive,
            monitor_state: DirectionState::Inactive,
            subject_expire_time: None,
            subject_fail_time: None,
            subject_suspend_time: None,
            monitor_expire_time: None,
            duration: config.duration,
            lease_suspend_duration: config.lease_suspend_duration,
            arbitration_duration: config.arbitration_duration,
            remote_duration: None,
            is_duration_updated: false,
            subject_identifier: InstanceId::ZERO,
            monitor_identifier: InstanceId::ZERO,
            lease_message_sent: false,
            is_renew_retry: false,
            renew_retry_count: 0,
            indirect_lease_count: 0,
        }
    }

    /// Activate the subject side at `now`, minting a fresh identifier and computing the
    /// expiry/fail/suspend deadlines.
    pub fn activate_subject(&mut self, now: Ticks) {
        self.subject_identifier = InstanceId::next();
        self.subject_state = DirectionState::Active;
        self.recompute_subject_deadlines(now);
    }

    /// Recompute `subject_expire_time`/`subject_fail_time`/`subject_suspend_time` from
    /// `now` and the currently configured durations.
    pub fn recompute_subject_deadlines(&mut self, now: Ticks) {
        let expire = now + crate::clock::duration_to_ticks(self.duration);
        self.subject_expire_time = Some(expire);
        self.subject_fail_time = Some(expire + crate::clock::duration_to_ticks(self.arbitration_duration));
        self.subject_suspend_time = Some(expire + crate::clock::duration_to_ticks(self.lease_suspend_duration));
    }

    /// The instant the next renew should fire: `subject_expire_time -
    /// (duration/renew_begin_ratio)`, with retries evenly spaced after that across the
    /// remaining window.
    pub fn next_renew_deadline(&self, config: &LeaseConfig) -> Option<Ticks> {
        let expire = self.subject_expire_time?;
        let begin_offset = crate::clock::duration_to_ticks(config.renew_begin_offset());
        let base = expire.saturating_sub(begin_offset);
        if !self.is_renew_retry {
            Some(base)
        } else {
            let spacing = crate::clock::duration_to_ticks(config.renew_retry_spacing());
            Some(base + spacing * (self.renew_retry_count as u64 + 1))
        }
    }

    /// Activate the monitor side at `now`.
    pub fn activate_monitor(&mut self, now: Ticks, duration: Duration) {
        self.monitor_identifier = InstanceId::next();
        self.monitor_state = DirectionState::Active;
        self.monitor_expire_time = Some(now + crate::clock::duration_to_ticks(duration));
    }
}
