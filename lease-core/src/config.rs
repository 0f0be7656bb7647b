//! Tunables for a [`crate::agent::LeaseAgent`].
//!
//! Validated once at construction (`LeaseConfig::validate`), analogous to
//! `coordination::ConfigBuilder::finish()`, so a misconfigured agent never gets as far as
//! its first timer.

use std::time::Duration;

use crate::error::Error;

/// Every lease duration and retry tunable, plus the ping-retry interval and
/// indirect-lease fan-out cap.
#[derive(Debug, Clone, Copy)]
pub struct LeaseConfig {
    /// Requested lease duration.
    pub duration: Duration,
    /// Grace period added to `subject_expire_time` to compute `subject_suspend_time`.
    pub lease_suspend_duration: Duration,
    /// Upper bound the arbitrator is told it has to decide.
    pub arbitration_duration: Duration,
    /// Number of renew retries evenly spaced across the post-renew-begin window.
    pub lease_retry_count: u32,
    /// `duration / lease_renew_begin_ratio` is how long before expiry the first renew fires.
    pub lease_renew_begin_ratio: u32,
    /// Cap on `indirect_lease_count` before indirect forwarding stops being attempted.
    pub consecutive_indirect_lease_limit: u32,
    /// Interval between ping-request resends while `in_ping`.
    pub ping_retry_interval: Duration,
}

impl Default for LeaseConfig {
    /// Defaults chosen to leave comfortable renew and arbitration windows at a
    /// `duration` of two seconds: one retry before falling back to arbitration, and a
    /// 600ms suspend grace period.
    fn default() -> Self {
        LeaseConfig {
            duration: Duration::from_millis(2000),
            lease_suspend_duration: Duration::from_millis(600),
            arbitration_duration: Duration::from_millis(3000),
            lease_retry_count: 1,
            lease_renew_begin_ratio: 2,
            consecutive_indirect_lease_limit: 3,
            ping_retry_interval: Duration::from_millis(250),
        }
    }
}

impl LeaseConfig {
    /// Reject non-sensical combinations before any agent is constructed from this
    /// config: zero durations, a renew ratio of zero, etc.
    pub fn validate(self) -> Result<Self, Error> {
        if self.duration.is_zero() {
            return Err(Error::Config("duration must be nonzero"));
        }
        if self.arbitration_duration.is_zero() {
            return Err(Error::Config("arbitration_duration must be nonzero"));
        }
        if self.lease_renew_begin_ratio == 0 {
            return Err(Error::Config("lease_renew_begin_ratio must be nonzero"));
        }
        if self.lease_renew_begin_ratio as u128 >= self.duration.as_millis().max(1) {
            return Err(Error::Config(
                "lease_renew_begin_ratio must leave a nonzero renew window before expiry",
            ));
        }
        if self.ping_retry_interval.is_zero() {
            return Err(Error::Config("ping_retry_interval must be nonzero"));
        }
        Ok(self)
    }

    /// How long before `subject_expire_time` the first renew is sent.
    pub fn renew_begin_offset(&self) -> Duration {
        self.duration / self.lease_renew_begin_ratio
    }

    /// Spacing between evenly distributed renew retries across the remaining window.
    pub fn renew_retry_spacing(&self) -> Duration {
        let window = self.duration - self.renew_begin_offset();
        if self.lease_retry_count == 0 {
            window
        } else {
            window / self.lease_retry_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(LeaseConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let cfg = LeaseConfig {
            duration: Duration::ZERO,
            ..LeaseConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_renew_ratio_is_rejected() {
        let cfg = LeaseConfig {
            lease_renew_begin_ratio: 0,
            ..LeaseConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
