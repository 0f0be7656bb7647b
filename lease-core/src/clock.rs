//! Monotonic clock: ticks are 100ns units, consistent across threads, with no
//! wall-clock involved. Built on [`tokio::time::Instant`] so that
//! `tokio::time::{pause, advance}` drive it deterministically in tests.

use std::time::Duration;

use tokio::time::Instant as TokioInstant;

/// Absolute or relative duration expressed in 100ns ticks.
pub type Ticks = u64;

const NANOS_PER_TICK: u64 = 100;

/// A cheap-to-clone monotonic time source anchored at construction time.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: TokioInstant,
}

impl Clock {
    /// Anchor a new clock at the current instant; `now()` measures ticks elapsed since
    /// this call.
    pub fn new() -> Self {
        Clock {
            epoch: TokioInstant::now(),
        }
    }

    /// Ticks elapsed since this clock was constructed.
    pub fn now(&self) -> Ticks {
        (self.epoch.elapsed().as_nanos() / NANOS_PER_TICK as u128) as u64
    }

    /// The absolute tick value `duration` from now.
    pub fn deadline(&self, duration: Duration) -> Ticks {
        self.now() + duration_to_ticks(duration)
    }

    /// Convert an absolute tick deadline to a [`TokioInstant`], clamping to "now" if the
    /// deadline has already passed.
    pub fn instant_at(&self, ticks: Ticks) -> TokioInstant {
        let now = TokioInstant::now();
        let target = self.epoch + Duration::from_nanos(ticks.saturating_mul(NANOS_PER_TICK));
        if target > now {
            target
        } else {
            now
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::new()
    }
}

/// Convert a [`Duration`] to ticks (100ns units), matching the wire's millisecond
/// granularity for durations configured in milliseconds.
pub fn duration_to_ticks(d: Duration) -> Ticks {
    (d.as_nanos() / NANOS_PER_TICK as u128) as u64
}

/// Convert a millisecond count to ticks.
pub fn ms_to_ticks(ms: u64) -> Ticks {
    ms.saturating_mul(10_000)
}

/// Convert a tick count back to whole milliseconds, rounding down.
pub fn ticks_to_ms(ticks: Ticks) -> u64 {
    ticks / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn now_advances_with_paused_time() {
        let clock = Clock::new();
        let t0 = clock.now();
        tokio::time::advance(Duration::from_millis(500)).await;
        let t1 = clock.now();
        assert_eq!(t1 - t0, ms_to_ticks(500));
    }

    #[test]
    fn ms_round_trips_through_ticks() {
        assert_eq!(ticks_to_ms(ms_to_ticks(1234)), 1234);
    }
}
