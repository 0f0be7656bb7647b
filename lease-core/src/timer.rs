//! The process-wide timer queue and the seven lease-relationship timer kinds it
//! dispatches.
//!
//! Grounded on `kube_runtime::scheduler::Scheduler`'s `DelayQueue` + `HashMap` dedup
//! pattern, generalized from a debounced message stream into an explicit `arm`/`dequeue`
//! primitive. Entries are [`TimerId`]s keyed into the owning [`crate::agent::LeaseAgent`]'s
//! arena rather than raw pointers into remote-lease-agent contexts, so a dequeued
//! callback whose handle no longer resolves is simply a no-op at the call site.

use std::hash::Hash;
use std::time::Duration;

use futures::StreamExt;
use hashbrown::HashMap;
use tokio_util::time::delay_queue::{self, DelayQueue};

use crate::clock::Clock;

/// One of the seven per-lease-relationship timers, plus the lease agent's own
/// delayed-failure timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    SubjectExpired,
    MonitorExpired,
    RenewOrArbitrate,
    PreArbitrationSubject,
    PreArbitrationMonitor,
    PostArbitration,
    PingRetry,
    DelayedFailure,
}

/// Stable handle identifying one armed timer: which remote lease agent (or `None` for
/// the owning lease agent's own delayed-failure timer) and which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub remote: Option<crate::agent::RemoteAgentId>,
    pub kind: TimerKind,
}

impl TimerId {
    pub fn new(remote: crate::agent::RemoteAgentId, kind: TimerKind) -> Self {
        TimerId {
            remote: Some(remote),
            kind,
        }
    }

    pub fn agent_level(kind: TimerKind) -> Self {
        TimerId { remote: None, kind }
    }
}

/// A single-process timer queue keyed on a stable handle `T` rather than a pointer.
///
/// `enqueue` on an already-armed entry is a logic error reported as `false` (callers use
/// [`TimerQueue::arm`], which is always safe to call repeatedly).
pub struct TimerQueue<T: Eq + Hash + Clone> {
    queue: DelayQueue<T>,
    keys: HashMap<T, delay_queue::Key>,
}

impl<T: Eq + Hash + Clone> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> TimerQueue<T> {
    pub fn new() -> Self {
        TimerQueue {
            queue: DelayQueue::new(),
            keys: HashMap::new(),
        }
    }

    /// Schedule `entry` to fire at `deadline` (absolute ticks). Returns `false` if it was
    /// already armed; callers that want to reschedule should use [`Self::arm`] instead.
    pub fn enqueue(&mut self, entry: T, deadline: crate::clock::Ticks, clock: &Clock) -> bool {
        if self.keys.contains_key(&entry) {
            return false;
        }
        let key = self.queue.insert_at(entry.clone(), clock.instant_at(deadline));
        self.keys.insert(entry, key);
        true
    }

    /// Schedule `entry` to fire `delay` from now.
    pub fn enqueue_after(&mut self, entry: T, delay: Duration, clock: &Clock) -> bool {
        self.enqueue(entry, clock.deadline(delay), clock)
    }

    /// Remove `entry` if still pending. Returns whether it was pending.
    pub fn dequeue(&mut self, entry: &T) -> bool {
        match self.keys.remove(entry) {
            Some(key) => {
                self.queue.try_remove(&key);
                true
            }
            None => false,
        }
    }

    /// Whether `entry` is currently armed.
    pub fn is_armed(&self, entry: &T) -> bool {
        self.keys.contains_key(entry)
    }

    /// `dequeue` then `enqueue` at `deadline`; the net reference count held by the
    /// caller is unchanged.
    pub fn arm(&mut self, entry: T, deadline: crate::clock::Ticks, clock: &Clock) {
        self.dequeue(&entry);
        self.enqueue(entry, deadline, clock);
    }

    /// Await the next expired entry, removing its bookkeeping. Pending forever (never
    /// resolves) once the queue is empty, matching `DelayQueue`'s behavior of never
    /// terminating on its own.
    pub async fn next_expired(&mut self) -> Option<T> {
        let expired = self.queue.next().await?;
        let entry = expired.into_inner();
        self.keys.remove(&entry);
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RemoteAgentId;

    #[tokio::test(start_paused = true)]
    async fn arm_then_fire() {
        let clock = Clock::new();
        let mut q: TimerQueue<TimerId> = TimerQueue::new();
        let id = TimerId::new(RemoteAgentId(0), TimerKind::SubjectExpired);
        q.arm(id, clock.deadline(Duration::from_millis(100)), &clock);
        assert!(q.is_armed(&id));
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(q.next_expired().await, Some(id));
        assert!(!q.is_armed(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn dequeue_before_fire_prevents_expiry() {
        let clock = Clock::new();
        let mut q: TimerQueue<TimerId> = TimerQueue::new();
        let id = TimerId::new(RemoteAgentId(0), TimerKind::PingRetry);
        q.arm(id, clock.deadline(Duration::from_millis(100)), &clock);
        assert!(q.dequeue(&id));
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(futures::poll!(q.next_expired()).is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_moves_the_deadline() {
        let clock = Clock::new();
        let mut q: TimerQueue<TimerId> = TimerQueue::new();
        let id = TimerId::new(RemoteAgentId(0), TimerKind::RenewOrArbitrate);
        q.arm(id, clock.deadline(Duration::from_millis(100)), &clock);
        q.arm(id, clock.deadline(Duration::from_millis(300)), &clock);
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(futures::poll!(q.next_expired()).is_pending());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(q.next_expired().await, Some(id));
    }
}
