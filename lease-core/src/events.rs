//! The application and arbitrator interfaces: both are external collaborators the core
//! calls into, specified here only as the traits it drives.

use async_trait::async_trait;
use lease_wire::{ApplicationName, InstanceId, ListenEndpoint};

/// Arguments to `LEASING_APPLICATION_ARBITRATE`.
#[derive(Debug, Clone)]
pub struct ArbitrateEvent {
    pub local_id: ApplicationName,
    pub remote_endpoint: ListenEndpoint,
    pub monitor_ttl_ms: u64,
    pub subject_ttl_ms: u64,
    pub local_instance: InstanceId,
    pub remote_instance: InstanceId,
    pub remote_version: u16,
    pub monitor_id: Option<ApplicationName>,
    pub subject_id: Option<ApplicationName>,
    pub remote_arbitration_duration_upper_bound_ms: u64,
}

/// A client registered against a local application name. The process registry that
/// maps a local application id to a client is external; this is the narrow interface
/// the core calls into it through.
#[async_trait]
pub trait RegisteredApplication: Send + Sync {
    /// Whether this application opted in to arbitration. Arbitration request
    /// construction requires at least one registered application with
    /// `is_arbitration_enabled = true`.
    fn is_arbitration_enabled(&self) -> bool {
        true
    }

    /// The TTL, in milliseconds, this application reports when asked how long it needs
    /// before it can tolerate being told of a remote failure.
    fn application_ttl_ms(&self) -> u64 {
        0
    }

    /// `REMOTE_LEASING_APPLICATION_EXPIRED(local_id, remote_id)`.
    async fn on_remote_expired(&self, local_id: &ApplicationName, remote_id: &ApplicationName);

    /// Advisory: arbitration is about to be requested for this LRI. No reply is
    /// expected.
    async fn on_pre_arbitration(&self, local_id: &ApplicationName, remote_id: &ApplicationName) {
        let _ = (local_id, remote_id);
    }

    /// `LEASING_APPLICATION_ARBITRATE(...)`.
    async fn on_arbitrate(&self, event: ArbitrateEvent);
}

/// The external arbitrator: `arbitrate(local_node, remote_node, local_ttl_ms,
/// remote_ttl_ms, is_delayed)`, invoked asynchronously after the core surfaces an
/// arbitration event. Its decision policy is entirely out of scope; this trait only
/// pins down the call shape.
#[async_trait]
pub trait Arbitrator: Send + Sync {
    async fn arbitrate(&self, event: ArbitrateEvent) -> ArbitrationOutcome;
}

/// The arbitrator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrationOutcome {
    /// `None` encodes the wire's `MAX` sentinel ("no TTL granted", i.e. this side lost).
    pub local_ttl_ms: Option<u64>,
    pub remote_ttl_ms: Option<u64>,
    pub is_delayed: bool,
}
