//! The `Transport` collaborator: reliable ordered delivery of opaque buffers to a named
//! peer. This crate only describes the interface `lease-core` needs against it;
//! resolving addresses, retrying, and authenticating are all left to the
//! implementation plugged in at the edge.

use async_trait::async_trait;
use bytes::Bytes;
use lease_wire::ListenEndpoint;

use crate::error::Error;

/// Sends opaque lease-wire bytes to a named peer and reports liveness hints back.
///
/// A `Transport` never interprets the bytes it carries; `lease-core` is the only caller
/// that knows they are [`lease_wire::LeaseMessage`]s. Implementations MUST NOT perform
/// their own retries: the renew/ping timers already drive resend cadence, and a
/// transport-level retry would defeat the wire protocol's reordering tolerance.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `message` to `target`. Completion (`Ok` or `Err`) always eventually resolves;
    /// it never blocks indefinitely.
    async fn send(&self, target: &ListenEndpoint, message: Bytes) -> Result<(), Error>;

    /// Best-effort liveness hint for `target`, consulted when deciding whether a remote
    /// lease agent counts as active. A transport with no liveness tracking may always
    /// return `true`.
    fn is_active(&self, target: &ListenEndpoint) -> bool {
        let _ = target;
        true
    }
}
