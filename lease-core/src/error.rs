//! Error taxonomy for `lease-core`.
//!
//! Most failure cases are codec-level and live in [`lease_wire::Error`]. What remains
//! here is genuinely exceptional: configuration that fails validation at construction
//! time, and transport failures surfaced from a send. Everything else that could be
//! called a "state-machine error" is folded into a state transition rather than
//! returned.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// `LeaseConfig::validate` rejected a non-sensical combination of durations.
    #[error("invalid lease configuration: {0}")]
    Config(&'static str),

    /// A send to the transport failed; the caller releases the reference it was
    /// holding for the send and waits for the next timer to retry.
    #[error("transport error: {0}")]
    Transport(#[from] lease_transport::Error),

    /// The arbitrator did not return a result before the subject's fail deadline,
    /// detected by the renew-or-arbitrate timer; treated as arbitration lost.
    #[error("arbitration result timed out")]
    ArbitrationTimeout,

    /// A wire message failed to decode or encode; the message is dropped without any
    /// state change.
    #[error("wire error: {0}")]
    Wire(#[from] lease_wire::Error),
}
