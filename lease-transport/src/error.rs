//! Error handling in [`lease-transport`][crate].

use thiserror::Error;

/// Possible errors when sending a lease message over a [`crate::Transport`].
#[derive(Error, Debug)]
pub enum Error {
    /// The named peer is not known to this transport (no route, no listener registered).
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    /// The send failed at the transport layer; the caller releases its reference and
    /// lets the next timer retry.
    #[error("transport send failed: {0}")]
    Send(#[source] std::io::Error),

    /// The transport has been closed and can no longer accept sends.
    #[error("transport is closed")]
    Closed,
}
