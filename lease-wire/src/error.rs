//! Error taxonomy for `lease-wire`, the codec-level subset.

use thiserror::Error;

/// Errors produced while building or parsing a lease message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A malformed wire message, bad LRI string, or caller-side validation failure.
    ///
    /// Covers every validation rule enforced while decoding or constructing a message.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Allocation or set-insertion failure while building a message.
    #[error("insufficient resources while building message")]
    InsufficientResources,

    /// A bounded buffer copy would have overflowed; treated as a codec bug, message dropped.
    #[error("data error: bounded copy would overflow ({context})")]
    DataError { context: &'static str },
}
