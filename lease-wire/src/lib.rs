//! Identifiers, listen endpoints, and the bit-exact lease message wire codec.
//!
//! This crate has no knowledge of sockets, timers, or state machines: it only knows how
//! to name a lease relationship and how to turn a [`message::LeaseMessage`] into bytes
//! and back, exactly.

pub mod codec;
pub mod error;
pub mod ids;
pub mod message;

pub use codec::{deserialize, serialize};
pub use error::Error;
pub use ids::{
    AddressFamily, ApplicationName, InstanceId, LeaseRelationshipId, ListenEndpoint,
    ENDPOINT_ADDR_CCH_MAX, MAX_PATH,
};
pub use message::{
    LeaseMessage, LeaseRelationshipSets, ListDescriptor, MessageHeader, MessageType,
    LEGACY_NO_ONE_WAY_ARBITRATION_VERSION, PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION,
};
