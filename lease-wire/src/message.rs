//! Lease message types: header, list descriptors, and the full message body.

use crate::ids::{InstanceId, LeaseRelationshipId, ListenEndpoint};

/// Major version of the lease wire protocol this crate speaks.
pub const PROTOCOL_MAJOR_VERSION: u16 = 1;
/// Minor version of the lease wire protocol this crate speaks.
///
/// Must stay above the minor version baked into
/// [`LEGACY_NO_ONE_WAY_ARBITRATION_VERSION`] (1): this crate supports one-way
/// arbitration, so its own version must never encode to that sentinel.
pub const PROTOCOL_MINOR_VERSION: u16 = 2;

/// The hard-coded remote-version sentinel meaning "legacy peer, one-way arbitration
/// unsupported".
///
/// Encoding: `major * 256 + minor`, so `257 == 1 * 256 + 1`: major version 1, minor
/// version 1, the last protocol revision before one-way arbitration was introduced.
/// Preserved by name rather than re-derived so a future protocol bump can't silently
/// change its meaning.
pub const LEGACY_NO_ONE_WAY_ARBITRATION_VERSION: u16 = 257;


/// Kind of a lease message. Relay messages are handled by a separate codec and are out
/// of scope for this crate; the variant exists so an unrecognized wire value can be
/// distinguished from a malformed one during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    LeaseRequest = 0,
    LeaseResponse = 1,
    PingRequest = 2,
    PingResponse = 3,
    ForwardRequest = 4,
    ForwardResponse = 5,
    RelayRequest = 6,
    RelayResponse = 7,
}

impl MessageType {
    pub(crate) fn from_wire(value: u8) -> Option<Self> {
        Some(match value {
            0 => MessageType::LeaseRequest,
            1 => MessageType::LeaseResponse,
            2 => MessageType::PingRequest,
            3 => MessageType::PingResponse,
            4 => MessageType::ForwardRequest,
            5 => MessageType::ForwardResponse,
            6 => MessageType::RelayRequest,
            7 => MessageType::RelayResponse,
            _ => return None,
        })
    }

    /// Whether this message kind carries the indirect-lease (`FORWARD_*`) extra
    /// descriptor and lease listen endpoint (the V2 header).
    pub fn is_indirect(self) -> bool {
        matches!(self, MessageType::ForwardRequest | MessageType::ForwardResponse)
    }

    /// Whether this message kind is a ping handshake, which skips the
    /// duration/lease-instance validation rules.
    pub fn is_ping(self) -> bool {
        matches!(self, MessageType::PingRequest | MessageType::PingResponse)
    }
}

/// One `{size, count, start_offset}` descriptor for a body list or trailing structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListDescriptor {
    pub size: u32,
    pub count: u32,
    pub start_offset: u32,
}

impl ListDescriptor {
    pub(crate) const WIRE_SIZE: usize = 12;
}

/// The nine body lists, in fixed wire order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseRelationshipSets {
    pub subject_pending: Vec<LeaseRelationshipId>,
    pub subject_failed_pending: Vec<LeaseRelationshipId>,
    pub monitor_failed_pending: Vec<LeaseRelationshipId>,
    pub subject_pending_accepted: Vec<LeaseRelationshipId>,
    pub subject_failed_accepted: Vec<LeaseRelationshipId>,
    pub monitor_failed_accepted: Vec<LeaseRelationshipId>,
    pub subject_pending_rejected: Vec<LeaseRelationshipId>,
    pub subject_terminate_pending: Vec<LeaseRelationshipId>,
    pub subject_terminate_accepted: Vec<LeaseRelationshipId>,
}

impl LeaseRelationshipSets {
    /// The nine lists in wire order, for uniform encode/decode/validate loops.
    pub(crate) fn as_array(&self) -> [&Vec<LeaseRelationshipId>; 9] {
        [
            &self.subject_pending,
            &self.subject_failed_pending,
            &self.monitor_failed_pending,
            &self.subject_pending_accepted,
            &self.subject_failed_accepted,
            &self.monitor_failed_accepted,
            &self.subject_pending_rejected,
            &self.subject_terminate_pending,
            &self.subject_terminate_accepted,
        ]
    }
}

/// Absolute deadline or duration expressed in 100ns ticks.
pub type Ticks = u64;

/// The fixed-order header fields that precede the nine list descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub major_version: u16,
    pub minor_version: u16,
    pub header_size: u32,
    pub message_size: u32,
    pub lease_instance: InstanceId,
    pub remote_lease_agent_instance: InstanceId,
    pub duration_ms: u32,
    pub expiration: Ticks,
    pub suspend_duration_ms: u32,
    pub arbitration_duration_ms: u32,
    pub is_two_way_termination: bool,
    pub message_type: MessageType,
    pub message_identifier: InstanceId,
    pub subject_pending: ListDescriptor,
    pub subject_failed_pending: ListDescriptor,
    pub monitor_failed_pending: ListDescriptor,
    pub subject_pending_accepted: ListDescriptor,
    pub subject_failed_accepted: ListDescriptor,
    pub monitor_failed_accepted: ListDescriptor,
    pub subject_pending_rejected: ListDescriptor,
    pub subject_terminate_pending: ListDescriptor,
    pub subject_terminate_accepted: ListDescriptor,
    pub message_listen_endpoint: ListDescriptor,
    /// Only populated (and only serialized) for `FORWARD_*` messages.
    pub lease_listen_endpoint: Option<ListDescriptor>,
}

impl MessageHeader {
    /// Fixed-size portion of the header, before the list descriptors.
    pub(crate) const FIXED_SIZE: usize = 60;

    /// Size of a V1 header (no indirect-lease descriptor): fixed part + the nine list
    /// descriptors + the message listen endpoint descriptor.
    pub const V1_SIZE: usize = Self::FIXED_SIZE + 10 * ListDescriptor::WIRE_SIZE;

    /// Size of a V2 header (`FORWARD_*` messages): V1 + one extra descriptor for the
    /// lease listen endpoint.
    pub const V2_SIZE: usize = Self::V1_SIZE + ListDescriptor::WIRE_SIZE;

    pub(crate) fn descriptors(&self) -> [&ListDescriptor; 9] {
        [
            &self.subject_pending,
            &self.subject_failed_pending,
            &self.monitor_failed_pending,
            &self.subject_pending_accepted,
            &self.subject_failed_accepted,
            &self.monitor_failed_accepted,
            &self.subject_pending_rejected,
            &self.subject_terminate_pending,
            &self.subject_terminate_accepted,
        ]
    }
}

/// A fully decoded (or to-be-encoded) lease message: header + body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseMessage {
    pub header: MessageHeader,
    pub sets: LeaseRelationshipSets,
    pub message_listen_endpoint: ListenEndpoint,
    /// Only present for `FORWARD_*` messages: the listen endpoint of the direct remote
    /// whose renewal is being forwarded.
    pub lease_listen_endpoint: Option<ListenEndpoint>,
    /// The extension: `remote_lease_agent_instance`, carried again outside the header
    /// for historical wire compatibility.
    pub extension_remote_lease_agent_instance: InstanceId,
}
