//! Bit-exact serialization/deserialization of lease messages.
//!
//! All integers are little-endian. Strings are UTF-16LE including a terminating NUL,
//! whose byte count (NUL included) is carried in the preceding `u32`.

use crate::error::Error;
use crate::ids::{AddressFamily, ApplicationName, InstanceId, LeaseRelationshipId, ListenEndpoint};
use crate::message::{
    LeaseMessage, LeaseRelationshipSets, ListDescriptor, MessageHeader, MessageType,
};

// --- primitive byte helpers -------------------------------------------------

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}
fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn get_u16(buf: &[u8], offset: usize) -> Result<u16, Error> {
    let bytes = buf
        .get(offset..offset + 2)
        .ok_or(Error::InvalidParameter("buffer too short for u16 field"))?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}
fn get_u32(buf: &[u8], offset: usize) -> Result<u32, Error> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or(Error::InvalidParameter("buffer too short for u32 field"))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
fn get_u64(buf: &[u8], offset: usize) -> Result<u64, Error> {
    let bytes = buf
        .get(offset..offset + 8)
        .ok_or(Error::InvalidParameter("buffer too short for u64 field"))?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(arr))
}

/// Encode a UTF-8 string as UTF-16LE with a terminating NUL unit, returning the raw
/// bytes (byte count included).
fn encode_utf16_nul(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2 + 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Decode a NUL-terminated UTF-16LE byte string, validating that the declared byte
/// count is even, positive, and that the terminator falls within it.
fn decode_utf16_nul(bytes: &[u8]) -> Result<String, Error> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return Err(Error::InvalidParameter(
            "identifier byte count must be even and positive",
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let nul_pos = units
        .iter()
        .position(|&u| u == 0)
        .ok_or(Error::InvalidParameter("identifier is not NUL-terminated"))?;
    String::from_utf16(&units[..nul_pos])
        .map_err(|_| Error::InvalidParameter("identifier is not valid UTF-16"))
}

fn encode_lri(buf: &mut Vec<u8>, lri: &LeaseRelationshipId) {
    let local = encode_utf16_nul(lri.local_application.as_str());
    let remote = encode_utf16_nul(lri.remote_application.as_str());
    put_u32(buf, local.len() as u32);
    buf.extend_from_slice(&local);
    put_u32(buf, remote.len() as u32);
    buf.extend_from_slice(&remote);
}

fn lri_encoded_size(lri: &LeaseRelationshipId) -> usize {
    4 + (lri.local_application.as_str().encode_utf16().count() + 1) * 2
        + 4
        + (lri.remote_application.as_str().encode_utf16().count() + 1) * 2
}

/// Encode one of the nine LRI lists: `u32 total_size, u32 element_count, element*`.
fn encode_lri_list(buf: &mut Vec<u8>, list: &[LeaseRelationshipId]) {
    let total_size: usize = 8 + list.iter().map(lri_encoded_size).sum::<usize>();
    put_u32(buf, total_size as u32);
    put_u32(buf, list.len() as u32);
    for lri in list {
        encode_lri(buf, lri);
    }
}

fn list_wire_size(list: &[LeaseRelationshipId]) -> u32 {
    (8 + list.iter().map(lri_encoded_size).sum::<usize>()) as u32
}

fn decode_lri_list(buf: &[u8], descriptor: &ListDescriptor) -> Result<Vec<LeaseRelationshipId>, Error> {
    let start = descriptor.start_offset as usize;
    let size = descriptor.size as usize;
    let body = buf
        .get(start..start + size)
        .ok_or(Error::InvalidParameter("list descriptor out of range"))?;
    if size < 8 {
        return Err(Error::InvalidParameter("list too small to hold its own header"));
    }
    let declared_total = get_u32(body, 0)? as usize;
    if declared_total != size {
        return Err(Error::InvalidParameter(
            "list total_size does not match descriptor size",
        ));
    }
    let count = get_u32(body, 4)? as usize;
    let mut cursor = 8usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let local_len = get_u32(body, cursor)? as usize;
        cursor += 4;
        let local_bytes = body
            .get(cursor..cursor + local_len)
            .ok_or(Error::InvalidParameter("lri local name out of range"))?;
        cursor += local_len;
        let remote_len = get_u32(body, cursor)? as usize;
        cursor += 4;
        let remote_bytes = body
            .get(cursor..cursor + remote_len)
            .ok_or(Error::InvalidParameter("lri remote name out of range"))?;
        cursor += remote_len;

        let local = ApplicationName::parse(decode_utf16_nul(local_bytes)?)?;
        let remote = ApplicationName::parse(decode_utf16_nul(remote_bytes)?)?;
        out.push(LeaseRelationshipId::new(local, remote));
    }
    if cursor != size {
        return Err(Error::InvalidParameter("list body has trailing garbage"));
    }
    Ok(out)
}

fn encode_listen_endpoint(buf: &mut Vec<u8>, endpoint: &ListenEndpoint) {
    let addr = encode_utf16_nul(&endpoint.address);
    buf.extend_from_slice(&addr);
    put_u16(buf, endpoint.family.to_wire());
    put_u16(buf, endpoint.port);
}

fn listen_endpoint_wire_size(endpoint: &ListenEndpoint) -> u32 {
    ((endpoint.address.encode_utf16().count() + 1) * 2 + 2 + 2) as u32
}

fn decode_listen_endpoint(buf: &[u8], descriptor: &ListDescriptor) -> Result<ListenEndpoint, Error> {
    let start = descriptor.start_offset as usize;
    let size = descriptor.size as usize;
    if size < 4 {
        return Err(Error::InvalidParameter("listen endpoint descriptor too small"));
    }
    let body = buf
        .get(start..start + size)
        .ok_or(Error::InvalidParameter("listen endpoint descriptor out of range"))?;
    let addr_len = size - 4;
    let address = decode_utf16_nul(&body[..addr_len])?;
    let family = AddressFamily::from_wire(get_u16(body, addr_len)?)?;
    let port = get_u16(body, addr_len + 2)?;
    let endpoint = ListenEndpoint {
        address,
        family,
        port,
    };
    endpoint.validate()?;
    Ok(endpoint)
}

/// Serialize a [`LeaseMessage`] to its wire representation.
///
/// Guarantees `serialize(m).len() == header.message_size`: the header's size fields
/// are (re)computed from the message's actual content, not trusted from the caller, so
/// callers only need to set the semantic fields and can leave descriptors default.
pub fn serialize(message: &LeaseMessage) -> Result<Vec<u8>, Error> {
    let is_indirect = message.header.message_type.is_indirect();
    if is_indirect != message.lease_listen_endpoint.is_some() {
        return Err(Error::InvalidParameter(
            "lease listen endpoint must be present iff message type is FORWARD_*",
        ));
    }

    let header_size = if is_indirect {
        MessageHeader::V2_SIZE
    } else {
        MessageHeader::V1_SIZE
    };

    let lists = message.sets.as_array();
    let list_sizes: Vec<u32> = lists.iter().map(|l| list_wire_size(l)).collect();
    let message_listen_endpoint_size = listen_endpoint_wire_size(&message.message_listen_endpoint);
    let lease_listen_endpoint_size = message
        .lease_listen_endpoint
        .as_ref()
        .map(listen_endpoint_wire_size);

    let mut offset = header_size as u32;
    let mut offsets = [0u32; 9];
    for (i, size) in list_sizes.iter().enumerate() {
        offsets[i] = offset;
        offset += size;
    }
    let message_listen_endpoint_offset = offset;
    offset += message_listen_endpoint_size;
    let lease_listen_endpoint_offset = offset;
    if let Some(size) = lease_listen_endpoint_size {
        offset += size;
    }
    let extension_offset = offset;
    let extension_size = 8u32; // u64 remote_lease_agent_instance
    let message_size = extension_offset + extension_size;

    let mut descriptors: Vec<ListDescriptor> = Vec::with_capacity(9);
    for i in 0..9 {
        descriptors.push(ListDescriptor {
            size: list_sizes[i],
            count: lists[i].len() as u32,
            start_offset: offsets[i],
        });
    }

    let mut buf = Vec::with_capacity(message_size as usize);
    let h = &message.header;
    put_u16(&mut buf, h.major_version);
    put_u16(&mut buf, h.minor_version);
    put_u32(&mut buf, header_size as u32);
    put_u32(&mut buf, message_size);
    put_u64(&mut buf, h.lease_instance.0);
    put_u64(&mut buf, h.remote_lease_agent_instance.0);
    put_u32(&mut buf, h.duration_ms);
    put_u64(&mut buf, h.expiration);
    put_u32(&mut buf, h.suspend_duration_ms);
    put_u32(&mut buf, h.arbitration_duration_ms);
    buf.push(u8::from(h.is_two_way_termination));
    buf.push(h.message_type as u8);
    put_u16(&mut buf, 0); // reserved
    put_u64(&mut buf, h.message_identifier.0);
    for d in &descriptors {
        put_u32(&mut buf, d.size);
        put_u32(&mut buf, d.count);
        put_u32(&mut buf, d.start_offset);
    }
    let message_listen_endpoint_descriptor = ListDescriptor {
        size: message_listen_endpoint_size,
        count: 1,
        start_offset: message_listen_endpoint_offset,
    };
    if is_indirect {
        let lease_listen_endpoint_descriptor = ListDescriptor {
            size: lease_listen_endpoint_size.unwrap_or(0),
            count: 1,
            start_offset: lease_listen_endpoint_offset,
        };
        put_u32(&mut buf, message_listen_endpoint_descriptor.size);
        put_u32(&mut buf, message_listen_endpoint_descriptor.count);
        put_u32(&mut buf, message_listen_endpoint_descriptor.start_offset);
        put_u32(&mut buf, lease_listen_endpoint_descriptor.size);
        put_u32(&mut buf, lease_listen_endpoint_descriptor.count);
        put_u32(&mut buf, lease_listen_endpoint_descriptor.start_offset);
    } else {
        put_u32(&mut buf, message_listen_endpoint_descriptor.size);
        put_u32(&mut buf, message_listen_endpoint_descriptor.count);
        put_u32(&mut buf, message_listen_endpoint_descriptor.start_offset);
    }

    debug_assert_eq!(buf.len(), header_size);

    for list in &lists {
        encode_lri_list(&mut buf, list);
    }
    encode_listen_endpoint(&mut buf, &message.message_listen_endpoint);
    if let Some(endpoint) = &message.lease_listen_endpoint {
        encode_listen_endpoint(&mut buf, endpoint);
    }
    put_u64(&mut buf, message.extension_remote_lease_agent_instance.0);

    debug_assert_eq!(buf.len(), message_size as usize);
    Ok(buf)
}

/// Validate a body descriptor: it must lie strictly inside the body (after the header,
/// before the message end) and must not be large enough to swallow the whole body (a
/// degenerate "covers everything" descriptor is rejected the same way
/// `IsValidBodyDescriptor` rejects it).
fn validate_body_descriptor(d: &ListDescriptor, header_size: u32, message_size: u32) -> Result<(), Error> {
    if d.start_offset < header_size {
        return Err(Error::InvalidParameter("descriptor overlaps header"));
    }
    if d.start_offset >= message_size {
        return Err(Error::InvalidParameter("descriptor starts past message end"));
    }
    if d.start_offset.checked_add(d.size).map_or(true, |end| end > message_size) {
        return Err(Error::InvalidParameter("descriptor extends past message end"));
    }
    if d.size >= message_size.saturating_sub(header_size) {
        return Err(Error::InvalidParameter("descriptor spans the whole body"));
    }
    Ok(())
}

/// Deserialize a wire buffer into a [`LeaseMessage`], applying every validation rule.
/// Buffers violating any rule fail with [`Error::InvalidParameter`]; the message is
/// never partially applied.
pub fn deserialize(buf: &[u8]) -> Result<LeaseMessage, Error> {
    if buf.len() < MessageHeader::FIXED_SIZE + 10 * ListDescriptor::WIRE_SIZE {
        return Err(Error::InvalidParameter("buffer shorter than minimum header"));
    }

    let major_version = get_u16(buf, 0)?;
    let minor_version = get_u16(buf, 2)?;
    let header_size = get_u32(buf, 4)?;
    let message_size = get_u32(buf, 8)?;
    let lease_instance = InstanceId(get_u64(buf, 12)?);
    let remote_lease_agent_instance = InstanceId(get_u64(buf, 20)?);
    let duration_ms = get_u32(buf, 28)?;
    let expiration = get_u64(buf, 32)?;
    let suspend_duration_ms = get_u32(buf, 40)?;
    let arbitration_duration_ms = get_u32(buf, 44)?;
    let is_two_way_termination = match buf[48] {
        0 => false,
        1 => true,
        _ => return Err(Error::InvalidParameter("two-way-termination flag must be 0 or 1")),
    };
    let message_type =
        MessageType::from_wire(buf[49]).ok_or(Error::InvalidParameter("unrecognized message type"))?;
    let message_identifier = InstanceId(get_u64(buf, 52)?);

    if message_size as usize > buf.len() {
        return Err(Error::InvalidParameter("declared message_size exceeds buffer"));
    }
    if header_size == 0 || header_size >= message_size {
        return Err(Error::InvalidParameter("header_size must be in (0, message_size)"));
    }
    let expected_header_size = if message_type.is_indirect() {
        MessageHeader::V2_SIZE as u32
    } else {
        MessageHeader::V1_SIZE as u32
    };
    if header_size != expected_header_size {
        return Err(Error::InvalidParameter(
            "header_size does not match the V1/V2 size for this message type",
        ));
    }
    if !message_type.is_ping() {
        if duration_ms == 0 {
            return Err(Error::InvalidParameter("duration must be valid for non-ping messages"));
        }
        if lease_instance.is_zero() {
            return Err(Error::InvalidParameter(
                "lease_instance must be > 0 for non-ping messages",
            ));
        }
    }

    let mut descriptors = [ListDescriptor::default(); 9];
    let mut cursor = MessageHeader::FIXED_SIZE;
    for d in &mut descriptors {
        d.size = get_u32(buf, cursor)?;
        d.count = get_u32(buf, cursor + 4)?;
        d.start_offset = get_u32(buf, cursor + 8)?;
        cursor += ListDescriptor::WIRE_SIZE;
    }
    let message_listen_endpoint_descriptor = ListDescriptor {
        size: get_u32(buf, cursor)?,
        count: get_u32(buf, cursor + 4)?,
        start_offset: get_u32(buf, cursor + 8)?,
    };
    cursor += ListDescriptor::WIRE_SIZE;
    let lease_listen_endpoint_descriptor = if message_type.is_indirect() {
        let d = ListDescriptor {
            size: get_u32(buf, cursor)?,
            count: get_u32(buf, cursor + 4)?,
            start_offset: get_u32(buf, cursor + 8)?,
        };
        Some(d)
    } else {
        None
    };

    for d in descriptors
        .iter()
        .chain(std::iter::once(&message_listen_endpoint_descriptor))
        .chain(lease_listen_endpoint_descriptor.iter())
    {
        validate_body_descriptor(d, header_size, message_size)?;
    }
    // Descriptors must not overlap one another.
    let mut spans: Vec<(u32, u32)> = descriptors
        .iter()
        .chain(std::iter::once(&message_listen_endpoint_descriptor))
        .chain(lease_listen_endpoint_descriptor.iter())
        .map(|d| (d.start_offset, d.start_offset + d.size))
        .collect();
    spans.sort_unstable();
    for pair in spans.windows(2) {
        if pair[0].1 > pair[1].0 {
            return Err(Error::InvalidParameter("body descriptors overlap"));
        }
    }

    let body = &buf[..message_size as usize];
    let sets = LeaseRelationshipSets {
        subject_pending: decode_lri_list(body, &descriptors[0])?,
        subject_failed_pending: decode_lri_list(body, &descriptors[1])?,
        monitor_failed_pending: decode_lri_list(body, &descriptors[2])?,
        subject_pending_accepted: decode_lri_list(body, &descriptors[3])?,
        subject_failed_accepted: decode_lri_list(body, &descriptors[4])?,
        monitor_failed_accepted: decode_lri_list(body, &descriptors[5])?,
        subject_pending_rejected: decode_lri_list(body, &descriptors[6])?,
        subject_terminate_pending: decode_lri_list(body, &descriptors[7])?,
        subject_terminate_accepted: decode_lri_list(body, &descriptors[8])?,
    };
    let message_listen_endpoint = decode_listen_endpoint(body, &message_listen_endpoint_descriptor)?;
    let lease_listen_endpoint = lease_listen_endpoint_descriptor
        .as_ref()
        .map(|d| decode_listen_endpoint(body, d))
        .transpose()?;

    let extension_offset = message_size as usize - 8;
    let extension_remote_lease_agent_instance = InstanceId(get_u64(body, extension_offset)?);

    let header = MessageHeader {
        major_version,
        minor_version,
        header_size,
        message_size,
        lease_instance,
        remote_lease_agent_instance,
        duration_ms,
        expiration,
        suspend_duration_ms,
        arbitration_duration_ms,
        is_two_way_termination,
        message_type,
        message_identifier,
        subject_pending: descriptors[0],
        subject_failed_pending: descriptors[1],
        monitor_failed_pending: descriptors[2],
        subject_pending_accepted: descriptors[3],
        subject_failed_accepted: descriptors[4],
        monitor_failed_accepted: descriptors[5],
        subject_pending_rejected: descriptors[6],
        subject_terminate_pending: descriptors[7],
        subject_terminate_accepted: descriptors[8],
        message_listen_endpoint: message_listen_endpoint_descriptor,
        lease_listen_endpoint: lease_listen_endpoint_descriptor,
    };

    Ok(LeaseMessage {
        header,
        sets,
        message_listen_endpoint,
        lease_listen_endpoint,
        extension_remote_lease_agent_instance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ApplicationName;

    fn lri(local: &str, remote: &str) -> LeaseRelationshipId {
        LeaseRelationshipId::new(
            ApplicationName::parse(local).unwrap(),
            ApplicationName::parse(remote).unwrap(),
        )
    }

    fn sample_message(message_type: MessageType) -> LeaseMessage {
        let sets = LeaseRelationshipSets {
            subject_pending: vec![lri("fabric:/A", "fabric:/B")],
            subject_terminate_pending: vec![lri("fabric:/C", "fabric:/D")],
            ..Default::default()
        };
        let endpoint = ListenEndpoint {
            address: "10.0.0.1".into(),
            family: AddressFamily::Inet,
            port: 12345,
        };
        let lease_listen_endpoint = if message_type.is_indirect() {
            Some(ListenEndpoint {
                address: "10.0.0.2".into(),
                family: AddressFamily::Inet,
                port: 54321,
            })
        } else {
            None
        };
        let header_size = if message_type.is_indirect() {
            MessageHeader::V2_SIZE
        } else {
            MessageHeader::V1_SIZE
        } as u32;
        LeaseMessage {
            header: MessageHeader {
                major_version: crate::message::PROTOCOL_MAJOR_VERSION,
                minor_version: 1,
                header_size,
                message_size: 0,
                lease_instance: InstanceId::next(),
                remote_lease_agent_instance: InstanceId::next(),
                duration_ms: 1000,
                expiration: 123_456,
                suspend_duration_ms: 2000,
                arbitration_duration_ms: 3000,
                is_two_way_termination: false,
                message_type,
                message_identifier: InstanceId::next(),
                subject_pending: ListDescriptor::default(),
                subject_failed_pending: ListDescriptor::default(),
                monitor_failed_pending: ListDescriptor::default(),
                subject_pending_accepted: ListDescriptor::default(),
                subject_failed_accepted: ListDescriptor::default(),
                monitor_failed_accepted: ListDescriptor::default(),
                subject_pending_rejected: ListDescriptor::default(),
                subject_terminate_pending: ListDescriptor::default(),
                subject_terminate_accepted: ListDescriptor::default(),
                message_listen_endpoint: ListDescriptor::default(),
                lease_listen_endpoint: None,
            },
            sets,
            message_listen_endpoint: endpoint,
            lease_listen_endpoint,
            extension_remote_lease_agent_instance: InstanceId::next(),
        }
    }

    #[test]
    fn serialized_length_matches_header_message_size() {
        let msg = sample_message(MessageType::LeaseRequest);
        let bytes = serialize(&msg).unwrap();
        let decoded = deserialize(&bytes).unwrap();
        assert_eq!(bytes.len(), decoded.header.message_size as usize);
    }

    #[test]
    fn round_trip_preserves_sets_modulo_message_identifier() {
        let msg = sample_message(MessageType::LeaseRequest);
        let bytes = serialize(&msg).unwrap();
        let decoded = deserialize(&bytes).unwrap();
        assert_eq!(decoded.sets, msg.sets);
        assert_eq!(decoded.header.lease_instance, msg.header.lease_instance);
        assert_eq!(decoded.header.expiration, msg.header.expiration);
        assert_eq!(decoded.message_listen_endpoint, msg.message_listen_endpoint);
    }

    #[test]
    fn round_trip_forward_request_carries_lease_listen_endpoint() {
        let msg = sample_message(MessageType::ForwardRequest);
        let bytes = serialize(&msg).unwrap();
        let decoded = deserialize(&bytes).unwrap();
        assert_eq!(decoded.lease_listen_endpoint, msg.lease_listen_endpoint);
        assert_eq!(decoded.header.header_size as usize, MessageHeader::V2_SIZE);
    }

    #[test]
    fn non_indirect_message_uses_v1_header_size() {
        let msg = sample_message(MessageType::LeaseRequest);
        let bytes = serialize(&msg).unwrap();
        assert_eq!(
            get_u32(&bytes, 4).unwrap() as usize,
            MessageHeader::V1_SIZE,
            "non-indirect messages must use the smaller V1 header for wire compatibility"
        );
    }

    #[test]
    fn empty_list_round_trips() {
        let mut msg = sample_message(MessageType::LeaseRequest);
        msg.sets = LeaseRelationshipSets::default();
        let bytes = serialize(&msg).unwrap();
        let decoded = deserialize(&bytes).unwrap();
        assert!(decoded.sets.subject_pending.is_empty());
    }

    #[test]
    fn ping_message_skips_duration_and_instance_checks() {
        let mut msg = sample_message(MessageType::PingRequest);
        msg.header.duration_ms = 0;
        msg.header.lease_instance = InstanceId::ZERO;
        let bytes = serialize(&msg).unwrap();
        assert!(deserialize(&bytes).is_ok());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let msg = sample_message(MessageType::LeaseRequest);
        let bytes = serialize(&msg).unwrap();
        let truncated = &bytes[..bytes.len() - 4];
        assert!(deserialize(truncated).is_err());
    }

    #[test]
    fn oversized_declared_message_size_is_rejected() {
        let msg = sample_message(MessageType::LeaseRequest);
        let mut bytes = serialize(&msg).unwrap();
        let huge = (bytes.len() as u32) + 1_000_000;
        bytes[8..12].copy_from_slice(&huge.to_le_bytes());
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn descriptor_overlapping_header_is_rejected() {
        let msg = sample_message(MessageType::LeaseRequest);
        let mut bytes = serialize(&msg).unwrap();
        // Corrupt the first descriptor's start_offset to point inside the header.
        bytes[MessageHeader::FIXED_SIZE + 8..MessageHeader::FIXED_SIZE + 12].copy_from_slice(&0u32.to_le_bytes());
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn zero_duration_non_ping_is_rejected() {
        let mut msg = sample_message(MessageType::LeaseRequest);
        msg.header.duration_ms = 0;
        let bytes = serialize(&msg).unwrap();
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn zero_lease_instance_non_ping_is_rejected() {
        let mut msg = sample_message(MessageType::LeaseRequest);
        msg.header.lease_instance = InstanceId::ZERO;
        let bytes = serialize(&msg).unwrap();
        assert!(deserialize(&bytes).is_err());
    }
}
