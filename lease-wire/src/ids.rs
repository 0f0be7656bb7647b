//! Strongly-typed identifiers used throughout the lease layer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Error;

/// Maximum number of UTF-16 code units (including the terminating NUL) allowed in a
/// lease relationship identifier string.
pub const MAX_PATH: usize = 260;

/// Maximum number of UTF-16 code units allowed in a listen endpoint address string.
pub const ENDPOINT_ADDR_CCH_MAX: usize = 256;

/// A 64-bit monotonically increasing value minted by the local process.
///
/// Used as lease-relationship identity, remote-lease-agent creation id, and message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// The zero instance, used to mean "inactive" for `subject_identifier` /
    /// `monitor_identifier`.
    pub const ZERO: InstanceId = InstanceId(0);

    /// Mint a fresh, process-unique instance id.
    pub fn next() -> InstanceId {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        InstanceId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether this instance id represents "inactive"/unset.
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// A validated, UTF-16-round-trippable lease application name.
///
/// Constructed only through [`ApplicationName::parse`], which enforces the validation
/// rules: null-terminated, even and positive UTF-16 byte count, length at most
/// [`MAX_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationName(String);

impl ApplicationName {
    /// Validate and wrap a UTF-8 application name as a lease identifier component.
    ///
    /// The `MAX_PATH` bound is applied to the *UTF-16* encoded length (including the
    /// implicit terminating NUL unit), matching the wire representation, not the UTF-8
    /// byte length.
    pub fn parse(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        let utf16_len = name.encode_utf16().count() + 1; // + terminating NUL
        if name.is_empty() {
            return Err(Error::InvalidParameter("application name must not be empty"));
        }
        if utf16_len > MAX_PATH {
            return Err(Error::InvalidParameter("application name exceeds MAX_PATH"));
        }
        if name.encode_utf16().any(|unit| unit == 0) {
            return Err(Error::InvalidParameter(
                "application name must not contain embedded NUL",
            ));
        }
        Ok(ApplicationName(name))
    }

    /// Borrow the validated name as a `str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lease relationship identifier: `(local_application, remote_application)`.
/// Equality is pairwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaseRelationshipId {
    pub local_application: ApplicationName,
    pub remote_application: ApplicationName,
}

impl LeaseRelationshipId {
    /// Build a new LRI from two already-validated application names.
    pub fn new(local_application: ApplicationName, remote_application: ApplicationName) -> Self {
        LeaseRelationshipId {
            local_application,
            remote_application,
        }
    }

    /// A pure helper returning a flipped view of this LRI (monitor/subject asymmetry).
    /// Never mutates the underlying LRI.
    pub fn flipped(&self) -> LeaseRelationshipId {
        LeaseRelationshipId {
            local_application: self.remote_application.clone(),
            remote_application: self.local_application.clone(),
        }
    }
}

/// Address family of a [`ListenEndpoint`], wire-round-trippable as a `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Unspecified,
    Inet,
    Inet6,
}

impl AddressFamily {
    pub(crate) fn to_wire(self) -> u16 {
        match self {
            AddressFamily::Unspecified => 0,
            AddressFamily::Inet => 2,
            AddressFamily::Inet6 => 23,
        }
    }

    pub(crate) fn from_wire(value: u16) -> Result<Self, Error> {
        match value {
            0 => Ok(AddressFamily::Unspecified),
            2 => Ok(AddressFamily::Inet),
            23 => Ok(AddressFamily::Inet6),
            _ => Err(Error::InvalidParameter("unrecognized address family on wire")),
        }
    }
}

/// A listen endpoint: `(address, address family, port)`, wire-round-trippable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenEndpoint {
    pub address: String,
    pub family: AddressFamily,
    pub port: u16,
}

impl ListenEndpoint {
    /// Validate an endpoint's address string length against
    /// [`ENDPOINT_ADDR_CCH_MAX`].
    pub fn validate(&self) -> Result<(), Error> {
        let utf16_len = self.address.encode_utf16().count() + 1;
        if utf16_len > ENDPOINT_ADDR_CCH_MAX {
            return Err(Error::InvalidParameter("listen endpoint address too long"));
        }
        Ok(())
    }
}
