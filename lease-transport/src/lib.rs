//! The `Transport` collaborator: reliable ordered delivery of opaque lease-wire buffers
//! to a named peer. This crate only pins down the interface `lease-core` drives; an
//! in-memory implementation is provided for tests and examples.

pub mod error;
pub mod memory;
pub mod transport;

pub use error::Error;
pub use memory::{MemoryNetwork, MemoryTransport};
pub use transport::Transport;
