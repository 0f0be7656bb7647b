//! The lease state machine: [`Clock`], [`timer::TimerQueue`], [`remote_agent::RemoteLeaseAgent`],
//! [`agent::LeaseAgent`], arbitration, and indirect-lease forwarding.
//!
//! This crate has no opinion on how bytes reach a peer (see [`lease_transport::Transport`])
//! or on what an application or an arbitrator decides (see [`events::RegisteredApplication`],
//! [`events::Arbitrator`]); it only implements the lease lifecycle state machine.

pub mod agent;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod relationship;
pub mod remote_agent;
pub mod timer;

pub use agent::{LeaseAgent, RemoteAgentId};
pub use clock::Clock;
pub use config::LeaseConfig;
pub use error::Error;
pub use events::{ArbitrateEvent, ArbitrationOutcome, Arbitrator, RegisteredApplication};
pub use remote_agent::{Effect, RemoteAgentState, RemoteLeaseAgent};
pub use timer::{TimerId, TimerKind, TimerQueue};
