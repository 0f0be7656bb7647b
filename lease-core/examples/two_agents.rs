//! Establishes a two-way lease between two in-memory lease agents and prints the
//! relationship state as it comes up, mirroring the shape of the teacher workspace's
//! own `examples/elector.rs` demo (acquire, observe, release).
//!
//! Run with `cargo run -p lease-core --example two_agents`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lease_core::events::{ArbitrateEvent, RegisteredApplication};
use lease_core::{LeaseAgent, LeaseConfig};
use lease_transport::MemoryNetwork;
use lease_wire::{AddressFamily, ApplicationName, ListenEndpoint};

struct LoggingApplication;

#[async_trait]
impl RegisteredApplication for LoggingApplication {
    async fn on_remote_expired(&self, local_id: &ApplicationName, remote_id: &ApplicationName) {
        tracing::info!(%local_id, %remote_id, "remote application expired");
    }

    async fn on_arbitrate(&self, event: ArbitrateEvent) {
        tracing::info!(?event, "arbitration requested");
    }
}

fn endpoint(addr: &str, port: u16) -> ListenEndpoint {
    ListenEndpoint {
        address: addr.into(),
        family: AddressFamily::Inet,
        port,
    }
}

#[tokio::main]
async fn main() {
    std::env::set_var("RUST_LOG", "info,lease_core=debug");
    tracing_subscriber::fmt::init();

    let network = MemoryNetwork::new();
    let (transport_a, _rx_a) = network.bind(endpoint("a", 4231));
    let (transport_b, mut rx_b) = network.bind(endpoint("b", 4232));

    let config = LeaseConfig {
        duration: Duration::from_millis(500),
        ..LeaseConfig::default()
    };
    let mut a = LeaseAgent::new(endpoint("a", 4231), config, Arc::new(transport_a)).unwrap();
    let mut b = LeaseAgent::new(endpoint("b", 4232), config, Arc::new(transport_b)).unwrap();
    a.register_application(ApplicationName::parse("app-a").unwrap(), Arc::new(LoggingApplication));
    b.register_application(ApplicationName::parse("app-b").unwrap(), Arc::new(LoggingApplication));

    a.establish(
        ApplicationName::parse("app-a").unwrap(),
        ApplicationName::parse("app-b").unwrap(),
        "B",
        endpoint("b", 4232),
    )
    .await;

    // Manually pump B's inbox through `on_message` for a few rounds to bring the
    // reverse direction up, since this demo has no real transport task driving it.
    for _ in 0..4 {
        tokio::select! {
            Some((from, bytes)) = rx_b.recv() => {
                let msg = lease_wire::deserialize(&bytes).unwrap();
                tracing::info!(%from, kind = ?msg.header.message_type, "B received message");
                b.on_message("A", msg).await;
            }
            _ = tokio::time::sleep(Duration::from_millis(50)) => break,
        }
    }

    tracing::info!("demo complete");
}
