//! An in-memory [`Transport`] used as the test double for `lease-core`'s integration
//! tests, analogous to how `kube-client`'s `mock_tests` module exercises the client
//! against a fake HTTP responder.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lease_wire::ListenEndpoint;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Error;
use crate::transport::Transport;

#[derive(Default)]
struct NetworkState {
    inboxes: HashMap<ListenEndpoint, mpsc::UnboundedSender<(ListenEndpoint, Bytes)>>,
    /// `(from, to)` pairs whose sends are silently dropped, for simulating a stalled
    /// direct path.
    severed: HashSet<(ListenEndpoint, ListenEndpoint)>,
}

/// A shared, in-process network that [`MemoryTransport`] instances bind to.
///
/// Cloning is cheap; all clones share the same routing table.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a new transport endpoint to this network, returning the transport and the
    /// inbox it receives `(sender, message)` pairs on.
    pub fn bind(&self, local: ListenEndpoint) -> (MemoryTransport, mpsc::UnboundedReceiver<(ListenEndpoint, Bytes)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().inboxes.insert(local.clone(), tx);
        (
            MemoryTransport {
                local,
                network: self.clone(),
            },
            rx,
        )
    }

    /// Make sends from `from` to `to` silently vanish, simulating a one-directional
    /// stall of the direct path.
    pub fn sever(&self, from: ListenEndpoint, to: ListenEndpoint) {
        self.state.lock().severed.insert((from, to));
    }

    /// Undo a previous [`Self::sever`].
    pub fn restore(&self, from: ListenEndpoint, to: ListenEndpoint) {
        self.state.lock().severed.remove(&(from, to));
    }
}

/// One endpoint's view of a [`MemoryNetwork`].
pub struct MemoryTransport {
    local: ListenEndpoint,
    network: MemoryNetwork,
}

#[async_trait]
impl Transport for MemoryTransport {
    #[tracing::instrument(skip(self, message), fields(from = %self.local.address, to = %target.address))]
    async fn send(&self, target: &ListenEndpoint, message: Bytes) -> Result<(), Error> {
        let state = self.network.state.lock();
        if state.severed.contains(&(self.local.clone(), target.clone())) {
            tracing::debug!("send severed, dropping");
            return Ok(());
        }
        match state.inboxes.get(target) {
            Some(inbox) => {
                let _ = inbox.send((self.local.clone(), message));
                Ok(())
            }
            None => Err(Error::UnknownPeer(target.address.clone())),
        }
    }

    fn is_active(&self, target: &ListenEndpoint) -> bool {
        self.network.state.lock().inboxes.contains_key(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lease_wire::AddressFamily;

    fn endpoint(addr: &str, port: u16) -> ListenEndpoint {
        ListenEndpoint {
            address: addr.into(),
            family: AddressFamily::Inet,
            port,
        }
    }

    #[tokio::test]
    async fn delivers_to_the_bound_inbox() {
        let network = MemoryNetwork::new();
        let (a, _a_rx) = network.bind(endpoint("a", 1));
        let (_b, mut b_rx) = network.bind(endpoint("b", 2));

        a.send(&endpoint("b", 2), Bytes::from_static(b"hi")).await.unwrap();
        let (from, msg) = b_rx.recv().await.unwrap();
        assert_eq!(from, endpoint("a", 1));
        assert_eq!(&msg[..], b"hi");
    }

    #[tokio::test]
    async fn unknown_peer_is_an_error() {
        let network = MemoryNetwork::new();
        let (a, _a_rx) = network.bind(endpoint("a", 1));
        let err = a.send(&endpoint("ghost", 9), Bytes::from_static(b"hi")).await;
        assert!(matches!(err, Err(Error::UnknownPeer(_))));
    }

    #[tokio::test]
    async fn severed_link_silently_drops() {
        let network = MemoryNetwork::new();
        let (a, _a_rx) = network.bind(endpoint("a", 1));
        let (_b, mut b_rx) = network.bind(endpoint("b", 2));
        network.sever(endpoint("a", 1), endpoint("b", 2));

        a.send(&endpoint("b", 2), Bytes::from_static(b"hi")).await.unwrap();
        assert!(b_rx.try_recv().is_err());
    }
}
