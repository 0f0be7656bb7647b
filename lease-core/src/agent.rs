//! The lease agent: an arena of [`RemoteLeaseAgent`]s, the registered-application set,
//! the shared [`TimerQueue`], and the single dispatch loop that drives all of it.
//!
//! Nothing here is `Sync`. Every mutating method takes `&mut self`; the owning task is
//! the lease agent's single dispatcher, so no lock is needed because nothing else ever
//! reaches this state concurrently. `establish`/`on_message`/`tick` all eventually call
//! into [`RemoteLeaseAgent`] methods and apply the [`Effect`]s they return.

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use lease_transport::Transport;
use lease_wire::{ApplicationName, InstanceId, LeaseMessage, LeaseRelationshipId, ListenEndpoint, MessageType};

use crate::clock::{Clock, Ticks};
use crate::config::LeaseConfig;
use crate::error::Error;
use crate::events::{ArbitrateEvent, Arbitrator, RegisteredApplication};
use crate::remote_agent::{ArbitrationRequest, Effect, RemoteAgentState, RemoteLeaseAgent};
use crate::timer::{TimerId, TimerKind, TimerQueue};

/// Stable handle into a [`LeaseAgent`]'s remote-lease-agent arena: a plain integer, not
/// a pointer, so a [`TimerId`] can outlive any particular reference into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteAgentId(pub usize);

/// Aggregates every remote lease agent for one local endpoint. Owns the
/// registered-application set and the delayed-failure timer.
pub struct LeaseAgent {
    local_listen_endpoint: ListenEndpoint,
    instance: InstanceId,
    config: LeaseConfig,
    clock: Clock,
    transport: Arc<dyn Transport>,
    arbitrator: Option<Arc<dyn Arbitrator>>,
    applications: HashMap<ApplicationName, Arc<dyn RegisteredApplication>>,
    remotes: HashMap<RemoteAgentId, RemoteLeaseAgent>,
    by_identifier: HashMap<String, RemoteAgentId>,
    next_id: usize,
    timers: TimerQueue<TimerId>,
    delayed_failure_deadline: Option<Ticks>,
    failed: bool,
}

impl LeaseAgent {
    pub fn new(
        local_listen_endpoint: ListenEndpoint,
        config: LeaseConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let config = config.validate()?;
        Ok(LeaseAgent {
            local_listen_endpoint,
            instance: InstanceId::next(),
            config,
            clock: Clock::new(),
            transport,
            arbitrator: None,
            applications: HashMap::new(),
            remotes: HashMap::new(),
            by_identifier: HashMap::new(),
            next_id: 0,
            timers: TimerQueue::new(),
            delayed_failure_deadline: None,
            failed: false,
        })
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn local_listen_endpoint(&self) -> &ListenEndpoint {
        &self.local_listen_endpoint
    }

    pub fn set_arbitrator(&mut self, arbitrator: Arc<dyn Arbitrator>) {
        self.arbitrator = Some(arbitrator);
    }

    pub fn register_application(&mut self, name: ApplicationName, app: Arc<dyn RegisteredApplication>) {
        self.applications.insert(name, app);
    }

    pub fn unregister_application(&mut self, name: &ApplicationName) {
        self.applications.remove(name);
    }

    fn remote_id_for(&mut self, remote_identifier: &str, remote_endpoint: &ListenEndpoint) -> RemoteAgentId {
        if let Some(id) = self.by_identifier.get(remote_identifier) {
            return *id;
        }
        let id = RemoteAgentId(self.next_id);
        self.next_id += 1;
        let remote = RemoteLeaseAgent::new(remote_identifier.to_string(), remote_endpoint.clone(), &self.config);
        self.remotes.insert(id, remote);
        self.by_identifier.insert(remote_identifier.to_string(), id);
        id
    }

    /// Establish the subject side of `(local, remote)` toward `remote_identifier`.
    pub async fn establish(
        &mut self,
        local: ApplicationName,
        remote: ApplicationName,
        remote_identifier: &str,
        remote_endpoint: ListenEndpoint,
    ) {
        let id = self.remote_id_for(remote_identifier, &remote_endpoint);
        let lri = LeaseRelationshipId::new(local, remote);
        let effects = {
            let remote_agent = self.remotes.get_mut(&id).expect("just inserted");
            remote_agent.establish(lri, &self.clock, &self.config, &self.local_listen_endpoint)
        };
        self.apply_effects(id, effects).await;
    }

    /// Prime a relationship with a one-way ping before any real LRI exists.
    pub async fn start_ping(&mut self, remote_identifier: &str, remote_endpoint: ListenEndpoint) {
        let id = self.remote_id_for(remote_identifier, &remote_endpoint);
        let effects = {
            let remote_agent = self.remotes.get_mut(&id).expect("just inserted");
            remote_agent.start_ping(&self.clock, &self.config, &self.local_listen_endpoint)
        };
        self.apply_effects(id, effects).await;
    }

    pub async fn terminate_subject_lease(
        &mut self,
        remote_identifier: &str,
        lri: &LeaseRelationshipId,
        is_subject_failed: bool,
    ) {
        let Some(&id) = self.by_identifier.get(remote_identifier) else {
            return;
        };
        let effects = {
            let remote_agent = self.remotes.get_mut(&id).expect("looked up by_identifier");
            remote_agent.terminate_subject_lease(lri, is_subject_failed, &self.local_listen_endpoint)
        };
        self.apply_effects(id, effects).await;
    }

    pub fn terminate_monitor_lease(&mut self, remote_identifier: &str, lri: &LeaseRelationshipId) {
        if let Some(&id) = self.by_identifier.get(remote_identifier) {
            if let Some(remote_agent) = self.remotes.get_mut(&id) {
                remote_agent.terminate_monitor_lease(lri);
            }
        }
    }

    /// Dispatch a decoded incoming message to its owning remote lease agent, creating
    /// one if this is the first time this peer is heard from.
    pub async fn on_message(&mut self, remote_identifier: &str, msg: LeaseMessage) {
        let id = self.remote_id_for(remote_identifier, &msg.message_listen_endpoint);
        let effects = match msg.header.message_type {
            MessageType::LeaseRequest | MessageType::ForwardRequest => {
                let remote_agent = self.remotes.get_mut(&id).expect("just inserted");
                remote_agent.on_lease_request(&msg, &self.clock, &self.config, &self.local_listen_endpoint)
            }
            MessageType::LeaseResponse | MessageType::ForwardResponse => {
                let remote_agent = self.remotes.get_mut(&id).expect("just inserted");
                remote_agent.on_lease_response();
                Vec::new()
            }
            MessageType::PingResponse => {
                let remote_agent = self.remotes.get_mut(&id).expect("just inserted");
                remote_agent.on_ping_response(&msg)
            }
            MessageType::PingRequest | MessageType::RelayRequest | MessageType::RelayResponse => Vec::new(),
        };
        self.apply_effects(id, effects).await;
    }

    /// Feed an arbitration result back into the remote lease agent that requested it.
    pub async fn arbitrate_lease(
        &mut self,
        remote_identifier: &str,
        local_ttl_ms: Option<u64>,
        remote_ttl_ms: Option<u64>,
        is_delayed: bool,
    ) {
        let Some(&id) = self.by_identifier.get(remote_identifier) else {
            return;
        };
        let effects = {
            let remote_agent = self.remotes.get_mut(&id).expect("looked up by_identifier");
            remote_agent.arbitrate_lease(local_ttl_ms, remote_ttl_ms, is_delayed, &self.clock, &self.config)
        };
        self.apply_effects(id, effects).await;
    }

    async fn apply_effects(&mut self, id: RemoteAgentId, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmTimer(kind, deadline) => self.timers.arm(TimerId::new(id, kind), deadline, &self.clock),
                Effect::CancelTimer(kind) => {
                    self.timers.dequeue(&TimerId::new(id, kind));
                }
                Effect::SendMessage(msg) => self.send(id, msg).await,
                Effect::EmitRemoteExpired { local, remote } => {
                    if let Some(app) = self.applications.get(&local).cloned() {
                        app.on_remote_expired(&local, &remote).await;
                    }
                }
                Effect::EmitPreArbitration { local, remote } => {
                    if let Some(app) = self.applications.get(&local).cloned() {
                        app.on_pre_arbitration(&local, &remote).await;
                    }
                }
                Effect::RequestArbitration(req) => self.start_arbitration(id, req).await,
                Effect::ForwardRenewal => self.forward_renewal(id).await,
                Effect::AgentFailed => self.on_remote_agent_failed(id),
            }
        }
    }

    async fn send(&mut self, id: RemoteAgentId, msg: LeaseMessage) {
        let Some(endpoint) = self.remotes.get(&id).map(|r| r.remote_socket_address.clone()) else {
            return;
        };
        match lease_wire::serialize(&msg) {
            Ok(bytes) => match self.transport.send(&endpoint, bytes.into()).await {
                Ok(()) => {
                    if let Some(remote_agent) = self.remotes.get_mut(&id) {
                        remote_agent.mark_message_sent();
                    }
                }
                Err(err) => {
                    // Dropped; the next timer fire retries.
                    tracing::warn!(error = %err, "lease message send failed, next timer will retry");
                }
            },
            Err(err) => tracing::error!(error = %err, "failed to serialize outgoing lease message"),
        }
    }

    async fn start_arbitration(&mut self, id: RemoteAgentId, req: ArbitrationRequest) {
        let candidate = req.monitor_id.clone().or_else(|| req.subject_id.clone());
        let app = candidate.as_ref().and_then(|name| self.applications.get(name)).cloned();
        let enabled = app.as_ref().map(|a| a.is_arbitration_enabled()).unwrap_or(false);

        let Some(arbitrator) = self.arbitrator.clone().filter(|_| enabled) else {
            if let Some(remote_agent) = self.remotes.get_mut(&id) {
                let effects = remote_agent.lose_arbitration_no_application(&self.clock);
                self.apply_effects(id, effects).await;
            }
            return;
        };
        let Some(local_id) = candidate else {
            return;
        };
        let event = ArbitrateEvent {
            local_id,
            remote_endpoint: req.remote_endpoint,
            monitor_ttl_ms: req.monitor_ttl_ms,
            subject_ttl_ms: req.subject_ttl_ms,
            local_instance: req.local_instance,
            remote_instance: req.remote_instance,
            remote_version: req.remote_version,
            monitor_id: req.monitor_id,
            subject_id: req.subject_id,
            remote_arbitration_duration_upper_bound_ms: req.remote_arbitration_duration_upper_bound_ms,
        };
        if let Some(app) = app {
            app.on_arbitrate(event.clone()).await;
        }
        let outcome = arbitrator.arbitrate(event).await;
        if let Some(remote_agent) = self.remotes.get_mut(&id) {
            let effects = remote_agent.arbitrate_lease(
                outcome.local_ttl_ms,
                outcome.remote_ttl_ms,
                outcome.is_delayed,
                &self.clock,
                &self.config,
            );
            self.apply_effects(id, effects).await;
        }
    }

    /// Fan a stalled renewal out to every other active, OPEN, two-way-active remote
    /// lease agent.
    async fn forward_renewal(&mut self, id: RemoteAgentId) {
        let Some(msg) = self
            .remotes
            .get(&id)
            .map(|r| r.build_forward_request(r.remote_socket_address.clone(), &self.local_listen_endpoint))
        else {
            return;
        };
        let neighbors: Vec<RemoteAgentId> = self
            .remotes
            .iter()
            .filter(|(neighbor_id, r)| {
                **neighbor_id != id
                    && r.state == RemoteAgentState::Open
                    && r.is_active
                    && r.relationship.subject_state.is_active()
                    && r.relationship.monitor_state.is_active()
            })
            .map(|(neighbor_id, _)| *neighbor_id)
            .collect();
        // `indirect_lease_count` belongs to the stalled direct relationship (`id`), not
        // to whichever neighbors happen to carry this round's forward. It caps how
        // many consecutive retry ticks the direct renewal gets forwarded at all.
        if let Some(remote_agent) = self.remotes.get_mut(&id) {
            remote_agent.relationship.indirect_lease_count += 1;
        }
        for neighbor in neighbors {
            self.send(neighbor, msg.clone()).await;
        }
    }

    /// Whether every remote lease agent has reached FAILED.
    pub fn can_be_failed(&self) -> bool {
        !self.remotes.is_empty() && self.remotes.values().all(|r| r.state == RemoteAgentState::Failed)
    }

    fn on_remote_agent_failed(&mut self, _id: RemoteAgentId) {
        if self.failed || self.delayed_failure_deadline.is_some() || !self.can_be_failed() {
            // A second failure before the delayed-failure timer fires is ignored.
            return;
        }
        let max_ttl_ms = self.applications.values().map(|a| a.application_ttl_ms()).max().unwrap_or(0);
        let cap_ms = self.config.lease_suspend_duration.as_millis() as u64;
        let clamped_ms = max_ttl_ms.min(cap_ms);
        if clamped_ms == 0 {
            self.mark_lease_agent_failed();
        } else {
            let deadline = self.clock.deadline(Duration::from_millis(clamped_ms));
            self.delayed_failure_deadline = Some(deadline);
            self.timers.arm(TimerId::agent_level(TimerKind::DelayedFailure), deadline, &self.clock);
        }
    }

    fn mark_lease_agent_failed(&mut self) {
        self.failed = true;
        self.timers.dequeue(&TimerId::agent_level(TimerKind::DelayedFailure));
    }

    /// True once this lease agent is FAILED and ready for deallocation. The
    /// transport-closed and application-unregistration conditions are the caller's to
    /// check, since both live outside this crate's boundary.
    pub fn is_ready_for_deallocation(&self) -> bool {
        self.failed
    }

    /// Drive the next armed timer to completion. Never resolves once nothing is armed;
    /// callers race this against external input (new messages, new establish calls) in
    /// a `select!`.
    pub async fn tick(&mut self) -> Option<TimerId> {
        let fired = self.timers.next_expired().await?;
        match fired.remote {
            None => {
                if fired.kind == TimerKind::DelayedFailure {
                    self.mark_lease_agent_failed();
                    let apps = self.applications.clone();
                    for remote_agent in self.remotes.values() {
                        for lri in remote_agent.subject_set.iter().chain(remote_agent.monitor_set.iter()) {
                            if let Some(app) = apps.get(&lri.local_application) {
                                app.on_remote_expired(&lri.local_application, &lri.remote_application).await;
                            }
                        }
                    }
                }
            }
            Some(id) => {
                let effects = match fired.kind {
                    TimerKind::SubjectExpired => self
                        .remotes
                        .get_mut(&id)
                        .map(|r| r.on_subject_expired(&self.clock, &self.config, &self.local_listen_endpoint)),
                    TimerKind::MonitorExpired => {
                        self.remotes.get_mut(&id).map(|r| r.on_monitor_expired(&self.clock, &self.config))
                    }
                    TimerKind::RenewOrArbitrate => self
                        .remotes
                        .get_mut(&id)
                        .map(|r| r.on_renew_or_arbitrate(&self.clock, &self.config, &self.local_listen_endpoint)),
                    TimerKind::PingRetry => self
                        .remotes
                        .get_mut(&id)
                        .map(|r| r.on_ping_retry(&self.clock, &self.config, &self.local_listen_endpoint)),
                    TimerKind::PostArbitration => {
                        self.remotes.get_mut(&id).map(|r| r.on_post_arbitration(&self.clock, &self.config))
                    }
                    TimerKind::PreArbitrationSubject => self.remotes.get(&id).map(|r| r.on_pre_arbitration_subject()),
                    TimerKind::PreArbitrationMonitor => self.remotes.get(&id).map(|r| r.on_pre_arbitration_monitor()),
                    TimerKind::DelayedFailure => None,
                };
                if let Some(effects) = effects {
                    self.apply_effects(id, effects).await;
                }
            }
        }
        Some(fired)
    }

    /// Run the dispatch loop forever (until the process shuts down); intended to be
    /// spawned as its own task.
    pub async fn run(&mut self) {
        while self.tick().await.is_some() {}
    }

    #[cfg(test)]
    fn remote_by_identifier(&self, remote_identifier: &str) -> Option<&RemoteLeaseAgent> {
        self.by_identifier.get(remote_identifier).and_then(|id| self.remotes.get(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;
    use lease_transport::MemoryNetwork;
    use lease_wire::AddressFamily;
    use tokio::sync::mpsc;

    use super::*;
    use crate::events::{ArbitrateEvent, ArbitrationOutcome, Arbitrator};
    use crate::relationship::DirectionState;

    fn endpoint(addr: &str, port: u16) -> ListenEndpoint {
        ListenEndpoint {
            address: addr.into(),
            family: AddressFamily::Inet,
            port,
        }
    }

    /// Records every `REMOTE_LEASING_APPLICATION_EXPIRED`/arbitrate callback it
    /// receives; `application_ttl_ms` and `arbitration_enabled` are fixed at
    /// construction.
    struct RecordingApplication {
        ttl_ms: u64,
        arbitration_enabled: bool,
        expired: Mutex<Vec<(ApplicationName, ApplicationName)>>,
    }

    impl RecordingApplication {
        fn new(ttl_ms: u64, arbitration_enabled: bool) -> Arc<Self> {
            Arc::new(RecordingApplication {
                ttl_ms,
                arbitration_enabled,
                expired: Mutex::new(Vec::new()),
            })
        }

        fn expired_count(&self) -> usize {
            self.expired.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RegisteredApplication for RecordingApplication {
        fn is_arbitration_enabled(&self) -> bool {
            self.arbitration_enabled
        }

        fn application_ttl_ms(&self) -> u64 {
            self.ttl_ms
        }

        async fn on_remote_expired(&self, local_id: &ApplicationName, remote_id: &ApplicationName) {
            self.expired.lock().unwrap().push((local_id.clone(), remote_id.clone()));
        }

        async fn on_arbitrate(&self, _event: ArbitrateEvent) {}
    }

    /// Always returns a fixed outcome, for driving the arbitration-win/neutral cases
    /// deterministically.
    struct FixedArbitrator(ArbitrationOutcome);

    #[async_trait]
    impl Arbitrator for FixedArbitrator {
        async fn arbitrate(&self, _event: ArbitrateEvent) -> ArbitrationOutcome {
            self.0
        }
    }

    fn app_name(s: &str) -> ApplicationName {
        ApplicationName::parse(s).unwrap()
    }

    /// Drive `agent` until nothing is armed that fires within the next `budget` ticks,
    /// mirroring `kube_runtime::scheduler`'s test style of advancing paused time and
    /// polling the dispatch loop rather than sleeping on the wall clock.
    async fn drain(agent: &mut LeaseAgent, budget: usize) {
        for _ in 0..budget {
            if tokio::time::timeout(Duration::from_millis(0), agent.tick()).await.is_err() {
                return;
            }
        }
    }

    /// Bounce messages between two fully-instantiated lease agents until neither side
    /// has anything left to deliver, driving both dispatch loops in between. Unlike the
    /// single-sided tests above (where the remote is a raw, never-polled transport),
    /// the clean-renew and indirect-forwarding tests need a genuinely responding peer
    /// on both ends.
    async fn pump(
        a: &mut LeaseAgent,
        a_identifier: &str,
        rx_a: &mut mpsc::UnboundedReceiver<(ListenEndpoint, Bytes)>,
        b: &mut LeaseAgent,
        b_identifier: &str,
        rx_b: &mut mpsc::UnboundedReceiver<(ListenEndpoint, Bytes)>,
    ) {
        for _ in 0..4 {
            let mut delivered = false;
            while let Ok((_from, bytes)) = rx_a.try_recv() {
                let msg = lease_wire::deserialize(&bytes).unwrap();
                a.on_message(b_identifier, msg).await;
                delivered = true;
            }
            while let Ok((_from, bytes)) = rx_b.try_recv() {
                let msg = lease_wire::deserialize(&bytes).unwrap();
                b.on_message(a_identifier, msg).await;
                delivered = true;
            }
            drain(a, 16).await;
            drain(b, 16).await;
            if !delivered {
                break;
            }
        }
    }

    /// `duration=2000ms`, `renew_begin_ratio=2`, `retry_count=1`. A establishes toward
    /// a live, responding B. The renew fires at the computed renew instant (t=1000ms)
    /// and, since B is reachable, A's relationship is still ACTIVE with its expiry
    /// pushed out to 3000ms rather than lapsing.
    #[tokio::test(start_paused = true)]
    async fn clean_renew_extends_subject_expiry() {
        let network = MemoryNetwork::new();
        let (transport_a, mut rx_a) = network.bind(endpoint("a", 1));
        let (transport_b, mut rx_b) = network.bind(endpoint("b", 2));
        let config = LeaseConfig {
            duration: Duration::from_millis(2000),
            lease_renew_begin_ratio: 2,
            lease_retry_count: 1,
            ..LeaseConfig::default()
        };
        let mut a = LeaseAgent::new(endpoint("a", 1), config, Arc::new(transport_a)).unwrap();
        let mut b = LeaseAgent::new(endpoint("b", 2), config, Arc::new(transport_b)).unwrap();

        a.establish(app_name("app-a"), app_name("app-b"), "B", endpoint("b", 2))
            .await;
        pump(&mut a, "A", &mut rx_a, &mut b, "B", &mut rx_b).await;

        let expire_at_establish = a.remote_by_identifier("B").unwrap().relationship.subject_expire_time.unwrap();
        assert_eq!(crate::clock::ticks_to_ms(expire_at_establish), 2000);

        // Renew instant = subject_expire_time - duration/renew_begin_ratio = 2000 - 1000.
        tokio::time::advance(Duration::from_millis(1000)).await;
        pump(&mut a, "A", &mut rx_a, &mut b, "B", &mut rx_b).await;

        let remote = a.remote_by_identifier("B").unwrap();
        assert_eq!(remote.relationship.subject_state, DirectionState::Active);
        assert_eq!(crate::clock::ticks_to_ms(remote.relationship.subject_expire_time.unwrap()), 3000);
        assert_eq!(remote.relationship.renew_retry_count, 1);
        assert!(!remote.relationship.is_renew_retry);
    }

    /// A's direct renewal to B is lost (severed link), but A also has a healthy,
    /// two-way-ACTIVE relationship with C. Once renew-or-arbitrate enters retry mode,
    /// A must forward the stalled renewal to C, and only to C, since B itself is
    /// excluded and no other neighbor exists.
    #[tokio::test(start_paused = true)]
    async fn indirect_renewal_forwards_to_healthy_neighbor_only() {
        let network = MemoryNetwork::new();
        let (transport_a, mut rx_a) = network.bind(endpoint("a", 1));
        let (transport_b, mut rx_b) = network.bind(endpoint("b", 2));
        let (transport_c, mut rx_c) = network.bind(endpoint("c", 3));
        let config = LeaseConfig {
            duration: Duration::from_millis(1000),
            lease_renew_begin_ratio: 2,
            lease_retry_count: 1,
            consecutive_indirect_lease_limit: 3,
            ..LeaseConfig::default()
        };
        let mut a = LeaseAgent::new(endpoint("a", 1), config, Arc::new(transport_a)).unwrap();
        let mut b = LeaseAgent::new(endpoint("b", 2), config, Arc::new(transport_b)).unwrap();
        let mut c = LeaseAgent::new(endpoint("c", 3), config, Arc::new(transport_c)).unwrap();

        a.establish(app_name("app-a"), app_name("app-b"), "B", endpoint("b", 2))
            .await;
        pump(&mut a, "A", &mut rx_a, &mut b, "B", &mut rx_b).await;
        // The direct path only needs to stall for renewals; establishment itself
        // already succeeded.
        network.sever(endpoint("a", 1), endpoint("b", 2));

        a.establish(app_name("app-a"), app_name("app-c"), "C", endpoint("c", 3))
            .await;
        pump(&mut a, "A", &mut rx_a, &mut c, "C", &mut rx_c).await;
        let neighbor = a.remote_by_identifier("C").unwrap();
        assert_eq!(neighbor.relationship.subject_state, DirectionState::Active);
        assert_eq!(neighbor.relationship.monitor_state, DirectionState::Active);

        // A's own direct relationship with C renews on the same schedule as its (now
        // stalled) relationship with B; drain those out separately so they don't get
        // mistaken for a forwarded renewal below.
        fn drain_forwards(rx_c: &mut mpsc::UnboundedReceiver<(ListenEndpoint, Bytes)>) -> Vec<LeaseMessage> {
            let mut forwards = Vec::new();
            while let Ok((_from, bytes)) = rx_c.try_recv() {
                let msg = lease_wire::deserialize(&bytes).unwrap();
                if msg.header.message_type == MessageType::ForwardRequest {
                    forwards.push(msg);
                }
            }
            forwards
        }

        // First renew-or-arbitrate fire (t=500ms): retry count goes to 1, still within
        // `lease_retry_count`, no forwarding yet.
        tokio::time::advance(Duration::from_millis(500)).await;
        drain(&mut a, 16).await;
        assert!(drain_forwards(&mut rx_c).is_empty());

        // Second fire (t=1000ms): retry count exceeds `lease_retry_count`, entering
        // renew-retry mode and triggering exactly one FORWARD_REQUEST to C.
        tokio::time::advance(Duration::from_millis(500)).await;
        drain(&mut a, 16).await;

        let mut forwards = drain_forwards(&mut rx_c);
        assert_eq!(forwards.len(), 1, "exactly one FORWARD_REQUEST per retry tick");
        let forwarded_msg = forwards.pop().unwrap();
        assert_eq!(
            forwarded_msg.lease_listen_endpoint.as_ref().unwrap(),
            &endpoint("b", 2),
            "forward carries the direct remote's (B's) socket address"
        );

        let remote_b = a.remote_by_identifier("B").unwrap();
        assert!(remote_b.relationship.is_renew_retry);
        assert_eq!(remote_b.relationship.indirect_lease_count, 1);
    }

    /// A establishes toward B, but B's transport never delivers anything back (the
    /// ping is effectively dropped). Once `duration` elapses, A's subject-expired timer
    /// fires while `subject_state` is still `INACTIVE` (no ping response ever
    /// arrived), which must clear silently with no `REMOTE_LEASING_APPLICATION_EXPIRED`
    /// surfaced.
    #[tokio::test(start_paused = true)]
    async fn dropped_ping_does_not_surface_remote_expired() {
        let network = MemoryNetwork::new();
        let (transport_a, _rx_a) = network.bind(endpoint("a", 1));
        // B is never bound, so every send to it fails with UnknownPeer, equivalent to
        // the ping vanishing on the wire.
        let config = LeaseConfig {
            duration: Duration::from_millis(1000),
            ..LeaseConfig::default()
        };
        let mut a = LeaseAgent::new(endpoint("a", 1), config, Arc::new(transport_a)).unwrap();
        let app = RecordingApplication::new(0, true);
        a.register_application(app_name("app-a"), app.clone());

        a.start_ping("B", endpoint("b", 2)).await;
        drain(&mut a, 8).await;
        tokio::time::advance(Duration::from_millis(1500)).await;
        drain(&mut a, 8).await;

        assert_eq!(app.expired_count(), 0);
        let remote = a.remote_by_identifier("B").unwrap();
        assert!(!remote.in_ping);
        assert_eq!(remote.relationship.subject_state, DirectionState::Inactive);
    }

    /// Two registered applications report TTLs of 200ms and 800ms; the delayed-failure
    /// timer is clamped to `lease_suspend_duration` (600ms by default) rather than the
    /// raw maximum.
    #[tokio::test(start_paused = true)]
    async fn delayed_failure_clamps_to_lease_suspend_duration() {
        let network = MemoryNetwork::new();
        let (transport_a, _rx_a) = network.bind(endpoint("a", 1));
        // B is bound (so A's sends succeed and `lease_message_sent` goes true) but
        // never polled, so it never acknowledges anything.
        let (_transport_b, _rx_b) = network.bind(endpoint("b", 2));
        let config = LeaseConfig {
            duration: Duration::from_millis(200),
            arbitration_duration: Duration::from_millis(50),
            lease_retry_count: 1,
            ..LeaseConfig::default()
        };
        assert_eq!(config.lease_suspend_duration, Duration::from_millis(600));
        let mut a = LeaseAgent::new(endpoint("a", 1), config, Arc::new(transport_a)).unwrap();
        let app1 = RecordingApplication::new(200, true);
        let app2 = RecordingApplication::new(800, true);
        a.register_application(app_name("app-1"), app1.clone());
        a.register_application(app_name("app-2"), app2.clone());

        // No arbitrator is configured: losing arbitration for lack of an
        // arbitration-enabled candidate is itself a terminal outcome.
        a.establish(app_name("app-1"), app_name("remote-app"), "B", endpoint("b", 2))
            .await;

        for _ in 0..50 {
            drain(&mut a, 16).await;
            if a.is_ready_for_deallocation() {
                break;
            }
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // app-1 owns the only established relationship with B: it hears about the
        // failure once immediately (the remote lease agent's own notification) and
        // again when the agent-level delayed-failure timer sweeps every remote's LRIs.
        assert_eq!(app1.expired_count(), 2);
        // app-2 never established a relationship, so it never appears in any remote's
        // LRI sets; only its reported TTL feeds the clamp computation.
        assert_eq!(app2.expired_count(), 0);
        assert!(a.is_ready_for_deallocation());
    }

    /// A establishes toward B, B never answers, retries run out and subject-expired
    /// fires; arbitration returns `(local=MAX, remote=500ms)`, a win. The
    /// post-arbitration timer must fire no earlier than 500ms later and shut the
    /// remote lease agent down directly (no second arbitration round).
    #[tokio::test(start_paused = true)]
    async fn winning_arbitration_defers_monitor_expiry_by_the_granted_ttl() {
        let network = MemoryNetwork::new();
        let (transport_a, _rx_a) = network.bind(endpoint("a", 1));
        // B is bound but never polled: reachable, but unresponsive.
        let (_transport_b, _rx_b) = network.bind(endpoint("b", 2));
        let config = LeaseConfig {
            duration: Duration::from_millis(200),
            arbitration_duration: Duration::from_millis(50),
            lease_retry_count: 1,
            ..LeaseConfig::default()
        };
        let mut a = LeaseAgent::new(endpoint("a", 1), config, Arc::new(transport_a)).unwrap();
        let app = RecordingApplication::new(0, true);
        a.register_application(app_name("app-1"), app.clone());
        a.set_arbitrator(Arc::new(FixedArbitrator(ArbitrationOutcome {
            local_ttl_ms: None,
            remote_ttl_ms: Some(500),
            is_delayed: false,
        })));

        a.establish(app_name("app-1"), app_name("remote-app"), "B", endpoint("b", 2))
            .await;

        for _ in 0..50 {
            drain(&mut a, 16).await;
            let still_open = a
                .remote_by_identifier("B")
                .map(|r| r.state == RemoteAgentState::Open)
                .unwrap_or(false);
            if !still_open {
                break;
            }
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // The remote lease agent fails only once the granted remote TTL elapses;
        // post-arbitration notifies the one app holding an LRI with B exactly once,
        // and since it is the only registered application its reported 0ms TTL means
        // the lease agent fails immediately rather than arming a second delay.
        assert_eq!(app.expired_count(), 1);
        assert!(a.is_ready_for_deallocation());
    }
}
