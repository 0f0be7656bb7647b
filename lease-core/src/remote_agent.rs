//! Per-peer state machine: OPEN/SUSPENDED/FAILED, ping, establish, renew, terminate,
//! arbitrate.
//!
//! Every public method here is pure with respect to I/O and the timer queue: it mutates
//! `self` and returns the [`Effect`]s the caller (the owning [`crate::agent::LeaseAgent`])
//! must carry out: arm or cancel a timer, send a message, emit an application event. No
//! callback here ever touches a socket or a `TimerQueue` directly.

use std::collections::HashSet;

use lease_wire::{
    ApplicationName, InstanceId, LeaseMessage, LeaseRelationshipId, LeaseRelationshipSets,
    ListenEndpoint, MessageHeader, MessageType, LEGACY_NO_ONE_WAY_ARBITRATION_VERSION,
    PROTOCOL_MAJOR_VERSION, PROTOCOL_MINOR_VERSION,
};

use crate::clock::{duration_to_ticks, ticks_to_ms, Clock, Ticks};
use crate::config::LeaseConfig;
use crate::relationship::{DirectionState, LeaseRelationship};
use crate::timer::TimerKind;

/// The lifecycle state of one remote lease agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAgentState {
    Open,
    Suspended,
    Failed,
}

/// A side effect the state machine wants carried out. Nothing here executes itself;
/// [`crate::agent::LeaseAgent`] interprets the list after each call.
#[derive(Debug, Clone)]
pub enum Effect {
    ArmTimer(TimerKind, Ticks),
    CancelTimer(TimerKind),
    SendMessage(LeaseMessage),
    /// `REMOTE_LEASING_APPLICATION_EXPIRED` for one LRI direction.
    EmitRemoteExpired {
        local: ApplicationName,
        remote: ApplicationName,
    },
    /// Ask the owning lease agent to pick an arbitration-enabled application and
    /// surface `LEASING_APPLICATION_ARBITRATE`; if none exists the agent calls back into
    /// [`RemoteLeaseAgent::lose_arbitration_no_application`].
    RequestArbitration(ArbitrationRequest),
    /// Ask the owning lease agent to fan this renewal out to healthy neighbors.
    ForwardRenewal,
    /// Advisory "arbitration imminent" notification for one LRI direction.
    EmitPreArbitration {
        local: ApplicationName,
        remote: ApplicationName,
    },
    /// This remote lease agent has moved to FAILED; the owning lease agent runs its
    /// delayed-failure bookkeeping.
    AgentFailed,
}

/// The inputs an arbitration request needs.
#[derive(Debug, Clone)]
pub struct ArbitrationRequest {
    pub remote_endpoint: ListenEndpoint,
    pub monitor_ttl_ms: u64,
    pub subject_ttl_ms: u64,
    pub local_instance: InstanceId,
    pub remote_instance: InstanceId,
    pub remote_version: u16,
    pub monitor_id: Option<ApplicationName>,
    pub subject_id: Option<ApplicationName>,
    pub remote_arbitration_duration_upper_bound_ms: u64,
}

fn duration_as_ms(d: std::time::Duration) -> u32 {
    d.as_millis().min(u32::MAX as u128) as u32
}

/// The seven per-relationship timer kinds, for uniform cancel-all-on-failure loops.
const ALL_TIMER_KINDS: [TimerKind; 7] = [
    TimerKind::SubjectExpired,
    TimerKind::MonitorExpired,
    TimerKind::RenewOrArbitrate,
    TimerKind::PreArbitrationSubject,
    TimerKind::PreArbitrationMonitor,
    TimerKind::PostArbitration,
    TimerKind::PingRetry,
];

/// State machine for one peer.
#[derive(Debug, Clone)]
pub struct RemoteLeaseAgent {
    pub state: RemoteAgentState,
    pub remote_lease_agent_identifier: String,
    pub remote_lease_agent_instance: InstanceId,
    pub instance: InstanceId,
    pub remote_socket_address: ListenEndpoint,
    pub relationship: LeaseRelationship,

    pub subject_set: HashSet<LeaseRelationshipId>,
    pub monitor_set: HashSet<LeaseRelationshipId>,
    pub subject_establish_pending: HashSet<LeaseRelationshipId>,
    pub subject_failed_pending: HashSet<LeaseRelationshipId>,
    pub monitor_failed_pending: HashSet<LeaseRelationshipId>,
    pub subject_terminate_pending: HashSet<LeaseRelationshipId>,
    pub subject_terminate_accepted: HashSet<LeaseRelationshipId>,

    pub in_ping: bool,
    pub ping_send_time: Option<Ticks>,

    pub leasing_application_for_arbitration: Option<ApplicationName>,
    pub is_in_arbitration_neutral: bool,
    pub renewed_before: bool,
    pub time_to_be_failed: Option<Ticks>,
    pub is_in_two_way_termination: bool,
    pub remote_version: u16,

    pub is_active: bool,
}

impl RemoteLeaseAgent {
    pub fn new(remote_lease_agent_identifier: String, remote_socket_address: ListenEndpoint, config: &LeaseConfig) -> Self {
        RemoteLeaseAgent {
            state: RemoteAgentState::Open,
            remote_lease_agent_identifier,
            remote_lease_agent_instance: InstanceId::ZERO,
            instance: InstanceId::next(),
            remote_socket_address,
            relationship: LeaseRelationship::new(config),
            subject_set: HashSet::new(),
            monitor_set: HashSet::new(),
            subject_establish_pending: HashSet::new(),
            subject_failed_pending: HashSet::new(),
            monitor_failed_pending: HashSet::new(),
            subject_terminate_pending: HashSet::new(),
            subject_terminate_accepted: HashSet::new(),
            in_ping: false,
            ping_send_time: None,
            leasing_application_for_arbitration: None,
            is_in_arbitration_neutral: false,
            renewed_before: false,
            time_to_be_failed: None,
            is_in_two_way_termination: false,
            remote_version: PROTOCOL_MAJOR_VERSION * 256 + PROTOCOL_MINOR_VERSION,
            is_active: true,
        }
    }

    fn build_message(
        &self,
        message_type: MessageType,
        is_two_way_termination: bool,
        local_endpoint: &ListenEndpoint,
    ) -> LeaseMessage {
        let header = MessageHeader {
            major_version: PROTOCOL_MAJOR_VERSION,
            minor_version: PROTOCOL_MINOR_VERSION,
            header_size: 0,
            message_size: 0,
            lease_instance: self.relationship.subject_identifier,
            remote_lease_agent_instance: self.remote_lease_agent_instance,
            duration_ms: duration_as_ms(self.relationship.duration),
            expiration: self.relationship.subject_expire_time.unwrap_or(0),
            suspend_duration_ms: duration_as_ms(self.relationship.lease_suspend_duration),
            arbitration_duration_ms: duration_as_ms(self.relationship.arbitration_duration),
            is_two_way_termination,
            message_type,
            message_identifier: InstanceId::next(),
            subject_pending: Default::default(),
            subject_failed_pending: Default::default(),
            monitor_failed_pending: Default::default(),
            subject_pending_accepted: Default::default(),
            subject_failed_accepted: Default::default(),
            monitor_failed_accepted: Default::default(),
            subject_pending_rejected: Default::default(),
            subject_terminate_pending: Default::default(),
            subject_terminate_accepted: Default::default(),
            message_listen_endpoint: Default::default(),
            lease_listen_endpoint: None,
        };
        let sets = if message_type.is_ping() {
            LeaseRelationshipSets::default()
        } else {
            LeaseRelationshipSets {
                subject_pending: self.subject_set.iter().cloned().collect(),
                subject_failed_pending: self.subject_failed_pending.iter().cloned().collect(),
                monitor_failed_pending: self.monitor_failed_pending.iter().cloned().collect(),
                subject_pending_accepted: Vec::new(),
                subject_failed_accepted: Vec::new(),
                monitor_failed_accepted: Vec::new(),
                subject_pending_rejected: Vec::new(),
                subject_terminate_pending: self.subject_terminate_pending.iter().cloned().collect(),
                subject_terminate_accepted: self.subject_terminate_accepted.iter().cloned().collect(),
            }
        };
        LeaseMessage {
            header,
            sets,
            message_listen_endpoint: local_endpoint.clone(),
            lease_listen_endpoint: None,
            extension_remote_lease_agent_instance: self.remote_lease_agent_instance,
        }
    }

    /// Establish (first activation) of the subject side for `lri`.
    #[tracing::instrument(skip(self, clock, config, local_endpoint), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn establish(
        &mut self,
        lri: LeaseRelationshipId,
        clock: &Clock,
        config: &LeaseConfig,
        local_endpoint: &ListenEndpoint,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        let was_inactive = self.relationship.subject_state == DirectionState::Inactive;
        self.subject_set.insert(lri.clone());
        self.subject_establish_pending.insert(lri);

        if was_inactive {
            self.relationship.activate_subject(clock.now());
            if !self.relationship.monitor_state.is_active() {
                effects.push(Effect::ArmTimer(
                    TimerKind::SubjectExpired,
                    self.relationship.subject_expire_time.unwrap(),
                ));
            }
            let renew_at = self.relationship.next_renew_deadline(config).unwrap();
            effects.push(Effect::ArmTimer(TimerKind::RenewOrArbitrate, renew_at));
        }
        let msg = self.build_message(MessageType::LeaseRequest, false, local_endpoint);
        effects.push(Effect::SendMessage(msg));
        effects
    }

    /// Mark the first outgoing lease-request as having left the transport layer.
    /// `lease_message_sent` only ever moves from `false` to `true`.
    pub fn mark_message_sent(&mut self) {
        self.relationship.lease_message_sent = true;
    }

    /// One-way ping handshake priming the relationship before the first real renewal.
    pub fn start_ping(&mut self, clock: &Clock, config: &LeaseConfig, local_endpoint: &ListenEndpoint) -> Vec<Effect> {
        self.in_ping = true;
        self.ping_send_time = Some(clock.now());
        let expire_deadline = clock.deadline(self.relationship.duration);
        vec![
            Effect::ArmTimer(TimerKind::SubjectExpired, expire_deadline),
            Effect::ArmTimer(TimerKind::PingRetry, clock.deadline(config.ping_retry_interval)),
            Effect::SendMessage(self.build_message(MessageType::PingRequest, false, local_endpoint)),
        ]
    }

    pub fn on_ping_retry(&mut self, clock: &Clock, config: &LeaseConfig, local_endpoint: &ListenEndpoint) -> Vec<Effect> {
        if !self.in_ping {
            return Vec::new();
        }
        vec![
            Effect::ArmTimer(TimerKind::PingRetry, clock.deadline(config.ping_retry_interval)),
            Effect::SendMessage(self.build_message(MessageType::PingRequest, false, local_endpoint)),
        ]
    }

    pub fn on_ping_response(&mut self, msg: &LeaseMessage) -> Vec<Effect> {
        self.in_ping = false;
        self.remote_version = (msg.header.major_version as u16) * 256 + msg.header.minor_version;
        vec![Effect::CancelTimer(TimerKind::PingRetry)]
    }

    /// Renew-or-arbitrate timer fire.
    #[tracing::instrument(skip(self, clock, config, local_endpoint), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn on_renew_or_arbitrate(
        &mut self,
        clock: &Clock,
        config: &LeaseConfig,
        local_endpoint: &ListenEndpoint,
    ) -> Vec<Effect> {
        if self.state == RemoteAgentState::Failed {
            return Vec::new();
        }
        let Some(expire) = self.relationship.subject_expire_time else {
            return Vec::new();
        };
        let now = clock.now();

        // Already mid-arbitration: this fire is the arbitration-result timeout
        // safety net.
        if self.relationship.subject_state == DirectionState::Expired {
            return self.fail(clock);
        }

        if now >= expire {
            return self.on_subject_expired(clock, config, local_endpoint);
        }

        let mut effects = Vec::new();
        let new_expire = now + duration_to_ticks(self.relationship.duration);
        if new_expire < expire {
            let next = self.relationship.next_renew_deadline(config).unwrap_or(expire);
            effects.push(Effect::ArmTimer(TimerKind::RenewOrArbitrate, next));
            return effects;
        }

        self.relationship.subject_expire_time = Some(new_expire);
        self.relationship.subject_fail_time =
            Some(new_expire + duration_to_ticks(self.relationship.arbitration_duration));
        self.relationship.subject_suspend_time =
            Some(new_expire + duration_to_ticks(self.relationship.lease_suspend_duration));
        // Re-arm against the live deadline, not the one in force when this timer was
        // first armed by `establish`/`start_ping`, so a renewed lease doesn't expire
        // at its original deadline.
        effects.push(Effect::ArmTimer(TimerKind::SubjectExpired, new_expire));
        let next_renew = self.relationship.next_renew_deadline(config).unwrap_or(new_expire);
        effects.push(Effect::ArmTimer(TimerKind::RenewOrArbitrate, next_renew));

        if self.subject_set.is_empty() {
            let msg = self.build_message(MessageType::LeaseRequest, true, local_endpoint);
            self.state = RemoteAgentState::Suspended;
            effects.push(Effect::SendMessage(msg));
            return effects;
        }

        let msg = self.build_message(MessageType::LeaseRequest, false, local_endpoint);
        effects.push(Effect::SendMessage(msg));

        let was_retrying = self.relationship.is_renew_retry;
        self.relationship.renew_retry_count += 1;
        if self.relationship.renew_retry_count > config.lease_retry_count {
            self.relationship.is_renew_retry = true;
            if !was_retrying {
                effects.push(Effect::ArmTimer(TimerKind::PreArbitrationSubject, now));
            }
            if self.relationship.indirect_lease_count < config.consecutive_indirect_lease_limit {
                effects.push(Effect::ForwardRenewal);
            }
        }
        effects
    }

    /// Pre-arbitration-subject timer fire: tell every registered application on the
    /// subject side that arbitration may be imminent.
    pub fn on_pre_arbitration_subject(&self) -> Vec<Effect> {
        self.subject_set
            .iter()
            .map(|lri| Effect::EmitPreArbitration {
                local: lri.local_application.clone(),
                remote: lri.remote_application.clone(),
            })
            .collect()
    }

    /// Pre-arbitration-monitor timer fire: same, monitor side.
    pub fn on_pre_arbitration_monitor(&self) -> Vec<Effect> {
        self.monitor_set
            .iter()
            .map(|lri| Effect::EmitPreArbitration {
                local: lri.local_application.clone(),
                remote: lri.remote_application.clone(),
            })
            .collect()
    }

    /// Clears retry state on a fresh acknowledgement via `LEASE_RESPONSE`.
    pub fn on_lease_response(&mut self) {
        self.relationship.is_renew_retry = false;
        self.relationship.renew_retry_count = 0;
        self.relationship.indirect_lease_count = 0;
        self.mark_message_sent();
    }

    /// Subject-expired callback.
    #[tracing::instrument(skip(self, clock, config, local_endpoint), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn on_subject_expired(
        &mut self,
        clock: &Clock,
        config: &LeaseConfig,
        local_endpoint: &ListenEndpoint,
    ) -> Vec<Effect> {
        let _ = local_endpoint;
        if self.in_ping {
            self.in_ping = false;
            return vec![Effect::CancelTimer(TimerKind::PingRetry)];
        }
        if self.relationship.subject_state == DirectionState::Inactive
            && self.relationship.monitor_state.is_active()
        {
            return Vec::new();
        }
        if !self.relationship.monitor_state.is_active() && !self.relationship.lease_message_sent {
            self.state = RemoteAgentState::Failed;
            return self.cancel_all_timers();
        }
        if self.remote_version == LEGACY_NO_ONE_WAY_ARBITRATION_VERSION {
            return self.fail(clock);
        }
        self.relationship.subject_state = DirectionState::Expired;
        self.relationship.monitor_state = DirectionState::Expired;
        self.enter_arbitration(clock, config)
    }

    /// Monitor-expired callback.
    #[tracing::instrument(skip(self, clock, config), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn on_monitor_expired(&mut self, clock: &Clock, config: &LeaseConfig) -> Vec<Effect> {
        if self.relationship.subject_state == DirectionState::Inactive {
            self.relationship.monitor_state = DirectionState::Inactive;
            return vec![Effect::CancelTimer(TimerKind::MonitorExpired)];
        }
        self.relationship.subject_state = DirectionState::Expired;
        self.relationship.monitor_state = DirectionState::Expired;
        let mut effects = vec![
            Effect::CancelTimer(TimerKind::RenewOrArbitrate),
            Effect::CancelTimer(TimerKind::PreArbitrationSubject),
            Effect::CancelTimer(TimerKind::PreArbitrationMonitor),
            Effect::CancelTimer(TimerKind::PingRetry),
        ];
        effects.extend(self.enter_arbitration(clock, config));
        effects
    }

    fn enter_arbitration(&mut self, clock: &Clock, config: &LeaseConfig) -> Vec<Effect> {
        let now = clock.now();
        let monitor_ttl_ms = self
            .relationship
            .monitor_expire_time
            .map(|t| ticks_to_ms(t.saturating_sub(now)))
            .unwrap_or(0);
        let subject_ttl_ms = self
            .relationship
            .subject_suspend_time
            .map(|t| ticks_to_ms(t.saturating_sub(now)))
            .unwrap_or(0);
        let (monitor_id, subject_id) = (
            self.monitor_set.iter().next().map(|l| l.local_application.clone()),
            self.subject_set.iter().next().map(|l| l.local_application.clone()),
        );
        let request = ArbitrationRequest {
            remote_endpoint: self.remote_socket_address.clone(),
            monitor_ttl_ms,
            subject_ttl_ms,
            local_instance: self.instance,
            remote_instance: self.remote_lease_agent_instance,
            remote_version: self.remote_version,
            monitor_id: monitor_id.clone(),
            subject_id: subject_id.clone(),
            remote_arbitration_duration_upper_bound_ms: ticks_to_ms(duration_to_ticks(
                self.relationship.arbitration_duration,
            )),
        };
        self.leasing_application_for_arbitration = monitor_id.or(subject_id);
        // The renew-or-arbitrate timer doubles as the arbitration-result timeout: arm
        // it at subject_fail_time rather than cancel it.
        let mut effects = vec![Effect::CancelTimer(TimerKind::RenewOrArbitrate)];
        if let Some(fail_time) = self.relationship.subject_fail_time {
            effects.push(Effect::ArmTimer(TimerKind::RenewOrArbitrate, fail_time));
        }
        effects.push(Effect::RequestArbitration(request));
        effects
    }

    /// No registered application was arbitration-enabled; treat this as arbitration
    /// lost.
    pub fn lose_arbitration_no_application(&mut self, clock: &Clock) -> Vec<Effect> {
        self.relationship.subject_state = DirectionState::Failed;
        self.relationship.monitor_state = DirectionState::Inactive;
        self.fail(clock)
    }

    /// Apply an arbitration result.
    #[tracing::instrument(skip(self, clock, config), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn arbitrate_lease(
        &mut self,
        local_ttl_ms: Option<u64>,
        remote_ttl_ms: Option<u64>,
        is_delayed: bool,
        clock: &Clock,
        config: &LeaseConfig,
    ) -> Vec<Effect> {
        match (local_ttl_ms, remote_ttl_ms) {
            (Some(_), _) => {
                self.relationship.subject_state = DirectionState::Failed;
                self.relationship.monitor_state = DirectionState::Inactive;
                self.is_in_arbitration_neutral = false;
                self.fail(clock)
            }
            (None, Some(remote_ttl)) => {
                self.relationship.subject_suspend_time = None;
                self.is_in_arbitration_neutral = false;
                if is_delayed {
                    self.remote_expired_effects()
                } else if remote_ttl == 0 {
                    self.on_monitor_expired(clock, config)
                } else {
                    let deadline = clock.deadline(std::time::Duration::from_millis(remote_ttl));
                    vec![Effect::ArmTimer(TimerKind::PostArbitration, deadline)]
                }
            }
            (None, None) => {
                self.relationship.subject_state = DirectionState::Inactive;
                self.relationship.monitor_state = DirectionState::Failed;
                self.is_in_arbitration_neutral = true;
                self.fail(clock)
            }
        }
    }

    /// Post-arbitration timer fire: the remote TTL granted by a winning arbitration
    /// elapsed without further renewal. Unlike a fresh monitor-expired fire,
    /// arbitration has already run for this remote lease agent, so re-entering it here
    /// would ask the arbitrator to decide the same question twice. Fail outright
    /// instead, so both directions are notified the same way a lost arbitration would.
    pub fn on_post_arbitration(&mut self, clock: &Clock, _config: &LeaseConfig) -> Vec<Effect> {
        self.relationship.subject_state = DirectionState::Failed;
        self.relationship.monitor_state = DirectionState::Inactive;
        self.fail(clock)
    }

    fn remote_expired_effects(&self) -> Vec<Effect> {
        self.subject_set
            .iter()
            .chain(self.monitor_set.iter())
            .map(|lri| Effect::EmitRemoteExpired {
                local: lri.local_application.clone(),
                remote: lri.remote_application.clone(),
            })
            .collect()
    }

    fn cancel_all_timers(&self) -> Vec<Effect> {
        ALL_TIMER_KINDS.iter().map(|k| Effect::CancelTimer(*k)).collect()
    }

    /// Fail this remote lease agent: cancel every timer, notify every registered
    /// application with an outstanding LRI, and mark it FAILED.
    fn fail(&mut self, clock: &Clock) -> Vec<Effect> {
        let _ = clock;
        self.state = RemoteAgentState::Failed;
        let mut effects = self.cancel_all_timers();
        effects.extend(self.remote_expired_effects());
        effects.push(Effect::AgentFailed);
        effects
    }

    /// Remove `lri` from the monitor side and queue its failure for the next outgoing
    /// message.
    pub fn terminate_monitor_lease(&mut self, lri: &LeaseRelationshipId) {
        if self.monitor_set.remove(lri) {
            self.monitor_failed_pending.insert(lri.clone());
        }
    }

    /// Remove `lri` from the subject side and queue it as failed or terminated,
    /// depending on `is_subject_failed`.
    pub fn terminate_subject_lease(
        &mut self,
        lri: &LeaseRelationshipId,
        is_subject_failed: bool,
        local_endpoint: &ListenEndpoint,
    ) -> Vec<Effect> {
        let removed = self.subject_set.remove(lri) | self.subject_establish_pending.remove(lri);
        if removed {
            if is_subject_failed {
                self.subject_failed_pending.insert(lri.clone());
            } else {
                self.subject_terminate_pending.insert(lri.clone());
            }
        }
        let mut effects = Vec::new();
        if self.subject_set.is_empty() && self.monitor_set.is_empty() {
            effects.push(Effect::CancelTimer(TimerKind::MonitorExpired));
            if let Some(expire) = self.relationship.subject_expire_time {
                effects.push(Effect::ArmTimer(TimerKind::SubjectExpired, expire));
            }
            effects.push(Effect::SendMessage(self.build_message(
                MessageType::LeaseRequest,
                true,
                local_endpoint,
            )));
        }
        effects
    }

    /// Handle an incoming `LEASE_REQUEST`, including the reverse-lease optimization and
    /// idempotent two-way termination.
    #[tracing::instrument(skip(self, msg, clock, config, local_endpoint), fields(remote = %self.remote_lease_agent_identifier))]
    pub fn on_lease_request(
        &mut self,
        msg: &LeaseMessage,
        clock: &Clock,
        config: &LeaseConfig,
        local_endpoint: &ListenEndpoint,
    ) -> Vec<Effect> {
        self.remote_lease_agent_instance = msg.header.remote_lease_agent_instance;
        self.remote_version = (msg.header.major_version as u16) * 256 + msg.header.minor_version;

        if msg.header.is_two_way_termination {
            // Termination is idempotent: the side observing this second must not
            // resurrect the relationship. The sender's subject-terminate list names
            // LRIs from its own perspective, the flip of ours.
            for lri in &msg.sets.subject_terminate_pending {
                let reverse = lri.flipped();
                self.monitor_set.remove(&reverse);
                self.monitor_failed_pending.remove(&reverse);
            }
            let mut effects = Vec::new();
            if self.subject_set.is_empty() && self.monitor_set.is_empty() {
                effects.push(Effect::CancelTimer(TimerKind::MonitorExpired));
            }
            return effects;
        }

        // The sender's subject_pending entries are named from its own perspective; our
        // view of the same relationship is the flip.
        let mut effects = Vec::new();
        for lri in &msg.sets.subject_pending {
            let reverse = lri.flipped();
            self.monitor_set.insert(reverse.clone());

            // Pre-establish our subject side on the same LRI unless we are suspended,
            // terminating, or already tracking it. `establish` is what arms the
            // subject-side timers and sends our own `LEASE_REQUEST` back, so a two-way
            // relationship comes up from a single incoming message.
            if self.state == RemoteAgentState::Open
                && !self.subject_set.contains(&reverse)
                && !self.subject_terminate_pending.contains(&reverse)
            {
                effects.extend(self.establish(reverse, clock, config, local_endpoint));
            }
        }
        if !self.monitor_set.is_empty() && !self.relationship.monitor_state.is_active() {
            self.relationship
                .activate_monitor(clock.now(), self.relationship.duration);
            let monitor_expire = self.relationship.monitor_expire_time.unwrap();
            effects.push(Effect::ArmTimer(TimerKind::MonitorExpired, monitor_expire));
            let lead = crate::clock::duration_to_ticks(config.renew_begin_offset());
            effects.push(Effect::ArmTimer(
                TimerKind::PreArbitrationMonitor,
                monitor_expire.saturating_sub(lead),
            ));
        }
        effects
    }

    /// A `FORWARD_REQUEST`/`FORWARD_RESPONSE` carries the same body as a regular
    /// renewal plus the direct remote's lease listen endpoint.
    pub fn build_forward_request(&self, direct_remote_endpoint: ListenEndpoint, local_endpoint: &ListenEndpoint) -> LeaseMessage {
        let mut msg = self.build_message(MessageType::ForwardRequest, self.subject_set.is_empty(), local_endpoint);
        msg.lease_listen_endpoint = Some(direct_remote_endpoint);
        msg
    }
}
