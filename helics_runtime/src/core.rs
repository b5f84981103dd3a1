//! The Core: a process hosting one or more local federates, their
//! interfaces, and the filter/translator machinery that sits between
//! them, per spec §4.1-§4.7.
//!
//! A `Core` owns exactly one [`HandleManager`], one [`FilterFederate`],
//! a table of [`TranslatorInfo`], and one [`FederateState`] per locally
//! registered federate. Every federate on a Core shares the Core's single
//! upstream connection to its broker; messages destined off-Core are
//! handed to the Core's own [`ActionBus`] send side for the transport
//! layer (`helics_federated` when the `federated` feature is enabled, or
//! direct in-process delivery otherwise) to carry onward.

use std::collections::HashMap;

use helics_core::{GlobalFederateId, GlobalHandle, HelicsError, InterfaceHandle, Result, Time};
use helics_coordinator::{CoordinatorVariant, FederateLifecycle};
use helics_message::{ActionCode, ActionMessage, Flags};

use crate::bus::ActionBus;
use crate::fed_state::{FederateState, ProcessResult};
use crate::filter::{DestFilterOutcome, FilterFederate, FilterInfo};
use crate::handle::{HandleManager, InterfaceKind};
use crate::translator::TranslatorInfo;

/// A locally-registered federate and the local id it was handed at
/// registration, distinct from its federation-wide [`GlobalFederateId`]
/// (assigned once the root broker acknowledges registration).
pub struct LocalFederate {
    pub name: String,
    pub state: FederateState,
}

/// A Core process: the handle registry, filter engine, translator table,
/// and per-federate time-coordination state for every federate it hosts.
pub struct Core {
    pub id: GlobalFederateId,
    pub identifier: String,
    pub handles: HandleManager,
    pub filters: FilterFederate,
    translators: HashMap<InterfaceHandle, TranslatorInfo>,
    federates: HashMap<GlobalFederateId, LocalFederate>,
    /// Outbound bus: messages destined for the broker or another Core.
    pub upstream: ActionBus,
    initializing: bool,
}

impl Core {
    pub fn new(id: GlobalFederateId, identifier: impl Into<String>, upstream: ActionBus) -> Self {
        Core {
            id,
            identifier: identifier.into(),
            handles: HandleManager::new(),
            filters: FilterFederate::new(),
            translators: HashMap::new(),
            federates: HashMap::new(),
            upstream,
            initializing: true,
        }
    }

    /// Registers a federate locally, in [`FederateLifecycle::Created`],
    /// with the given time-coordination strategy. Returns the
    /// [`GlobalFederateId`] assigned to it (the Core's own id combined
    /// with the federate's position, matching the broker-assigned
    /// federation-wide numbering scheme).
    pub fn register_federate(&mut self, name: impl Into<String>, variant: CoordinatorVariant) -> GlobalFederateId {
        let fed_id = GlobalFederateId::new(self.id.raw() + self.federates.len() as i32 + 1);
        self.federates.insert(
            fed_id,
            LocalFederate {
                name: name.into(),
                state: FederateState::new(fed_id, variant),
            },
        );
        fed_id
    }

    pub fn federate(&self, id: GlobalFederateId) -> Option<&LocalFederate> {
        self.federates.get(&id)
    }

    pub fn federate_mut(&mut self, id: GlobalFederateId) -> Option<&mut LocalFederate> {
        self.federates.get_mut(&id)
    }

    pub fn federate_ids(&self) -> impl Iterator<Item = GlobalFederateId> + '_ {
        self.federates.keys().copied()
    }

    /// Looks up a locally-hosted federate by its registered name, for
    /// targeted queries (`<name>/state`, `<name>/current_time`, ...).
    pub fn federate_named(&self, name: &str) -> Option<(GlobalFederateId, &LocalFederate)> {
        self.federates.iter().find(|(_, fed)| fed.name == name).map(|(id, fed)| (*id, fed))
    }

    /// Registers a publication, input, endpoint, filter, or translator
    /// interface on a hosted federate. Valid only before
    /// `enter_initializing_mode` for that federate, matching the "created
    /// once, before enterInitializing" handle-lifetime rule.
    pub fn register_interface(
        &mut self,
        owner: GlobalFederateId,
        kind: InterfaceKind,
        key: impl Into<String>,
        type_: impl Into<String>,
        units: impl Into<String>,
        flags: Flags,
    ) -> Result<InterfaceHandle> {
        let key = key.into();
        let handle = self.handles.register(
            GlobalHandle::new(owner, InterfaceHandle::from(0usize)),
            kind,
            key,
            type_,
            units,
            flags,
        )?;
        Ok(handle)
    }

    pub fn register_filter(&mut self, info: FilterInfo, on_endpoint: Option<InterfaceHandle>) {
        let handle = info.handle;
        self.filters.register_filter(handle, info);
        if let Some(endpoint) = on_endpoint {
            self.filters.coordinator_for(endpoint).source_filters.push(handle);
        }
    }

    pub fn register_translator(&mut self, info: TranslatorInfo) {
        self.translators.insert(info.handle, info);
    }

    /// Validates every required target link for every hosted interface and
    /// transitions each `Created` federate to `Initializing`. Fails with
    /// [`HelicsError::ConnectionFailure`] if a required link is still
    /// unresolved (a caller should call this once, at the moment the
    /// federation-wide entry barrier for this Core's federates opens).
    pub fn enter_initializing_mode(&mut self) -> Result<()> {
        self.handles.check_required_links()?;
        self.initializing = false;
        for fed in self.federates.values_mut() {
            if fed.state.lifecycle == FederateLifecycle::Created {
                fed.state.lifecycle = fed.state.lifecycle.apply(FederateLifecycle::Initializing)?;
            }
        }
        Ok(())
    }

    /// Routes one inbound [`ActionMessage`] to the federate it targets (by
    /// `dest.fed_id`), applying §4.6 filtering first for data-plane
    /// messages addressed to a filtered endpoint. Anything not destined
    /// for a locally-hosted federate is forwarded upstream unchanged.
    pub fn route(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        if msg.action == ActionCode::MultiMessage {
            return self.route_multi_message(msg);
        }

        if msg.action == ActionCode::FilterResult {
            return self.route_filter_result(msg);
        }

        if !self.federates.contains_key(&msg.dest.fed_id) {
            self.upstream.send(msg);
            return Vec::new();
        }

        match msg.action {
            ActionCode::SendMessage | ActionCode::SendForFilter | ActionCode::SendForFilterAndReturn => {
                self.route_data_message(msg)
            }
            _ => self.dispatch_to_federate(msg),
        }
    }

    /// Depacketizes a `MULTI_MESSAGE` batch and re-injects each inner
    /// message into the local pipeline, matching the §4.1 contract that a
    /// MULTI_MESSAGE is purely a batching container and never itself a
    /// deliverable unit.
    fn route_multi_message(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        let inner = match msg.unpack_multi_message() {
            Ok(inner) => inner,
            Err(err) => {
                tracing::warn!(?err, "dropping malformed MULTI_MESSAGE");
                return Vec::new();
            }
        };
        inner.into_iter().flat_map(|m| self.route(m)).collect()
    }

    /// A filter has finished processing a send-and-return message: clears
    /// the outstanding entry for this federate and, if the blocking set
    /// empties, emits the TIME_UNBLOCK that lifts the §4.6 block.
    fn route_filter_result(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        let fed_id = msg.dest.fed_id;
        if !self.filters.resolve_filter_return(fed_id, msg.sequence_id) {
            return Vec::new();
        }
        if !self.federates.contains_key(&fed_id) {
            return Vec::new();
        }
        let mut unblock = ActionMessage::new(ActionCode::TimeUnblock);
        unblock.source.fed_id = fed_id;
        unblock.dest.fed_id = fed_id;
        unblock.sequence_id = msg.sequence_id;
        self.dispatch_to_federate(unblock)
    }

    fn route_data_message(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        let dest_handle = msg.dest.handle;
        match self.filters.apply_dest_filter(dest_handle, msg) {
            DestFilterOutcome::Deliver(m) => self.deliver_data(m),
            DestFilterOutcome::Cloned(msgs) => msgs.into_iter().flat_map(|m| self.deliver_data(m)).collect(),
            DestFilterOutcome::Reroute(m) => {
                let mut out = Vec::new();
                out.extend(self.route(m));
                out
            }
            DestFilterOutcome::Dropped => Vec::new(),
        }
    }

    fn deliver_data(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        if let Some(info) = self.translators.get(&msg.dest.handle) {
            if let Some(value) = info.decode_from_message(&msg) {
                tracing::trace!(translator = %info.key, ?value, "decoded message into value for input targets");
            }
        }
        self.dispatch_to_federate(msg)
    }

    /// `ProcessResult::ReprocessMessage` means the *last* entry in
    /// `emitted` (the disconnect-to-parent redirect, or the
    /// ExecCheck/TimeCheck follow-up a TIME_BLOCK/TIME_UNBLOCK produces)
    /// is what must be routed again, not the original `msg` — reprocessing
    /// the original would replay the exact same, state-unchanged input
    /// forever for the TIME_BLOCK/TIME_UNBLOCK row, which never mutates
    /// federate state. That entry is popped out of the ordinary
    /// emitted-dispatch loop so it is routed exactly once.
    fn dispatch_to_federate(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        let Some(fed) = self.federates.get_mut(&msg.dest.fed_id) else {
            return Vec::new();
        };
        let (result, mut emitted) = fed.state.process(&msg);
        let reprocess = if result == ProcessResult::ReprocessMessage { emitted.pop() } else { None };

        let mut out = Vec::new();
        for m in emitted {
            if self.federates.contains_key(&m.dest.fed_id) {
                out.extend(self.dispatch_to_federate(m));
            } else {
                self.upstream.send(m.clone());
                out.push(m);
            }
        }
        match result {
            ProcessResult::DelayMessage => self.upstream.requeue(msg),
            ProcessResult::ReprocessMessage => {
                if let Some(rm) = reprocess {
                    out.extend(self.route(rm));
                }
            }
            _ => {}
        }
        out
    }

    /// Submits a federate's own outbound publication: resolves every
    /// target registered on the publishing handle, runs source filters on
    /// each, and routes the result.
    pub fn publish(&mut self, source: GlobalHandle, payload: Vec<u8>) -> Result<Vec<ActionMessage>> {
        let info = self
            .handles
            .get(source.handle)
            .ok_or_else(|| HelicsError::InvalidIdentifier(format!("no such publication handle {source:?}")))?;
        let targets = info.targets.clone();
        let mut out = Vec::new();
        for target in targets {
            let Some(dest_handle) = self.handles.lookup(&target) else { continue };
            let dest_info = self.handles.get(dest_handle).expect("looked up handle always exists");
            let mut msg = ActionMessage::new(ActionCode::Pub);
            msg.source = source;
            msg.dest = GlobalHandle::new(dest_info.owner.fed_id, dest_handle);
            msg.payload = payload.clone();
            out.extend(self.route(msg));
        }
        Ok(out)
    }

    /// Submits a federate's own outbound message to an endpoint target,
    /// running source filters attached to `source` first.
    pub fn send_message(&mut self, source: GlobalHandle, dest: GlobalHandle, payload: Vec<u8>, send_time: Time) -> Vec<ActionMessage> {
        let mut msg = ActionMessage::new(ActionCode::SendMessage);
        msg.source = source;
        msg.dest = dest;
        msg.payload = payload;
        msg.action_time = send_time;

        let outcome = self.filters.apply_source_filters(source.handle, msg);
        let mut results = Vec::new();
        for filtered in outcome.delivered {
            results.extend(self.route(filtered));
        }
        if let Some(seq) = outcome.blocked_sequence {
            if let Some(fed) = self.federates.get_mut(&source.fed_id) {
                fed.state.coordinator.base.next_sequence();
                let mut block = ActionMessage::new(ActionCode::TimeBlock);
                block.source.fed_id = source.fed_id;
                block.dest.fed_id = source.fed_id;
                block.sequence_id = seq;
                results.extend(self.dispatch_to_federate(block));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helics_core::Time;

    fn core() -> Core {
        Core::new(GlobalFederateId::new(GlobalFederateId::BROKER_ID_OFFSET), "core1", ActionBus::new())
    }

    #[test]
    fn registering_a_federate_assigns_increasing_ids() {
        let mut c = core();
        let a = c.register_federate("fedA", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let b = c.register_federate("fedB", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        assert_ne!(a, b);
        assert!(c.federate(a).is_some());
        assert!(c.federate(b).is_some());
    }

    #[test]
    fn enter_initializing_fails_on_unresolved_required_target() {
        let mut c = core();
        let fed = c.register_federate("f", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        c.register_interface(fed, InterfaceKind::Endpoint, "ep1", "", "", Flags::empty()).unwrap();
        c.handles.add_target("ep1", "missing", true);
        assert!(c.enter_initializing_mode().is_err());
    }

    #[test]
    fn messages_for_unhosted_federates_go_upstream() {
        let mut c = core();
        let mut msg = ActionMessage::new(ActionCode::Query);
        msg.dest.fed_id = GlobalFederateId::new(999);
        let out = c.route(msg);
        assert!(out.is_empty());
        assert!(!c.upstream.is_empty());
    }

    #[test]
    fn publish_with_no_targets_emits_nothing() {
        let mut c = core();
        let fed = c.register_federate("f", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let handle = c.register_interface(fed, InterfaceKind::Publication, "pub1", "double", "", Flags::empty()).unwrap();
        let source = GlobalHandle::new(fed, handle);
        let out = c.publish(source, vec![1, 2, 3]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn send_message_between_two_local_endpoints_delivers_directly() {
        let mut c = core();
        let fed_a = c.register_federate("a", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let fed_b = c.register_federate("b", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let ep_a = c.register_interface(fed_a, InterfaceKind::Endpoint, "a/ep", "", "", Flags::empty()).unwrap();
        let ep_b = c.register_interface(fed_b, InterfaceKind::Endpoint, "b/ep", "", "", Flags::empty()).unwrap();

        c.federate_mut(fed_b).unwrap().state.lifecycle = FederateLifecycle::Initializing;
        let _ = c.send_message(
            GlobalHandle::new(fed_a, ep_a),
            GlobalHandle::new(fed_b, ep_b),
            b"hello".to_vec(),
            Time::ZERO,
        );
        assert!(c.upstream.is_empty());
    }

    #[test]
    fn multi_message_unpacks_and_delivers_each_inner_disconnect() {
        let mut c = core();
        let fed_a = c.register_federate("a", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let fed_b = c.register_federate("b", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        c.federate_mut(fed_a).unwrap().state.lifecycle = FederateLifecycle::Executing;
        c.federate_mut(fed_b).unwrap().state.lifecycle = FederateLifecycle::Executing;

        let mut inner_a = ActionMessage::new(ActionCode::Disconnect);
        inner_a.source.fed_id = GlobalFederateId::new(999);
        inner_a.dest.fed_id = fed_a;
        let mut inner_b = ActionMessage::new(ActionCode::Disconnect);
        inner_b.source.fed_id = GlobalFederateId::new(999);
        inner_b.dest.fed_id = fed_b;

        let batch = ActionMessage::pack_multi_message(GlobalFederateId::new(999), &[inner_a, inner_b]).unwrap();
        c.route(batch);

        assert_eq!(c.federate(fed_a).unwrap().state.lifecycle, FederateLifecycle::Finalizing);
        assert_eq!(c.federate(fed_b).unwrap().state.lifecycle, FederateLifecycle::Finalizing);
    }

    #[test]
    fn filter_result_clears_the_block_and_emits_unblock() {
        let mut c = core();
        let fed = c.register_federate("f", CoordinatorVariant::Distributed { restrictive_time_policy: false });
        let ep = c.register_interface(fed, InterfaceKind::Endpoint, "f/ep", "", "", Flags::empty()).unwrap();
        c.federate_mut(fed).unwrap().state.lifecycle = FederateLifecycle::Executing;

        c.register_filter(
            crate::filter::FilterInfo {
                core_id: c.id,
                handle: InterfaceHandle::from(50usize),
                key: "delay".into(),
                in_type: String::new(),
                out_type: String::new(),
                op: crate::filter::FilterKind::NonCloning(Box::new(|mut m| {
                    m.action = ActionCode::SendForFilterAndReturn;
                    Some(m)
                })),
                source_targets: vec![],
                dest_targets: vec![],
                disconnected: false,
            },
            Some(ep),
        );

        let out = c.send_message(GlobalHandle::new(fed, ep), GlobalHandle::new(fed, ep), b"x".to_vec(), Time::ZERO);
        assert!(out.iter().any(|m| m.action == ActionCode::TimeBlock));
        assert!(c.filters.is_blocked(fed));

        // Only filter allocated in this Core, so its sequence id is the first one handed out.
        let mut result = ActionMessage::new(ActionCode::FilterResult);
        result.dest.fed_id = fed;
        result.sequence_id = 0;
        let emitted = c.route(result);

        assert!(!c.filters.is_blocked(fed));
        assert!(emitted.iter().any(|m| m.action == ActionCode::TimeUnblock));
    }
}
