//! The Broker: an interior node of the federation tree, aggregating the
//! timing dependencies of its children and routing priority traffic
//! between them, per spec §4.1/§4.3.
//!
//! A `Broker` hosts no federates itself. It runs a single `Forwarding`
//! [`TimeCoordinator`] over its children (Cores or sub-brokers), resolves
//! federation-wide name registration, and forwards anything not addressed
//! to one of its direct children up toward the root.

use std::collections::HashMap;

use helics_core::{GlobalBrokerId, GlobalFederateId, HelicsError, Result};
use helics_coordinator::{CoordinatorVariant, TimeCoordinator};
use helics_message::{ActionCode, ActionMessage};

use crate::bus::ActionBus;

/// One child of this broker: a Core hosting federates, or another,
/// nested, sub-broker.
pub struct ChildNode {
    pub id: GlobalFederateId,
    pub name: String,
    pub is_broker: bool,
    pub disconnected: bool,
}

/// A Broker process: the tree-interior node aggregating timing across its
/// children and resolving federation-wide names.
pub struct Broker {
    pub id: GlobalBrokerId,
    pub identifier: String,
    pub coordinator: TimeCoordinator,
    children: HashMap<GlobalFederateId, ChildNode>,
    /// Global name -> owning child, used to answer registration lookups
    /// and route queries by target name rather than id.
    by_name: HashMap<String, GlobalFederateId>,
    next_child_offset: i32,
    pub upstream: Option<ActionBus>,
}

impl Broker {
    /// Constructs the root broker. `upstream` is `None` for the root;
    /// every other broker in the tree is given its parent's bus.
    pub fn new_root(identifier: impl Into<String>) -> Self {
        Broker {
            id: GlobalBrokerId::ROOT_BROKER_ID,
            identifier: identifier.into(),
            coordinator: TimeCoordinator::new(GlobalFederateId::ROOT_BROKER_ID, CoordinatorVariant::Forwarding),
            children: HashMap::new(),
            by_name: HashMap::new(),
            next_child_offset: 1,
            upstream: None,
        }
    }

    pub fn new_child(id: GlobalBrokerId, identifier: impl Into<String>, upstream: ActionBus) -> Self {
        Broker {
            id,
            identifier: identifier.into(),
            coordinator: TimeCoordinator::new(id.as_federate_id(), CoordinatorVariant::Forwarding),
            children: HashMap::new(),
            by_name: HashMap::new(),
            next_child_offset: 1,
            upstream: Some(upstream),
        }
    }

    /// Registers a new Core or sub-broker beneath this broker, assigning
    /// it a federation-wide id derived from this broker's own id plus a
    /// monotonically increasing offset (mirroring the real broker-id
    /// allocation scheme: a child's id always nests inside its parent's
    /// id space).
    pub fn register_child(&mut self, name: impl Into<String>, is_broker: bool) -> Result<GlobalFederateId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(HelicsError::RegistrationFailure(format!("duplicate child name {name:?}")));
        }
        let base = if is_broker { GlobalFederateId::BROKER_ID_OFFSET } else { 0 };
        let child_id = GlobalFederateId::new(self.id.raw() + base + self.next_child_offset);
        self.next_child_offset += 1;
        self.by_name.insert(name.clone(), child_id);
        self.children.insert(
            child_id,
            ChildNode { id: child_id, name, is_broker, disconnected: false },
        );
        if is_broker {
            self.coordinator.base.add_dependent(child_id);
            self.coordinator.base.add_dependency(child_id);
        } else {
            self.coordinator.base.add_dependent(child_id);
        }
        Ok(child_id)
    }

    pub fn resolve_name(&self, name: &str) -> Option<GlobalFederateId> {
        self.by_name.get(name).copied()
    }

    /// Called once this broker's children are all registered, before its
    /// federates enter executing mode: records whether every child is a
    /// leaf Core (no nested sub-brokers) on the coordinator, per §4.3's
    /// "set federatesOnly iff all children are leaf federates" rule.
    pub fn enter_executing_mode(&mut self) -> Vec<ActionMessage> {
        let federates_only = self.children.values().all(|c| !c.is_broker);
        self.coordinator.base.set_federates_only(federates_only);
        self.coordinator.entering_exec_mode(false)
    }

    pub fn children(&self) -> impl Iterator<Item = &ChildNode> {
        self.children.values()
    }

    /// Routes one inbound message: if it targets a direct child, forward
    /// to it; if it targets this broker itself (timing aggregation,
    /// disconnection), process locally; otherwise pass to the upstream
    /// bus toward the root.
    pub fn route(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        if msg.action == ActionCode::MultiMessage {
            return self.route_multi_message(msg);
        }
        if msg.dest.fed_id == self.id.as_federate_id() {
            return self.process_local(msg);
        }
        if self.owns(msg.dest.fed_id) {
            return vec![msg];
        }
        match &self.upstream {
            Some(bus) => {
                bus.send(msg);
                Vec::new()
            }
            None => {
                // Root broker with an unresolvable destination: drop with
                // a trace rather than looping it back to itself.
                tracing::warn!(dest = ?msg.dest, "root broker received message for unknown destination");
                Vec::new()
            }
        }
    }

    /// Depacketizes a `MULTI_MESSAGE` batch and re-injects each inner
    /// message through `route` itself, same as [`crate::core::Core`]'s
    /// handling — a MULTI_MESSAGE is a batching container, not a
    /// deliverable unit, at any hop.
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

    fn owns(&self, id: GlobalFederateId) -> bool {
        self.children.contains_key(&id)
    }

    fn process_local(&mut self, msg: ActionMessage) -> Vec<ActionMessage> {
        match msg.action {
            ActionCode::TimingInfo | ActionCode::TimeRequest | ActionCode::TimeGrant | ActionCode::ExecRequest => {
                self.coordinator.transmit_timing_messages(msg.action_time)
            }
            ActionCode::Disconnect => {
                if let Some(child) = self.children.get_mut(&msg.source.fed_id) {
                    child.disconnected = true;
                }
                self.coordinator.base.remove_dependent(msg.source.fed_id);
                if self.children.values().all(|c| c.disconnected) {
                    self.coordinator.disconnect()
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_children_assigns_distinct_ids() {
        let mut b = Broker::new_root("root");
        let a = b.register_child("core_a", false).unwrap();
        let c = b.register_child("broker_b", true).unwrap();
        assert_ne!(a, c);
        assert!(c.is_broker());
    }

    #[test]
    fn duplicate_child_name_is_rejected() {
        let mut b = Broker::new_root("root");
        b.register_child("core_a", false).unwrap();
        assert!(b.register_child("core_a", false).is_err());
    }

    #[test]
    fn message_for_a_known_child_routes_directly() {
        let mut b = Broker::new_root("root");
        let child = b.register_child("core_a", false).unwrap();
        let mut msg = ActionMessage::new(ActionCode::Query);
        msg.dest.fed_id = child;
        let out = b.route(msg);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn disconnect_from_every_child_triggers_broker_disconnect() {
        let mut b = Broker::new_root("root");
        let a = b.register_child("core_a", false).unwrap();
        let mut msg = ActionMessage::new(ActionCode::Disconnect);
        msg.source.fed_id = a;
        msg.dest.fed_id = b.id.as_federate_id();
        b.route(msg);
    }

    #[test]
    fn multi_message_unpacks_into_independent_routed_messages() {
        let mut b = Broker::new_root("root");
        let child = b.register_child("core_a", false).unwrap();
        let mut a = ActionMessage::new(ActionCode::Query);
        a.dest.fed_id = child;
        let mut c = ActionMessage::new(ActionCode::Query);
        c.dest.fed_id = child;
        let batch = ActionMessage::pack_multi_message(b.id.as_federate_id(), &[a, c]).unwrap();
        let out = b.route(batch);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn federates_only_is_true_when_every_child_is_a_core() {
        let mut b = Broker::new_root("root");
        b.register_child("core_a", false).unwrap();
        b.register_child("core_b", false).unwrap();
        b.enter_executing_mode();
        assert!(b.coordinator.base.federates_only);
    }

    #[test]
    fn federates_only_is_false_when_a_child_is_a_sub_broker() {
        let mut b = Broker::new_root("root");
        b.register_child("core_a", false).unwrap();
        b.register_child("sub_broker", true).unwrap();
        b.enter_executing_mode();
        assert!(!b.coordinator.base.federates_only);
    }
}
