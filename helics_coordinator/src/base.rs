//! Shared dependency-graph bookkeeping common to every coordinator variant.
//!
//! The original implementation expressed this as `BaseTimeCoordinator`, an
//! abstract base class with the `Distributed`/`Forwarding`/`Global`/`Async`
//! flavors inheriting from it. Here the shared state and methods live in
//! [`CoordinatorBase`], a plain struct each variant in
//! [`crate::variant::CoordinatorVariant`] holds and delegates to; divergent
//! behavior is dispatched on the variant itself rather than through virtual
//! calls.

use helics_core::{GlobalFederateId, HelicsError, Result, Time};
use helics_message::{ActionCode, ActionMessage, Flags};

use crate::dependency::{Connection, TimeData, TimeDependencies, TimeState};

/// Bumped whenever the wire-visible meaning of a TIMING_INFO payload
/// changes; carried so a peer can detect a protocol mismatch early instead
/// of failing confusingly deep in a time-grant round.
pub const TIME_COORDINATOR_VERSION: i32 = 1;

/// Dependency-graph state and operations shared by every coordinator
/// variant.
#[derive(Debug, Clone)]
pub struct CoordinatorBase {
    pub own_id: GlobalFederateId,
    pub dependencies: TimeDependencies,
    /// True once every child in the dependency graph has been confirmed to
    /// be a leaf federate (no sub-brokers beneath this node).
    pub federates_only: bool,
    /// Disables the second-order look-ahead projections in the distributed
    /// algorithm: grant exactly the minimum with no speculative advance.
    pub restrictive_time_policy: bool,
    sequence_counter: i32,
}

impl CoordinatorBase {
    pub fn new(own_id: GlobalFederateId) -> Self {
        CoordinatorBase {
            own_id,
            dependencies: TimeDependencies::new(),
            federates_only: false,
            restrictive_time_policy: false,
            sequence_counter: 0,
        }
    }

    pub fn next_sequence(&mut self) -> i32 {
        self.sequence_counter += 1;
        self.sequence_counter
    }

    pub fn current_sequence(&self) -> i32 {
        self.sequence_counter
    }

    pub fn add_dependency(&mut self, fed_id: GlobalFederateId) {
        self.dependencies.entry_or_insert(fed_id).dependency = true;
    }

    pub fn add_dependent(&mut self, fed_id: GlobalFederateId) {
        self.dependencies.entry_or_insert(fed_id).dependent = true;
    }

    pub fn remove_dependency(&mut self, fed_id: GlobalFederateId) {
        if let Some(dep) = self.dependencies.get_mut(fed_id) {
            dep.dependency = false;
        }
    }

    pub fn remove_dependent(&mut self, fed_id: GlobalFederateId) {
        if let Some(dep) = self.dependencies.get_mut(fed_id) {
            dep.dependent = false;
        }
    }

    /// Marks `fed_id` as a child. A self-dependency (`fed_id == own_id`) is
    /// recorded with `connection = SelfDependency` regardless.
    pub fn set_as_child(&mut self, fed_id: GlobalFederateId) {
        let entry = self.dependencies.entry_or_insert(fed_id);
        entry.connection = if fed_id == self.own_id {
            Connection::SelfDependency
        } else {
            Connection::Child
        };
    }

    /// Marks `fed_id` as the (sole) parent. Fails if another entry already
    /// holds that role: at most one parent may exist in the graph.
    pub fn set_as_parent(&mut self, fed_id: GlobalFederateId) -> Result<()> {
        if let Some(existing) = self.dependencies.parent() {
            if existing.fed_id != fed_id {
                return Err(HelicsError::InvalidStateTransition {
                    from: format!("parent={:?}", existing.fed_id),
                    attempted: format!("set_as_parent({fed_id:?})"),
                });
            }
            return Ok(());
        }
        let entry = self.dependencies.entry_or_insert(fed_id);
        entry.connection = if fed_id == self.own_id {
            Connection::SelfDependency
        } else {
            Connection::Parent
        };
        Ok(())
    }

    /// Diagnoses common misconfigurations: no parent recorded at all when
    /// one is expected, and timing-version skew between peers.
    pub fn check_dependency_graph_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !self.dependencies.has_at_most_one_parent() {
            issues.push("more than one parent in dependency graph".to_string());
        }
        for dep in self.dependencies.iter() {
            if dep.timing_version != 0 && dep.timing_version as i32 != TIME_COORDINATOR_VERSION {
                issues.push(format!(
                    "timing version skew with {:?}: peer={} local={}",
                    dep.fed_id, dep.timing_version, TIME_COORDINATOR_VERSION
                ));
            }
        }
        issues
    }

    /// Records whether every child in the dependency graph is a leaf
    /// federate (as opposed to a sub-broker). A caller that owns the
    /// child-registry knowledge needed to answer this (a
    /// [`Broker`](crate) aggregating Cores and sub-brokers) calls this
    /// before [`CoordinatorBase::entering_exec_mode`]; a Core's
    /// per-federate coordinator has no children and leaves the default
    /// (`false`) in place.
    pub fn set_federates_only(&mut self, federates_only: bool) {
        self.federates_only = federates_only;
    }

    /// Runs on entry to executing mode: validates the dependency graph and
    /// broadcasts a TIMING_INFO carrying this node's protocol version to
    /// every dependent. `iterative` marks the triggering `CMD_EXEC_REQUEST`
    /// as carrying `iterate_if_needed`/`force_iteration`, set on the
    /// broadcast TIMING_INFO's `ITERATION_REQUESTED_FLAG` so a dependent
    /// can tell an iterative exec entry from a plain one.
    pub fn entering_exec_mode(&mut self, iterative: bool) -> Vec<ActionMessage> {
        let issues = self.check_dependency_graph_issues();
        if !issues.is_empty() {
            tracing::warn!(fed = ?self.own_id, ?issues, "dependency graph issues on entering executing mode");
        }
        tracing::debug!(fed = ?self.own_id, dependents = self.dependencies.dependents().count(), iterative, "entering executing mode");
        self.dependencies
            .dependents()
            .map(|dep| {
                let mut msg = ActionMessage::new(ActionCode::TimingInfo);
                msg.source.fed_id = self.own_id;
                msg.dest.fed_id = dep.fed_id;
                msg.extra_data = TIME_COORDINATOR_VERSION;
                if iterative {
                    msg.flags.set(helics_message::flags::ITERATION_REQUESTED_FLAG);
                }
                msg
            })
            .collect()
    }

    /// Sends CMD_DISCONNECT to every dependent not already disconnected.
    /// Idempotent: a second call with nothing left to notify returns an
    /// empty vector. Multiple notifications are packed into a single
    /// MULTI_MESSAGE.
    pub fn disconnect(&mut self) -> Vec<ActionMessage> {
        let targets: Vec<GlobalFederateId> = self
            .dependencies
            .dependents()
            .filter(|d| !d.disconnected)
            .map(|d| d.fed_id)
            .collect();

        for target in &targets {
            if let Some(dep) = self.dependencies.get_mut(*target) {
                dep.disconnected = true;
            }
        }

        if targets.is_empty() {
            return Vec::new();
        }

        if targets.len() == 1 {
            let mut msg = ActionMessage::new(ActionCode::Disconnect);
            msg.source.fed_id = self.own_id;
            msg.dest.fed_id = targets[0];
            return vec![msg];
        }

        let inner: Vec<ActionMessage> = targets
            .into_iter()
            .map(|target| {
                let mut inner = ActionMessage::new(ActionCode::Disconnect);
                inner.source.fed_id = self.own_id;
                inner.dest.fed_id = target;
                inner
            })
            .collect();
        let batch = ActionMessage::pack_multi_message(self.own_id, &inner)
            .expect("disconnect messages always fit in a frame");
        vec![batch]
    }

    /// Constructs the outbound control message for `(dep, target)`
    /// deterministically from `dep`'s state, per the TimeState dispatch
    /// table: the same inputs always produce the same message content
    /// (aside from timestamps set by the caller).
    pub fn generate_time_request(
        &self,
        dep: &TimeData,
        target_fed: GlobalFederateId,
        response_code: i32,
    ) -> ActionMessage {
        let mut msg = match dep.state {
            TimeState::TimeGranted => {
                let mut m = ActionMessage::new(ActionCode::TimeGrant);
                m.action_time = dep.next;
                m
            }
            TimeState::TimeRequested => {
                let mut m = ActionMessage::new(ActionCode::TimeRequest);
                m.te = dep.te;
                m.tdemin = dep.min_de.min(dep.te);
                m.extra_data = dep.min_fed.raw();
                m.counter = response_code as i16;
                m
            }
            TimeState::TimeRequestedIterative => {
                let mut m = ActionMessage::new(ActionCode::TimeRequest);
                m.flags.set(helics_message::flags::ITERATE_IF_NEEDED_FLAG);
                m.te = dep.te;
                m.tdemin = dep.min_de.min(dep.te);
                m.extra_data = dep.min_fed.raw();
                m.counter = response_code as i16;
                m
            }
            TimeState::TimeRequestedRequireIteration => {
                let mut m = ActionMessage::new(ActionCode::TimeRequest);
                m.flags.set(helics_message::flags::FORCE_ITERATION_FLAG);
                m.te = dep.te;
                m.tdemin = dep.min_de.min(dep.te);
                m.extra_data = dep.min_fed.raw();
                m.counter = response_code as i16;
                m
            }
            TimeState::ExecRequested => {
                let mut m = ActionMessage::new(ActionCode::ExecRequest);
                m.action_time = Time::ZERO;
                m
            }
            TimeState::ExecRequestedIterative => {
                let mut m = ActionMessage::new(ActionCode::ExecRequest);
                m.flags.set(helics_message::flags::ITERATE_IF_NEEDED_FLAG);
                m
            }
            TimeState::ExecRequestedRequireIteration => {
                let mut m = ActionMessage::new(ActionCode::ExecRequest);
                m.flags.set(helics_message::flags::FORCE_ITERATION_FLAG);
                m
            }
            TimeState::Error => ActionMessage::new(ActionCode::Ignore),
            TimeState::Initialized => {
                if response_code != 0 {
                    let mut m = ActionMessage::new(ActionCode::Ignore);
                    m.extra_data = dep.min_fed.raw();
                    m
                } else {
                    let mut m = ActionMessage::new(ActionCode::ExecGrant);
                    m.extra_data = dep.min_fed.raw();
                    m
                }
            }
        };
        msg.source.fed_id = self.own_id;
        msg.dest.fed_id = target_fed;
        if matches!(msg.action, ActionCode::Ignore) {
            msg.flags = Flags::empty();
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_parent_enforced() {
        let mut base = CoordinatorBase::new(GlobalFederateId::new(1));
        base.set_as_parent(GlobalFederateId::new(2)).unwrap();
        assert!(base.set_as_parent(GlobalFederateId::new(3)).is_err());
        // Re-asserting the same parent is fine.
        base.set_as_parent(GlobalFederateId::new(2)).unwrap();
    }

    #[test]
    fn disconnect_is_idempotent() {
        let mut base = CoordinatorBase::new(GlobalFederateId::new(1));
        base.add_dependent(GlobalFederateId::new(2));
        base.add_dependent(GlobalFederateId::new(3));
        let first = base.disconnect();
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0].action, ActionCode::MultiMessage));
        let second = base.disconnect();
        assert!(second.is_empty());
    }

    #[test]
    fn generate_time_request_is_deterministic() {
        let base = CoordinatorBase::new(GlobalFederateId::new(1));
        let mut dep = TimeData::default();
        dep.state = TimeState::TimeRequested;
        dep.next = Time::from_seconds(2.0);
        dep.te = Time::from_seconds(2.5);
        let a = base.generate_time_request(&dep, GlobalFederateId::new(9), 0);
        let b = base.generate_time_request(&dep, GlobalFederateId::new(9), 0);
        assert_eq!(a, b);
    }
}
