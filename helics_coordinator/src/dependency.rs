//! Per-peer timing state: what one node knows about one dependency or
//! dependent, and the ordered collection of all of them.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use helics_core::{GlobalFederateId, Time};

/// The state of a node's (or dependency's) progress through a time/init
/// request round.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeState {
    Initialized,
    ExecRequested,
    ExecRequestedIterative,
    ExecRequestedRequireIteration,
    TimeGranted,
    TimeRequested,
    TimeRequestedIterative,
    TimeRequestedRequireIteration,
    Error,
}

impl TimeState {
    pub fn is_iterative(&self) -> bool {
        matches!(
            self,
            TimeState::ExecRequestedIterative
                | TimeState::ExecRequestedRequireIteration
                | TimeState::TimeRequestedIterative
                | TimeState::TimeRequestedRequireIteration
        )
    }

    pub fn requires_iteration(&self) -> bool {
        matches!(
            self,
            TimeState::ExecRequestedRequireIteration | TimeState::TimeRequestedRequireIteration
        )
    }
}

/// What one node knows about one peer's timing progress: its own reported
/// values (`next`, `te`, `min_de`) plus bookkeeping used to decide when a
/// round may close.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeData {
    /// Next time this peer intends to request or has been granted.
    pub next: Time,
    /// Event horizon: earliest time this peer may next produce a visible
    /// event.
    pub te: Time,
    /// Minimum, over this peer's own dependencies, of their event horizons.
    pub min_de: Time,
    /// The federate whose event horizon is the minimum contributor, used
    /// for tie-breaking.
    pub min_fed: GlobalFederateId,
    pub state: TimeState,
    pub sequence_counter: i32,
    pub response_sequence_counter: i32,
    pub interrupted: bool,
    pub non_granting: bool,
    pub triggered: bool,
    pub last_grant: Time,
}

impl Default for TimeData {
    fn default() -> Self {
        TimeData {
            next: Time::ZERO,
            te: Time::MAX_TIME,
            min_de: Time::MAX_TIME,
            min_fed: GlobalFederateId::INVALID,
            state: TimeState::Initialized,
            sequence_counter: 0,
            response_sequence_counter: 0,
            interrupted: false,
            non_granting: false,
            triggered: false,
            last_grant: Time::ZERO,
        }
    }
}

/// How a peer relates to this node in the dependency tree.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    Parent,
    Child,
    /// A self-dependency: this node is both source and sink.
    SelfDependency,
    None,
}

/// A single entry in a node's dependency graph: a peer's [`TimeData`] plus
/// the relationship that peer has to this node.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub fed_id: GlobalFederateId,
    pub connection: Connection,
    /// This node waits on the peer's time.
    pub dependency: bool,
    /// The peer waits on this node's time.
    pub dependent: bool,
    pub timing_version: i8,
    pub disconnected: bool,
    pub data: TimeData,
}

impl DependencyInfo {
    pub fn new(fed_id: GlobalFederateId) -> Self {
        DependencyInfo {
            fed_id,
            connection: Connection::None,
            dependency: false,
            dependent: false,
            timing_version: 0,
            disconnected: false,
            data: TimeData::default(),
        }
    }
}

/// The ordered collection of all of a node's peer [`DependencyInfo`]
/// entries, keyed by [`GlobalFederateId`].
///
/// Iteration order is by id, ascending: the distributed coordinator's
/// outbound messages must be byte-identical given the same inputs, so
/// aggregation over this collection must visit peers in a fixed order
/// rather than hashmap order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct TimeDependencies {
    entries: BTreeMap<GlobalFederateId, DependencyInfo>,
}

impl TimeDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fed_id: GlobalFederateId) -> Option<&DependencyInfo> {
        self.entries.get(&fed_id)
    }

    pub fn get_mut(&mut self, fed_id: GlobalFederateId) -> Option<&mut DependencyInfo> {
        self.entries.get_mut(&fed_id)
    }

    pub fn contains(&self, fed_id: GlobalFederateId) -> bool {
        self.entries.contains_key(&fed_id)
    }

    pub fn entry_or_insert(&mut self, fed_id: GlobalFederateId) -> &mut DependencyInfo {
        self.entries
            .entry(fed_id)
            .or_insert_with(|| DependencyInfo::new(fed_id))
    }

    pub fn remove(&mut self, fed_id: GlobalFederateId) -> Option<DependencyInfo> {
        self.entries.remove(&fed_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DependencyInfo> {
        self.entries.values_mut()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.entries.values().filter(|d| d.dependency)
    }

    pub fn dependents(&self) -> impl Iterator<Item = &DependencyInfo> {
        self.entries.values().filter(|d| d.dependent)
    }

    pub fn parent(&self) -> Option<&DependencyInfo> {
        self.entries
            .values()
            .find(|d| matches!(d.connection, Connection::Parent))
    }

    /// At most one entry may have `connection == Parent`.
    pub fn has_at_most_one_parent(&self) -> bool {
        self.entries
            .values()
            .filter(|d| matches!(d.connection, Connection::Parent))
            .count()
            <= 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_parent_invariant() {
        let mut deps = TimeDependencies::new();
        let a = deps.entry_or_insert(GlobalFederateId::new(1));
        a.connection = Connection::Parent;
        assert!(deps.has_at_most_one_parent());

        let b = deps.entry_or_insert(GlobalFederateId::new(2));
        b.connection = Connection::Parent;
        assert!(!deps.has_at_most_one_parent());
    }

    #[test]
    fn iteration_order_is_by_id() {
        let mut deps = TimeDependencies::new();
        deps.entry_or_insert(GlobalFederateId::new(5));
        deps.entry_or_insert(GlobalFederateId::new(1));
        deps.entry_or_insert(GlobalFederateId::new(3));
        let ids: Vec<_> = deps.iter().map(|d| d.fed_id.raw()).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }
}
