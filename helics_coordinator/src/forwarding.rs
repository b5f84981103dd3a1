//! The Forwarding Time Coordinator: used at broker nodes that route timing
//! traffic between cores/sub-brokers but never themselves request a grant.
//!
//! Grounded directly on `ForwardingTimeCoordinator::generateMinTimeSet` /
//! `updateTimeFactors` in the original HELICS core: a forwarding node
//! aggregates its dependencies' `TimeData` into one synthetic time request
//! and republishes it to each dependent, excluding a dependent's own
//! contribution from the aggregate sent back to it so it never waits on
//! itself.

use helics_core::{GlobalFederateId, Time};
use helics_message::ActionMessage;

use crate::base::CoordinatorBase;
use crate::dependency::{DependencyInfo, TimeState};

/// The aggregate of every dependency's `TimeData`, used both to decide
/// what to forward and, with one dependency excluded, to build the
/// per-dependent message that avoids routing a node's own contribution
/// back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinTimeSet {
    pub min_next: Time,
    pub min_te: Time,
    /// Minimum Tso (source-only contribution); invalidated to `Time::MIN_TIME`
    /// when multiple source-only dependencies tie and no single minimum
    /// federate can be identified.
    pub min_tso: Time,
    /// Minimum Tdemin; invalidated to `Time::MIN_TIME` on tie per rule 3.
    pub min_tdemin: Time,
    pub min_fed: GlobalFederateId,
}

impl MinTimeSet {
    fn invalid() -> Self {
        MinTimeSet {
            min_next: Time::MAX_TIME,
            min_te: Time::MAX_TIME,
            min_tso: Time::MAX_TIME,
            min_tdemin: Time::MAX_TIME,
            min_fed: GlobalFederateId::INVALID,
        }
    }
}

/// Computes the aggregate [`MinTimeSet`] over `deps`, optionally excluding
/// one federate (per-downstream customization so a dependent never sees
/// its own contribution reflected back at it).
pub fn generate_min_time_set<'a>(
    deps: impl Iterator<Item = &'a DependencyInfo>,
    exclude: Option<GlobalFederateId>,
) -> MinTimeSet {
    let mut set = MinTimeSet::invalid();
    let mut next_tie_count = 0usize;
    let mut tso_tie_count = 0usize;

    for dep in deps.filter(|d| d.dependency && !d.disconnected) {
        if Some(dep.fed_id) == exclude {
            continue;
        }
        let data = &dep.data;

        if data.next < set.min_next {
            set.min_next = data.next;
            next_tie_count = 1;
        } else if data.next == set.min_next {
            next_tie_count += 1;
        }

        if !data.non_granting && data.te < set.min_te {
            set.min_te = data.te;
        }

        if data.min_de < set.min_tdemin {
            set.min_tdemin = data.min_de;
        }

        // Source-only dependency: contributes a Tso constraint distinct
        // from the grantable-time chain.
        if !dep.dependent {
            if data.next < set.min_tso {
                set.min_tso = data.next;
                set.min_fed = dep.fed_id;
                tso_tie_count = 1;
            } else if data.next == set.min_tso {
                tso_tie_count += 1;
                if dep.fed_id < set.min_fed {
                    set.min_fed = dep.fed_id;
                }
            }
        }
    }

    // Rule 3: when several dependencies report identical `next`, the one
    // whose `min_de > next` is authoritative; otherwise invalidate.
    if next_tie_count > 1 && set.min_tdemin <= set.min_next {
        set.min_tdemin = Time::MIN_TIME;
    }

    // Rule 4: tied Tso with no resolvable minFed invalidates the Tso
    // constraint entirely.
    if tso_tie_count > 1 {
        set.min_fed = GlobalFederateId::INVALID;
    }

    set
}

/// Given the current aggregate and `base`'s dependents, builds one outbound
/// message per dependent — skipping any whose own `next` already exceeds
/// the candidate grant time, and excluding a dependent's own contribution
/// from the aggregate computed for it (to avoid feedback loops between two
/// forwarding nodes).
pub fn transmit_timing_messages(base: &CoordinatorBase, candidate: Time) -> Vec<ActionMessage> {
    let mut out = Vec::new();
    let overall_min_fed = generate_min_time_set(base.dependencies.iter(), None).min_fed;
    for dependent in base.dependencies.dependents() {
        if dependent.data.next > candidate {
            continue;
        }

        let is_self_contributor = dependent.data.next == candidate || dependent.fed_id == overall_min_fed;
        let exclude = is_self_contributor.then_some(dependent.fed_id);

        let set = generate_min_time_set(base.dependencies.iter(), exclude);
        let mut synthetic = TimeState::TimeRequested;
        if set.min_tdemin == Time::MIN_TIME || set.min_tso == Time::MIN_TIME {
            synthetic = TimeState::TimeRequestedIterative;
        }

        let data = crate::dependency::TimeData {
            next: set.min_next,
            te: set.min_te,
            min_de: set.min_tdemin,
            min_fed: set.min_fed,
            state: synthetic,
            ..Default::default()
        };
        out.push(base.generate_time_request(&data, dependent.fed_id, 0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Connection;

    fn dep(id: i32, next: Time, dependency: bool, dependent: bool) -> DependencyInfo {
        let mut d = DependencyInfo::new(GlobalFederateId::new(id));
        d.connection = Connection::Child;
        d.dependency = dependency;
        d.dependent = dependent;
        d.data.next = next;
        d
    }

    #[test]
    fn aggregates_minimum_next_time() {
        let deps = vec![
            dep(2, Time::from_seconds(1.0), true, true),
            dep(3, Time::from_seconds(2.0), true, true),
        ];
        let set = generate_min_time_set(deps.iter(), None);
        assert_eq!(set.min_next, Time::from_seconds(1.0));
    }

    #[test]
    fn tso_tie_invalidates_min_fed() {
        let mut a = dep(2, Time::from_seconds(1.0), true, false);
        a.data.next = Time::from_seconds(1.0);
        let mut b = dep(3, Time::from_seconds(1.0), true, false);
        b.data.next = Time::from_seconds(1.0);
        let deps = vec![a, b];
        let set = generate_min_time_set(deps.iter(), None);
        assert_eq!(set.min_fed, GlobalFederateId::INVALID);
    }

    #[test]
    fn excluded_dependency_is_skipped() {
        let deps = vec![
            dep(2, Time::from_seconds(1.0), true, true),
            dep(3, Time::from_seconds(5.0), true, true),
        ];
        let set = generate_min_time_set(deps.iter(), Some(GlobalFederateId::new(2)));
        assert_eq!(set.min_next, Time::from_seconds(5.0));
    }
}
