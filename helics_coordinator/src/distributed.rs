//! The Distributed Time Coordinator: the default variant, used by a Core
//! hosting one or more federates that actually perform time-stepped work.
//!
//! Implements the seven grant rules directly rather than through a chain of
//! subclass overrides; each rule is one clearly-named step of
//! [`evaluate_grant`].

use helics_core::{GlobalFederateId, Time};

use crate::dependency::TimeDependencies;
use crate::forwarding::generate_min_time_set;

/// The outcome of evaluating whether a federate's time request may be
/// granted right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantEvaluation {
    /// The time that may be granted. Equal to the requested time only when
    /// the request is fully satisfied; otherwise an intermediate time (an
    /// event interruption) or the prior grant (no progress yet possible).
    pub grantable_time: Time,
    /// An iteration is required at `grantable_time` before any further
    /// advance: either a dependency demanded it, or a tie could not be
    /// resolved deterministically (rules 3/4).
    pub iteration_required: bool,
    /// True if `grantable_time` is strictly less than the requested time:
    /// an event interruption occurred (rule 2) rather than a full grant.
    pub interrupted: bool,
}

/// Applies rules 1-7 against the current dependency graph to decide the
/// grantable time for a request of `requested_time`, given this node's own
/// event horizon `own_te`.
///
/// `current_round` is this node's current `sequenceCounter`; dependencies
/// that have not yet caught up to it block the grant (rule: a node may
/// only grant when all dependencies with `next <= candidate` have
/// `sequence_counter >= current_round`).
pub fn evaluate_grant(
    deps: &TimeDependencies,
    requested_time: Time,
    own_te: Time,
    restrictive_time_policy: bool,
    current_round: i32,
) -> GrantEvaluation {
    let set = generate_min_time_set(deps.iter(), None);

    // Rule 1 + 6: no *granting* dependency may be passed; non-granting
    // dependencies contribute event-time information (via `set.min_te`)
    // but never bound the grant itself.
    let granting_min_next = deps
        .dependencies()
        .filter(|d| !d.data.non_granting && !d.disconnected)
        .map(|d| d.data.next)
        .min()
        .unwrap_or(Time::MAX_TIME);
    let mut candidate = requested_time.min(granting_min_next);

    // Rule 2: event horizon — a time_granted dependency's Te bounds the
    // grant (an already-advanced peer may still emit an event earlier than
    // our requested time).
    let any_granted = deps
        .dependencies()
        .any(|d| matches!(d.data.state, crate::dependency::TimeState::TimeGranted));
    if any_granted || restrictive_time_policy {
        candidate = candidate.min(set.min_te).min(own_te);
    }

    let interrupted = candidate < requested_time;

    // Rule 3/4: an unresolved tie at the candidate time forces an
    // iteration rather than a silent, possibly-wrong grant.
    let tie_unresolved = (set.min_tdemin == Time::MIN_TIME && set.min_next == candidate)
        || (set.min_fed == GlobalFederateId::INVALID
            && set.min_tso == candidate
            && deps.dependencies().filter(|d| !d.dependent).count() > 1);

    // Rule 7: wait-for-current-time — block one extra round if a
    // dependency reports a pending value exactly at the requested time
    // that has not yet been confirmed by this round's sequence counter.
    let blocked_on_round = deps
        .dependencies()
        .any(|d| d.data.next <= candidate && d.data.sequence_counter < current_round);

    if blocked_on_round {
        let prior = deps
            .dependencies()
            .map(|d| d.data.last_grant)
            .max()
            .unwrap_or(Time::ZERO);
        return GrantEvaluation {
            grantable_time: prior,
            iteration_required: false,
            interrupted: false,
        };
    }

    GrantEvaluation {
        grantable_time: candidate,
        iteration_required: tie_unresolved,
        interrupted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::Connection;
    use helics_core::GlobalFederateId;

    fn deps_with(next_times: &[(i32, f64)]) -> TimeDependencies {
        let mut deps = TimeDependencies::new();
        for (id, t) in next_times {
            let entry = deps.entry_or_insert(GlobalFederateId::new(*id));
            entry.connection = Connection::Child;
            entry.dependency = true;
            entry.dependent = true;
            entry.data.next = Time::from_seconds(*t);
            entry.data.sequence_counter = 1;
        }
        deps
    }

    #[test]
    fn grant_is_bounded_by_minimum_dependency() {
        let deps = deps_with(&[(2, 1.0), (3, 5.0)]);
        let eval = evaluate_grant(&deps, Time::from_seconds(10.0), Time::MAX_TIME, false, 1);
        assert_eq!(eval.grantable_time, Time::from_seconds(1.0));
        assert!(eval.interrupted);
    }

    #[test]
    fn grant_matches_request_when_no_dependency_blocks() {
        let deps = deps_with(&[(2, 10.0)]);
        let eval = evaluate_grant(&deps, Time::from_seconds(2.0), Time::MAX_TIME, false, 1);
        assert_eq!(eval.grantable_time, Time::from_seconds(2.0));
        assert!(!eval.interrupted);
    }
}
