//! The Global Time Coordinator: a single root authority decides grants for
//! every federate in the federation directly, bypassing the distributed
//! min-time aggregation entirely. Used when `global_timing_flag` is set.

use helics_core::{GlobalFederateId, Time};
use helics_message::{ActionCode, ActionMessage};

use crate::base::CoordinatorBase;
use crate::dependency::TimeDependencies;

/// State of an in-progress global grant round.
#[derive(Debug, Clone, Default)]
pub struct GlobalRound {
    pub sequence_counter: i32,
    pub trigger_time: Time,
    /// Set when a new request arrives while a round is already pending;
    /// forces another round even if every response for the current one
    /// already arrived.
    pub new_request_during_round: bool,
    responses_received: Vec<GlobalFederateId>,
}

impl GlobalRound {
    pub fn start(sequence_counter: i32, trigger_time: Time) -> Self {
        GlobalRound {
            sequence_counter,
            trigger_time,
            new_request_during_round: false,
            responses_received: Vec::new(),
        }
    }

    pub fn record_response(&mut self, fed_id: GlobalFederateId) {
        if !self.responses_received.contains(&fed_id) {
            self.responses_received.push(fed_id);
        }
    }

    /// True once every dependency that is expected to answer has.
    pub fn all_responded(&self, deps: &TimeDependencies) -> bool {
        deps.dependencies()
            .all(|d| d.disconnected || self.responses_received.contains(&d.fed_id))
    }

    /// True if any responding dependency reported `triggered` after this
    /// round began — the round must restart rather than grant on stale
    /// data.
    pub fn any_triggered_since_start(&self, deps: &TimeDependencies) -> bool {
        deps.dependencies().any(|d| d.data.triggered)
    }
}

/// Issues CMD_REQUEST_CURRENT_TIME to every dependency, at
/// `trigger_time = next_event + epsilon`.
pub fn request_current_time(base: &mut CoordinatorBase, next_event: Time) -> (GlobalRound, Vec<ActionMessage>) {
    let trigger_time = next_event.saturating_add(Time::EPSILON);
    let sequence_counter = base.next_sequence();
    let round = GlobalRound::start(sequence_counter, trigger_time);

    let msgs = base
        .dependencies
        .dependencies()
        .filter(|d| !d.disconnected)
        .map(|dep| {
            let mut m = ActionMessage::new(ActionCode::RequestCurrentTime);
            m.source.fed_id = base.own_id;
            m.dest.fed_id = dep.fed_id;
            m.action_time = trigger_time;
            m.sequence_id = sequence_counter;
            m
        })
        .collect();

    (round, msgs)
}

/// Whether the round may close and a grant be broadcast: every dependency
/// responded, matching the round's sequence counter, and nothing became
/// `triggered` in the interval.
pub fn round_can_close(round: &GlobalRound, deps: &TimeDependencies) -> bool {
    round.all_responded(deps) && !round.any_triggered_since_start(deps) && !round.new_request_during_round
}

/// Broadcasts the grant to every dependent once [`round_can_close`] holds.
pub fn broadcast_grant(base: &CoordinatorBase, grant_time: Time) -> Vec<ActionMessage> {
    base.dependencies
        .dependents()
        .map(|dep| {
            let mut m = ActionMessage::new(ActionCode::TimeGrant);
            m.source.fed_id = base.own_id;
            m.dest.fed_id = dep.fed_id;
            m.action_time = grant_time;
            m
        })
        .collect()
}
