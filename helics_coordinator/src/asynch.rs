//! The Async Time Coordinator: no time synchronization at all. Entry to
//! executing mode is the only barrier; afterward every federate runs
//! freely with no grant protocol. Used for real-time, discard-data, or
//! purely command-driven federations where correctness does not depend on
//! simulated time ordering.

use helics_core::Time;
use helics_message::{ActionCode, ActionMessage};

use crate::base::CoordinatorBase;
use crate::distributed::GrantEvaluation;

/// Grants whatever is requested, unconditionally: no iteration, no
/// interruption, no dependency check.
pub fn evaluate_grant(requested_time: Time) -> GrantEvaluation {
    GrantEvaluation {
        grantable_time: requested_time,
        iteration_required: false,
        interrupted: false,
    }
}

/// Entry into executing mode still requires every dependency to have
/// acknowledged EXEC_GRANT once; this is the only synchronization point
/// an async federation has.
pub fn exec_entry_satisfied(base: &CoordinatorBase) -> bool {
    base.dependencies
        .dependencies()
        .all(|d| d.disconnected || d.data.state == crate::dependency::TimeState::TimeGranted)
}

/// Grants any time a federate requests immediately: there is no dependency
/// check, no sequencing, no grant horizon.
pub fn grant_immediately(base: &CoordinatorBase, requester: helics_core::GlobalFederateId, requested_time: helics_core::Time) -> ActionMessage {
    let mut msg = ActionMessage::new(ActionCode::TimeGrant);
    msg.source.fed_id = base.own_id;
    msg.dest.fed_id = requester;
    msg.action_time = requested_time;
    msg
}
