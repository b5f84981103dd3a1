//! §4.5's per-federate message dispatch: the flat table driving
//! `process(cmd, coord, state, grantedMode, localID) -> (newState, result,
//! newMode)`.
//!
//! [`FederateState`] bundles exactly what that table needs: the
//! [`FederateLifecycle`], the federate's [`TimeCoordinator`], and the
//! `granted` flag distinguishing "waiting on a grant" from "free to act".
//! A [`Core`](crate::core::Core) owns one of these per locally-hosted
//! federate.

use helics_core::{GlobalFederateId, HelicsError, Result, Time};
use helics_coordinator::{CoordinatorVariant, FederateLifecycle, TimeCoordinator};
use helics_message::{ActionCode, ActionMessage, Flags};

/// The outcome of one call to [`FederateState::process`], mirroring
/// spec.md §4.5's result vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    /// Nothing further to do; state and mode are final for this call.
    ContinueProcessing,
    /// Execution or time has advanced; the caller may proceed to its next
    /// scheduled step.
    NextStep,
    /// A new iteration round is required at the current time before any
    /// further advance.
    Iterating,
    /// The same message must be processed again, generally with a field
    /// changed by this call (e.g. its destination redirected to the
    /// parent).
    ReprocessMessage,
    /// The caller must requeue this message and retry later: some
    /// precondition (e.g. a dependency not yet caught up to this round)
    /// isn't satisfied yet.
    DelayMessage,
    /// The federate has reached a terminal state; the caller should stop
    /// driving it.
    Halted,
    /// A fatal error occurred; `lifecycle` is now [`FederateLifecycle::Error`].
    ErrorResult,
    /// Nothing to do at the protocol level; the call originated from and
    /// returns directly to the federate's own API caller.
    UserReturn,
}

/// Per-federate lifecycle + time-coordination state, and the §4.5 message
/// dispatch over it.
pub struct FederateState {
    pub id: GlobalFederateId,
    pub lifecycle: FederateLifecycle,
    pub coordinator: TimeCoordinator,
    /// True once the federate's outstanding exec/time request has been
    /// granted and it is free to act; false while a request is in flight.
    pub granted: bool,
    /// The most recently granted time, queryable via `current_time`.
    pub current_time: Time,
}

impl FederateState {
    pub fn new(id: GlobalFederateId, variant: CoordinatorVariant) -> Self {
        FederateState {
            id,
            lifecycle: FederateLifecycle::Created,
            coordinator: TimeCoordinator::new(id, variant),
            granted: false,
            current_time: Time::ZERO,
        }
    }

    /// Dispatches one inbound [`ActionMessage`] per the §4.5 table,
    /// returning the protocol outcome and any messages to emit.
    pub fn process(&mut self, cmd: &ActionMessage) -> (ProcessResult, Vec<ActionMessage>) {
        match cmd.action {
            ActionCode::InitGrant if self.lifecycle == FederateLifecycle::Created => {
                if cmd.flags.is_set(helics_message::flags::ITERATION_REQUESTED_FLAG) {
                    (ProcessResult::Iterating, Vec::new())
                } else {
                    self.lifecycle = FederateLifecycle::Initializing;
                    self.granted = true;
                    (ProcessResult::ContinueProcessing, Vec::new())
                }
            }

            ActionCode::ExecRequest if cmd.source.fed_id == self.id => {
                let iterative = cmd.flags.is_set(helics_message::flags::ITERATE_IF_NEEDED_FLAG)
                    || cmd.flags.is_set(helics_message::flags::FORCE_ITERATION_FLAG);
                let msgs = self.coordinator.entering_exec_mode(iterative);
                self.granted = false;
                (ProcessResult::ContinueProcessing, msgs)
            }

            ActionCode::ExecRequest | ActionCode::ExecGrant => self.process_timing(cmd, true),

            ActionCode::ExecCheck if self.lifecycle == FederateLifecycle::Initializing && !self.granted => {
                match self.coordinator.evaluate_grant(Time::ZERO, Time::MAX_TIME, self.coordinator.base.current_sequence()) {
                    Some(eval) if eval.iteration_required => (ProcessResult::Iterating, Vec::new()),
                    Some(_) => {
                        self.granted = true;
                        (ProcessResult::NextStep, Vec::new())
                    }
                    None => (ProcessResult::ContinueProcessing, Vec::new()),
                }
            }

            ActionCode::TerminateImmediately => {
                self.lifecycle = FederateLifecycle::Finalized;
                (ProcessResult::Halted, Vec::new())
            }

            ActionCode::Stop => {
                let msgs = self.coordinator.disconnect();
                self.lifecycle = FederateLifecycle::Finalized;
                (ProcessResult::Halted, msgs)
            }

            ActionCode::Disconnect if cmd.source.fed_id == self.id => {
                if self.lifecycle.is_terminal() || self.lifecycle == FederateLifecycle::Finalizing {
                    return (ProcessResult::ContinueProcessing, Vec::new());
                }
                let msgs = self.coordinator.disconnect();
                self.lifecycle = FederateLifecycle::Finalizing;
                let mut reprocessed = cmd.clone();
                reprocessed.dest.fed_id = helics_core::GlobalFederateId::ROOT_BROKER_ID;
                let mut out = msgs;
                out.push(reprocessed);
                (ProcessResult::ReprocessMessage, out)
            }

            ActionCode::Disconnect if self.lifecycle == FederateLifecycle::Executing => self.process_timing(cmd, false),

            ActionCode::TimeRequest | ActionCode::TimeGrant
                if self.lifecycle == FederateLifecycle::Executing && !self.granted =>
            {
                self.process_timing(cmd, false)
            }

            ActionCode::ForceTimeGrant => {
                // Per Open Question §9: accepted even mid-iteration,
                // without clearing any iteration counter.
                self.granted = true;
                self.current_time = cmd.action_time;
                (ProcessResult::NextStep, Vec::new())
            }

            ActionCode::Error | ActionCode::LocalError | ActionCode::GlobalError => {
                self.lifecycle = FederateLifecycle::Error;
                (ProcessResult::ErrorResult, Vec::new())
            }

            ActionCode::AddDependency
            | ActionCode::AddDependent
            | ActionCode::RemoveDependency
            | ActionCode::RemoveDependent => {
                self.process_dependency_update(cmd);
                (ProcessResult::ContinueProcessing, Vec::new())
            }

            ActionCode::TimeBlock | ActionCode::TimeUnblock | ActionCode::TimeBarrier | ActionCode::TimeBarrierClear => {
                let reprocess = match self.lifecycle {
                    FederateLifecycle::Initializing => ActionCode::ExecCheck,
                    _ => ActionCode::TimeCheck,
                };
                let mut follow_up = ActionMessage::new(reprocess);
                follow_up.dest = cmd.dest;
                follow_up.source = cmd.source;
                (ProcessResult::ReprocessMessage, vec![follow_up])
            }

            _ => (ProcessResult::ContinueProcessing, Vec::new()),
        }
    }

    /// Updates the corresponding `TimeData` entry from an inbound timing
    /// message and re-evaluates whether a grant may now proceed.
    /// `exec_phase` selects the exec-mode entry path (table rows for
    /// `CMD_EXEC_REQUEST`/`CMD_EXEC_GRANT`) vs. the time-request path.
    fn process_timing(&mut self, cmd: &ActionMessage, exec_phase: bool) -> (ProcessResult, Vec<ActionMessage>) {
        let peer = cmd.source.fed_id;
        let dep = self.coordinator.base.dependencies.entry_or_insert(peer);
        dep.data.next = cmd.action_time;
        dep.data.te = cmd.te;
        dep.data.min_de = cmd.tdemin;
        dep.data.sequence_counter = self.coordinator.base.current_sequence();

        if exec_phase {
            return (ProcessResult::ContinueProcessing, Vec::new());
        }

        match self.coordinator.evaluate_grant(cmd.action_time, cmd.te, self.coordinator.base.current_sequence()) {
            Some(eval) if eval.iteration_required => (ProcessResult::Iterating, Vec::new()),
            Some(eval) => {
                self.granted = true;
                self.current_time = eval.grantable_time;
                let mut grant = ActionMessage::new(ActionCode::TimeGrant);
                grant.source.fed_id = self.id;
                grant.dest = cmd.source;
                grant.action_time = eval.grantable_time;
                if eval.interrupted {
                    grant.flags = Flags::empty().with(helics_message::flags::INTERRUPTED_FLAG);
                }
                (ProcessResult::NextStep, vec![grant])
            }
            None => (ProcessResult::DelayMessage, Vec::new()),
        }
    }

    fn process_dependency_update(&mut self, cmd: &ActionMessage) {
        let peer = cmd.source.fed_id;
        match cmd.action {
            ActionCode::AddDependency => self.coordinator.base.add_dependency(peer),
            ActionCode::AddDependent => self.coordinator.base.add_dependent(peer),
            ActionCode::RemoveDependency => self.coordinator.base.remove_dependency(peer),
            ActionCode::RemoveDependent => self.coordinator.base.remove_dependent(peer),
            _ => unreachable!("process_dependency_update called with non-dependency action"),
        }
    }

    pub fn request_time(&mut self, requested: Time, iterative: bool) -> Result<ActionMessage> {
        if !self.lifecycle.accepts_time_request() {
            return Err(HelicsError::InvalidFunctionCall(format!(
                "time request rejected: federate {:?} is {:?}, not executing",
                self.id, self.lifecycle
            )));
        }
        self.granted = false;
        let mut msg = ActionMessage::new(ActionCode::TimeRequest);
        msg.source.fed_id = self.id;
        msg.action_time = requested;
        if iterative {
            msg.flags.set(helics_message::flags::ITERATE_IF_NEEDED_FLAG);
        }
        Ok(msg)
    }
}
