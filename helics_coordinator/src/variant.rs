//! The coordinator variant sum type.
//!
//! The original HELICS core expresses `Distributed`/`Forwarding`/`Global`/
//! `Async` as subclasses of `BaseTimeCoordinator`, overriding
//! `updateTimeFactors`, `checkExecEntry`, and `transmitTimingMessages*`.
//! Here they are variants of one enum; [`CoordinatorVariant`] dispatches to
//! the free functions in [`crate::distributed`], [`crate::forwarding`],
//! [`crate::global`], and [`crate::asynch`] instead of relying on virtual
//! calls, and [`CoordinatorBase`] carries the state every variant shares.

use helics_core::{GlobalFederateId, Time};
use helics_message::ActionMessage;

use crate::asynch;
use crate::base::CoordinatorBase;
use crate::distributed::{self, GrantEvaluation};
use crate::forwarding;
use crate::global::{self, GlobalRound};

/// Which time-coordination strategy a node runs. Chosen once, at node
/// construction, from the federate/core/broker's configured flags.
#[derive(Debug, Clone)]
pub enum CoordinatorVariant {
    /// A core hosting federates that perform time-stepped work.
    Distributed { restrictive_time_policy: bool },
    /// A broker/core interior node that only routes timing traffic.
    Forwarding,
    /// A single root authority grants for the whole federation.
    Global { round: Option<GlobalRound> },
    /// No time synchronization.
    Async,
}

/// A coordinator variant paired with the dependency-graph state it shares
/// with every other variant.
pub struct TimeCoordinator {
    pub base: CoordinatorBase,
    pub variant: CoordinatorVariant,
}

impl TimeCoordinator {
    pub fn new(own_id: GlobalFederateId, variant: CoordinatorVariant) -> Self {
        TimeCoordinator {
            base: CoordinatorBase::new(own_id),
            variant,
        }
    }

    /// `iterative` distinguishes an exec entry made with
    /// `iterate_if_needed`/`force_iteration` set on the triggering
    /// `CMD_EXEC_REQUEST` from a plain one; threaded through to
    /// [`CoordinatorBase::entering_exec_mode`] so the TIMING_INFO
    /// broadcast it produces can be told apart by a later iteration round.
    pub fn entering_exec_mode(&mut self, iterative: bool) -> Vec<ActionMessage> {
        self.base.entering_exec_mode(iterative)
    }

    pub fn disconnect(&mut self) -> Vec<ActionMessage> {
        self.base.disconnect()
    }

    /// Dispatches a time-request evaluation to the active variant.
    /// `Distributed` runs the full seven-rule evaluation against the
    /// dependency graph; `Async` grants immediately and unconditionally,
    /// matching "each federate runs freely" once executing is entered.
    /// `Forwarding`/`Global` aggregate instead, via
    /// [`TimeCoordinator::transmit_timing_messages`] and the
    /// `request_current_time`/`broadcast_global_grant` round, so they
    /// return `None` here.
    pub fn evaluate_grant(&self, requested_time: Time, own_te: Time, current_round: i32) -> Option<GrantEvaluation> {
        match &self.variant {
            CoordinatorVariant::Distributed { restrictive_time_policy } => Some(distributed::evaluate_grant(
                &self.base.dependencies,
                requested_time,
                own_te,
                *restrictive_time_policy,
                current_round,
            )),
            CoordinatorVariant::Async => Some(asynch::evaluate_grant(requested_time)),
            _ => None,
        }
    }

    /// Dispatches the forwarding-node aggregation; only meaningful for
    /// [`CoordinatorVariant::Forwarding`].
    pub fn transmit_timing_messages(&self, candidate: Time) -> Vec<ActionMessage> {
        match &self.variant {
            CoordinatorVariant::Forwarding => forwarding::transmit_timing_messages(&self.base, candidate),
            _ => Vec::new(),
        }
    }

    /// Starts a global round; only meaningful for
    /// [`CoordinatorVariant::Global`].
    pub fn request_current_time(&mut self, next_event: Time) -> Vec<ActionMessage> {
        if !matches!(self.variant, CoordinatorVariant::Global { .. }) {
            return Vec::new();
        }
        let (round, msgs) = global::request_current_time(&mut self.base, next_event);
        if let CoordinatorVariant::Global { round: slot } = &mut self.variant {
            *slot = Some(round);
        }
        msgs
    }

    pub fn global_round_can_close(&self) -> bool {
        match &self.variant {
            CoordinatorVariant::Global { round: Some(round) } => global::round_can_close(round, &self.base.dependencies),
            _ => false,
        }
    }

    pub fn broadcast_global_grant(&mut self, grant_time: Time) -> Vec<ActionMessage> {
        let msgs = global::broadcast_grant(&self.base, grant_time);
        if let CoordinatorVariant::Global { round } = &mut self.variant {
            *round = None;
        }
        msgs
    }
}
