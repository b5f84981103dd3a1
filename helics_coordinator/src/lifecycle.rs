//! The federate lifecycle state machine.
//!
//! Transitions are driven only by CMD_INIT_GRANT, CMD_EXEC_GRANT,
//! CMD_DISCONNECT*, and the error commands — never by direct assignment
//! from unrelated call sites, so every transition funnels through
//! [`FederateLifecycle::apply`] and stays auditable.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use helics_core::{HelicsError, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FederateLifecycle {
    Created,
    Initializing,
    Executing,
    Finalizing,
    Finalized,
    Error,
}

impl FederateLifecycle {
    /// Time requests are rejected unless the federate is `Executing` (or
    /// `Initializing`, for the initial exec-mode request).
    pub fn accepts_time_request(&self) -> bool {
        matches!(self, FederateLifecycle::Executing | FederateLifecycle::Initializing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FederateLifecycle::Finalized | FederateLifecycle::Error)
    }

    /// Applies a lifecycle transition, rejecting any that skip the
    /// `created -> initializing -> executing -> {finalizing -> finalized |
    /// error}` chain.
    pub fn apply(self, next: FederateLifecycle) -> Result<FederateLifecycle> {
        use FederateLifecycle::*;
        let valid = self == next
            || matches!(
                (self, next),
                (Created, Initializing)
                    | (Initializing, Executing)
                    | (Executing, Finalizing)
                    | (Finalizing, Finalized)
                    | (_, Error)
            );
        if valid {
            tracing::debug!(from = ?self, to = ?next, "federate lifecycle transition");
            Ok(next)
        } else {
            tracing::warn!(from = ?self, attempted = ?next, "rejected federate lifecycle transition");
            Err(HelicsError::InvalidStateTransition {
                from: format!("{self:?}"),
                attempted: format!("{next:?}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_lifecycle_chain_is_accepted() {
        let s = FederateLifecycle::Created;
        let s = s.apply(FederateLifecycle::Initializing).unwrap();
        let s = s.apply(FederateLifecycle::Executing).unwrap();
        let s = s.apply(FederateLifecycle::Finalizing).unwrap();
        let s = s.apply(FederateLifecycle::Finalized).unwrap();
        assert_eq!(s, FederateLifecycle::Finalized);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let s = FederateLifecycle::Created;
        assert!(s.apply(FederateLifecycle::Executing).is_err());
    }

    #[test]
    fn error_reachable_from_any_state() {
        assert!(FederateLifecycle::Executing.apply(FederateLifecycle::Error).is_ok());
    }

    #[test]
    fn time_request_rejected_outside_executing_or_initializing() {
        assert!(!FederateLifecycle::Created.accepts_time_request());
        assert!(FederateLifecycle::Initializing.accepts_time_request());
        assert!(FederateLifecycle::Executing.accepts_time_request());
    }
}
