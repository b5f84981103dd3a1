//! Time Coordinator variants, dependency graph, and federate lifecycle
//! state machine for HELICS (spec §4.3-§4.5).
//!
//! [`base`] carries the dependency-graph state and operations shared by
//! every coordinator variant (what used to be `BaseTimeCoordinator`'s
//! fields and methods); [`distributed`], [`forwarding`], [`global`], and
//! [`asynch`] hold the behavior that diverges per variant; [`variant`]
//! ties them together as one sum type a [`lifecycle::FederateLifecycle`]
//! owns. [`dependency`] is the per-peer timing record every variant reads
//! and writes.
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

pub mod asynch;
pub mod base;
pub mod dependency;
pub mod distributed;
pub mod forwarding;
pub mod global;
pub mod lifecycle;
pub mod variant;

pub use base::{CoordinatorBase, TIME_COORDINATOR_VERSION};
pub use dependency::{Connection, DependencyInfo, TimeData, TimeDependencies, TimeState};
pub use distributed::GrantEvaluation;
pub use forwarding::MinTimeSet;
pub use global::GlobalRound;
pub use lifecycle::FederateLifecycle;
pub use variant::{CoordinatorVariant, TimeCoordinator};
