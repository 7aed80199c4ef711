//! Core phase execution model.
//!
//! - [`PhaseDefinition`] - declared invocations of a phase
//! - [`PhaseCoordinator`] - runs a definition against the agent registry
//! - [`aggregate`] - orders outcomes into report entries

mod aggregate;
mod execution;
mod phase;

pub use aggregate::{aggregate, InvocationRecord};
pub use execution::PhaseCoordinator;
pub use phase::{InputBinding, InvocationSpec, PhaseDefinition, PlannedInvocation};
