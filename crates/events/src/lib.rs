//! Lifecycle events for phase runs
//!
//! The coordinator publishes phase and invocation events on an [`EventBus`];
//! the CLI subscribes to print progress.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
