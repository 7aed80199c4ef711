//! Data model shared by the BMAD orchestrator crates.
//!
//! Phases, their arguments, invocation outcomes and the phase report live
//! here so the CLI, the event bus and the orchestrator agree on one shape.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{CoreError, Result};
