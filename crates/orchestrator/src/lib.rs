pub mod agent;
pub mod agents;
pub mod config;
pub mod core;
pub mod error;
pub mod process;
pub mod registry;
pub mod resources;

pub use agent::{Agent, InvocationContext, OperationInput, OperationSpec};
pub use config::OrchestratorConfig;
pub use core::{InvocationSpec, PhaseCoordinator, PhaseDefinition};
pub use error::{InvocationError, OrchestratorError, Result};
pub use registry::AgentRegistry;
