mod outcome;
mod phase;
mod report;

pub use outcome::{InvocationKey, Outcome, OutcomeKind, Requirement};
pub use phase::{ArgumentKind, PhaseArgument, PhaseName};
pub use report::{PhaseReport, PhaseStatus, ReportEntry};
