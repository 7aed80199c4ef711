//! RAII guards for invocation lifecycle.
//!
//! - [`InvocationGuard`] - guarantees a finished event for every started invocation

mod invocation_guard;

pub use invocation_guard::InvocationGuard;
