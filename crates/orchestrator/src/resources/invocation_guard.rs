//! RAII guard for invocation lifecycle events.
//!
//! Publishes `invocation.started` on creation and makes sure a matching
//! `invocation.finished` follows, even if the task running the invocation
//! panics or is aborted.

use bmad_core::{InvocationKey, Outcome, OutcomeKind};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use events::{Event, EventBus};

/// RAII guard for one invocation.
///
/// When dropped without [`InvocationGuard::finish`] it emits an errored
/// finished event.
///
/// # Example
///
/// ```ignore
/// let mut guard = InvocationGuard::start(
///     run_id, ctx.invocation_id, ctx.key.clone(), "semgrep", "scan_security", bus,
/// );
/// let outcome = agent.invoke("scan_security", &input, &ctx).await;
/// guard.finish(&outcome);
/// ```
pub struct InvocationGuard {
    run_id: Uuid,
    invocation_id: Uuid,
    key: InvocationKey,
    started: Instant,
    event_bus: Option<EventBus>,
    finished: bool,
}

impl InvocationGuard {
    /// Create the guard and publish the started event.
    pub fn start(
        run_id: Uuid,
        invocation_id: Uuid,
        key: InvocationKey,
        agent: &str,
        operation: &str,
        event_bus: Option<EventBus>,
    ) -> Self {
        debug!(
            invocation_id = %invocation_id,
            key = %key,
            "Invocation started"
        );

        if let Some(ref bus) = event_bus {
            bus.emit(Event::InvocationStarted {
                run_id,
                invocation_id,
                key: key.to_string(),
                agent: agent.to_string(),
                operation: operation.to_string(),
            });
        }

        Self {
            run_id,
            invocation_id,
            key,
            started: Instant::now(),
            event_bus,
            finished: false,
        }
    }

    /// Publish the finished event for `outcome`.
    pub fn finish(&mut self, outcome: &Outcome) {
        debug!(
            invocation_id = %self.invocation_id,
            key = %self.key,
            outcome = %outcome.kind(),
            "Invocation finished"
        );
        self.emit_finished(outcome.kind(), outcome.message().map(str::to_string));
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    fn emit_finished(&self, outcome: OutcomeKind, message: Option<String>) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(Event::InvocationFinished {
                run_id: self.run_id,
                invocation_id: self.invocation_id,
                key: self.key.to_string(),
                outcome,
                message,
                duration_ms: self.started.elapsed().as_millis() as u64,
            });
        }
    }
}

impl Drop for InvocationGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                invocation_id = %self.invocation_id,
                key = %self.key,
                "Invocation guard dropped without outcome"
            );

            self.emit_finished(
                OutcomeKind::Errored,
                Some("invocation terminated unexpectedly".to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn guard(bus: Option<EventBus>) -> InvocationGuard {
        InvocationGuard::start(
            Uuid::new_v4(),
            Uuid::new_v4(),
            InvocationKey::agent("exa"),
            "exa",
            "research_competitors",
            bus,
        )
    }

    #[test]
    fn test_guard_initial_state() {
        let guard = guard(None);
        assert!(!guard.is_finished());
        assert!(!guard.invocation_id().is_nil());
    }

    #[tokio::test]
    async fn test_guard_finish_emits_once() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let mut g = guard(Some(bus.clone()));
        g.finish(&Outcome::completed(json!({})));
        assert!(g.is_finished());
        drop(g);

        let started = rx.recv().await.unwrap();
        assert!(matches!(started.event, Event::InvocationStarted { .. }));
        let finished = rx.recv().await.unwrap();
        assert!(matches!(
            finished.event,
            Event::InvocationFinished {
                outcome: OutcomeKind::Completed,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_guard_drop_emits_errored() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        drop(guard(Some(bus.clone())));

        let _started = rx.recv().await.unwrap();
        let finished = rx.recv().await.unwrap();
        match finished.event {
            Event::InvocationFinished {
                outcome, message, ..
            } => {
                assert_eq!(outcome, OutcomeKind::Errored);
                assert_eq!(message.as_deref(), Some("invocation terminated unexpectedly"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
