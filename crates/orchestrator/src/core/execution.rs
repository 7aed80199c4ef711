//! Phase coordinator.
//!
//! Runs a [`PhaseDefinition`] against the [`AgentRegistry`]: every
//! independent invocation is spawned at once, dependent invocations wait for
//! their predecessor, and the coordinator joins all of them before building
//! the report. Each invocation yields exactly one outcome.

use bmad_core::{InvocationKey, Outcome, PhaseArgument, PhaseName, PhaseReport};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use events::{Event, EventBus};

use crate::agent::{Agent, InvocationContext, OperationInput};
use crate::error::{InvocationError, Result};
use crate::registry::AgentRegistry;
use crate::resources::InvocationGuard;

use super::aggregate::{aggregate, InvocationRecord};
use super::phase::{InputBinding, PhaseDefinition};

/// How long a timed-out or cancelled agent gets to terminate its own work.
const DEFAULT_CLEANUP_GRACE: Duration = Duration::from_secs(5);

/// Drives phase runs against an immutable agent registry.
pub struct PhaseCoordinator {
    registry: Arc<AgentRegistry>,
    event_bus: Option<EventBus>,
    cleanup_grace: Duration,
}

/// Everything a spawned invocation task owns.
struct DispatchedInvocation {
    run_id: Uuid,
    key: InvocationKey,
    agent: Arc<dyn Agent>,
    operation: String,
    input: OperationInput,
    timeout: Duration,
    predecessor: Option<watch::Receiver<bool>>,
    done: watch::Sender<bool>,
    cancel: CancellationToken,
    event_bus: Option<EventBus>,
    cleanup_grace: Duration,
}

impl PhaseCoordinator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            event_bus: None,
            cleanup_grace: DEFAULT_CLEANUP_GRACE,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_cleanup_grace(mut self, grace: Duration) -> Self {
        self.cleanup_grace = grace;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run one of the builtin phases.
    ///
    /// Fails only when `argument` is not the kind the phase accepts.
    pub async fn run_phase(
        &self,
        phase: PhaseName,
        argument: &PhaseArgument,
        cancel: &CancellationToken,
    ) -> Result<PhaseReport> {
        argument.check_for(phase)?;
        let definition = PhaseDefinition::builtin(phase)?;
        Ok(self.run(&definition, argument, cancel).await)
    }

    /// Run `definition` to completion. Invocation failures are recorded in the
    /// report, never returned as errors.
    pub async fn run(
        &self,
        definition: &PhaseDefinition,
        argument: &PhaseArgument,
        cancel: &CancellationToken,
    ) -> PhaseReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let phase = definition.name();

        info!(
            run_id = %run_id,
            phase = %phase,
            argument = %argument,
            invocations = definition.len(),
            "Executing phase"
        );
        self.emit(Event::PhaseStarted {
            run_id,
            phase,
            argument: argument.to_string(),
            invocations: definition.len(),
        });

        let mut records: Vec<(InvocationKey, InvocationRecord)> =
            Vec::with_capacity(definition.len());
        let mut done_receivers: Vec<watch::Receiver<bool>> = Vec::with_capacity(definition.len());
        let mut tasks: JoinSet<(usize, InvocationRecord)> = JoinSet::new();

        for (index, planned) in definition.invocations().iter().enumerate() {
            let (done, done_rx) = watch::channel(false);
            done_receivers.push(done_rx);

            let spec = &planned.spec;
            let resolved = self.resolve(&planned.key, &spec.agent, &spec.operation);
            let (agent, declared_timeout) = match resolved {
                Ok(resolved) => resolved,
                Err(error) => {
                    done.send_replace(true);
                    self.emit(Event::Error {
                        run_id,
                        message: error.to_string(),
                        context: Some(planned.key.to_string()),
                    });
                    let outcome = Outcome::from(error);
                    self.emit(Event::InvocationFinished {
                        run_id,
                        invocation_id: Uuid::new_v4(),
                        key: planned.key.to_string(),
                        outcome: outcome.kind(),
                        message: outcome.message().map(str::to_string),
                        duration_ms: 0,
                    });
                    records.push((planned.key.clone(), InvocationRecord::immediate(outcome)));
                    continue;
                }
            };

            let input = match spec.input {
                InputBinding::PhaseArgument => OperationInput::from(argument),
                InputBinding::None => OperationInput::None,
            };

            let dispatched = DispatchedInvocation {
                run_id,
                key: planned.key.clone(),
                agent,
                operation: spec.operation.clone(),
                input,
                timeout: spec.timeout.unwrap_or(declared_timeout),
                predecessor: planned.predecessor.map(|p| done_receivers[p].clone()),
                done,
                cancel: cancel.clone(),
                event_bus: self.event_bus.clone(),
                cleanup_grace: self.cleanup_grace,
            };

            debug!(key = %planned.key, timeout_ms = dispatched.timeout.as_millis() as u64, "Dispatching invocation");
            // The inner task isolates agent panics so the outer one can still
            // report which invocation it was.
            tasks.spawn(async move {
                let mut dispatched = dispatched;
                dispatched.wait_for_turn().await;
                let started_at = Utc::now();
                let record = match tokio::spawn(dispatched.execute()).await {
                    Ok(record) => record,
                    Err(join_error) => {
                        let error = InvocationError::Panicked(panic_message(join_error));
                        InvocationRecord::new(error.into(), started_at)
                    }
                };
                (index, record)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, record)) => {
                    let key = &definition.invocations()[index].key;
                    if let Some(message) = record.outcome.message() {
                        debug!(key = %key, message = %message, "Invocation did not complete");
                    }
                    records.push((key.clone(), record));
                }
                Err(join_error) => {
                    warn!(error = %join_error, "Invocation supervisor task failed");
                    self.emit(Event::Error {
                        run_id,
                        message: join_error.to_string(),
                        context: None,
                    });
                }
            }
        }

        let entries = aggregate(definition, records);
        let report = PhaseReport::new(run_id, phase, argument.to_string(), started_at, entries);

        info!(
            run_id = %run_id,
            phase = %phase,
            status = %report.status,
            duration_ms = report.duration_ms(),
            "Phase completed"
        );
        self.emit(Event::PhaseFinished {
            run_id,
            phase,
            status: report.status,
            duration_ms: report.duration_ms(),
        });

        report
    }

    /// Look up the agent and the timeout of `operation`.
    fn resolve(
        &self,
        key: &InvocationKey,
        agent_name: &str,
        operation: &str,
    ) -> std::result::Result<(Arc<dyn Agent>, Duration), InvocationError> {
        let agent = self.registry.get(agent_name).map_err(|_| {
            warn!(key = %key, agent = %agent_name, "Phase references unregistered agent");
            InvocationError::UnknownAgent
        })?;
        let spec = agent.operation(operation).ok_or_else(|| {
            warn!(key = %key, agent = %agent_name, operation = %operation, "Agent does not support operation");
            InvocationError::UnsupportedOperation(operation.to_string())
        })?;
        Ok((agent, spec.timeout))
    }

    fn emit(&self, event: Event) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(event);
        }
    }
}

impl DispatchedInvocation {
    /// Wait until the predecessor, if any, resolved or the phase is cancelled.
    async fn wait_for_turn(&mut self) {
        if let Some(mut predecessor) = self.predecessor.take() {
            tokio::select! {
                _ = wait_for_predecessor(&mut predecessor) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
    }

    async fn execute(self) -> InvocationRecord {
        let started_at = Utc::now();
        let ctx = InvocationContext::new(self.key.clone(), self.timeout, self.cancel.child_token());
        let mut guard = InvocationGuard::start(
            self.run_id,
            ctx.invocation_id,
            self.key.clone(),
            self.agent.name(),
            &self.operation,
            self.event_bus.clone(),
        );

        let outcome = if self.cancel.is_cancelled() {
            InvocationError::Cancelled.into()
        } else {
            self.invoke_bounded(&ctx).await
        };

        guard.finish(&outcome);
        let record = InvocationRecord::new(outcome, started_at);
        self.done.send_replace(true);
        record
    }

    /// Invoke the agent, enforcing the timeout and phase cancellation.
    ///
    /// On either, the invocation's token is cancelled and the agent gets
    /// `cleanup_grace` to tear down external processes before it is dropped.
    async fn invoke_bounded(&self, ctx: &InvocationContext) -> Outcome {
        let invoke = self.agent.invoke(&self.operation, &self.input, ctx);
        tokio::pin!(invoke);

        let interrupted = tokio::select! {
            outcome = &mut invoke => return outcome,
            _ = tokio::time::sleep(self.timeout) => InvocationError::Timeout,
            _ = self.cancel.cancelled() => InvocationError::Cancelled,
        };

        warn!(key = %self.key, reason = %interrupted, "Invocation interrupted");
        ctx.cancel.cancel();
        if tokio::time::timeout(self.cleanup_grace, &mut invoke).await.is_err() {
            warn!(key = %self.key, "Agent did not stop within the cleanup grace period");
        }

        interrupted.into()
    }
}

/// Resolves once the predecessor signalled completion or its task is gone.
async fn wait_for_predecessor(done: &mut watch::Receiver<bool>) {
    let _ = done.wait_for(|done| *done).await;
}

fn panic_message(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task aborted".to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::OperationSpec;
    use crate::core::phase::InvocationSpec;
    use async_trait::async_trait;
    use bmad_core::PhaseStatus;
    use serde_json::json;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            "echo"
        }

        fn operations(&self) -> Vec<OperationSpec> {
            vec![OperationSpec::new("say", Duration::from_secs(1))]
        }

        async fn invoke(
            &self,
            _operation: &str,
            input: &OperationInput,
            _ctx: &InvocationContext,
        ) -> Outcome {
            Outcome::completed(json!({ "input": input.describe() }))
        }
    }

    fn coordinator() -> PhaseCoordinator {
        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent)).unwrap();
        PhaseCoordinator::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_unsupported_operation_is_errored() {
        let definition = PhaseDefinition::new(
            PhaseName::Model,
            vec![InvocationSpec::new("echo", "shout")],
        )
        .unwrap();
        let report = coordinator()
            .run(
                &definition,
                &PhaseArgument::requirements(["x"]),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            report.entries[0].outcome,
            Outcome::errored("unsupported operation: shout")
        );
        assert_eq!(report.status, PhaseStatus::PartiallyFailed);
    }

    #[tokio::test]
    async fn test_run_phase_rejects_mismatched_argument() {
        let result = coordinator()
            .run_phase(
                PhaseName::Benchmark,
                &PhaseArgument::path("/tmp").unwrap(),
                &CancellationToken::new(),
            )
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_panic_message_from_str() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let err = rt
            .block_on(rt.spawn(async { panic!("boom") }))
            .unwrap_err();
        assert_eq!(panic_message(err), "boom");
    }
}
