//! Phase definitions.
//!
//! A [`PhaseDefinition`] lists the agent operations a phase invokes, in
//! declaration order, with each invocation's requirement, input binding and
//! optional predecessor. The four BMAD phases ship as builtin definitions.

use bmad_core::{InvocationKey, PhaseName, Requirement};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{OrchestratorError, Result};

/// What an invocation receives as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputBinding {
    /// The argument the phase was started with.
    #[default]
    PhaseArgument,
    /// Nothing.
    None,
}

/// Declaration of one agent-operation call within a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub agent: String,
    pub operation: String,
    pub requirement: Requirement,
    pub input: InputBinding,
    /// Key of an earlier invocation that must resolve before this one starts.
    pub after: Option<InvocationKey>,
    /// Overrides the agent's declared operation timeout.
    pub timeout: Option<Duration>,
}

impl InvocationSpec {
    /// Optional, independent invocation fed with the phase argument.
    pub fn new(agent: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            operation: operation.into(),
            requirement: Requirement::Optional,
            input: InputBinding::PhaseArgument,
            after: None,
            timeout: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.requirement = Requirement::Required;
        self
    }

    pub fn without_input(mut self) -> Self {
        self.input = InputBinding::None;
        self
    }

    pub fn after(mut self, key: impl Into<InvocationKey>) -> Self {
        self.after = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// An invocation with its resolved key and predecessor index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInvocation {
    pub key: InvocationKey,
    pub spec: InvocationSpec,
    pub predecessor: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PhaseDefinition {
    name: PhaseName,
    invocations: Vec<PlannedInvocation>,
}

impl PhaseDefinition {
    /// Validate `specs` and assign invocation keys.
    ///
    /// Keys are agent names, or `agent.operation` for agents listed more than
    /// once. A predecessor must be declared before its dependent.
    pub fn new(name: PhaseName, specs: Vec<InvocationSpec>) -> Result<Self> {
        let mut per_agent: HashMap<&str, usize> = HashMap::new();
        for spec in &specs {
            if spec.agent.is_empty() || spec.operation.is_empty() {
                return Err(OrchestratorError::invalid_definition(
                    name.as_str(),
                    "agent and operation names must not be empty",
                ));
            }
            *per_agent.entry(spec.agent.as_str()).or_default() += 1;
        }

        let keys: Vec<InvocationKey> = specs
            .iter()
            .map(|spec| {
                if per_agent.get(spec.agent.as_str()).copied().unwrap_or(0) > 1 {
                    InvocationKey::operation(&spec.agent, &spec.operation)
                } else {
                    InvocationKey::agent(&spec.agent)
                }
            })
            .collect();

        let mut invocations: Vec<PlannedInvocation> = Vec::with_capacity(specs.len());
        for (index, (key, spec)) in keys.into_iter().zip(specs).enumerate() {
            if invocations.iter().any(|planned| planned.key == key) {
                return Err(OrchestratorError::invalid_definition(
                    name.as_str(),
                    format!("duplicate invocation {}", key),
                ));
            }

            let predecessor = match &spec.after {
                None => None,
                Some(after) => {
                    let position = invocations.iter().position(|planned| &planned.key == after);
                    match position {
                        Some(position) if position < index => Some(position),
                        _ => {
                            return Err(OrchestratorError::invalid_definition(
                                name.as_str(),
                                format!("{} must come after an earlier invocation, not {}", key, after),
                            ))
                        }
                    }
                }
            };

            invocations.push(PlannedInvocation {
                key,
                spec,
                predecessor,
            });
        }

        Ok(Self { name, invocations })
    }

    /// The definition shipped for `name`. No builtin invocation is required.
    pub fn builtin(name: PhaseName) -> Result<Self> {
        let specs = match name {
            PhaseName::Benchmark => vec![
                InvocationSpec::new("playwright", "analyze_performance"),
                InvocationSpec::new("exa", "research_competitors"),
                InvocationSpec::new("firecrawl", "analyze_content"),
            ],
            PhaseName::Model => vec![
                InvocationSpec::new("component-design", "plan_components"),
                InvocationSpec::new("documentation", "gather_best_practices"),
            ],
            PhaseName::Analyze => vec![
                InvocationSpec::new("semgrep", "scan_security"),
                InvocationSpec::new("playwright", "test_browsers"),
            ],
            PhaseName::Deliver => vec![
                InvocationSpec::new("semgrep", "final_check").without_input(),
                InvocationSpec::new("playwright", "test_deployment"),
            ],
        };
        Self::new(name, specs)
    }

    pub fn name(&self) -> PhaseName {
        self.name
    }

    pub fn invocations(&self) -> &[PlannedInvocation] {
        &self.invocations
    }

    pub fn keys(&self) -> Vec<&InvocationKey> {
        self.invocations.iter().map(|planned| &planned.key).collect()
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_definitions() {
        let benchmark = PhaseDefinition::builtin(PhaseName::Benchmark).unwrap();
        assert_eq!(
            benchmark
                .keys()
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>(),
            vec!["playwright", "exa", "firecrawl"]
        );

        for phase in PhaseName::ALL {
            let definition = PhaseDefinition::builtin(phase).unwrap();
            assert_eq!(definition.name(), phase);
            assert!(!definition.is_empty());
            assert!(definition
                .invocations()
                .iter()
                .all(|p| p.spec.requirement == Requirement::Optional && p.predecessor.is_none()));
        }
    }

    #[test]
    fn test_deliver_final_check_takes_no_input() {
        let deliver = PhaseDefinition::builtin(PhaseName::Deliver).unwrap();
        assert_eq!(deliver.invocations()[0].spec.input, InputBinding::None);
        assert_eq!(deliver.invocations()[1].spec.input, InputBinding::PhaseArgument);
    }

    #[test]
    fn test_repeated_agent_gets_operation_keys() {
        let definition = PhaseDefinition::new(
            PhaseName::Analyze,
            vec![
                InvocationSpec::new("playwright", "test_browsers"),
                InvocationSpec::new("playwright", "test_deployment"),
                InvocationSpec::new("semgrep", "scan_security"),
            ],
        )
        .unwrap();

        let keys: Vec<_> = definition.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(
            keys,
            vec!["playwright.test_browsers", "playwright.test_deployment", "semgrep"]
        );
    }

    #[test]
    fn test_duplicate_invocation_rejected() {
        let result = PhaseDefinition::new(
            PhaseName::Deliver,
            vec![
                InvocationSpec::new("semgrep", "final_check"),
                InvocationSpec::new("semgrep", "final_check"),
            ],
        );
        assert!(matches!(result, Err(OrchestratorError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_predecessor_resolution() {
        let definition = PhaseDefinition::new(
            PhaseName::Analyze,
            vec![
                InvocationSpec::new("semgrep", "scan_security"),
                InvocationSpec::new("playwright", "test_browsers").after("semgrep"),
            ],
        )
        .unwrap();
        assert_eq!(definition.invocations()[1].predecessor, Some(0));
    }

    #[test]
    fn test_forward_or_missing_predecessor_rejected() {
        let forward = PhaseDefinition::new(
            PhaseName::Analyze,
            vec![
                InvocationSpec::new("playwright", "test_browsers").after("semgrep"),
                InvocationSpec::new("semgrep", "scan_security"),
            ],
        );
        assert!(forward.is_err());

        let own = PhaseDefinition::new(
            PhaseName::Analyze,
            vec![InvocationSpec::new("semgrep", "scan_security").after("semgrep")],
        );
        assert!(own.is_err());
    }

    #[test]
    fn test_empty_names_rejected() {
        let result = PhaseDefinition::new(PhaseName::Model, vec![InvocationSpec::new("", "op")]);
        assert!(result.is_err());
    }
}
