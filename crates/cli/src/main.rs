mod render;

use anyhow::{Context, Result};
use bmad_core::{PhaseArgument, PhaseName, PhaseStatus};
use clap::{Parser, Subcommand, ValueEnum};
use events::EventBus;
use orchestrator::{AgentRegistry, OrchestratorConfig, PhaseCoordinator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BMAD_DIR: &str = ".bmad";
const CONFIG_FILE: &str = "config.toml";
const EXIT_PHASE_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "bmad")]
#[command(about = "Run a BMAD phase and print its report", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to .bmad/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Print lifecycle events to stderr while the phase runs
    #[arg(long, global = true)]
    progress: bool,

    /// Exit with status 2 when the phase fails
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Performance, competitor and content analysis of a URL
    Benchmark { url: Vec<String> },
    /// Component planning for a list of requirements
    Model { requirements: Vec<String> },
    /// Security scan and browser checks of a path
    Analyze { path: Vec<String> },
    /// Final security check and deployment tests of a URL
    Deliver { url: Vec<String> },
    /// List phases and registered agents
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = load_config(cli.config.as_deref()).await?;
    config.validate()?;
    let registry = Arc::new(AgentRegistry::with_defaults(&config)?);

    let (phase, raw) = match cli.command {
        Commands::Benchmark { url } => (PhaseName::Benchmark, url),
        Commands::Model { requirements } => (PhaseName::Model, requirements),
        Commands::Analyze { path } => (PhaseName::Analyze, path),
        Commands::Deliver { url } => (PhaseName::Deliver, url),
        Commands::List => {
            print!("{}", render::listing(&registry));
            return Ok(());
        }
    };

    let argument = phase_argument(phase, raw, &config)?;
    let status = run(phase, argument, registry, cli.format, cli.progress).await?;

    if cli.strict && status == PhaseStatus::Failed {
        std::process::exit(EXIT_PHASE_FAILED);
    }
    Ok(())
}

async fn run(
    phase: PhaseName,
    argument: PhaseArgument,
    registry: Arc<AgentRegistry>,
    format: OutputFormat,
    progress: bool,
) -> Result<PhaseStatus> {
    let mut coordinator = PhaseCoordinator::new(registry);
    let mut printer = None;
    if progress {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        // Ends once the coordinator, and with it the last sender, is dropped.
        printer = Some(tokio::spawn(async move {
            while let Ok(envelope) = rx.recv().await {
                eprintln!(
                    "[{}] {}",
                    envelope.timestamp.format("%H:%M:%S"),
                    envelope.event.summary()
                );
            }
        }));
        coordinator = coordinator.with_event_bus(bus);
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling phase");
            trigger.cancel();
        }
    });

    let report = coordinator
        .run_phase(phase, &argument, &cancel)
        .await
        .with_context(|| format!("Failed to run {} phase", phase))?;

    drop(coordinator);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", render::report(&report)),
    }
    Ok(report.status)
}

/// Build the phase argument, falling back to configured defaults when none is given.
fn phase_argument(
    phase: PhaseName,
    raw: Vec<String>,
    config: &OrchestratorConfig,
) -> Result<PhaseArgument> {
    let raw = if raw.is_empty() {
        default_argument(phase, config)
    } else {
        raw
    };
    let argument = PhaseArgument::parse_for(phase, &raw)?;
    match argument {
        PhaseArgument::Requirements(ref items) if items.is_empty() => Ok(
            PhaseArgument::requirements(config.defaults.requirements.iter().cloned()),
        ),
        argument => Ok(argument),
    }
}

fn default_argument(phase: PhaseName, config: &OrchestratorConfig) -> Vec<String> {
    match phase {
        PhaseName::Benchmark | PhaseName::Deliver => vec![config.defaults.url.clone()],
        PhaseName::Analyze => vec![config.defaults.path.display().to_string()],
        PhaseName::Model => config.defaults.requirements.clone(),
    }
}

async fn load_config(explicit: Option<&Path>) -> Result<OrchestratorConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = std::env::current_dir()?.join(BMAD_DIR).join(CONFIG_FILE);
            if !default.exists() {
                return Ok(OrchestratorConfig::default());
            }
            default
        }
    };

    let content = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config = toml::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bmad=info,orchestrator=info".into()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_phase_and_flags() {
        let cli = Cli::try_parse_from([
            "bmad",
            "benchmark",
            "https://example.test",
            "--format",
            "text",
            "--strict",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.strict);
        assert!(matches!(cli.command, Commands::Benchmark { ref url } if url.len() == 1));
    }

    #[test]
    fn test_cli_rejects_unknown_phase() {
        let err = Cli::try_parse_from(["bmad", "deploy"]).err().unwrap();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_phase_argument_defaults() {
        let config = OrchestratorConfig::default();

        let argument = phase_argument(PhaseName::Benchmark, vec![], &config).unwrap();
        assert_eq!(argument.to_string(), "https://admin.agistaffers.com/");

        let argument = phase_argument(PhaseName::Model, vec![" ".to_string()], &config).unwrap();
        assert_eq!(
            argument,
            PhaseArgument::Requirements(vec![
                "admin-dashboard".to_string(),
                "monitoring".to_string()
            ])
        );
    }

    #[test]
    fn test_phase_argument_rejects_invalid_url() {
        let config = OrchestratorConfig::default();
        assert!(phase_argument(PhaseName::Deliver, vec!["ftp://x".to_string()], &config).is_err());
        assert!(phase_argument(
            PhaseName::Benchmark,
            vec!["https://a.test".to_string(), "https://b.test".to_string()],
            &config
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bmad.toml");
        std::fs::write(&path, "[semgrep]\nrules = \"p/ci\"\n").unwrap();

        let config = load_config(Some(&path)).await.unwrap();
        assert_eq!(config.semgrep.rules, "p/ci");

        let missing = load_config(Some(&dir.path().join("missing.toml"))).await;
        assert!(missing.is_err());
    }
}
