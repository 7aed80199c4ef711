use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::{CoreError, Result};

/// The four fixed phases of the BMAD workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Benchmark,
    Model,
    Analyze,
    Deliver,
}

impl PhaseName {
    pub const ALL: [PhaseName; 4] = [
        PhaseName::Benchmark,
        PhaseName::Model,
        PhaseName::Analyze,
        PhaseName::Deliver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benchmark => "benchmark",
            Self::Model => "model",
            Self::Analyze => "analyze",
            Self::Deliver => "deliver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "benchmark" => Some(Self::Benchmark),
            "model" => Some(Self::Model),
            "analyze" => Some(Self::Analyze),
            "deliver" => Some(Self::Deliver),
            _ => None,
        }
    }

    /// Kind of argument the phase accepts.
    pub fn argument_kind(&self) -> ArgumentKind {
        match self {
            Self::Benchmark | Self::Deliver => ArgumentKind::Url,
            Self::Analyze => ArgumentKind::Path,
            Self::Model => ArgumentKind::Requirements,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Benchmark => "performance, competitive and content analysis of a site",
            Self::Model => "component planning and best-practice gathering",
            Self::Analyze => "security scan and browser compatibility of a code tree",
            Self::Deliver => "final security check and end-to-end deployment testing",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownPhase(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    Url,
    Path,
    Requirements,
}

impl ArgumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Path => "path",
            Self::Requirements => "requirements",
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated argument handed to a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PhaseArgument {
    Url(Url),
    Path(PathBuf),
    Requirements(Vec<String>),
}

impl PhaseArgument {
    /// Parse and validate an http(s) URL with a host.
    pub fn url(raw: &str) -> Result<Self> {
        let parsed = Url::parse(raw.trim())
            .map_err(|e| CoreError::invalid_argument(ArgumentKind::Url, raw, e.to_string()))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoreError::invalid_argument(
                ArgumentKind::Url,
                raw,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if parsed.host_str().is_none() {
            return Err(CoreError::invalid_argument(
                ArgumentKind::Url,
                raw,
                "missing host",
            ));
        }

        Ok(Self::Url(parsed))
    }

    pub fn path(raw: impl Into<PathBuf>) -> Result<Self> {
        let path = raw.into();
        if path.as_os_str().is_empty() {
            return Err(CoreError::invalid_argument(
                ArgumentKind::Path,
                "",
                "path must not be empty",
            ));
        }
        Ok(Self::Path(path))
    }

    /// Blank entries are dropped.
    pub fn requirements<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items
            .into_iter()
            .map(Into::into)
            .map(|s: String| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self::Requirements(items)
    }

    /// Build the argument a phase expects from raw command-line words.
    pub fn parse_for(phase: PhaseName, raw: &[String]) -> Result<Self> {
        match phase.argument_kind() {
            ArgumentKind::Url => match raw {
                [value] => Self::url(value),
                _ => Err(CoreError::invalid_argument(
                    ArgumentKind::Url,
                    raw.join(" "),
                    "expected exactly one URL",
                )),
            },
            ArgumentKind::Path => match raw {
                [value] => Self::path(value),
                _ => Err(CoreError::invalid_argument(
                    ArgumentKind::Path,
                    raw.join(" "),
                    "expected exactly one path",
                )),
            },
            ArgumentKind::Requirements => Ok(Self::requirements(raw.iter().cloned())),
        }
    }

    pub fn kind(&self) -> ArgumentKind {
        match self {
            Self::Url(_) => ArgumentKind::Url,
            Self::Path(_) => ArgumentKind::Path,
            Self::Requirements(_) => ArgumentKind::Requirements,
        }
    }

    /// Fails when the argument kind does not match what `phase` accepts.
    pub fn check_for(&self, phase: PhaseName) -> Result<()> {
        let expected = phase.argument_kind();
        if self.kind() == expected {
            Ok(())
        } else {
            Err(CoreError::ArgumentMismatch {
                phase: phase.to_string(),
                expected,
                actual: self.kind(),
            })
        }
    }
}

impl fmt::Display for PhaseArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Requirements(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_name_parse() {
        assert_eq!(PhaseName::parse("benchmark"), Some(PhaseName::Benchmark));
        assert_eq!(PhaseName::parse("DELIVER"), Some(PhaseName::Deliver));
        assert_eq!(PhaseName::parse("deploy"), None);
        for phase in PhaseName::ALL {
            assert_eq!(PhaseName::parse(phase.as_str()), Some(phase));
        }
    }

    #[test]
    fn test_phase_name_from_str_error() {
        let err = "release".parse::<PhaseName>().unwrap_err();
        assert_eq!(err, CoreError::UnknownPhase("release".to_string()));
    }

    #[test]
    fn test_argument_kinds() {
        assert_eq!(PhaseName::Benchmark.argument_kind(), ArgumentKind::Url);
        assert_eq!(PhaseName::Deliver.argument_kind(), ArgumentKind::Url);
        assert_eq!(PhaseName::Analyze.argument_kind(), ArgumentKind::Path);
        assert_eq!(PhaseName::Model.argument_kind(), ArgumentKind::Requirements);
    }

    #[test]
    fn test_url_validation() {
        assert!(PhaseArgument::url("https://example.test").is_ok());
        assert!(PhaseArgument::url("http://localhost:3000/admin").is_ok());
        assert!(matches!(
            PhaseArgument::url("not a url"),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            PhaseArgument::url("ftp://example.test"),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_parse_for_phase() {
        let arg = PhaseArgument::parse_for(
            PhaseName::Benchmark,
            &["https://example.test".to_string()],
        )
        .unwrap();
        assert_eq!(arg.kind(), ArgumentKind::Url);

        let arg = PhaseArgument::parse_for(PhaseName::Analyze, &["./src".to_string()]).unwrap();
        assert_eq!(arg, PhaseArgument::Path(PathBuf::from("./src")));

        let arg = PhaseArgument::parse_for(
            PhaseName::Model,
            &["admin-dashboard".to_string(), " ".to_string(), "monitoring".to_string()],
        )
        .unwrap();
        assert_eq!(
            arg,
            PhaseArgument::Requirements(vec![
                "admin-dashboard".to_string(),
                "monitoring".to_string()
            ])
        );

        assert!(PhaseArgument::parse_for(PhaseName::Deliver, &[]).is_err());
        assert!(PhaseArgument::parse_for(PhaseName::Analyze, &[String::new()]).is_err());
    }

    #[test]
    fn test_check_for() {
        let arg = PhaseArgument::path("/tmp").unwrap();
        assert!(arg.check_for(PhaseName::Analyze).is_ok());
        assert!(matches!(
            arg.check_for(PhaseName::Benchmark),
            Err(CoreError::ArgumentMismatch {
                expected: ArgumentKind::Url,
                actual: ArgumentKind::Path,
                ..
            })
        ));
    }
}
