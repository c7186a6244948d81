//! Declarative agent stack configuration (`asc.toml`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::types::{ModelKind, Phase};
use crate::validation::{Validate, ValidationIssue, ValidationLevel};

pub const DEFAULT_CONFIG_FILE: &str = "asc.toml";
pub const DEFAULT_BEADS_DB_PATH: &str = "./project-repo";
pub const DEFAULT_MCP_START_COMMAND: &str = "python -m mcp_agent_mail.server";
pub const DEFAULT_MCP_URL: &str = "http://localhost:8765";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config at {path}: {}", summarize_errors(.issues))]
    Invalid {
        path: PathBuf,
        issues: Vec<ValidationIssue>,
    },
    #[error("refusing to overwrite existing config at {path} (use --force)")]
    AlreadyExists { path: PathBuf },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn summarize_errors(issues: &[ValidationIssue]) -> String {
    let messages = issues
        .iter()
        .filter(|issue| issue.level == ValidationLevel::Error)
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>();
    if messages.is_empty() {
        "no details".to_string()
    } else {
        messages.join("; ")
    }
}

/// File shape as written by users. Every field is optional so that
/// validation, not deserialization, reports what is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub core: RawCoreSection,
    #[serde(default)]
    pub services: RawServicesSection,
    #[serde(default)]
    pub agent: BTreeMap<String, RawAgentSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCoreSection {
    pub beads_db_path: Option<String>,
    pub auto_recovery: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawServicesSection {
    #[serde(default)]
    pub mcp_agent_mail: RawServiceSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawServiceSection {
    pub start_command: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAgentSection {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub phases: Vec<String>,
}

/// Settings that only take effect on a full restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSettings {
    pub beads_db_path: PathBuf,
    pub auto_recovery: bool,
}

/// The `mcp_agent_mail` service descriptor. Not hot-reloadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    pub start_command: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    pub command: String,
    pub model: ModelKind,
    /// Declared order is kept for display and `AGENT_PHASES`; equality for
    /// reload purposes uses [`AgentSpec::phase_set`].
    pub phases: Vec<Phase>,
}

impl AgentSpec {
    pub fn phase_set(&self) -> BTreeSet<Phase> {
        self.phases.iter().copied().collect()
    }

    /// True when a running instance of `self` must be restarted to become `other`.
    pub fn requires_restart(&self, other: &AgentSpec) -> bool {
        self.command != other.command
            || self.model != other.model
            || self.phase_set() != other.phase_set()
    }

    pub fn phases_joined(&self) -> String {
        self.phases
            .iter()
            .map(|phase| phase.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub core: CoreSettings,
    pub services: ServiceSettings,
    pub agents: BTreeMap<String, AgentSpec>,
}

impl Config {
    /// Same core and service settings, no agents. Diffing a config against
    /// this yields every agent as added.
    pub fn without_agents(&self) -> Config {
        Config {
            core: self.core.clone(),
            services: self.services.clone(),
            agents: BTreeMap::new(),
        }
    }

    pub fn agent(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.get(name)
    }
}

/// A configuration that passed validation, with any non-fatal findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: Config,
    pub warnings: Vec<ValidationIssue>,
}

pub fn parse_raw_config(contents: &str) -> Result<RawConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Parses and validates `contents` as if read from `path`.
///
/// Relative `beads_db_path` values resolve against the directory holding
/// `path`, so the result does not depend on the caller's working directory.
pub fn parse_config(contents: &str, path: &Path) -> Result<LoadedConfig, ConfigError> {
    let raw = parse_raw_config(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    resolve_config(raw, path)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_config(&body, path_ref)
}

pub fn resolve_config(raw: RawConfig, path: &Path) -> Result<LoadedConfig, ConfigError> {
    let issues = raw.validate();
    if issues
        .iter()
        .any(|issue| issue.level == ValidationLevel::Error)
    {
        return Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            issues,
        });
    }

    let invalid = |issue: ValidationIssue| ConfigError::Invalid {
        path: path.to_path_buf(),
        issues: vec![issue],
    };

    let base_dir = config_base_dir(path);
    let core = CoreSettings {
        beads_db_path: expand_path(
            raw.core
                .beads_db_path
                .as_deref()
                .unwrap_or(DEFAULT_BEADS_DB_PATH),
            &base_dir,
        ),
        auto_recovery: raw.core.auto_recovery.unwrap_or(true),
    };
    let service = raw.services.mcp_agent_mail;
    let services = ServiceSettings {
        start_command: service
            .start_command
            .unwrap_or_else(|| DEFAULT_MCP_START_COMMAND.to_string()),
        url: service.url.unwrap_or_else(|| DEFAULT_MCP_URL.to_string()),
    };

    let mut agents = BTreeMap::new();
    for (name, section) in raw.agent {
        let spec = build_agent_spec(&name, &section).map_err(invalid)?;
        agents.insert(name, spec);
    }

    Ok(LoadedConfig {
        config: Config {
            core,
            services,
            agents,
        },
        warnings: issues,
    })
}

/// Converts one `[agent.<name>]` table into a typed spec. Repeated phases
/// are collapsed, keeping the first occurrence.
pub fn build_agent_spec(name: &str, section: &RawAgentSection) -> Result<AgentSpec, ValidationIssue> {
    let model = section
        .model
        .parse::<ModelKind>()
        .map_err(|message| ValidationIssue {
            level: ValidationLevel::Error,
            code: "agent.model.unknown",
            message: format!("agent '{name}': {message}"),
        })?;

    let mut phases = Vec::with_capacity(section.phases.len());
    for raw_phase in &section.phases {
        let phase = raw_phase
            .parse::<Phase>()
            .map_err(|message| ValidationIssue {
                level: ValidationLevel::Error,
                code: "agent.phase.unknown",
                message: format!("agent '{name}': {message}"),
            })?;
        if !phases.contains(&phase) {
            phases.push(phase);
        }
    }

    Ok(AgentSpec {
        name: name.to_string(),
        command: section.command.trim().to_string(),
        model,
        phases,
    })
}

fn config_base_dir(path: &Path) -> PathBuf {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if parent.is_absolute() {
        return parent;
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize_lexically(&cwd.join(parent)),
        Err(_) => parent,
    }
}

/// Expands a leading `~` and anchors relative paths at `base_dir`.
pub fn expand_path(raw: &str, base_dir: &Path) -> PathBuf {
    let raw = raw.trim();
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(raw),
        },
        _ => PathBuf::from(raw),
    };

    if expanded.is_absolute() {
        normalize_lexically(&expanded)
    } else {
        normalize_lexically(&base_dir.join(expanded))
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
