//! Validation for agent stack configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::{build_agent_spec, RawConfig};
use crate::types::{ModelKind, Phase, CRITICAL_PHASES};

/// Process name used for the supervised `mcp_agent_mail` service.
pub const SERVICE_PROCESS_NAME: &str = "mcp_agent_mail";

/// Name the daemon logs under; its log file shares the agents' log directory.
pub const DAEMON_PROCESS_NAME: &str = "asc";

/// Agent names that would collide with a supervisor-owned log or pid file.
pub const RESERVED_AGENT_NAMES: [&str; 2] = [SERVICE_PROCESS_NAME, DAEMON_PROCESS_NAME];

const MAX_AGENTS_PER_PHASE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub code: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn error(code: &'static str, message: String) -> Self {
        Self {
            level: ValidationLevel::Error,
            code,
            message,
        }
    }

    fn warning(code: &'static str, message: String) -> Self {
        Self {
            level: ValidationLevel::Warning,
            code,
            message,
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Vec<ValidationIssue>;
}

pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues
        .iter()
        .any(|issue| issue.level == ValidationLevel::Error)
}

impl Validate for RawConfig {
    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if matches!(self.core.beads_db_path.as_deref(), Some(path) if path.trim().is_empty()) {
            issues.push(ValidationIssue::error(
                "core.beads_db_path.empty",
                "core.beads_db_path must not be empty".to_string(),
            ));
        }

        let service = &self.services.mcp_agent_mail;
        if matches!(service.start_command.as_deref(), Some(cmd) if cmd.trim().is_empty()) {
            issues.push(ValidationIssue::error(
                "services.start_command.empty",
                "services.mcp_agent_mail.start_command must not be empty".to_string(),
            ));
        }
        match service.url.as_deref() {
            Some(url) if url.trim().is_empty() => issues.push(ValidationIssue::error(
                "services.url.empty",
                "services.mcp_agent_mail.url must not be empty".to_string(),
            )),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                issues.push(ValidationIssue::warning(
                    "services.url.scheme",
                    format!("service url {url:?} should start with http:// or https://"),
                ))
            }
            _ => {}
        }

        if self.agent.is_empty() {
            issues.push(ValidationIssue::error(
                "agents.empty",
                "at least one agent must be defined".to_string(),
            ));
            return issues;
        }

        let mut seen_lowercase: HashMap<String, &str> = HashMap::new();
        for name in self.agent.keys() {
            if let Some(existing) = seen_lowercase.insert(name.to_lowercase(), name.as_str()) {
                issues.push(ValidationIssue::error(
                    "agent.name.duplicate",
                    format!(
                        "duplicate agent name: '{existing}' and '{name}' (agent names are case-insensitive)"
                    ),
                ));
            }
        }

        let mut models = BTreeMap::new();
        let mut phase_agents: BTreeMap<Phase, Vec<&str>> = BTreeMap::new();

        for (name, section) in &self.agent {
            validate_agent_name(name, &mut issues);

            if section.command.trim().is_empty() {
                issues.push(ValidationIssue::warning(
                    "agent.command.empty",
                    format!("agent '{name}': command is empty; it will fail to start"),
                ));
            } else if let Some(program) = section.command.split_whitespace().next() {
                if !program_resolves(program) {
                    issues.push(ValidationIssue::warning(
                        "agent.command.not_found",
                        format!("agent '{name}': command '{program}' not found in PATH"),
                    ));
                }
            }

            if section.model.trim().is_empty() {
                issues.push(ValidationIssue::error(
                    "agent.model.missing",
                    format!(
                        "agent '{name}': model is required (supported: {})",
                        ModelKind::supported_list()
                    ),
                ));
            }

            if section.phases.is_empty() {
                issues.push(ValidationIssue::error(
                    "agent.phases.empty",
                    format!("agent '{name}': at least one phase is required"),
                ));
            }

            for raw_phase in &section.phases {
                if raw_phase.parse::<Phase>().is_err() {
                    let mut message = format!(
                        "agent '{name}': invalid phase '{raw_phase}' (valid phases: {})",
                        Phase::valid_list()
                    );
                    if let Some(suggestion) = Phase::suggest(raw_phase) {
                        message.push_str(&format!("; did you mean '{suggestion}'?"));
                    }
                    issues.push(ValidationIssue::error("agent.phase.unknown", message));
                }
            }

            if section.model.trim().is_empty() {
                continue;
            }
            match build_agent_spec(name, section) {
                Ok(spec) => {
                    if spec.phases.len() < section.phases.len() {
                        issues.push(ValidationIssue::warning(
                            "agent.phase.duplicate",
                            format!("agent '{name}': phases contain duplicates"),
                        ));
                    }
                    *models.entry(spec.model).or_insert(0usize) += 1;
                    for phase in spec.phases {
                        phase_agents.entry(phase).or_default().push(name.as_str());
                    }
                }
                Err(issue) if issue.code == "agent.model.unknown" => issues.push(issue),
                // Phase problems were already reported one by one above.
                Err(_) => {}
            }
        }

        if self.agent.len() > 1 && models.len() == 1 {
            if let Some(model) = models.keys().next() {
                issues.push(ValidationIssue::warning(
                    "agents.same_model",
                    format!("all agents use the same model ({model})"),
                ));
            }
        }

        for (phase, agents) in &phase_agents {
            if agents.len() > MAX_AGENTS_PER_PHASE {
                issues.push(ValidationIssue::warning(
                    "phase.crowded",
                    format!(
                        "phase '{phase}' has {} agents assigned: {}",
                        agents.len(),
                        agents.join(", ")
                    ),
                ));
            }
        }

        for phase in CRITICAL_PHASES {
            if !phase_agents.contains_key(&phase) {
                issues.push(ValidationIssue::warning(
                    "phase.uncovered",
                    format!("no agent is assigned to the '{phase}' phase"),
                ));
            }
        }

        issues
    }
}

fn validate_agent_name(name: &str, issues: &mut Vec<ValidationIssue>) {
    let valid_chars = name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
    if name.is_empty() || name.starts_with('.') || !valid_chars {
        issues.push(ValidationIssue::error(
            "agent.name.invalid",
            format!(
                "agent name {name:?} may only contain letters, digits, '-', '_' and '.', and must not start with '.'"
            ),
        ));
    }
    if let Some(reserved) = RESERVED_AGENT_NAMES
        .iter()
        .find(|reserved| name.eq_ignore_ascii_case(reserved))
    {
        issues.push(ValidationIssue::error(
            "agent.name.reserved",
            format!("agent name '{name}' is reserved ('{reserved}' is used by asc itself)"),
        ));
    }
}

/// Whether `program` names an existing file or something on `PATH`.
pub fn program_resolves(program: &str) -> bool {
    if program.contains('/') {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
