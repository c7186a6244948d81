//! Built-in starter configurations for `asc init`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTemplate {
    Solo,
    #[default]
    Team,
    Swarm,
}

const HEADER: &str = r#"[core]
beads_db_path = "./project-repo"

[services.mcp_agent_mail]
start_command = "python -m mcp_agent_mail.server"
url = "http://localhost:8765"
"#;

const SOLO_AGENTS: &str = r#"
[agent.solo-agent]
command = "python agent_adapter.py"
model = "claude"
phases = ["planning", "implementation", "testing", "review", "refactor"]
"#;

const TEAM_AGENTS: &str = r#"
[agent.planner]
command = "python agent_adapter.py"
model = "gemini"
phases = ["planning", "design"]

[agent.coder]
command = "python agent_adapter.py"
model = "claude"
phases = ["implementation", "coding"]

[agent.tester]
command = "python agent_adapter.py"
model = "gpt-4"
phases = ["testing", "review"]
"#;

const SWARM_AGENTS: &str = r#"
[agent.planner-1]
command = "python agent_adapter.py"
model = "gemini"
phases = ["planning", "design"]

[agent.planner-2]
command = "python agent_adapter.py"
model = "claude"
phases = ["planning", "design"]

[agent.coder-1]
command = "python agent_adapter.py"
model = "claude"
phases = ["implementation", "coding"]

[agent.coder-2]
command = "python agent_adapter.py"
model = "gpt-4"
phases = ["implementation", "coding"]

[agent.coder-3]
command = "python agent_adapter.py"
model = "codex"
phases = ["implementation", "coding"]

[agent.tester-1]
command = "python agent_adapter.py"
model = "gpt-4"
phases = ["testing", "review"]

[agent.tester-2]
command = "python agent_adapter.py"
model = "gemini"
phases = ["testing", "review"]

[agent.refactor]
command = "python agent_adapter.py"
model = "claude"
phases = ["refactor", "optimization"]
"#;

impl ConfigTemplate {
    pub const ALL: [ConfigTemplate; 3] = [
        ConfigTemplate::Solo,
        ConfigTemplate::Team,
        ConfigTemplate::Swarm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigTemplate::Solo => "solo",
            ConfigTemplate::Team => "team",
            ConfigTemplate::Swarm => "swarm",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ConfigTemplate::Solo => "single agent setup for individual development",
            ConfigTemplate::Team => "planner, coder and tester agents",
            ConfigTemplate::Swarm => "several agents per phase for parallel work",
        }
    }

    pub fn render(self) -> String {
        let agents = match self {
            ConfigTemplate::Solo => SOLO_AGENTS,
            ConfigTemplate::Team => TEAM_AGENTS,
            ConfigTemplate::Swarm => SWARM_AGENTS,
        };
        format!("{HEADER}{agents}")
    }
}

impl std::str::FromStr for ConfigTemplate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "solo" => Ok(ConfigTemplate::Solo),
            "team" => Ok(ConfigTemplate::Team),
            "swarm" => Ok(ConfigTemplate::Swarm),
            other => Err(format!(
                "invalid template '{other}'. valid values: solo, team, swarm"
            )),
        }
    }
}

impl std::fmt::Display for ConfigTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn write_template(
    path: impl AsRef<Path>,
    template: ConfigTemplate,
    force: bool,
) -> Result<(), ConfigError> {
    let path_ref = path.as_ref();
    if path_ref.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path_ref.to_path_buf(),
        });
    }
    if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path_ref, template.render()).map_err(|source| ConfigError::Write {
        path: path_ref.to_path_buf(),
        source,
    })
}
