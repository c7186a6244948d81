//! Environment handed to each agent process.

use asc_core::config::{AgentSpec, CoreSettings, ServiceSettings};
use std::collections::BTreeMap;

pub const ENV_AGENT_NAME: &str = "AGENT_NAME";
pub const ENV_AGENT_MODEL: &str = "AGENT_MODEL";
pub const ENV_AGENT_PHASES: &str = "AGENT_PHASES";
pub const ENV_MCP_MAIL_URL: &str = "MCP_MAIL_URL";
pub const ENV_BEADS_DB_PATH: &str = "BEADS_DB_PATH";

/// `base` (usually the `.env` secrets) with the agent identity and stack
/// endpoints layered on top.
pub fn build_agent_env(
    spec: &AgentSpec,
    core: &CoreSettings,
    services: &ServiceSettings,
    base: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = base.clone();
    env.insert(ENV_AGENT_NAME.to_string(), spec.name.clone());
    env.insert(ENV_AGENT_MODEL.to_string(), spec.model.as_str().to_string());
    env.insert(ENV_AGENT_PHASES.to_string(), spec.phases_joined());
    env.insert(ENV_MCP_MAIL_URL.to_string(), services.url.clone());
    env.insert(
        ENV_BEADS_DB_PATH.to_string(),
        core.beads_db_path.display().to_string(),
    );
    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_core::types::{ModelKind, Phase};
    use std::path::PathBuf;

    #[test]
    fn agent_identity_overrides_base_values() {
        let spec = AgentSpec {
            name: "tester".to_string(),
            command: "python agent_adapter.py".to_string(),
            model: ModelKind::Gpt4,
            phases: vec![Phase::Testing, Phase::Review],
        };
        let core = CoreSettings {
            beads_db_path: PathBuf::from("/work/project-repo"),
            auto_recovery: true,
        };
        let services = ServiceSettings {
            start_command: "mail".to_string(),
            url: "http://localhost:8765".to_string(),
        };
        let mut base = BTreeMap::new();
        base.insert("CLAUDE_API_KEY".to_string(), "sk-test".to_string());
        base.insert("AGENT_NAME".to_string(), "stale".to_string());

        let env = build_agent_env(&spec, &core, &services, &base);

        assert_eq!(env["CLAUDE_API_KEY"], "sk-test");
        assert_eq!(env["AGENT_NAME"], "tester");
        assert_eq!(env["AGENT_MODEL"], "gpt-4");
        assert_eq!(env["AGENT_PHASES"], "testing,review");
        assert_eq!(env["MCP_MAIL_URL"], "http://localhost:8765");
        assert_eq!(env["BEADS_DB_PATH"], "/work/project-repo");
    }
}
