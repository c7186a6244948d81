//! Agent-level difference between two configurations.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Partition of the union of agent names in `old` and `new`. Every name lands
/// in exactly one bucket; each bucket is sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    /// `[core]` or `[services]` differ. These sections are never applied live.
    pub core_settings_changed: bool,
}

impl ConfigDiff {
    pub fn between(old: &Config, new: &Config) -> Self {
        let mut diff = ConfigDiff::default();

        for (name, old_spec) in &old.agents {
            match new.agents.get(name) {
                None => diff.removed.push(name.clone()),
                Some(new_spec) if old_spec.requires_restart(new_spec) => {
                    diff.updated.push(name.clone())
                }
                Some(_) => diff.unchanged.push(name.clone()),
            }
        }
        for name in new.agents.keys() {
            if !old.agents.contains_key(name) {
                diff.added.push(name.clone());
            }
        }

        diff.core_settings_changed = old.core != new.core || old.services != new.services;
        diff
    }

    /// No agent needs to be started or stopped.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigDiff;
    use crate::config::{AgentSpec, Config, CoreSettings, ServiceSettings};
    use crate::types::{ModelKind, Phase};
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn spec(name: &str, model: ModelKind, phases: &[Phase]) -> AgentSpec {
        AgentSpec {
            name: name.to_string(),
            command: format!("run-{name}"),
            model,
            phases: phases.to_vec(),
        }
    }

    fn config(agents: Vec<AgentSpec>) -> Config {
        Config {
            core: CoreSettings {
                beads_db_path: PathBuf::from("/tmp/beads"),
                auto_recovery: true,
            },
            services: ServiceSettings {
                start_command: "mail-server".to_string(),
                url: "http://localhost:8765".to_string(),
            },
            agents: agents
                .into_iter()
                .map(|agent| (agent.name.clone(), agent))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn replaces_one_agent_and_keeps_unchanged_one() {
        let old = config(vec![
            spec("a", ModelKind::Claude, &[Phase::Planning]),
            spec("b", ModelKind::Codex, &[Phase::Coding]),
        ]);
        let new = config(vec![
            spec("b", ModelKind::Codex, &[Phase::Coding]),
            spec("c", ModelKind::Gemini, &[Phase::Testing]),
        ]);

        let diff = ConfigDiff::between(&old, &new);
        assert_eq!(diff.added, vec!["c"]);
        assert_eq!(diff.removed, vec!["a"]);
        assert!(diff.updated.is_empty());
        assert_eq!(diff.unchanged, vec!["b"]);
        assert!(!diff.core_settings_changed);
    }

    #[test]
    fn model_change_is_an_update() {
        let old = config(vec![spec("a", ModelKind::Claude, &[Phase::Planning])]);
        let new = config(vec![spec("a", ModelKind::Gemini, &[Phase::Planning])]);
        assert_eq!(ConfigDiff::between(&old, &new).updated, vec!["a"]);
    }

    #[test]
    fn phase_order_is_not_an_update_but_phase_set_is() {
        let old = config(vec![spec(
            "a",
            ModelKind::Claude,
            &[Phase::Planning, Phase::Testing],
        )]);
        let reordered = config(vec![spec(
            "a",
            ModelKind::Claude,
            &[Phase::Testing, Phase::Planning],
        )]);
        let grown = config(vec![spec(
            "a",
            ModelKind::Claude,
            &[Phase::Testing, Phase::Planning, Phase::Review],
        )]);

        assert!(ConfigDiff::between(&old, &reordered).is_noop());
        assert_eq!(ConfigDiff::between(&old, &grown).updated, vec!["a"]);
    }

    #[test]
    fn identical_configs_produce_empty_diff() {
        let cfg = config(vec![
            spec("a", ModelKind::Claude, &[Phase::Planning]),
            spec("b", ModelKind::Codex, &[Phase::Coding]),
        ]);
        let diff = ConfigDiff::between(&cfg, &cfg.clone());
        assert!(diff.is_noop());
        assert_eq!(diff.unchanged, vec!["a", "b"]);
    }

    #[test]
    fn core_and_service_changes_are_flagged_not_diffed() {
        let old = config(vec![spec("a", ModelKind::Claude, &[Phase::Planning])]);
        let mut new = old.clone();
        new.services.url = "http://localhost:9999".to_string();
        let diff = ConfigDiff::between(&old, &new);
        assert!(diff.core_settings_changed);
        assert!(diff.is_noop());

        let mut new_core = old.clone();
        new_core.core.beads_db_path = PathBuf::from("/elsewhere");
        assert!(ConfigDiff::between(&old, &new_core).core_settings_changed);
    }

    #[test]
    fn buckets_partition_the_union_of_names() {
        let models = [ModelKind::Claude, ModelKind::Gemini, ModelKind::Codex];
        let phases = [Phase::Planning, Phase::Coding, Phase::Testing];
        let names = ["a", "b", "c", "d", "e", "f"];

        // Deterministic sweep over membership and spec variations.
        for mask in 0u32..729 {
            let mut old_agents = Vec::new();
            let mut new_agents = Vec::new();
            let mut digits = mask;
            for (idx, name) in names.iter().enumerate() {
                let state = digits % 3;
                digits /= 3;
                let model = models[idx % models.len()];
                let phase = phases[(idx + mask as usize) % phases.len()];
                match state {
                    0 => old_agents.push(spec(name, model, &[phase])),
                    1 => new_agents.push(spec(name, model, &[phase])),
                    _ => {
                        old_agents.push(spec(name, model, &[phase]));
                        let changed = (mask as usize + idx) % 2 == 0;
                        let new_model = if changed { models[(idx + 1) % 3] } else { model };
                        new_agents.push(spec(name, new_model, &[phase]));
                    }
                }
            }
            let old = config(old_agents);
            let new = config(new_agents);
            let diff = ConfigDiff::between(&old, &new);

            let mut seen = BTreeSet::new();
            for name in diff
                .added
                .iter()
                .chain(&diff.removed)
                .chain(&diff.updated)
                .chain(&diff.unchanged)
            {
                assert!(seen.insert(name.clone()), "{name} in two buckets (mask {mask})");
            }
            let union = old
                .agents
                .keys()
                .chain(new.agents.keys())
                .cloned()
                .collect::<BTreeSet<_>>();
            assert_eq!(seen, union, "mask {mask}");
            for name in &diff.added {
                assert!(!old.agents.contains_key(name) && new.agents.contains_key(name));
            }
            for name in &diff.removed {
                assert!(old.agents.contains_key(name) && !new.agents.contains_key(name));
            }
        }
    }
}
