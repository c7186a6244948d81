//! Converges running agents onto a newly validated configuration.

use asc_core::config::{AgentSpec, Config, CoreSettings, ServiceSettings};
use asc_core::diff::ConfigDiff;
use asc_core::events::ReconciliationResult;
use asc_process::{ProcessControl, ProcessError};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::agent_env::build_agent_env;

/// Single owner of the "current" configuration.
///
/// Core and service settings are captured once, when the engine is created,
/// because the processes that depend on them are never restarted live.
#[derive(Debug)]
pub struct ReconciliationEngine<P> {
    control: P,
    current: Config,
    effective_core: CoreSettings,
    effective_services: ServiceSettings,
    base_env: BTreeMap<String, String>,
}

impl<P: ProcessControl> ReconciliationEngine<P> {
    /// Treats every agent in `current` as already running.
    pub fn new(current: Config, control: P, base_env: BTreeMap<String, String>) -> Self {
        Self {
            control,
            effective_core: current.core.clone(),
            effective_services: current.services.clone(),
            current,
            base_env,
        }
    }

    /// Starts every agent in `config` from nothing.
    pub fn launch(
        config: Config,
        control: P,
        base_env: BTreeMap<String, String>,
    ) -> (Self, ReconciliationResult) {
        let mut engine = Self::new(config.without_agents(), control, base_env);
        let result = engine.reconcile(config);
        (engine, result)
    }

    pub fn current(&self) -> &Config {
        &self.current
    }

    pub fn control(&self) -> &P {
        &self.control
    }

    /// Applies `next` in the order removed, updated, added. Per-agent
    /// failures are recorded and never abort the pass; `next` becomes the
    /// baseline regardless.
    pub fn reconcile(&mut self, next: Config) -> ReconciliationResult {
        let diff = ConfigDiff::between(&self.current, &next);
        let mut result = ReconciliationResult {
            added: diff.added.clone(),
            removed: diff.removed.clone(),
            updated: diff.updated.clone(),
            errors: BTreeMap::new(),
            core_settings_changed: diff.core_settings_changed,
        };

        if diff.core_settings_changed {
            warn!("core/service settings changed; restart required to apply them");
        }
        if diff.is_noop() {
            debug!("reconcile: no agent changes");
        }

        for name in &diff.removed {
            if let Err(err) = self.control.stop(name) {
                record_failure(&mut result, name, "stop", &err);
            }
        }

        for name in &diff.updated {
            if let Err(err) = self.control.stop(name) {
                record_failure(&mut result, name, "stop", &err);
                continue;
            }
            if let Some(spec) = next.agents.get(name) {
                if let Err(err) = self.start_agent(spec) {
                    record_failure(&mut result, name, "start", &err);
                }
            }
        }

        for name in &diff.added {
            if let Some(spec) = next.agents.get(name) {
                if let Err(err) = self.start_agent(spec) {
                    record_failure(&mut result, name, "start", &err);
                }
            }
        }

        info!(
            added = result.added.len(),
            removed = result.removed.len(),
            updated = result.updated.len(),
            errors = result.errors.len(),
            "reconciliation pass complete"
        );
        self.current = next;
        result
    }

    /// Stops everything the underlying supervisor tracks.
    pub fn shutdown(&self) -> Vec<ProcessError> {
        self.control.stop_all()
    }

    fn start_agent(&self, spec: &AgentSpec) -> Result<u32, ProcessError> {
        let env = build_agent_env(
            spec,
            &self.effective_core,
            &self.effective_services,
            &self.base_env,
        );
        let pid = self.control.start(&spec.name, &spec.command, &env)?;
        debug!(agent = %spec.name, pid, model = %spec.model, "agent launched");
        Ok(pid)
    }
}

fn record_failure(
    result: &mut ReconciliationResult,
    name: &str,
    action: &str,
    err: &ProcessError,
) {
    warn!(agent = %name, action, error = %err, "agent lifecycle action failed");
    result.record_error(name, format!("{action} failed: {err}"));
}
