//! Results that cross from the reconciliation loop to front ends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of one reconciliation pass. Names in `errors` may also appear in
/// `added`/`removed`/`updated`: the lists record what was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
    pub errors: BTreeMap<String, String>,
    /// Core or service settings changed in the file and were not applied.
    #[serde(default)]
    pub core_settings_changed: bool,
}

impl ReconciliationResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.errors.is_empty()
            && !self.core_settings_changed
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Keeps the first error recorded for a name.
    pub fn record_error(&mut self, name: &str, message: impl Into<String>) {
        self.errors
            .entry(name.to_string())
            .or_insert_with(|| message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Reconciled(ReconciliationResult),
    ReloadFailed { error: String },
}

impl LifecycleEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::Reconciled(_) => "reconciled",
            LifecycleEvent::ReloadFailed { .. } => "reload_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LifecycleEvent, ReconciliationResult};

    #[test]
    fn default_result_is_empty() {
        assert!(ReconciliationResult::default().is_empty());
    }

    #[test]
    fn core_change_alone_makes_result_non_empty() {
        let result = ReconciliationResult {
            core_settings_changed: true,
            ..ReconciliationResult::default()
        };
        assert!(!result.is_empty());
        assert!(!result.has_errors());
    }

    #[test]
    fn record_error_keeps_first_message() {
        let mut result = ReconciliationResult::default();
        result.record_error("coder", "stop failed");
        result.record_error("coder", "start skipped");
        assert_eq!(
            result.errors.get("coder").map(String::as_str),
            Some("stop failed")
        );
    }

    #[test]
    fn lifecycle_event_serializes_with_kind_tag() {
        let event = LifecycleEvent::ReloadFailed {
            error: "bad toml".to_string(),
        };
        let encoded = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(encoded["kind"], "reload_failed");
        assert_eq!(encoded["error"], "bad toml");
        assert_eq!(event.kind(), "reload_failed");

        let reconciled = LifecycleEvent::Reconciled(ReconciliationResult {
            added: vec!["c".to_string()],
            ..ReconciliationResult::default()
        });
        let encoded = serde_json::to_value(&reconciled).expect("serialize reconciled");
        assert_eq!(encoded["kind"], "reconciled");
        assert_eq!(encoded["added"][0], "c");
    }
}
