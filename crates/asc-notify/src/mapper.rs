//! Map lifecycle events to notifications.

use asc_core::events::{LifecycleEvent, ReconciliationResult};
use chrono::Utc;

use crate::types::{NotificationMessage, NotificationSeverity, NotificationTopic};

const CORE_CHANGED_NOTE: &str = "[core/service settings changed; restart asc to apply]";

pub fn notification_for_lifecycle(event: &LifecycleEvent) -> NotificationMessage {
    match event {
        LifecycleEvent::Reconciled(result) => NotificationMessage {
            at: Utc::now(),
            topic: NotificationTopic::ConfigReloaded,
            severity: if result.has_errors() || result.core_settings_changed {
                NotificationSeverity::Warning
            } else {
                NotificationSeverity::Info
            },
            title: "Config reloaded".to_string(),
            body: summarize_result(result),
            event: event.clone(),
        },
        LifecycleEvent::ReloadFailed { error } => NotificationMessage {
            at: Utc::now(),
            topic: NotificationTopic::ConfigReloadFailed,
            severity: NotificationSeverity::Error,
            title: "Config reload failed".to_string(),
            body: error.clone(),
            event: event.clone(),
        },
    }
}

/// `+added -removed ~updated (name: error; ...)`, with a trailing note when
/// non-reloadable settings changed.
pub fn summarize_result(result: &ReconciliationResult) -> String {
    let mut parts = Vec::new();
    parts.extend(result.added.iter().map(|name| format!("+{name}")));
    parts.extend(result.removed.iter().map(|name| format!("-{name}")));
    parts.extend(result.updated.iter().map(|name| format!("~{name}")));

    let mut line = if parts.is_empty() {
        "no agent changes".to_string()
    } else {
        parts.join(" ")
    };

    if !result.errors.is_empty() {
        let errors = result
            .errors
            .iter()
            .map(|(name, message)| format!("{name}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        line.push_str(&format!(" ({errors})"));
    }
    if result.core_settings_changed {
        line.push(' ');
        line.push_str(CORE_CHANGED_NOTE);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{notification_for_lifecycle, summarize_result};
    use crate::types::{NotificationSeverity, NotificationTopic};
    use asc_core::events::{LifecycleEvent, ReconciliationResult};

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn summary_distinguishes_each_bucket() {
        let result = ReconciliationResult {
            added: names(&["coder-2"]),
            removed: names(&["planner"]),
            updated: names(&["tester"]),
            ..ReconciliationResult::default()
        };
        assert_eq!(summarize_result(&result), "+coder-2 -planner ~tester");
    }

    #[test]
    fn summary_appends_parenthesized_errors() {
        let mut result = ReconciliationResult {
            added: names(&["a", "b"]),
            ..ReconciliationResult::default()
        };
        result.record_error("b", "command is empty");
        assert_eq!(summarize_result(&result), "+a +b (b: command is empty)");
    }

    #[test]
    fn clean_pass_is_info_and_says_no_changes() {
        let message =
            notification_for_lifecycle(&LifecycleEvent::Reconciled(ReconciliationResult::default()));
        assert_eq!(message.topic, NotificationTopic::ConfigReloaded);
        assert_eq!(message.severity, NotificationSeverity::Info);
        assert_eq!(message.summary(), "Config reloaded: no agent changes");
    }

    #[test]
    fn core_change_is_flagged_as_warning() {
        let result = ReconciliationResult {
            core_settings_changed: true,
            ..ReconciliationResult::default()
        };
        let message = notification_for_lifecycle(&LifecycleEvent::Reconciled(result));
        assert_eq!(message.severity, NotificationSeverity::Warning);
        assert!(message.body.ends_with("restart asc to apply]"));
    }

    #[test]
    fn reload_failure_maps_to_error_notification() {
        let message = notification_for_lifecycle(&LifecycleEvent::ReloadFailed {
            error: "invalid config at asc.toml: agent 'a': at least one phase is required"
                .to_string(),
        });
        assert_eq!(message.topic, NotificationTopic::ConfigReloadFailed);
        assert_eq!(message.severity, NotificationSeverity::Error);
        assert!(message.summary().starts_with("Config reload failed: invalid config"));
    }
}
