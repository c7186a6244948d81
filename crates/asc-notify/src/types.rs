use asc_core::events::LifecycleEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Error,
}

impl NotificationSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationSeverity::Info => "info",
            NotificationSeverity::Warning => "warning",
            NotificationSeverity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTopic {
    ConfigReloaded,
    ConfigReloadFailed,
}

/// Rendered notification. `event` keeps the structured result so front ends
/// can style added, removed, updated and failed agents separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub at: DateTime<Utc>,
    pub topic: NotificationTopic,
    pub severity: NotificationSeverity,
    pub title: String,
    pub body: String,
    pub event: LifecycleEvent,
}

impl NotificationMessage {
    /// Single-line form used by the footer and stdout sink.
    pub fn summary(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.body)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSinkKind {
    Channel,
    Tracing,
    Stdout,
}

#[cfg(test)]
mod tests {
    use super::{NotificationMessage, NotificationSeverity, NotificationTopic};
    use asc_core::events::LifecycleEvent;
    use chrono::Utc;

    #[test]
    fn enums_serialize_in_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationSeverity::Warning).expect("serialize severity"),
            "\"warning\""
        );
        assert_eq!(
            serde_json::to_string(&NotificationTopic::ConfigReloadFailed)
                .expect("serialize topic"),
            "\"config_reload_failed\""
        );
    }

    #[test]
    fn summary_joins_title_and_body() {
        let message = NotificationMessage {
            at: Utc::now(),
            topic: NotificationTopic::ConfigReloadFailed,
            severity: NotificationSeverity::Error,
            title: "Config reload failed".to_string(),
            body: "bad toml".to_string(),
            event: LifecycleEvent::ReloadFailed {
                error: "bad toml".to_string(),
            },
        };
        assert_eq!(message.summary(), "Config reload failed: bad toml");

        let bare = NotificationMessage {
            body: String::new(),
            ..message
        };
        assert_eq!(bare.summary(), "Config reload failed");
    }
}
