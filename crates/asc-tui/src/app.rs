use asc_notify::NotificationMessage;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

use crate::event::TuiEvent;
use crate::model::AgentRow;

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownNotification {
    pub message: NotificationMessage,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuiApp {
    pub config_path: String,
    pub agents: Vec<AgentRow>,
    pub notification: Option<ShownNotification>,
    pub notification_ttl: Duration,
    pub should_quit: bool,
}

impl Default for TuiApp {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            agents: Vec::new(),
            notification: None,
            notification_ttl: NOTIFICATION_TTL,
            should_quit: false,
        }
    }
}

impl TuiApp {
    pub fn new(config_path: impl Into<String>) -> Self {
        Self {
            config_path: config_path.into(),
            ..Self::default()
        }
    }

    pub fn apply_event(&mut self, event: TuiEvent, now: Instant) {
        match event {
            TuiEvent::AgentsReplaced { mut agents } => {
                agents.sort_by(|a, b| a.name.cmp(&b.name));
                self.agents = agents;
            }
            TuiEvent::Lifecycle { message } => {
                self.notification = Some(ShownNotification {
                    message,
                    shown_at: now,
                });
            }
        }
    }

    /// Drops the footer notification once it has been visible for the TTL.
    pub fn expire_notification(&mut self, now: Instant) {
        let expired = self
            .notification
            .as_ref()
            .is_some_and(|shown| now.saturating_duration_since(shown.shown_at) >= self.notification_ttl);
        if expired {
            self.notification = None;
        }
    }

    pub fn notification(&self) -> Option<&NotificationMessage> {
        self.notification.as_ref().map(|shown| &shown.message)
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TuiApp, NOTIFICATION_TTL};
    use crate::event::TuiEvent;
    use crate::model::AgentRow;
    use asc_core::events::{LifecycleEvent, ReconciliationResult};
    use asc_notify::notification_for_lifecycle;
    use asc_process::ProcessStatus;
    use chrono::Utc;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
    use std::time::{Duration, Instant};

    fn row(name: &str) -> AgentRow {
        AgentRow {
            name: name.to_string(),
            pid: 100,
            status: ProcessStatus::Running,
            started_at: Utc::now(),
            command: "sleep 60".to_string(),
        }
    }

    fn reloaded() -> TuiEvent {
        TuiEvent::from(notification_for_lifecycle(&LifecycleEvent::Reconciled(
            ReconciliationResult {
                added: vec!["coder-2".to_string()],
                ..ReconciliationResult::default()
            },
        )))
    }

    #[test]
    fn agents_replaced_sorts_rows_by_name() {
        let mut app = TuiApp::new("asc.toml");
        app.apply_event(
            TuiEvent::AgentsReplaced {
                agents: vec![row("tester"), row("coder")],
            },
            Instant::now(),
        );
        let names: Vec<&str> = app.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["coder", "tester"]);
    }

    #[test]
    fn notification_expires_after_ttl() {
        let mut app = TuiApp::default();
        let shown = Instant::now();
        app.apply_event(reloaded(), shown);
        assert_eq!(
            app.notification().map(|m| m.summary()),
            Some("Config reloaded: +coder-2".to_string())
        );

        app.expire_notification(shown + NOTIFICATION_TTL - Duration::from_millis(1));
        assert!(app.notification().is_some());

        app.expire_notification(shown + NOTIFICATION_TTL);
        assert!(app.notification().is_none());
    }

    #[test]
    fn newer_notification_restarts_the_display_window() {
        let mut app = TuiApp::default();
        let first = Instant::now();
        app.apply_event(reloaded(), first);
        app.apply_event(reloaded(), first + Duration::from_secs(4));

        app.expire_notification(first + Duration::from_secs(6));
        assert!(app.notification().is_some());
    }

    #[test]
    fn quit_keys_set_should_quit() {
        for (code, modifiers) in [
            (KeyCode::Char('q'), KeyModifiers::NONE),
            (KeyCode::Esc, KeyModifiers::NONE),
            (KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut app = TuiApp::default();
            app.handle_key_event(KeyEvent::new(code, modifiers));
            assert!(app.should_quit, "{code:?} should quit");
        }

        let mut app = TuiApp::default();
        app.handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!app.should_quit);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut app = TuiApp::default();
        app.handle_key_event(KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert!(!app.should_quit);
    }
}
