use asc_notify::NotificationMessage;
use serde::{Deserialize, Serialize};

use crate::model::AgentRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TuiEvent {
    AgentsReplaced { agents: Vec<AgentRow> },
    Lifecycle { message: NotificationMessage },
}

impl From<NotificationMessage> for TuiEvent {
    fn from(message: NotificationMessage) -> Self {
        TuiEvent::Lifecycle { message }
    }
}
