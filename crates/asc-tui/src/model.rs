use asc_process::{ProcessRecord, ProcessStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of the agents table, built from a supervisor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRow {
    pub name: String,
    pub pid: u32,
    pub status: ProcessStatus,
    pub started_at: DateTime<Utc>,
    pub command: String,
}

impl AgentRow {
    pub fn from_record(record: &ProcessRecord, status: ProcessStatus) -> Self {
        Self {
            name: record.name.clone(),
            pid: record.pid,
            status,
            started_at: record.started_at,
            command: record.command_line(),
        }
    }

    /// Blank once the process is no longer running.
    pub fn uptime(&self, now: DateTime<Utc>) -> String {
        if self.status != ProcessStatus::Running {
            return "-".to_string();
        }
        format_uptime((now - self.started_at).num_seconds())
    }
}

pub fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h{minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m{secs:02}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::{format_uptime, AgentRow};
    use asc_process::{ProcessRecord, ProcessStatus};
    use chrono::{Duration, TimeZone, Utc};
    use std::path::PathBuf;

    #[test]
    fn format_uptime_picks_coarsest_units() {
        assert_eq!(format_uptime(-5), "0s");
        assert_eq!(format_uptime(42), "42s");
        assert_eq!(format_uptime(185), "3m05s");
        assert_eq!(format_uptime(3 * 3600 + 7 * 60 + 9), "3h07m");
    }

    #[test]
    fn row_copies_record_and_hides_uptime_when_not_running() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let record = ProcessRecord {
            name: "planner".to_string(),
            pid: 77,
            command: "python".to_string(),
            args: vec!["agent_adapter.py".to_string()],
            started_at: started,
            log_file: PathBuf::from("/tmp/planner.log"),
        };

        let mut row = AgentRow::from_record(&record, ProcessStatus::Running);
        assert_eq!(row.command, "python agent_adapter.py");
        assert_eq!(row.uptime(started + Duration::seconds(90)), "1m30s");

        row.status = ProcessStatus::Exited;
        assert_eq!(row.uptime(started + Duration::seconds(90)), "-");
    }
}
