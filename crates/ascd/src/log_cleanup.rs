//! Retention for the append-only logs under the state directory.

use asc_process::{ProcessError, ProcessSupervisor};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::info;

pub const DEFAULT_LOG_RETENTION_DAYS: u32 = 30;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Default)]
pub struct LogCleanup {
    /// Logs older than the cutoff. Removed unless this was a dry run.
    pub stale: Vec<PathBuf>,
    pub failures: Vec<ProcessError>,
}

impl LogCleanup {
    pub fn removed(&self) -> usize {
        self.stale.len().saturating_sub(self.failures.len())
    }
}

pub fn retention_cutoff(now: SystemTime, days: u32) -> SystemTime {
    now.checked_sub(Duration::from_secs(u64::from(days) * SECS_PER_DAY))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

pub fn cleanup_logs(
    supervisor: &ProcessSupervisor,
    retention_days: u32,
    dry_run: bool,
    now: SystemTime,
) -> Result<LogCleanup, ProcessError> {
    let stale = supervisor.stale_logs(retention_cutoff(now, retention_days))?;
    if dry_run {
        info!(count = stale.len(), "dry run; no logs removed");
        return Ok(LogCleanup {
            stale,
            failures: Vec::new(),
        });
    }
    let failures = supervisor.remove_logs(&stale);
    Ok(LogCleanup { stale, failures })
}
