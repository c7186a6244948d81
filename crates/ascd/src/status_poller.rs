//! Periodic snapshot of supervised processes for the dashboard.

use asc_process::ProcessSupervisor;
use asc_tui::{AgentRow, TuiEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Reads supervisor records only; never touches the reconciliation engine.
pub fn snapshot(supervisor: &ProcessSupervisor) -> Vec<AgentRow> {
    match supervisor.list() {
        Ok(records) => records
            .iter()
            .map(|record| AgentRow::from_record(record, supervisor.get_status(record.pid)))
            .collect(),
        Err(err) => {
            warn!(error = %err, "failed to list process records");
            Vec::new()
        }
    }
}

#[derive(Debug)]
pub struct StatusPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn(
        supervisor: Arc<ProcessSupervisor>,
        interval: Duration,
        tx: Sender<TuiEvent>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("asc-status".to_string())
            .spawn(move || {
                while !flag.load(Ordering::SeqCst) {
                    let agents = snapshot(&supervisor);
                    if tx.send(TuiEvent::AgentsReplaced { agents }).is_err() {
                        debug!("dashboard gone; status poller exiting");
                        return;
                    }
                    sleep_unless_stopped(&flag, interval);
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sleep_unless_stopped(flag: &AtomicBool, interval: Duration) {
    let deadline = Instant::now() + interval;
    while !flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}
