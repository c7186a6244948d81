//! Background worker that owns the reconciliation engine.
//!
//! Watcher events and shutdown requests arrive over one channel, so passes
//! never interleave and events are handled in the order they were emitted.

use asc_core::config::Config;
use asc_core::events::LifecycleEvent;
use asc_notify::NotificationDispatcher;
use asc_process::{ProcessControl, ProcessError};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use crate::file_watcher::WatchEvent;
use crate::reload::ReconciliationEngine;

#[derive(Debug)]
pub enum WorkerCommand {
    Reload(Config),
    ReloadFailed(String),
    Shutdown(Sender<Vec<ProcessError>>),
}

impl From<WatchEvent> for WorkerCommand {
    fn from(event: WatchEvent) -> Self {
        match event {
            WatchEvent::ReloadRequested(config) => WorkerCommand::Reload(config),
            WatchEvent::ReloadFailed(error) => WorkerCommand::ReloadFailed(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("failed to spawn reload worker: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

/// Handle to the worker thread. Dropping it without calling
/// [`ReloadWorker::shutdown`] still stops every agent.
#[derive(Debug)]
pub struct ReloadWorker {
    tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl ReloadWorker {
    pub fn spawn<P>(
        engine: ReconciliationEngine<P>,
        dispatcher: NotificationDispatcher,
    ) -> Result<Self, WorkerError>
    where
        P: ProcessControl + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("asc-reload".to_string())
            .spawn(move || run(engine, dispatcher, rx))
            .map_err(|source| WorkerError::Spawn { source })?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> Sender<WorkerCommand> {
        self.tx.clone()
    }

    /// Stops every agent and waits for the worker to exit.
    pub fn shutdown(mut self) -> Vec<ProcessError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Vec<ProcessError> {
        let Some(handle) = self.handle.take() else {
            return Vec::new();
        };
        let (reply_tx, reply_rx) = mpsc::channel();
        let errors = if self.tx.send(WorkerCommand::Shutdown(reply_tx)).is_ok() {
            reply_rx.recv().unwrap_or_default()
        } else {
            Vec::new()
        };
        if handle.join().is_err() {
            warn!("reload worker panicked");
        }
        errors
    }
}

impl Drop for ReloadWorker {
    fn drop(&mut self) {
        for err in self.stop_and_join() {
            warn!(error = %err, "failed to stop process during teardown");
        }
    }
}

fn run<P: ProcessControl>(
    mut engine: ReconciliationEngine<P>,
    dispatcher: NotificationDispatcher,
    rx: Receiver<WorkerCommand>,
) {
    while let Ok(first) = rx.recv() {
        // Everything already queued is handled as one batch so that only the
        // newest configuration in it is applied.
        let batch: Vec<WorkerCommand> = std::iter::once(first).chain(rx.try_iter()).collect();
        let latest_reload = batch
            .iter()
            .rposition(|command| matches!(command, WorkerCommand::Reload(_)));
        let shutting_down = batch
            .iter()
            .any(|command| matches!(command, WorkerCommand::Shutdown(_)));

        for (index, command) in batch.into_iter().enumerate() {
            match command {
                WorkerCommand::Reload(_) if shutting_down || Some(index) != latest_reload => {
                    debug!("superseded reload skipped");
                }
                WorkerCommand::Reload(next) => {
                    let result = engine.reconcile(next);
                    dispatcher.publish(&LifecycleEvent::Reconciled(result));
                }
                WorkerCommand::ReloadFailed(error) => {
                    dispatcher.publish(&LifecycleEvent::ReloadFailed { error });
                }
                WorkerCommand::Shutdown(reply) => {
                    let errors = engine.shutdown();
                    let _ = reply.send(errors);
                    debug!("reload worker stopped");
                    return;
                }
            }
        }
    }
    debug!("reload worker channel closed");
}
