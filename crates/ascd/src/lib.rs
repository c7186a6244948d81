//! asc daemon crate: config watching, reconciliation and the reload worker.

pub mod agent_env;
pub mod controller;
pub mod file_watcher;
pub mod log_cleanup;
pub mod logging;
pub mod reload;
pub mod services;
pub mod signals;
pub mod status_poller;

pub use agent_env::*;
pub use controller::*;
pub use file_watcher::*;
pub use log_cleanup::*;
pub use logging::*;
pub use reload::*;
pub use services::*;
pub use signals::*;
pub use status_poller::*;

#[cfg(test)]
mod tests {
    use super::{
        ConfigWatcher, DebounceState, LogCleanup, ReconciliationEngine, ReloadWorker,
        ServiceState, StatusPoller, WatchEvent, WorkerCommand,
    };
    use asc_process::ProcessSupervisor;
    use std::any::TypeId;

    #[test]
    fn crate_root_reexports_daemon_types() {
        let _ = TypeId::of::<ConfigWatcher>();
        let _ = TypeId::of::<DebounceState>();
        let _ = TypeId::of::<ReconciliationEngine<ProcessSupervisor>>();
        let _ = TypeId::of::<ReloadWorker>();
        let _ = TypeId::of::<LogCleanup>();
        let _ = TypeId::of::<ServiceState>();
        let _ = TypeId::of::<StatusPoller>();
        let _ = TypeId::of::<WatchEvent>();
        let _ = TypeId::of::<WorkerCommand>();
    }
}
