//! Config file watcher with debouncing.
//!
//! The parent directory is watched rather than the file itself so that
//! editors which save via temp-file + rename, or delete and recreate, keep
//! producing events for the configured path.

use asc_core::config::{load_config, Config};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("config path {path} has no file name")]
    InvalidPath { path: PathBuf },
    #[error("failed to create file watcher: {source}")]
    Init {
        #[source]
        source: notify::Error,
    },
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to spawn watcher thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

/// Emitted at most once per burst of raw file-system events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    ReloadRequested(Config),
    ReloadFailed(String),
}

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Debouncing { deadline: Instant },
    Validating,
}

/// Explicit Idle → Debouncing → Validating → Idle machine. Each raw event
/// pushes the deadline out by the full window.
#[derive(Debug)]
pub struct Debouncer<C> {
    window: Duration,
    clock: C,
    state: DebounceState,
}

impl<C: Clock> Debouncer<C> {
    pub fn new(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn record_change(&mut self) {
        self.state = DebounceState::Debouncing {
            deadline: self.clock.now() + self.window,
        };
    }

    /// Time left before the pending validation is due, if one is pending.
    pub fn time_until_due(&self) -> Option<Duration> {
        match self.state {
            DebounceState::Debouncing { deadline } => {
                Some(deadline.saturating_duration_since(self.clock.now()))
            }
            _ => None,
        }
    }

    /// Moves to Validating once the window has passed quietly.
    pub fn begin_validation_if_due(&mut self) -> bool {
        match self.state {
            DebounceState::Debouncing { deadline } if self.clock.now() >= deadline => {
                self.state = DebounceState::Validating;
                true
            }
            _ => false,
        }
    }

    pub fn finish_validation(&mut self) {
        if self.state == DebounceState::Validating {
            self.state = DebounceState::Idle;
        }
    }
}

/// Parses and validates the file as it is right now.
pub fn validate_config_file(path: &Path) -> WatchEvent {
    match load_config(path) {
        Ok(loaded) => {
            for issue in &loaded.warnings {
                warn!(code = issue.code, "{}", issue.message);
            }
            WatchEvent::ReloadRequested(loaded.config)
        }
        Err(err) => WatchEvent::ReloadFailed(err.to_string()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub debounce: Duration,
    /// Upper bound on how long the loop blocks, which bounds shutdown latency
    /// and the retry interval for a lost watch.
    pub idle_tick: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            idle_tick: Duration::from_millis(200),
        }
    }
}

/// Background watcher for one config file. Dropping it stops the thread and
/// releases the OS watch handle.
#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ConfigWatcher {
    pub fn spawn<T>(
        path: impl Into<PathBuf>,
        options: WatchOptions,
        tx: Sender<T>,
    ) -> Result<Self, WatchError>
    where
        T: From<WatchEvent> + Send + 'static,
    {
        let path = absolute(path.into());
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| WatchError::InvalidPath { path: path.clone() })?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::InvalidPath { path: path.clone() })?;

        let (raw_tx, raw_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })
        .map_err(|source| WatchError::Init { source })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: dir.clone(),
                source,
            })?;

        let stop = Arc::new(AtomicBool::new(false));
        let worker = WatchLoop {
            path: path.clone(),
            dir,
            file_name,
            options,
            stop: Arc::clone(&stop),
        };
        let handle = thread::Builder::new()
            .name("asc-config-watch".to_string())
            .spawn(move || worker.run(watcher, raw_rx, tx))
            .map_err(|source| WatchError::Spawn { source })?;

        info!(path = %path.display(), "watching config file");
        Ok(Self {
            path,
            stop,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
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

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WatchLoop {
    path: PathBuf,
    dir: PathBuf,
    file_name: OsString,
    options: WatchOptions,
    stop: Arc<AtomicBool>,
}

impl WatchLoop {
    fn run<T: From<WatchEvent>>(
        self,
        mut watcher: RecommendedWatcher,
        raw_rx: Receiver<notify::Result<Event>>,
        tx: Sender<T>,
    ) {
        let mut debouncer = Debouncer::new(self.options.debounce, SystemClock);
        let mut watch_lost = false;

        while !self.stop.load(Ordering::SeqCst) {
            let wait = debouncer
                .time_until_due()
                .map_or(self.options.idle_tick, |due| due.min(self.options.idle_tick));

            match raw_rx.recv_timeout(wait) {
                Ok(Ok(event)) => {
                    if self.touches_config(&event) {
                        debug!(kind = ?event.kind, "config file event");
                        debouncer.record_change();
                    }
                }
                Ok(Err(err)) => {
                    if !watch_lost {
                        warn!(error = %err, "file watch error; re-establishing watch");
                    }
                    watch_lost = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("file watch channel closed");
                    break;
                }
            }

            if watch_lost && self.rewatch(&mut watcher) {
                watch_lost = false;
                // Changes made while the watch was down would otherwise be missed.
                debouncer.record_change();
            }

            if debouncer.begin_validation_if_due() {
                let event = validate_config_file(&self.path);
                debouncer.finish_validation();
                if tx.send(T::from(event)).is_err() {
                    debug!("config watch receiver dropped; stopping");
                    break;
                }
            }
        }
        debug!(path = %self.path.display(), "config watcher stopped");
    }

    fn touches_config(&self, event: &Event) -> bool {
        matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event
                .paths
                .iter()
                .any(|path| path.file_name() == Some(self.file_name.as_os_str()))
    }

    fn rewatch(&self, watcher: &mut RecommendedWatcher) -> bool {
        let _ = watcher.unwatch(&self.dir);
        match watcher.watch(&self.dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                info!(dir = %self.dir.display(), "config watch re-established");
                true
            }
            Err(err) => {
                debug!(error = %err, "re-establishing config watch failed; will retry");
                false
            }
        }
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}
