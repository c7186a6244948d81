use chrono::Utc;
use nix::sys::signal::Signal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::pid_store::PidStore;
use crate::signal::{deliver, probe_alive};
use crate::types::{ProcessRecord, ProcessStatus};

pub const STATE_DIR_ENV: &str = "ASC_HOME";

const LOG_EXT: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub pid_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Grace window between SIGTERM and SIGKILL.
    pub stop_timeout: Duration,
    pub poll_interval: Duration,
    /// How long to wait for the kernel to tear a process down after SIGKILL.
    pub kill_grace: Duration,
}

impl SupervisorConfig {
    pub fn under(state_dir: &Path) -> Self {
        Self {
            pid_dir: state_dir.join("pids"),
            log_dir: state_dir.join("logs"),
            stop_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            kill_grace: Duration::from_secs(1),
        }
    }
}

/// `$ASC_HOME`, or `~/.asc`.
pub fn resolve_state_dir() -> Result<PathBuf, ProcessError> {
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".asc"))
        .ok_or(ProcessError::NoHomeDir)
}

#[derive(Debug)]
struct TrackedChild {
    name: String,
    child: Child,
}

/// Owns the name → process mapping. Records live on disk so a later
/// invocation can find and stop processes started by this one.
#[derive(Debug)]
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    store: PidStore,
    children: Mutex<HashMap<u32, TrackedChild>>,
    name_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let store = PidStore::new(config.pid_dir.clone());
        Self {
            config,
            store,
            children: Mutex::new(HashMap::new()),
            name_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.config.log_dir.join(format!("{name}.{LOG_EXT}"))
    }

    /// Spawns `command` (split on whitespace, no shell) with `env` layered
    /// over the inherited environment. The pid record is on disk before
    /// this returns `Ok`.
    pub fn start(
        &self,
        name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<u32, ProcessError> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| ProcessError::EmptyCommand {
            name: name.to_string(),
        })?;
        let args = parts.map(str::to_string).collect::<Vec<_>>();

        if let Some(existing) = self.store.load(name) {
            if self.is_running(existing.pid) {
                return Err(ProcessError::AlreadyRunning {
                    name: name.to_string(),
                    pid: existing.pid,
                });
            }
            debug!(agent = %name, pid = existing.pid, "replacing stale pid record");
            self.store.remove(name)?;
        }

        let log_file = self.log_path(name);
        let mut stdout = open_log(&log_file)?;
        let started_at = Utc::now();
        // Best effort: the header is cosmetic.
        let _ = writeln!(stdout, "=== {name} starting at {} ===", started_at.to_rfc3339());
        let stderr = stdout
            .try_clone()
            .map_err(|source| ProcessError::LogFile {
                path: log_file.clone(),
                source,
            })?;

        let mut child = Command::new(program)
            .args(&args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .process_group(0)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                name: name.to_string(),
                program: program.to_string(),
                source,
            })?;
        let pid = child.id();

        let record = ProcessRecord {
            name: name.to_string(),
            pid,
            command: program.to_string(),
            args,
            started_at,
            log_file,
        };
        if let Err(err) = self.store.save(&record) {
            warn!(agent = %name, pid, error = %err, "pid record write failed; killing process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        self.lock_children().insert(
            pid,
            TrackedChild {
                name: name.to_string(),
                child,
            },
        );
        info!(agent = %name, pid, command = %record.command_line(), "process started");
        Ok(pid)
    }

    /// Graceful stop with SIGKILL escalation. A pid that is already gone is
    /// success. Bookkeeping for `pid` is cleared even when the kill fails.
    pub fn stop(&self, pid: u32) -> Result<(), ProcessError> {
        match self.record_for_pid(pid) {
            Some(record) => {
                let lock = self.name_lock(&record.name);
                let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
                self.stop_record(&record)
            }
            None => {
                let name = self
                    .lock_children()
                    .get(&pid)
                    .map(|tracked| tracked.name.clone())
                    .unwrap_or_else(|| format!("pid-{pid}"));
                let result = self.terminate(&name, pid);
                self.lock_children().remove(&pid);
                result
            }
        }
    }

    /// Stops whatever is recorded under `name`. Unknown names are a no-op.
    pub fn stop_by_name(&self, name: &str) -> Result<(), ProcessError> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.store.load(name) {
            Some(record) => self.stop_record(&record),
            None => {
                debug!(agent = %name, "stop requested for untracked process");
                Ok(())
            }
        }
    }

    /// Stops every recorded process concurrently, so total time is bounded
    /// by a single stop timeout. Returns every failure.
    pub fn stop_all(&self) -> Vec<ProcessError> {
        let records = match self.store.list() {
            Ok(records) => records,
            Err(err) => return vec![err],
        };

        let mut errors = thread::scope(|scope| {
            let handles = records
                .iter()
                .map(|record| scope.spawn(move || self.stop_by_name(&record.name)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .zip(&records)
                .filter_map(|(handle, record)| stop_outcome(&record.name, handle.join()))
                .collect::<Vec<_>>()
        });

        let orphans = self.lock_children().keys().copied().collect::<Vec<_>>();
        for pid in orphans {
            if let Err(err) = self.stop(pid) {
                errors.push(err);
            }
        }
        errors
    }

    /// Always asks the OS. Children of this supervisor are reaped first so an
    /// exited child is never reported alive as a zombie.
    pub fn is_running(&self, pid: u32) -> bool {
        {
            let mut children = self.lock_children();
            if let Some(tracked) = children.get_mut(&pid) {
                match tracked.child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(pid, %status, "child exited");
                        children.remove(&pid);
                        return false;
                    }
                    Ok(None) => return true,
                    Err(err) => debug!(pid, error = %err, "try_wait failed; probing"),
                }
            }
        }
        probe_alive(pid)
    }

    pub fn get_status(&self, pid: u32) -> ProcessStatus {
        if self.is_running(pid) {
            ProcessStatus::Running
        } else if self.record_for_pid(pid).is_some() {
            ProcessStatus::Exited
        } else {
            ProcessStatus::Unknown
        }
    }

    pub fn process_info(&self, name: &str) -> Option<ProcessRecord> {
        self.store.load(name)
    }

    pub fn list(&self) -> Result<Vec<ProcessRecord>, ProcessError> {
        self.store.list()
    }

    /// Drops records whose process has exited and returns their names.
    pub fn prune(&self) -> Result<Vec<String>, ProcessError> {
        let mut pruned = Vec::new();
        for record in self.store.list()? {
            let lock = self.name_lock(&record.name);
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            // Re-read under the lock; a concurrent start may have replaced it.
            let Some(current) = self.store.load(&record.name) else {
                continue;
            };
            if !self.is_running(current.pid) {
                self.store.remove(&current.name)?;
                self.lock_children().remove(&current.pid);
                info!(agent = %current.name, pid = current.pid, "pruned stale pid record");
                pruned.push(current.name);
            }
        }
        Ok(pruned)
    }

    /// Logs in the log directory last modified before `cutoff`. A log that
    /// belongs to a live process is never selected.
    pub fn stale_logs(&self, cutoff: SystemTime) -> Result<Vec<PathBuf>, ProcessError> {
        let dir = &self.config.log_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ProcessError::ListLogs {
                    path: dir.clone(),
                    source,
                })
            }
        };
        let live_logs = self
            .store
            .list()?
            .into_iter()
            .filter(|record| self.is_running(record.pid))
            .map(|record| record.log_file)
            .collect::<HashSet<_>>();

        let mut stale = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LOG_EXT) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() || live_logs.contains(&path) {
                continue;
            }
            match metadata.modified() {
                Ok(modified) if modified < cutoff => stale.push(path),
                Ok(_) => {}
                Err(err) => debug!(path = %path.display(), error = %err, "no mtime; keeping log"),
            }
        }
        stale.sort();
        Ok(stale)
    }

    /// Deletes each path, continuing past failures.
    pub fn remove_logs(&self, paths: &[PathBuf]) -> Vec<ProcessError> {
        let mut errors = Vec::new();
        for path in paths {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "removed old log"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => errors.push(ProcessError::RemoveLog {
                    path: path.clone(),
                    source,
                }),
            }
        }
        errors
    }

    fn stop_record(&self, record: &ProcessRecord) -> Result<(), ProcessError> {
        let result = self.terminate(&record.name, record.pid);
        self.lock_children().remove(&record.pid);
        let removed = self.store.remove(&record.name);
        match &result {
            Ok(()) => info!(agent = %record.name, pid = record.pid, "process stopped"),
            Err(err) => warn!(
                agent = %record.name,
                pid = record.pid,
                error = %err,
                "stop failed; forgetting process anyway"
            ),
        }
        result.and(removed)
    }

    fn terminate(&self, name: &str, pid: u32) -> Result<(), ProcessError> {
        if !self.is_running(pid) {
            return Ok(());
        }
        if !deliver(name, pid, Signal::SIGTERM)? {
            return Ok(());
        }
        if self.wait_for_exit(pid, self.config.stop_timeout) {
            return Ok(());
        }

        warn!(pid, timeout_ms = self.config.stop_timeout.as_millis() as u64, "escalating to SIGKILL");
        if !deliver(name, pid, Signal::SIGKILL)? {
            return Ok(());
        }
        if self.wait_for_exit(pid, self.config.kill_grace) {
            Ok(())
        } else {
            Err(ProcessError::StopTimeout {
                name: name.to_string(),
                pid,
            })
        }
    }

    fn wait_for_exit(&self, pid: u32, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if !self.is_running(pid) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    fn record_for_pid(&self, pid: u32) -> Option<ProcessRecord> {
        self.store
            .list()
            .ok()?
            .into_iter()
            .find(|record| record.pid == pid)
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    fn lock_children(&self) -> MutexGuard<'_, HashMap<u32, TrackedChild>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A stop thread that panicked still counts as a failure for its name.
fn stop_outcome(
    name: &str,
    joined: thread::Result<Result<(), ProcessError>>,
) -> Option<ProcessError> {
    match joined {
        Ok(result) => result.err(),
        Err(_) => {
            warn!(agent = %name, "stop thread panicked");
            Some(ProcessError::StopPanicked {
                name: name.to_string(),
            })
        }
    }
}

fn open_log(path: &Path) -> Result<File, ProcessError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ProcessError::LogFile {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ProcessError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}
