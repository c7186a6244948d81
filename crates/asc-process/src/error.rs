use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("command is empty")]
    EmptyCommand { name: String },
    #[error("failed to start '{program}': {source}")]
    Spawn {
        name: String,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("already running (pid {pid})")]
    AlreadyRunning { name: String, pid: u32 },
    #[error("invalid pid {pid}")]
    InvalidPid { pid: u32 },
    #[error("failed to send {signal} to pid {pid}: {source}")]
    Signal {
        name: String,
        pid: u32,
        signal: &'static str,
        #[source]
        source: nix::errno::Errno,
    },
    #[error("pid {pid} still alive after SIGKILL")]
    StopTimeout { name: String, pid: u32 },
    #[error("stop thread panicked")]
    StopPanicked { name: String },
    #[error("failed to write pid record at {path}: {source}")]
    WriteRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove pid record at {path}: {source}")]
    RemoveRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read pid records in {path}: {source}")]
    ReadRecords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode pid record for {name}: {source}")]
    EncodeRecord {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list logs in {path}: {source}")]
    ListLogs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove log {path}: {source}")]
    RemoveLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot determine home directory; set ASC_HOME")]
    NoHomeDir,
}

impl ProcessError {
    /// The agent or service this error is scoped to, when there is one.
    /// Display texts leave it out because callers key errors by name.
    pub fn name(&self) -> Option<&str> {
        match self {
            ProcessError::EmptyCommand { name }
            | ProcessError::Spawn { name, .. }
            | ProcessError::AlreadyRunning { name, .. }
            | ProcessError::Signal { name, .. }
            | ProcessError::StopTimeout { name, .. }
            | ProcessError::StopPanicked { name }
            | ProcessError::EncodeRecord { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}
