//! One JSON file per tracked process under the pid directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ProcessError;
use crate::types::ProcessRecord;

const RECORD_EXT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStore {
    dir: PathBuf,
}

impl PidStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORD_EXT}"))
    }

    /// Writes via a temp file and rename so readers never see a torn record.
    pub fn save(&self, record: &ProcessRecord) -> Result<(), ProcessError> {
        fs::create_dir_all(&self.dir).map_err(|source| ProcessError::WriteRecord {
            path: self.dir.clone(),
            source,
        })?;

        let body =
            serde_json::to_string_pretty(record).map_err(|source| ProcessError::EncodeRecord {
                name: record.name.clone(),
                source,
            })?;
        let path = self.record_path(&record.name);
        let tmp = self.dir.join(format!(".{}.{RECORD_EXT}.tmp", record.name));
        fs::write(&tmp, body).map_err(|source| ProcessError::WriteRecord {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| ProcessError::WriteRecord { path, source })
    }

    /// Missing or unreadable records read as absent.
    pub fn load(&self, name: &str) -> Option<ProcessRecord> {
        read_record(&self.record_path(name))
    }

    /// Removing a record that does not exist is not an error.
    pub fn remove(&self, name: &str) -> Result<(), ProcessError> {
        let path = self.record_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProcessError::RemoveRecord { path, source }),
        }
    }

    /// All readable records, sorted by name. Corrupt files are skipped.
    pub fn list(&self) -> Result<Vec<ProcessRecord>, ProcessError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ProcessError::ReadRecords {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_record = path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXT)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }
            if let Some(record) = read_record(&path) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

fn read_record(path: &Path) -> Option<ProcessRecord> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "unreadable pid record");
            return None;
        }
    };
    match serde_json::from_str(&body) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping corrupt pid record");
            None
        }
    }
}
