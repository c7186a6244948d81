use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ProcessError;
use crate::supervisor::ProcessSupervisor;

/// Lifecycle operations the reconciliation engine needs, keyed by agent name.
pub trait ProcessControl: Send + Sync {
    fn start(
        &self,
        name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<u32, ProcessError>;

    /// Must succeed when nothing is running under `name`.
    fn stop(&self, name: &str) -> Result<(), ProcessError>;

    fn stop_all(&self) -> Vec<ProcessError>;
}

impl ProcessControl for ProcessSupervisor {
    fn start(
        &self,
        name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<u32, ProcessError> {
        ProcessSupervisor::start(self, name, command, env)
    }

    fn stop(&self, name: &str) -> Result<(), ProcessError> {
        self.stop_by_name(name)
    }

    fn stop_all(&self) -> Vec<ProcessError> {
        ProcessSupervisor::stop_all(self)
    }
}

impl<T: ProcessControl + ?Sized> ProcessControl for Arc<T> {
    fn start(
        &self,
        name: &str,
        command: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<u32, ProcessError> {
        T::start(&**self, name, command, env)
    }

    fn stop(&self, name: &str) -> Result<(), ProcessError> {
        T::stop(&**self, name)
    }

    fn stop_all(&self) -> Vec<ProcessError> {
        T::stop_all(&**self)
    }
}
