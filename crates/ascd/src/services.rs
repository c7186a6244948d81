//! The `mcp_agent_mail` service, managed apart from the agents.

use asc_core::config::ServiceSettings;
use asc_core::validation::SERVICE_PROCESS_NAME;
use asc_process::{ProcessError, ProcessRecord, ProcessSupervisor};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStart {
    Started { pid: u32 },
    /// A previous `asc up` or `asc services start` left it running.
    AlreadyRunning { pid: u32 },
}

impl ServiceStart {
    pub fn pid(self) -> u32 {
        match self {
            ServiceStart::Started { pid } | ServiceStart::AlreadyRunning { pid } => pid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Running(ProcessRecord),
    Stopped,
    /// A record was left behind by a process that has exited. Reading the
    /// state clears it.
    Stale(ProcessRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStop {
    Stopped { pid: u32 },
    NotRunning,
}

pub fn start_service(
    supervisor: &ProcessSupervisor,
    settings: &ServiceSettings,
    env: &BTreeMap<String, String>,
) -> Result<ServiceStart, ProcessError> {
    match supervisor.start(SERVICE_PROCESS_NAME, &settings.start_command, env) {
        Ok(pid) => {
            info!(pid, url = %settings.url, "mcp_agent_mail started");
            Ok(ServiceStart::Started { pid })
        }
        Err(ProcessError::AlreadyRunning { pid, .. }) => {
            warn!(pid, "mcp_agent_mail already running; reusing it");
            Ok(ServiceStart::AlreadyRunning { pid })
        }
        Err(err) => Err(err),
    }
}

pub fn service_state(supervisor: &ProcessSupervisor) -> Result<ServiceState, ProcessError> {
    let Some(record) = supervisor.process_info(SERVICE_PROCESS_NAME) else {
        return Ok(ServiceState::Stopped);
    };
    if supervisor.is_running(record.pid) {
        return Ok(ServiceState::Running(record));
    }
    supervisor.stop_by_name(SERVICE_PROCESS_NAME)?;
    Ok(ServiceState::Stale(record))
}

pub fn stop_service(supervisor: &ProcessSupervisor) -> Result<ServiceStop, ProcessError> {
    match service_state(supervisor)? {
        ServiceState::Running(record) => {
            supervisor.stop_by_name(SERVICE_PROCESS_NAME)?;
            Ok(ServiceStop::Stopped { pid: record.pid })
        }
        ServiceState::Stopped | ServiceState::Stale(_) => Ok(ServiceStop::NotRunning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asc_process::SupervisorConfig;
    use std::time::Duration;

    fn supervisor(root: &std::path::Path) -> ProcessSupervisor {
        ProcessSupervisor::new(SupervisorConfig {
            stop_timeout: Duration::from_millis(300),
            poll_interval: Duration::from_millis(10),
            ..SupervisorConfig::under(root)
        })
    }

    fn settings(command: &str) -> ServiceSettings {
        ServiceSettings {
            start_command: command.to_string(),
            url: "http://localhost:8765".to_string(),
        }
    }

    #[test]
    fn start_status_stop_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = supervisor(dir.path());
        assert_eq!(service_state(&supervisor).expect("state"), ServiceState::Stopped);

        let started = start_service(&supervisor, &settings("sleep 30"), &BTreeMap::new())
            .expect("start service");
        assert!(matches!(started, ServiceStart::Started { .. }));
        let again = start_service(&supervisor, &settings("sleep 30"), &BTreeMap::new())
            .expect("second start");
        assert_eq!(again, ServiceStart::AlreadyRunning { pid: started.pid() });

        match service_state(&supervisor).expect("state") {
            ServiceState::Running(record) => {
                assert_eq!(record.pid, started.pid());
                assert_eq!(record.log_file, supervisor.log_path(SERVICE_PROCESS_NAME));
            }
            other => panic!("unexpected state {other:?}"),
        }

        assert_eq!(
            stop_service(&supervisor).expect("stop"),
            ServiceStop::Stopped { pid: started.pid() }
        );
        assert!(!supervisor.is_running(started.pid()));
        assert_eq!(stop_service(&supervisor).expect("stop again"), ServiceStop::NotRunning);
    }

    #[test]
    fn exited_service_reads_as_stale_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = supervisor(dir.path());
        let started = start_service(&supervisor, &settings("true"), &BTreeMap::new())
            .expect("start service");
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while supervisor.is_running(started.pid()) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(
            service_state(&supervisor).expect("state"),
            ServiceState::Stale(_)
        ));
        assert_eq!(service_state(&supervisor).expect("state"), ServiceState::Stopped);
    }

    #[test]
    fn unspawnable_service_command_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let supervisor = supervisor(dir.path());
        let err = start_service(
            &supervisor,
            &settings("definitely-not-a-real-binary-asc"),
            &BTreeMap::new(),
        )
        .expect_err("spawn fails");
        assert_eq!(err.name(), Some(SERVICE_PROCESS_NAME));
    }
}
