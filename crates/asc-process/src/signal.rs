//! Thin wrappers over `kill(2)` that treat a vanished process as success.

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::error::ProcessError;

pub(crate) fn to_pid(pid: u32) -> Result<Pid, ProcessError> {
    match i32::try_from(pid) {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(ProcessError::InvalidPid { pid }),
    }
}

/// Signal-0 existence probe. `EPERM` means the pid exists but belongs to
/// someone else, which still counts as alive. Zombies do not.
pub fn probe_alive(pid: u32) -> bool {
    let Ok(target) = to_pid(pid) else {
        return false;
    };
    match kill(target, None) {
        Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn is_zombie(pid: u32) -> bool {
    // Format: "pid (comm) state ...", where comm may itself contain ')'.
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.trim_start().chars().next()
        })
        .is_some_and(|state| state == 'Z')
}

#[cfg(not(target_os = "linux"))]
fn is_zombie(_pid: u32) -> bool {
    false
}

/// Delivers `signal` to the process group led by `pid`, falling back to the
/// single process when `pid` does not lead a group. `Ok(false)` means the
/// process was already gone. `name` only labels the error.
pub fn deliver(name: &str, pid: u32, signal: Signal) -> Result<bool, ProcessError> {
    let target = to_pid(pid)?;
    let result = match killpg(target, signal) {
        Err(Errno::ESRCH) => kill(target, signal),
        other => other,
    };
    match result {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(ProcessError::Signal {
            name: name.to_string(),
            pid,
            signal: signal.as_str(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{deliver, probe_alive, to_pid};
    use crate::error::ProcessError;
    use nix::sys::signal::Signal;

    #[test]
    fn zero_and_overflowing_pids_are_rejected() {
        assert!(matches!(to_pid(0), Err(ProcessError::InvalidPid { pid: 0 })));
        assert!(to_pid(u32::MAX).is_err());
        assert!(!probe_alive(0));
    }

    #[test]
    fn own_process_is_alive() {
        assert!(probe_alive(std::process::id()));
    }

    #[test]
    fn unreaped_child_is_not_alive() {
        let child = std::process::Command::new("true")
            .spawn()
            .expect("spawn true");
        let pid = child.id();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while probe_alive(pid) && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(!probe_alive(pid));
        drop(child);
    }

    #[test]
    fn signalling_reaped_child_reports_gone() {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn true");
        let pid = child.id();
        child.wait().expect("wait for true");

        assert!(!probe_alive(pid));
        assert!(!deliver("gone", pid, Signal::SIGTERM).expect("deliver to gone pid"));
    }
}
