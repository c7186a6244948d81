//! Termination signals for both front ends of `asc up`.

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use std::os::raw::c_int;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// SIGHUP is included so closing the terminal still stops every agent.
pub const TERMINATION_SIGNALS: [c_int; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Replaces the default action of each termination signal with setting the
/// returned flag. Install it before any process is started.
pub fn install_termination_flag() -> std::io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in TERMINATION_SIGNALS {
        signal_hook::flag::register(signal, Arc::clone(&flag))?;
    }
    Ok(flag)
}

pub fn wait_for_termination(flag: &AtomicBool, poll: Duration) {
    while !flag.load(Ordering::SeqCst) {
        thread::sleep(poll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hangup_sets_the_flag_instead_of_killing_the_process() {
        let flag = install_termination_flag().expect("register handlers");
        assert!(!flag.load(Ordering::SeqCst));

        signal_hook::low_level::raise(SIGHUP).expect("raise SIGHUP");

        assert!(flag.load(Ordering::SeqCst));
        wait_for_termination(&flag, Duration::from_millis(1));
    }
}
