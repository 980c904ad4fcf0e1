//! Runner - spawns the distributed runner and waits for it

use anyhow::{Context, Result};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Once;
use tracing::{debug, info, warn};

use super::compose::Invocation;

const NO_CHILD: i64 = 0;
const PENDING: i64 = -1;

// NO_CHILD, PENDING (signal arrived before spawn) or the child's pid
static CHILD_STATE: AtomicI64 = AtomicI64::new(NO_CHILD);
static INSTALL_HANDLER: Once = Once::new();

/// How the runner finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl LaunchOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// The child's code, or `128 + signal` when it was killed.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

/// Spawn the runner and block until it exits. No retries.
pub fn spawn_and_wait(invocation: &Invocation) -> Result<LaunchOutcome> {
    install_signal_forwarding();

    let mut command = invocation.command();
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own group so forwarded signals reach every worker torchrun starts.
        command.process_group(0);
    }

    info!(
        "🚀 Launching {} ({} worker process(es)) via {}",
        invocation.profile, invocation.nproc, invocation.program
    );
    debug!("argv: {:?}", invocation.masked_argv());

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to start runner `{}`", invocation.program))?;

    let pid = i64::from(child.id());
    if register_child(pid) {
        signal_child(pid);
    }

    let status = child.wait();
    CHILD_STATE.store(NO_CHILD, Ordering::SeqCst);
    let status = status.context("Failed to wait for runner")?;

    let outcome = LaunchOutcome::from_status(status);
    debug!("Runner exited: {:?}", outcome);
    Ok(outcome)
}

fn install_signal_forwarding() {
    INSTALL_HANDLER.call_once(|| {
        if let Err(e) = ctrlc::set_handler(forward_termination) {
            warn!("Signal forwarding disabled: {}", e);
        }
    });
}

/// Publishes the child's pid. True if a signal arrived before it existed.
fn register_child(pid: i64) -> bool {
    CHILD_STATE.swap(pid, Ordering::SeqCst) == PENDING
}

fn forward_termination() {
    loop {
        let state = CHILD_STATE.load(Ordering::SeqCst);
        if state > 0 {
            signal_child(state);
            return;
        }
        if state == PENDING {
            return;
        }
        // Fails only if a pid was registered since the load; go round again.
        if CHILD_STATE
            .compare_exchange(NO_CHILD, PENDING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return;
        }
    }
}

fn signal_child(pid: i64) {
    #[cfg(unix)]
    {
        // Negative pid targets the whole process group.
        let pgid = -(pid as libc::pid_t);
        unsafe {
            libc::kill(pgid, libc::SIGTERM);
        }
    }
    // Elsewhere the console already delivers Ctrl-C to the child.
    #[cfg(not(unix))]
    let _ = pid;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_passthrough() {
        let outcome = LaunchOutcome {
            code: Some(1),
            signal: None,
        };
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn test_signal_maps_to_shell_convention() {
        let outcome = LaunchOutcome {
            code: None,
            signal: Some(15),
        };
        assert_eq!(outcome.exit_code(), 143);
    }

    #[test]
    fn test_signal_before_spawn_is_delivered_after() {
        CHILD_STATE.store(NO_CHILD, Ordering::SeqCst);
        forward_termination();
        assert_eq!(CHILD_STATE.load(Ordering::SeqCst), PENDING);
        // A second signal while still pending does not change anything.
        forward_termination();
        assert_eq!(CHILD_STATE.load(Ordering::SeqCst), PENDING);

        assert!(register_child(4242));
        assert_eq!(CHILD_STATE.load(Ordering::SeqCst), 4242);
        CHILD_STATE.store(NO_CHILD, Ordering::SeqCst);

        assert!(!register_child(4243));
        CHILD_STATE.store(NO_CHILD, Ordering::SeqCst);
    }

    #[cfg(unix)]
    #[test]
    fn test_outcome_from_real_status() -> Result<()> {
        let status = std::process::Command::new("sh")
            .args(["-c", "exit 3"])
            .status()?;
        let outcome = LaunchOutcome::from_status(status);
        assert_eq!(outcome.code, Some(3));
        assert_eq!(outcome.exit_code(), 3);
        Ok(())
    }
}
