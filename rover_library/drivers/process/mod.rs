//! External single-shot actuator processes
//!
//! The turret steppers and the firing solenoid are driven by small programs
//! that generate the pulses themselves and exit. The agent only launches them.
//! A [`ProcessActuator`] wraps one such program with:
//!
//! - a busy flag: a new invocation is refused while the previous one runs
//! - a reaper thread that waits for the child, killing it past the timeout
//!
//! Invocation is fire-and-forget from the caller's side.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rover_core::{RoverError, RoverResult};
use serde::{Deserialize, Serialize};

const REAP_POLL: Duration = Duration::from_millis(20);

/// Program launched for one actuator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Executable (an interpreter when `args` names a script)
    pub program: PathBuf,
    /// Arguments placed before the per-invocation ones
    #[serde(default)]
    pub args: Vec<String>,
    /// Kill the child if it runs longer than this
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ProcessConfig {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// One external actuator program with a non-overlap guard
#[derive(Debug)]
pub struct ProcessActuator {
    name: String,
    config: ProcessConfig,
    busy: Arc<AtomicBool>,
    launched: AtomicU64,
}

impl ProcessActuator {
    pub fn new<S: Into<String>>(name: S, config: ProcessConfig) -> Self {
        Self {
            name: name.into(),
            config,
            busy: Arc::new(AtomicBool::new(false)),
            launched: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// True while a previous invocation is still running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Number of invocations that were actually started
    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    /// Launch the program with `args` appended and return immediately.
    ///
    /// Fails with [`RoverError::Busy`] if the previous invocation is still
    /// running, or with an actuator error if the program cannot be started.
    pub fn invoke(&self, args: &[String]) -> RoverResult<()> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RoverError::Busy(self.name.clone()));
        }

        let child = match Command::new(&self.config.program)
            .args(&self.config.args)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                self.busy.store(false, Ordering::Release);
                return Err(RoverError::actuator(
                    &self.name,
                    format!("failed to start {}: {}", self.config.program.display(), e),
                ));
            }
        };
        self.launched.fetch_add(1, Ordering::Relaxed);
        log::debug!("{}: launched pid {} with {:?}", self.name, child.id(), args);

        let name = self.name.clone();
        let busy = Arc::clone(&self.busy);
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let reaper = thread::Builder::new()
            .name(format!("{}-reaper", self.name))
            .spawn(move || {
                reap(&name, child, timeout);
                busy.store(false, Ordering::Release);
            });

        if let Err(e) = reaper {
            // The child moved into the failed closure and was dropped unreaped.
            self.busy.store(false, Ordering::Release);
            return Err(RoverError::actuator(
                &self.name,
                format!("failed to start reaper thread: {}", e),
            ));
        }
        Ok(())
    }

    /// Block until the actuator is idle or `timeout` elapses. Returns `true` if idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(REAP_POLL);
        }
        true
    }
}

fn reap(name: &str, mut child: Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => {
                log::debug!("{}: finished", name);
                return;
            }
            Ok(Some(status)) => {
                log::warn!("{}: exited with {}", name, status);
                return;
            }
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("{}: still running after {:?}, killing it", name, timeout);
                if let Err(e) = child.kill() {
                    log::error!("{}: kill failed: {}", name, e);
                }
                let _ = child.wait();
                return;
            }
            Ok(None) => thread::sleep(REAP_POLL),
            Err(e) => {
                log::error!("{}: wait failed: {}", name, e);
                return;
            }
        }
    }
}
