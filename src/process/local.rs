/*!
 * Local Process Controller
 * Runs the init process as a plain OS child of the shim
 *
 * No namespaces or cgroups: Update is unsupported, Kill and Resume are plain
 * signals. The init process gets its own process group so `kill(all)` reaches
 * everything it spawned.
 */

use super::traits::ProcessController;
use super::types::{CheckpointConfig, ExecHandle, ExecOptions, ResourceSpec};
use crate::core::errors::{ControllerError, ControllerResult};
use crate::core::limits::{SIGNAL_EXIT_BASE, UNKNOWN_EXIT_CODE};
use crate::core::types::{ExitCode, Pid};
use crate::signals::Signal;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::sys::signal::{kill, killpg};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Init process bookkeeping
#[derive(Debug, Default)]
struct Tracked {
    pid: Option<Pid>,
    child: Option<Child>,
    exit: Option<ExitCode>,
}

/// Controller backed by `std::process` and UNIX signals
pub struct LocalController {
    launch: ExecOptions,
    init: Mutex<Tracked>,
    execs: Mutex<HashMap<String, Child>>,
}

impl LocalController {
    /// `launch.args[0]` is the program, the rest its arguments
    pub fn new(launch: ExecOptions) -> Self {
        Self {
            launch,
            init: Mutex::new(Tracked::default()),
            execs: Mutex::new(HashMap::new()),
        }
    }

    /// OS pid of the init process once started
    pub fn pid(&self) -> Option<Pid> {
        self.init.lock().pid
    }

    /// Block until the init process exits and return its exit code
    ///
    /// Signal exits are reported as 128 + signal number. Only one waiter can
    /// hold the child; a second call returns the recorded code if the first
    /// has finished, `NotFound` otherwise.
    ///
    /// The exit is recorded before the child is reaped, so no signal is ever
    /// sent to a pid the kernel may have handed out again.
    pub fn wait(&self, id: &str) -> ControllerResult<ExitCode> {
        let child = {
            let mut tracked = self.init.lock();
            if let Some(code) = tracked.exit {
                return Ok(code);
            }
            tracked.child.take()
        };

        let mut child = child.ok_or_else(|| ControllerError::NotFound(id.to_string()))?;
        let code = await_exit(&mut child)?;
        self.init.lock().exit = Some(code);

        child.wait()?;
        info!(id = %id, pid = child.id(), code, "init process exited");
        Ok(code)
    }

    fn spawn(options: &ExecOptions, own_group: bool) -> ControllerResult<Child> {
        let (program, args) = options
            .args
            .split_first()
            .ok_or_else(|| ControllerError::SpawnFailed("empty command".to_string()))?;

        if options.terminal {
            return Err(ControllerError::Unsupported(
                "terminal sessions need a pty-backed controller".to_string(),
            ));
        }

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(options.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(ref cwd) = options.cwd {
            cmd.current_dir(cwd);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            if own_group {
                cmd.process_group(0);
            }
        }
        #[cfg(not(unix))]
        let _ = own_group;

        cmd.spawn()
            .map_err(|e| ControllerError::SpawnFailed(format!("{}: {}", program, e)))
    }

    /// Pid of a started, not yet reaped init process
    fn live_pid(&self, id: &str) -> ControllerResult<Pid> {
        let tracked = self.init.lock();
        match (tracked.pid, tracked.exit) {
            (Some(pid), None) => Ok(pid),
            _ => Err(ControllerError::NotFound(id.to_string())),
        }
    }

    /// Signals are sent under the init lock so the waiter cannot reap the
    /// process between the liveness check and delivery
    #[cfg(unix)]
    fn signal(&self, id: &str, signal: Signal, group: bool) -> ControllerResult<()> {
        let tracked = self.init.lock();
        let pid = match (tracked.pid, tracked.exit) {
            (Some(pid), None) => pid,
            _ => return Err(ControllerError::NotFound(id.to_string())),
        };
        let failed = |reason: String| ControllerError::SignalFailed {
            id: id.to_string(),
            signal: signal.to_string(),
            reason,
        };

        let unix_signal = signal.to_nix().map_err(|e| failed(e.to_string()))?;
        let target = NixPid::from_raw(pid as i32);
        let result = if group {
            killpg(target, unix_signal)
        } else {
            kill(target, unix_signal)
        };
        result.map_err(|e| failed(e.to_string()))
    }

    #[cfg(not(unix))]
    fn signal(&self, id: &str, _signal: Signal, _group: bool) -> ControllerResult<()> {
        self.live_pid(id)?;
        Err(ControllerError::Unsupported(
            "signals are not supported on this platform".to_string(),
        ))
    }
}

impl ProcessController for LocalController {
    fn start(&self, id: &str) -> ControllerResult<()> {
        let mut tracked = self.init.lock();
        if tracked.pid.is_some() {
            return Err(ControllerError::Failed(format!("process {} already started", id)));
        }

        let child = Self::spawn(&self.launch, true)?;
        let pid = child.id();
        info!(id = %id, pid, command = ?self.launch.args, "spawned init process");

        tracked.pid = Some(pid);
        tracked.child = Some(child);
        Ok(())
    }

    fn kill(&self, id: &str, signal: Signal, all: bool) -> ControllerResult<()> {
        info!(id = %id, signal = %signal, all, "signalling init process");
        self.signal(id, signal, all)
    }

    fn delete(&self, id: &str) -> ControllerResult<()> {
        {
            let mut guard = self.init.lock();
            let tracked = &mut *guard;
            if tracked.pid.is_some() && tracked.exit.is_none() {
                match tracked.child.as_mut() {
                    Some(child) => match child.try_wait()? {
                        Some(status) => tracked.exit = Some(exit_code(&status)),
                        None => return Err(ControllerError::StillRunning(id.to_string())),
                    },
                    // A waiter owns the child and has not seen the exit yet
                    None => return Err(ControllerError::StillRunning(id.to_string())),
                }
            }
            tracked.child = None;
        }

        let mut execs = self.execs.lock();
        for (exec_id, mut child) in execs.drain() {
            if let Ok(None) = child.try_wait() {
                warn!(id = %id, exec_id = %exec_id, "exec session outlived init process");
                let _ = child.kill();
                let _ = child.wait();
            }
        }

        info!(id = %id, "deleted init process");
        Ok(())
    }

    fn update(&self, id: &str, resources: &ResourceSpec) -> ControllerResult<()> {
        if resources.is_empty() {
            debug!(id = %id, "empty resource update");
            return Ok(());
        }
        warn!(id = %id, resources = ?resources, "resource update requested");
        Err(ControllerError::Unsupported(
            "resource updates need a cgroup-backed controller".to_string(),
        ))
    }

    fn exec(&self, id: &str, exec_id: &str, options: &ExecOptions) -> ControllerResult<ExecHandle> {
        self.live_pid(id)?;

        let mut execs = self.execs.lock();
        if execs.contains_key(exec_id) {
            return Err(ControllerError::Failed(format!(
                "exec {} already exists in {}",
                exec_id, id
            )));
        }

        let child = Self::spawn(options, false)?;
        let pid = child.id();
        info!(id = %id, exec_id = %exec_id, pid, "spawned exec session");
        execs.insert(exec_id.to_string(), child);

        Ok(ExecHandle {
            exec_id: exec_id.to_string(),
            pid: Some(pid),
        })
    }

    fn resume(&self, id: &str) -> ControllerResult<()> {
        self.signal(id, Signal::SIGCONT, true)
    }

    fn checkpoint(&self, id: &str, config: &CheckpointConfig) -> ControllerResult<()> {
        warn!(id = %id, image = %config.image_path.display(), "checkpoint requested");
        Err(ControllerError::Unsupported(
            "checkpoint needs a CRIU-backed controller".to_string(),
        ))
    }
}

/// Block until `child` has exited without reaping it
#[cfg(target_os = "linux")]
fn await_exit(child: &mut Child) -> ControllerResult<ExitCode> {
    use nix::errno::Errno;
    use nix::sys::wait::{waitid, Id, WaitPidFlag, WaitStatus};

    let pid = NixPid::from_raw(child.id() as i32);
    loop {
        match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(SIGNAL_EXIT_BASE + signal as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(ControllerError::Io(e.to_string())),
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn await_exit(child: &mut Child) -> ControllerResult<ExitCode> {
    Ok(exit_code(&child.wait()?))
}

#[cfg(unix)]
fn exit_code(status: &std::process::ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => SIGNAL_EXIT_BASE + signal,
        (None, None) => UNKNOWN_EXIT_CODE,
    }
}

#[cfg(not(unix))]
fn exit_code(status: &std::process::ExitStatus) -> ExitCode {
    status.code().unwrap_or(UNKNOWN_EXIT_CODE)
}
