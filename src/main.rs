/*!
 * Init Shim - Main Entry Point
 *
 * Runs one command as a container init process under the lifecycle state
 * machine:
 * - start the process and wait for its exit
 * - forward Ctrl+C as SIGTERM, then SIGKILL after the grace period
 * - record the exit, delete the process, print the final snapshot
 *
 * Usage: shim <command> [args...]
 */

use anyhow::{bail, Context, Result};
use init_shim::{init_tracing, ExecOptions, InitProcess, LocalController, ShimConfig, Signal};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ShimConfig::from_env().context("invalid shim configuration")?;
    init_tracing(config.trace_json);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bail!("usage: shim <command> [args...]");
    }

    info!(id = %config.id, command = ?args, "init shim starting");

    let controller = Arc::new(LocalController::new(ExecOptions::new(args)));
    let process = Arc::new(InitProcess::new(config.id.clone(), controller.clone()));

    process.start().context("failed to start init process")?;
    info!(id = %config.id, pid = ?controller.pid(), "init process running");

    let mut waiter = spawn_waiter(controller.clone(), process.clone());

    tokio::select! {
        joined = &mut waiter => {
            joined.context("exit waiter panicked")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!(id = %config.id, "interrupt received, stopping init process");
            if let Err(e) = process.kill(Signal::SIGTERM, true) {
                warn!(error = %e, "SIGTERM delivery failed");
            }

            match tokio::time::timeout(config.kill_grace, &mut waiter).await {
                Ok(joined) => joined.context("exit waiter panicked")?,
                Err(_) => {
                    warn!(
                        grace_ms = config.kill_grace.as_millis() as u64,
                        "init process ignored SIGTERM, sending SIGKILL"
                    );
                    if let Err(e) = process.kill(Signal::SIGKILL, true) {
                        error!(error = %e, "SIGKILL delivery failed");
                    }
                    waiter.await.context("exit waiter panicked")?;
                }
            }
        }
    }

    process.delete().context("failed to delete init process")?;

    let snapshot = process.snapshot();
    println!("{}", serde_json::to_string(&snapshot)?);

    let code = snapshot.exit.map(|e| e.code).unwrap_or_default();
    info!(id = %config.id, code, "init shim exiting");
    std::process::exit(code);
}

/// Wait for the init process on a blocking thread and report its exit
fn spawn_waiter(controller: Arc<LocalController>, process: Arc<InitProcess>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || match controller.wait(process.id()) {
        Ok(code) => process.set_exited(code),
        Err(e) => {
            error!(id = %process.id(), error = %e, "failed to wait for init process");
            process.set_exited(init_shim::core::limits::UNKNOWN_EXIT_CODE);
        }
    })
}
