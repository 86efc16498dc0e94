/*!
 * Init Process
 *
 * Owns the current lifecycle state of a container's init process and runs
 * every lifecycle operation against it.
 *
 * # Locking
 *
 * - **Operation lock**: serializes caller-driven operations (start, kill,
 *   delete, ...) so two callers never dispatch from the same state.
 * - **State lock**: guards the state slot and the recorded exit. Held only to
 *   dispatch and to commit, never across a controller call. The compensating
 *   resume in `set_exited` runs after the exit is claimed and the lock is
 *   released.
 *
 * Exit notifications take only the state lock. A controller that reports the
 * exit synchronously from inside `kill` therefore cannot deadlock, and the
 * exit may land between dispatch and commit. Commit re-validates: the
 * successor is installed when the table still allows it, otherwise the exit
 * wins.
 */

use super::state::{Dispatch, ExitAction, InitState};
use super::traits::ProcessController;
use super::types::{
    CheckpointConfig, ExecHandle, ExecOptions, ExitStatus, Operation, ProcessSnapshot,
    ResourceSpec,
};
use crate::core::errors::{ControllerResult, LifecycleError, LifecycleResult};
use crate::core::types::ExitCode;
use crate::monitoring::{span_operation, Event, EventSink, Payload, Severity, TracingSink};
use crate::signals::Signal;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// State slot: the current state and the exit recorded on the way to Stopped
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    state: InitState,
    exit: Option<ExitStatus>,
}

/// Lifecycle context of a container's init process
pub struct InitProcess {
    id: String,
    controller: Arc<dyn ProcessController>,
    events: Arc<dyn EventSink>,
    slot: Mutex<Slot>,
    serial: Mutex<()>,
}

impl InitProcess {
    /// Create an init process in the Created state
    pub fn new(id: impl Into<String>, controller: Arc<dyn ProcessController>) -> Self {
        let id = id.into();
        debug!(id = %id, "init process created");
        Self {
            id,
            controller,
            events: Arc::new(TracingSink),
            slot: Mutex::new(Slot::default()),
            serial: Mutex::new(()),
        }
    }

    /// Rebuild the context for a process already observed in `state`
    ///
    /// Used when a shim reattaches to a container it did not create, for
    /// example one frozen by the runtime while the shim was down.
    pub fn restore(
        id: impl Into<String>,
        controller: Arc<dyn ProcessController>,
        state: InitState,
    ) -> Self {
        let process = Self::new(id, controller);
        process.slot.lock().state = state;
        debug!(id = %process.id, state = %state, "init process restored");
        process
    }

    /// Route lifecycle events to `sink` instead of `tracing`
    #[inline]
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state
    #[inline]
    pub fn state(&self) -> InitState {
        self.slot.lock().state
    }

    /// Exit recorded by `set_exited`, if the process has exited
    #[inline]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.slot.lock().exit
    }

    /// Consistent view of state and exit
    pub fn snapshot(&self) -> ProcessSnapshot {
        let slot = *self.slot.lock();
        ProcessSnapshot {
            id: self.id.clone(),
            state: slot.state,
            exit: slot.exit,
        }
    }

    /// Status string for the current state
    ///
    /// Pure observation: never calls the controller or changes state.
    pub fn status(&self) -> LifecycleResult<&'static str> {
        self.slot.lock().state.status()
    }

    pub fn start(&self) -> LifecycleResult<()> {
        self.run(Operation::Start, |controller, id| controller.start(id))
    }

    pub fn pause(&self) -> LifecycleResult<()> {
        self.run(Operation::Pause, |_, _| {
            unreachable!("pause is rejected by dispatch in every state")
        })
    }

    pub fn resume(&self) -> LifecycleResult<()> {
        self.run(Operation::Resume, |controller, id| controller.resume(id))
    }

    pub fn update(&self, resources: &ResourceSpec) -> LifecycleResult<()> {
        self.run(Operation::Update, |controller, id| {
            controller.update(id, resources)
        })
    }

    pub fn checkpoint(&self, config: &CheckpointConfig) -> LifecycleResult<()> {
        self.run(Operation::Checkpoint, |controller, id| {
            controller.checkpoint(id, config)
        })
    }

    pub fn delete(&self) -> LifecycleResult<()> {
        self.run(Operation::Delete, |controller, id| controller.delete(id))
    }

    pub fn kill(&self, signal: Signal, all: bool) -> LifecycleResult<()> {
        self.run(Operation::Kill, |controller, id| {
            controller.kill(id, signal, all)
        })
    }

    pub fn exec(&self, exec_id: &str, options: &ExecOptions) -> LifecycleResult<ExecHandle> {
        self.run(Operation::Exec, |controller, id| {
            controller.exec(id, exec_id, options)
        })
    }

    /// Record the process exit and move to Stopped
    ///
    /// Never fails: the exit has already happened. A paused process is resumed
    /// first so the runtime can finish reaping it; if that resume fails the
    /// failure is emitted as an event and the transition still happens.
    /// Repeated notifications are ignored.
    ///
    /// The exit is claimed under the state lock before the resume, and the
    /// resume itself runs unlocked, so a controller may observe or notify the
    /// process from inside it. Until Stopped is installed the process still
    /// reports Paused, with its exit already recorded.
    pub fn set_exited(&self, status: ExitCode) {
        let _span = span_operation(Operation::SetExited, &self.id);

        let (previous, action) = {
            let mut slot = self.slot.lock();
            let previous = slot.state;
            let action = match slot.exit {
                Some(_) => ExitAction::Ignore,
                None => previous.on_exit(),
            };

            match action {
                ExitAction::Ignore => {}
                ExitAction::Stop => {
                    slot.exit = Some(ExitStatus::now(status));
                    slot.state = previous.transition(InitState::Stopped);
                }
                ExitAction::ResumeThenStop => {
                    slot.exit = Some(ExitStatus::now(status));
                }
            }
            (previous, action)
        };

        if action == ExitAction::Ignore {
            debug!(id = %self.id, state = %previous, status, "exit already handled");
            return;
        }

        self.emit(Severity::Info, Payload::ExitRecorded { status, previous });

        if action == ExitAction::ResumeThenStop {
            if let Err(err) = self.controller.resume(&self.id) {
                self.emit(
                    Severity::Error,
                    Payload::CompensatingResumeFailed {
                        error: err.to_string(),
                    },
                );
            }

            let mut slot = self.slot.lock();
            slot.state = slot.state.transition(InitState::Stopped);
        }

        self.emit(
            Severity::Info,
            Payload::StateChanged {
                operation: Operation::SetExited,
                from: previous,
                to: InitState::Stopped,
            },
        );
    }

    /// Dispatch, perform the side effect outside the state lock, commit
    fn run<T, F>(&self, operation: Operation, effect: F) -> LifecycleResult<T>
    where
        F: FnOnce(&dyn ProcessController, &str) -> ControllerResult<T>,
    {
        let span = span_operation(operation, &self.id);
        let _serial = self.serial.lock();

        let dispatched = {
            let slot = self.slot.lock();
            slot.state.dispatch(operation).map(|d| (slot.state, d))
        };

        let (from, next) = match dispatched {
            Ok((from, Dispatch::Delegate { next })) => (from, next),
            Ok((_, Dispatch::Observe)) => unreachable!("{operation} has no side effect"),
            Err(err) => {
                span.record_error(&err.to_string());
                if let Some(state) = rejected_state(&err) {
                    self.emit(
                        Severity::Info,
                        Payload::OperationRejected { operation, state },
                    );
                }
                return Err(err);
            }
        };

        let value = match effect(self.controller.as_ref(), &self.id) {
            Ok(value) => value,
            Err(err) => {
                span.record_error(&err.to_string());
                self.emit(
                    Severity::Error,
                    Payload::ControllerFailed {
                        operation,
                        error: err.to_string(),
                    },
                );
                return Err(err.into());
            }
        };

        if let Some(next) = next {
            self.commit(operation, from, next);
        }

        span.record_result(true);
        Ok(value)
    }

    /// Install `next` after a successful side effect dispatched from `from`
    fn commit(&self, operation: Operation, from: InitState, next: InitState) {
        let mut slot = self.slot.lock();
        let current = slot.state;

        if current != from && !current.can_transition_to(next) {
            drop(slot);
            self.emit(
                Severity::Info,
                Payload::TransitionSuperseded {
                    operation,
                    target: next,
                    current,
                },
            );
            return;
        }

        slot.state = current.transition(next);
        drop(slot);

        self.emit(
            Severity::Info,
            Payload::StateChanged {
                operation,
                from: current,
                to: next,
            },
        );
    }

    #[inline]
    fn emit(&self, severity: Severity, payload: Payload) {
        self.events.emit(Event::new(severity, self.id.as_str(), payload));
    }
}

fn rejected_state(err: &LifecycleError) -> Option<InitState> {
    match err {
        LifecycleError::IllegalOperation { state, .. }
        | LifecycleError::NotImplemented { state, .. } => Some(*state),
        LifecycleError::Controller(_) => None,
    }
}

impl fmt::Debug for InitProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = *self.slot.lock();
        f.debug_struct("InitProcess")
            .field("id", &self.id)
            .field("state", &slot.state)
            .field("exit", &slot.exit)
            .finish_non_exhaustive()
    }
}
