/*!
 * Shared test controller
 */

use init_shim::{
    CheckpointConfig, ControllerError, ControllerResult, ExecHandle, ExecOptions, InitProcess, InitState,
    LifecycleResult, MemorySink, Operation, ProcessController, ResourceSpec, Signal,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Controller call as observed by the recording controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start,
    Kill(Signal, bool),
    Delete,
    Update,
    Exec(String),
    Resume,
    Checkpoint,
}

type Hook = Arc<dyn Fn() + Send + Sync>;

/// Records every call, fails on demand, and runs hooks inside side effects
#[derive(Default)]
pub struct RecordingController {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<Operation>>,
    hooks: Mutex<HashMap<Operation, Hook>>,
}

impl RecordingController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// Make every later call of `operation` fail
    pub fn fail(&self, operation: Operation) {
        self.failing.lock().insert(operation);
    }

    /// Run `hook` while the side effect of `operation` is in flight
    pub fn on(&self, operation: Operation, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks.lock().insert(operation, Arc::new(hook));
    }

    fn record(&self, operation: Operation, call: Call) -> ControllerResult<()> {
        self.calls.lock().push(call);

        let hook = self.hooks.lock().get(&operation).cloned();
        if let Some(hook) = hook {
            hook();
        }

        if self.failing.lock().contains(&operation) {
            return Err(ControllerError::Failed(format!("{} failed", operation)));
        }
        Ok(())
    }
}

impl ProcessController for RecordingController {
    fn start(&self, _id: &str) -> ControllerResult<()> {
        self.record(Operation::Start, Call::Start)
    }

    fn kill(&self, _id: &str, signal: Signal, all: bool) -> ControllerResult<()> {
        self.record(Operation::Kill, Call::Kill(signal, all))
    }

    fn delete(&self, _id: &str) -> ControllerResult<()> {
        self.record(Operation::Delete, Call::Delete)
    }

    fn update(&self, _id: &str, _resources: &ResourceSpec) -> ControllerResult<()> {
        self.record(Operation::Update, Call::Update)
    }

    fn exec(&self, _id: &str, exec_id: &str, _options: &ExecOptions) -> ControllerResult<ExecHandle> {
        self.record(Operation::Exec, Call::Exec(exec_id.to_string()))?;
        Ok(ExecHandle {
            exec_id: exec_id.to_string(),
            pid: None,
        })
    }

    fn resume(&self, _id: &str) -> ControllerResult<()> {
        self.record(Operation::Resume, Call::Resume)
    }

    fn checkpoint(&self, _id: &str, _config: &CheckpointConfig) -> ControllerResult<()> {
        self.record(Operation::Checkpoint, Call::Checkpoint)
    }
}

/// Fresh init process in Created, wired to a recording controller and sink
pub fn fixture() -> (Arc<InitProcess>, Arc<RecordingController>, Arc<MemorySink>) {
    fixture_in(InitState::Created)
}

/// Init process restored into `state`
pub fn fixture_in(
    state: InitState,
) -> (Arc<InitProcess>, Arc<RecordingController>, Arc<MemorySink>) {
    let controller = RecordingController::new();
    let sink = Arc::new(MemorySink::new());
    let process = InitProcess::restore("task-1", controller.clone(), state)
        .with_event_sink(sink.clone());
    (Arc::new(process), controller, sink)
}

/// Invoke any caller-driven operation by name
pub fn invoke(process: &InitProcess, operation: Operation) -> LifecycleResult<()> {
    match operation {
        Operation::Start => process.start(),
        Operation::Pause => process.pause(),
        Operation::Resume => process.resume(),
        Operation::Update => process.update(&ResourceSpec::default()),
        Operation::Checkpoint => process.checkpoint(&CheckpointConfig::default()),
        Operation::Delete => process.delete(),
        Operation::Kill => process.kill(Signal::SIGTERM, false),
        Operation::Exec => process.exec("exec-1", &ExecOptions::new(["true"])).map(|_| ()),
        Operation::SetExited => {
            process.set_exited(0);
            Ok(())
        }
        Operation::Status => process.status().map(|_| ()),
    }
}
