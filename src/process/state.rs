/*!
 * Init Process State Machine
 *
 * The five lifecycle states of a container's init process, which operations
 * each state accepts, and which successors each state may install.
 *
 * # Transitions
 *
 * ```text
 * Created ──start──▶ Running ◀──resume── Paused
 *    │                  │ └────pause─────▶ │
 *    │                  └──exit──┐         │
 *    ├──exit──────────────────▶ Stopped ◀──exit
 *    └──delete──▶ Deleted ◀──delete──┘
 * ```
 *
 * Deleted is terminal. Every other edge is an internal consistency violation
 * and panics.
 */

use super::types::Operation;
use crate::core::errors::{LifecycleError, LifecycleResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an init process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    #[default]
    Created,
    Running,
    Paused,
    Stopped,
    Deleted,
}

/// What an accepted operation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Call the controller, then install `next` if set
    Delegate { next: Option<InitState> },
    /// Answer without touching the controller
    Observe,
}

/// How a state reacts to an exit notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    /// Record the status and move to Stopped
    Stop,
    /// Record the status, resume the frozen process, then move to Stopped
    ResumeThenStop,
    /// Already exited (or gone); nothing to do
    Ignore,
}

impl InitState {
    /// Every state, in lifecycle order
    pub const ALL: [InitState; 5] = [
        InitState::Created,
        InitState::Running,
        InitState::Paused,
        InitState::Stopped,
        InitState::Deleted,
    ];

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            InitState::Created => "created",
            InitState::Running => "running",
            InitState::Paused => "paused",
            InitState::Stopped => "stopped",
            InitState::Deleted => "deleted",
        }
    }

    /// Status string reported to callers
    ///
    /// Deleted processes have no status.
    pub fn status(&self) -> LifecycleResult<&'static str> {
        match self {
            InitState::Deleted => Err(self.illegal(Operation::Status)),
            state => Ok(state.as_str()),
        }
    }

    /// Check if the transition table has an edge from `self` to `next`
    pub const fn can_transition_to(&self, next: InitState) -> bool {
        matches!(
            (self, next),
            (InitState::Created, InitState::Running)
                | (InitState::Created, InitState::Stopped)
                | (InitState::Created, InitState::Deleted)
                | (InitState::Running, InitState::Stopped)
                | (InitState::Running, InitState::Paused)
                | (InitState::Paused, InitState::Running)
                | (InitState::Paused, InitState::Stopped)
                | (InitState::Stopped, InitState::Deleted)
        )
    }

    /// Successor state for `next`
    ///
    /// # Panics
    ///
    /// Panics when the edge is not in the transition table. Callers only ask
    /// for successors their own dispatch produced, so reaching the panic means
    /// the tables disagree.
    pub fn transition(self, next: InitState) -> InitState {
        if !self.can_transition_to(next) {
            panic!("invalid state transition {:?} to {:?}", self.as_str(), next.as_str());
        }
        next
    }

    /// Decide how `operation` is handled in this state
    ///
    /// SetExited is not dispatched here; see [`InitState::on_exit`].
    pub fn dispatch(&self, operation: Operation) -> LifecycleResult<Dispatch> {
        use InitState::*;
        use Operation::*;

        let delegate =
            |next: Option<InitState>| -> LifecycleResult<Dispatch> { Ok(Dispatch::Delegate { next }) };

        match (self, operation) {
            (Created, Start) => delegate(Some(Running)),

            (Running, Pause) => Err(self.not_implemented(operation)),
            (Paused, Resume) => Err(self.not_implemented(operation)),
            (Running | Paused, Checkpoint) => Err(self.not_implemented(operation)),

            (Created | Running | Paused, Update) => delegate(None),

            (Created | Stopped, Delete) => delegate(Some(Deleted)),

            (Created | Running | Paused | Stopped, Kill) => delegate(None),

            (Created | Running, Exec) => delegate(None),

            (Created | Running | Paused | Stopped, Status) => Ok(Dispatch::Observe),

            _ => Err(self.illegal(operation)),
        }
    }

    /// Reaction to the process exiting
    pub const fn on_exit(&self) -> ExitAction {
        match self {
            InitState::Created | InitState::Running => ExitAction::Stop,
            InitState::Paused => ExitAction::ResumeThenStop,
            InitState::Stopped | InitState::Deleted => ExitAction::Ignore,
        }
    }

    #[inline]
    fn illegal(&self, operation: Operation) -> LifecycleError {
        LifecycleError::IllegalOperation {
            operation,
            state: *self,
        }
    }

    #[inline]
    fn not_implemented(&self, operation: Operation) -> LifecycleError {
        LifecycleError::NotImplemented {
            operation,
            state: *self,
        }
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
