/*!
 * Lifecycle Scenario Tests
 * End-to-end walks through the state machine and table-wide legality checks
 */

use crate::support::{fixture, fixture_in, invoke, Call};
use init_shim::{InitState, LifecycleError, Operation, Payload, Signal};
use pretty_assertions::assert_eq;

/// Operations the table marks "delegate" for each state (plus Status)
fn accepted(state: InitState) -> &'static [Operation] {
    use Operation::*;
    match state {
        InitState::Created => &[Start, Update, Delete, Kill, Exec, Status],
        InitState::Running => &[Update, Kill, Exec, Status],
        InitState::Paused => &[Update, Kill, Status],
        InitState::Stopped => &[Delete, Kill, Status],
        InitState::Deleted => &[],
    }
}

#[test]
fn test_run_kill_exit_delete() {
    let (process, controller, _) = fixture();

    process.start().unwrap();
    assert_eq!(process.status(), Ok("running"));

    let err = process.pause().unwrap_err();
    assert!(err.is_not_implemented());
    assert_eq!(process.state(), InitState::Running);

    process.kill(Signal::SIGKILL, false).unwrap();
    assert_eq!(process.state(), InitState::Running);

    process.set_exited(Signal::SIGKILL.exit_code());
    assert_eq!(process.status(), Ok("stopped"));
    assert_eq!(process.exit_status().map(|e| e.code), Some(137));

    process.delete().unwrap();
    assert_eq!(process.state(), InitState::Deleted);
    assert_eq!(
        process.status(),
        Err(LifecycleError::IllegalOperation {
            operation: Operation::Status,
            state: InitState::Deleted,
        })
    );

    assert_eq!(
        controller.calls(),
        vec![Call::Start, Call::Kill(Signal::SIGKILL, false), Call::Delete]
    );
}

#[test]
fn test_exit_before_start() {
    let (process, controller, _) = fixture();

    process.set_exited(0);
    assert_eq!(process.state(), InitState::Stopped);

    process.delete().unwrap();
    assert_eq!(process.state(), InitState::Deleted);
    assert_eq!(controller.calls(), vec![Call::Delete]);
}

#[test]
fn test_delete_unstarted_process() {
    let (process, controller, _) = fixture();

    process.delete().unwrap();
    assert_eq!(process.state(), InitState::Deleted);
    assert_eq!(controller.count(&Call::Delete), 1);
}

#[test]
fn test_start_failure_keeps_created() {
    let (process, controller, sink) = fixture();
    controller.fail(Operation::Start);

    let err = process.start().unwrap_err();
    assert!(err.controller_error().is_some());
    assert_eq!(process.state(), InitState::Created);
    assert_eq!(
        sink.count(|e| matches!(e.payload, Payload::StateChanged { .. })),
        0
    );
}

#[test]
fn test_failed_side_effects_never_transition() {
    let (process, controller, _) = fixture();
    controller.fail(Operation::Delete);
    controller.fail(Operation::Kill);

    assert!(process.delete().is_err());
    assert!(process.kill(Signal::SIGTERM, true).is_err());
    assert_eq!(process.state(), InitState::Created);
}

#[test]
fn test_rejected_operations_leave_state_untouched() {
    for state in InitState::ALL {
        for operation in Operation::ALL {
            if operation == Operation::SetExited || accepted(state).contains(&operation) {
                continue;
            }

            let (process, controller, _) = fixture_in(state);
            let result = invoke(&process, operation);

            assert!(result.is_err(), "{operation} should fail in {state}");
            assert_eq!(process.state(), state, "{operation} changed {state}");
            assert!(controller.calls().is_empty(), "{operation} reached controller in {state}");
        }
    }
}

#[test]
fn test_accepted_operations_reach_controller() {
    for state in InitState::ALL {
        for &operation in accepted(state) {
            if operation == Operation::Status {
                continue;
            }

            let (process, controller, _) = fixture_in(state);
            invoke(&process, operation).unwrap();
            assert_eq!(controller.calls().len(), 1, "{operation} in {state}");
        }
    }
}

#[test]
fn test_status_is_pure() {
    for (state, expected) in [
        (InitState::Created, "created"),
        (InitState::Running, "running"),
        (InitState::Paused, "paused"),
        (InitState::Stopped, "stopped"),
    ] {
        let (process, controller, sink) = fixture_in(state);

        for _ in 0..3 {
            assert_eq!(process.status(), Ok(expected));
        }
        assert_eq!(process.state(), state);
        assert!(controller.calls().is_empty());
        assert!(sink.is_empty());
    }
}

#[test]
fn test_everything_fails_after_delete() {
    let (process, controller, _) = fixture();
    process.delete().unwrap();
    let calls = controller.calls().len();

    for operation in Operation::ALL {
        if operation == Operation::SetExited {
            continue;
        }
        assert!(invoke(&process, operation).is_err(), "{operation} after delete");
    }

    process.set_exited(0);
    assert_eq!(process.state(), InitState::Deleted);
    assert_eq!(process.exit_status(), None);
    assert_eq!(controller.calls().len(), calls);
}

#[test]
fn test_exit_from_running_ignores_pending_requests() {
    let (process, controller, _) = fixture();
    process.start().unwrap();
    process.update(&Default::default()).unwrap();
    process.kill(Signal::SIGTERM, false).unwrap();

    process.set_exited(143);

    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(controller.count(&Call::Update), 1);
    assert!(process.update(&Default::default()).is_err());
    assert!(process.kill(Signal::SIGKILL, false).is_ok());
}

#[test]
fn test_paused_exit_resumes_exactly_once() {
    let (process, controller, sink) = fixture_in(InitState::Paused);
    controller.fail(Operation::Resume);

    process.set_exited(0);
    process.set_exited(0);

    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(controller.count(&Call::Resume), 1);
    assert_eq!(
        sink.count(|e| matches!(e.payload, Payload::CompensatingResumeFailed { .. })),
        1
    );
}

#[test]
fn test_exec_in_created_and_running() {
    let (process, controller, _) = fixture();

    process.exec("pre", &Default::default()).unwrap();
    process.start().unwrap();
    let handle = process.exec("post", &Default::default()).unwrap();

    assert_eq!(handle.exec_id, "post");
    assert_eq!(controller.count(&Call::Exec("pre".into())), 1);
    assert_eq!(controller.count(&Call::Exec("post".into())), 1);
}

#[test]
fn test_event_trail_for_full_lifecycle() {
    let (process, _, sink) = fixture();

    process.start().unwrap();
    process.set_exited(0);
    process.delete().unwrap();

    let transitions: Vec<(InitState, InitState)> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e.payload {
            Payload::StateChanged { from, to, .. } => Some((from, to)),
            _ => None,
        })
        .collect();

    assert_eq!(
        transitions,
        vec![
            (InitState::Created, InitState::Running),
            (InitState::Running, InitState::Stopped),
            (InitState::Stopped, InitState::Deleted),
        ]
    );
    assert!(sink.events().iter().all(|e| e.id == "task-1"));
}
