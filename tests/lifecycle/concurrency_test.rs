/*!
 * Concurrency Tests
 * Exit notifications racing in-flight operations
 */

use crate::support::{fixture, fixture_in, Call};
use init_shim::{InitState, Operation, Payload, Signal};
use pretty_assertions::assert_eq;
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_exit_reported_from_inside_kill() {
    let (process, controller, _) = fixture_in(InitState::Running);

    let weak = Arc::downgrade(&process);
    controller.on(Operation::Kill, move || {
        if let Some(process) = weak.upgrade() {
            process.set_exited(Signal::SIGKILL.exit_code());
        }
    });

    process.kill(Signal::SIGKILL, true).unwrap();

    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(process.exit_status().map(|e| e.code), Some(137));
}

#[test]
fn test_exit_during_start_wins() {
    let (process, controller, sink) = fixture();

    let weak = Arc::downgrade(&process);
    controller.on(Operation::Start, move || {
        if let Some(process) = weak.upgrade() {
            process.set_exited(0);
        }
    });

    process.start().unwrap();

    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(
        sink.count(|e| matches!(
            e.payload,
            Payload::TransitionSuperseded {
                operation: Operation::Start,
                target: InitState::Running,
                current: InitState::Stopped,
            }
        )),
        1
    );
}

#[test]
fn test_exit_during_delete_still_deletes() {
    let (process, controller, _) = fixture();

    let weak = Arc::downgrade(&process);
    controller.on(Operation::Delete, move || {
        if let Some(process) = weak.upgrade() {
            process.set_exited(0);
        }
    });

    process.delete().unwrap();
    assert_eq!(process.state(), InitState::Deleted);
}

#[test]
fn test_racing_exits_record_once() {
    let (process, _, sink) = fixture_in(InitState::Running);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let process = Arc::clone(&process);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    process.set_exited(i);
                } else {
                    let _ = process.kill(Signal::SIGTERM, false);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(
        sink.count(|e| matches!(e.payload, Payload::ExitRecorded { .. })),
        1
    );
}

#[test]
fn test_concurrent_starts_spawn_once() {
    let (process, controller, _) = fixture();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let process = Arc::clone(&process);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                process.start().is_ok()
            })
        })
        .collect();

    let started = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(started, 1);
    assert_eq!(controller.count(&Call::Start), 1);
    assert_eq!(process.state(), InitState::Running);
}

#[test]
fn test_controller_reenters_during_compensating_resume() {
    let (process, controller, _) = fixture_in(InitState::Paused);

    let weak = Arc::downgrade(&process);
    let observed = Arc::new(parking_lot::Mutex::new(None));
    let seen = Arc::clone(&observed);
    controller.on(Operation::Resume, move || {
        if let Some(process) = weak.upgrade() {
            *seen.lock() = Some(process.status());
            process.set_exited(1);
        }
    });

    let (done_tx, done_rx) = mpsc::channel();
    let exiting = Arc::clone(&process);
    thread::spawn(move || {
        exiting.set_exited(0);
        let _ = done_tx.send(());
    });

    assert!(
        done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
        "set_exited blocked while the controller resumed"
    );
    assert_eq!(*observed.lock(), Some(Ok("paused")));
    assert_eq!(process.state(), InitState::Stopped);
    assert_eq!(process.exit_status().map(|e| e.code), Some(0));
    assert_eq!(controller.count(&Call::Resume), 1);
}

#[test]
fn test_status_readable_during_side_effect() {
    let (process, controller, _) = fixture_in(InitState::Running);

    let weak = Arc::downgrade(&process);
    let observed = Arc::new(parking_lot::Mutex::new(None));
    let seen = Arc::clone(&observed);
    controller.on(Operation::Update, move || {
        if let Some(process) = weak.upgrade() {
            *seen.lock() = Some(process.status());
        }
    });

    process.update(&Default::default()).unwrap();
    assert_eq!(*observed.lock(), Some(Ok("running")));
}
