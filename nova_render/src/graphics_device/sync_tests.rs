use crate::error::Error;
use crate::graphics_device::{CompletionMarker, Timeline};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_marker_none_is_signaled() {
    let timeline = Timeline::new();
    assert_eq!(timeline.is_complete(CompletionMarker::NONE), Ok(true));
    assert!(timeline.wait_for(CompletionMarker::NONE).is_ok());
}

#[test]
fn test_markers_are_monotonic() {
    let timeline = Timeline::new();
    let a = timeline.next_marker().unwrap();
    let b = timeline.next_marker().unwrap();
    assert!(b > a);
    assert_eq!(timeline.last_issued(), b);
}

#[test]
fn test_signal_never_moves_backwards() {
    let timeline = Timeline::new();
    let a = timeline.next_marker().unwrap();
    let b = timeline.next_marker().unwrap();

    timeline.signal(b);
    timeline.signal(a);

    assert_eq!(timeline.completed(), b);
    assert_eq!(timeline.is_complete(a), Ok(true));
}

#[test]
fn test_wait_blocks_until_signaled() {
    let timeline = Arc::new(Timeline::new());
    let marker = timeline.next_marker().unwrap();

    let signaler = {
        let timeline = timeline.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            timeline.signal(marker);
        })
    };

    let start = Instant::now();
    timeline.wait_for(marker).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(25));
    signaler.join().unwrap();
}

#[test]
fn test_wait_on_unsubmitted_marker_is_logic_error() {
    let timeline = Timeline::new();
    assert!(matches!(
        timeline.wait_for(CompletionMarker(5)),
        Err(Error::LogicError(_))
    ));
}

#[test]
fn test_lost_device_wakes_waiters() {
    let timeline = Arc::new(Timeline::new());
    let marker = timeline.next_marker().unwrap();

    let killer = {
        let timeline = timeline.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            timeline.mark_lost("executor panicked");
        })
    };

    assert!(matches!(timeline.wait_for(marker), Err(Error::DeviceLost(_))));
    assert!(timeline.is_lost());
    assert!(matches!(timeline.next_marker(), Err(Error::DeviceLost(_))));
    killer.join().unwrap();
}

#[test]
fn test_completed_work_survives_device_loss() {
    let timeline = Timeline::new();
    let marker = timeline.next_marker().unwrap();
    timeline.signal(marker);
    timeline.mark_lost("gone");

    assert_eq!(timeline.is_complete(marker), Ok(true));
}

#[test]
fn test_wait_idle() {
    let timeline = Timeline::new();
    let _a = timeline.next_marker().unwrap();
    let b = timeline.next_marker().unwrap();
    timeline.signal(b);
    assert!(timeline.wait_idle().is_ok());
}
