use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::*;

#[test]
fn total_counts_three_steps_per_frame_plus_exports() {
    assert_eq!(total_steps(1), 6);
    assert_eq!(total_steps(3), 14);
}

#[test]
fn channel_receives_ordered_events() {
    let (tx, rx) = mpsc::channel();
    let tracker = ProgressTracker::new(3, Arc::new(ChannelProgress::new(tx)));
    tracker.announce("starting");
    tracker.advance("one");
    tracker.advance("two");
    assert_eq!(tracker.completed(), 2);
    drop(tracker);

    let events: Vec<ProgressEvent> = rx.iter().collect();
    assert_eq!(
        events
            .iter()
            .map(|e| (e.completed, e.phase.as_str()))
            .collect::<Vec<_>>(),
        vec![(0, "starting"), (1, "one"), (2, "two")]
    );
    assert!(events.iter().all(|e| e.total == 3));
}

#[test]
fn counter_saturates_at_total() {
    let tracker = ProgressTracker::new(1, Arc::new(NoProgress));
    tracker.advance("a");
    tracker.advance("b");
    assert_eq!(tracker.completed(), 1);
    assert_eq!(tracker.total(), 1);
}

#[test]
fn concurrent_advances_stay_monotonic() {
    let (tx, rx) = mpsc::channel();
    let tracker = Arc::new(ProgressTracker::new(400, Arc::new(ChannelProgress::new(tx))));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tracker = Arc::clone(&tracker);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    tracker.advance("tick");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    drop(tracker);

    let counts: Vec<u64> = rx.iter().map(|e| e.completed).collect();
    assert_eq!(counts.len(), 400);
    assert!(counts.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(counts.last(), Some(&400));
}

#[test]
fn dropped_receiver_does_not_panic() {
    let (tx, rx) = mpsc::channel();
    drop(rx);
    let tracker = ProgressTracker::new(2, Arc::new(ChannelProgress::new(tx)));
    tracker.advance("still fine");
    assert_eq!(tracker.completed(), 1);
}

#[test]
fn tracing_sink_accepts_events_without_subscriber() {
    let tracker = ProgressTracker::for_frames(1, Arc::new(TracingProgress));
    tracker.advance("warping source for frame 1/1");
    assert_eq!(tracker.total(), 6);
}

struct Sleepy(Mutex<Vec<u64>>);

impl ProgressSink for Sleepy {
    fn report(&self, event: &ProgressEvent) {
        std::thread::sleep(Duration::from_millis(300));
        self.0.lock().unwrap().push(event.completed);
    }
}

#[test]
fn slow_sink_does_not_block_advance() {
    let sink = Arc::new(Sleepy(Mutex::new(Vec::new())));
    let tracker = ProgressTracker::new(3, sink.clone());

    let started = Instant::now();
    for _ in 0..3 {
        tracker.advance("step");
    }
    assert!(started.elapsed() < Duration::from_millis(300));
    assert_eq!(tracker.completed(), 3);

    drop(tracker);
    assert_eq!(*sink.0.lock().unwrap(), vec![1, 2, 3]);
}
