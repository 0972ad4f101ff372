use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

/// One progress update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Steps finished so far; never decreases within a job.
    pub completed: u64,
    /// Steps the job will take in total.
    pub total: u64,
    /// Human-readable phase, e.g. `"warping frame 2/5"`.
    pub phase: String,
}

/// Receiver of progress updates, called from the tracker's delivery thread.
pub trait ProgressSink: Send + Sync {
    /// Handle one event.
    fn report(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

/// Emits every event as a `tracing` info record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: &ProgressEvent) {
        tracing::info!(
            completed = event.completed,
            total = event.total,
            "{}",
            event.phase
        );
    }
}

/// Forwards events over an unbounded channel; never blocks.
///
/// Events are dropped silently once the receiver is gone.
#[derive(Debug)]
pub struct ChannelProgress {
    tx: Sender<ProgressEvent>,
}

impl ChannelProgress {
    /// Wrap the sending half of a channel.
    pub fn new(tx: Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, event: &ProgressEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Number of progress steps of a job with `frames` in-betweens: three per frame (two warps and
/// a dissolve) plus one per exported frame.
pub fn total_steps(frames: u32) -> u64 {
    4 * u64::from(frames) + 2
}

struct Counter {
    completed: u64,
    tx: Option<Sender<ProgressEvent>>,
}

/// Job-wide progress counter shared by frame and export workers.
///
/// Events reach the sink in counter order on a dedicated `linemorph-progress` thread, so a
/// slow sink never stalls the workers that advance the counter. Dropping the tracker flushes
/// every pending event to the sink before returning.
pub struct ProgressTracker {
    state: Mutex<Counter>,
    total: u64,
    sink: Arc<dyn ProgressSink>,
    worker: Option<JoinHandle<()>>,
}

impl ProgressTracker {
    /// Create a tracker expecting `total` steps.
    pub fn new(total: u64, sink: Arc<dyn ProgressSink>) -> Self {
        let (tx, rx) = mpsc::channel::<ProgressEvent>();
        let delivery = Arc::clone(&sink);
        let spawned = std::thread::Builder::new()
            .name("linemorph-progress".to_string())
            .spawn(move || {
                for event in rx {
                    delivery.report(&event);
                }
            });

        let (tx, worker) = match spawned {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                tracing::warn!(error = %e, "progress thread unavailable; reporting inline");
                (None, None)
            }
        };
        Self {
            state: Mutex::new(Counter { completed: 0, tx }),
            total,
            sink,
            worker,
        }
    }

    /// Tracker sized for a job with `frames` in-betweens.
    pub fn for_frames(frames: u32, sink: Arc<dyn ProgressSink>) -> Self {
        Self::new(total_steps(frames), sink)
    }

    /// Steps finished so far.
    pub fn completed(&self) -> u64 {
        self.state().completed
    }

    /// Total steps.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count one finished step and report it under `phase`.
    pub fn advance(&self, phase: impl Into<String>) {
        self.emit(1, phase.into());
    }

    /// Report a phase change without counting a step.
    pub fn announce(&self, phase: impl Into<String>) {
        self.emit(0, phase.into());
    }

    fn emit(&self, steps: u64, phase: String) {
        // Events are queued under the lock so they leave in counter order.
        let mut state = self.state();
        state.completed = (state.completed + steps).min(self.total);
        let event = ProgressEvent {
            completed: state.completed,
            total: self.total,
            phase,
        };
        match &state.tx {
            // A send error means the sink panicked on an earlier event.
            Some(tx) => {
                let _ = tx.send(event);
            }
            None => self.sink.report(&event),
        }
    }

    fn state(&self) -> MutexGuard<'_, Counter> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.state().tx = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!("progress sink panicked");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/progress.rs"]
mod tests;
