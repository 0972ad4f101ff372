use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::composite::dissolve::dissolve_frame;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MorphError, MorphResult};
use crate::geometry::interpolate::interpolate_lines;
use crate::geometry::line::FeatureLine;
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::export::ExportSink;
use crate::pipeline::job::{MorphInput, MorphJob};
use crate::pipeline::progress::{NoProgress, ProgressTracker};
use crate::pipeline::report::{FailureKind, FrameFailure, FrameOutcome, MorphReport};
use crate::raster::image::ImageRGBA;
use crate::warp::backend::{
    BackendKind, BackendSettings, RasterBackend, build_thread_pool, create_backend,
};
use crate::warp::engine::{WarpSpec, warp_image};

/// Frame scheduling options.
#[derive(Clone, Debug, Default)]
pub struct MorphThreading {
    /// Render in-between frames concurrently on a rayon pool when `true`.
    pub parallel: bool,
    /// Optional explicit worker thread count.
    pub threads: Option<usize>,
}

/// Options for [`run_morph`].
#[derive(Clone, Debug, Default)]
pub struct PipelineOpts {
    /// Frame scheduling.
    pub threading: MorphThreading,
    /// Pixel backend used for warps and dissolves.
    pub backend: BackendKind,
    /// Upper bound on each wait for an export: a free export slot while frames are produced,
    /// then the "finishing exports" wait. `None` waits indefinitely.
    pub export_timeout: Option<Duration>,
    /// Exports allowed in flight at once, each holding one frame buffer. Frame production
    /// blocks while the limit is reached. `None` allows one per frame worker plus the two
    /// endpoint exports.
    pub max_pending_exports: Option<usize>,
}

/// Produce and export every frame of `job`.
///
/// Frame `0` is the untouched source image, frame `N + 1` the untouched destination and frames
/// `1..=N` the morphed in-betweens. Exports run on their own threads; at most
/// [`PipelineOpts::max_pending_exports`] of them are in flight, so a slow sink throttles frame
/// production instead of piling up frame buffers. The call returns once every dispatched
/// export has reported or the export deadline has passed.
///
/// When `cancel` fires, no further frame is started and frames waiting for an export slot are
/// dropped; exports already running still complete.
///
/// Only invalid options and thread pool failures return `Err`. Failures of individual frames
/// are contained and reported per index in the returned [`MorphReport`].
#[tracing::instrument(
    skip_all,
    fields(frames = job.frames(), lines = job.lines().len(), parallel = opts.threading.parallel)
)]
pub fn run_morph(
    job: Arc<MorphJob>,
    sink: Arc<dyn ExportSink>,
    progress: &ProgressTracker,
    cancel: &CancelToken,
    opts: &PipelineOpts,
) -> MorphResult<MorphReport> {
    if let Some(timeout) = opts.export_timeout
        && timeout.is_zero()
    {
        return Err(MorphError::invalid("export timeout must be > 0 when set"));
    }
    if opts.max_pending_exports == Some(0) {
        return Err(MorphError::invalid("'max_pending_exports' must be >= 1 when set"));
    }

    let n = job.frames();
    let pool = if opts.threading.parallel {
        Some(build_thread_pool(opts.threading.threads)?)
    } else {
        None
    };
    // Inside a frame pool the row backend inherits that pool.
    let backend = create_backend(
        opts.backend,
        &BackendSettings {
            threads: if pool.is_some() {
                None
            } else {
                opts.threading.threads
            },
        },
    )?;
    tracing::info!(backend = backend.name(), "morph started");

    let workers = pool.as_ref().map_or(1, |p| p.current_num_threads());
    let capacity = opts.max_pending_exports.unwrap_or(workers + 2);
    let mut slots: Vec<Option<FrameOutcome>> = vec![None; job.slot_count()];
    let (exports, results) =
        ExportDispatcher::new(sink, capacity, opts.export_timeout, cancel.clone());

    for (index, payload) in [
        (FrameIndex(0), Payload::Source(Arc::clone(&job))),
        (FrameIndex(n + 1), Payload::Destination(Arc::clone(&job))),
    ] {
        if let Dispatch::Refused(failure) = exports.dispatch(index, payload) {
            slots[index.0 as usize] = Some(FrameOutcome::Failed(failure));
        }
    }

    let mid = interpolate_lines(job.lines(), n)?;
    let ctx = FrameCtx {
        job: &job,
        mid: &mid,
        backend: backend.as_ref(),
        progress,
        cancel,
    };

    let staged: Vec<(u32, Staged)> = match &pool {
        Some(pool) => pool.install(|| {
            (1..=n)
                .into_par_iter()
                .map(|k| (k, ctx.produce(k, &exports)))
                .collect()
        }),
        None => (1..=n).map(|k| (k, ctx.produce(k, &exports))).collect(),
    };
    for (k, stage) in staged {
        if let Staged::Failed(failure) = stage {
            slots[k as usize] = Some(FrameOutcome::Failed(failure));
        }
    }

    progress.announce("finishing exports");
    for (index, outcome) in exports.finish(results, progress, opts.export_timeout) {
        slots[index.0 as usize] = Some(outcome);
    }

    let report = MorphReport::from_slots(slots, cancel.is_cancelled());
    let exported = report.exported().count();
    tracing::info!(exported, status = ?report.status, "morph finished");
    Ok(report)
}

/// Render in-between frame `k` of `job` without exporting it.
///
/// Useful for previews; produces the same pixels [`run_morph`] exports at index `k`.
#[tracing::instrument(skip(job, backend, cancel))]
pub fn morph_frame(
    job: &MorphJob,
    k: u32,
    backend: &dyn RasterBackend,
    cancel: &CancelToken,
) -> MorphResult<ImageRGBA> {
    let n = job.frames();
    if k == 0 || k > n {
        return Err(MorphError::invalid(format!(
            "in-between frame index must be within [1, {n}], got {k}"
        )));
    }
    let mid = interpolate_lines(job.lines(), n)?;
    let progress = ProgressTracker::new(3, Arc::new(NoProgress));
    FrameCtx {
        job,
        mid: &mid,
        backend,
        progress: &progress,
        cancel,
    }
    .render(k)
}

enum Staged {
    Dispatched,
    Skipped,
    Failed(FrameFailure),
}

struct FrameCtx<'a> {
    job: &'a MorphJob,
    mid: &'a [Vec<FeatureLine>],
    backend: &'a dyn RasterBackend,
    progress: &'a ProgressTracker,
    cancel: &'a CancelToken,
}

impl FrameCtx<'_> {
    fn produce(&self, k: u32, exports: &ExportDispatcher) -> Staged {
        match self.render(k) {
            Ok(image) => match exports.dispatch(FrameIndex(k), Payload::Frame(image)) {
                Dispatch::Sent => Staged::Dispatched,
                Dispatch::Cancelled => Staged::Skipped,
                Dispatch::Refused(failure) => {
                    tracing::warn!(frame = k, error = %failure.message, "export not started");
                    Staged::Failed(failure)
                }
            },
            Err(e) if e.is_cancelled() => {
                tracing::debug!(frame = k, "skipped after cancellation");
                Staged::Skipped
            }
            Err(e) => {
                tracing::warn!(frame = k, error = %e, "frame failed");
                Staged::Failed(FrameFailure {
                    kind: FailureKind::Render,
                    message: e.to_string(),
                })
            }
        }
    }

    fn render(&self, k: u32) -> MorphResult<ImageRGBA> {
        self.cancel.check()?;
        let n = self.job.frames();
        let target = self.mid.get(k as usize - 1).ok_or_else(|| {
            MorphError::invalid(format!("no interpolated lines for frame {k}"))
        })?;

        let warped_src = self.warp(self.job.source(), self.job.lines().source(), target)?;
        self.progress
            .advance(format!("warped source for frame {k}/{n}"));

        let warped_dst = self.warp(
            self.job.destination(),
            self.job.lines().destination(),
            target,
        )?;
        self.progress
            .advance(format!("warped destination for frame {k}/{n}"));

        let blended = dissolve_frame(
            &warped_src,
            &warped_dst,
            k,
            n,
            self.job.background(),
            self.backend,
            self.cancel,
        )?;
        drop(warped_src);
        drop(warped_dst);
        self.progress.advance(format!("dissolved frame {k}/{n}"));
        Ok(blended)
    }

    fn warp(
        &self,
        input: &MorphInput,
        lines: &[FeatureLine],
        target: &[FeatureLine],
    ) -> MorphResult<ImageRGBA> {
        let spec = WarpSpec {
            image: &input.image,
            placement: input.placement,
            source_lines: lines,
            target_lines: target,
            output: input.placement,
            params: self.job.params(),
            background: self.job.background(),
        };
        warp_image(&spec, self.backend, self.cancel)
    }
}

enum Payload {
    Source(Arc<MorphJob>),
    Destination(Arc<MorphJob>),
    Frame(ImageRGBA),
}

impl Payload {
    fn image(&self) -> &ImageRGBA {
        match self {
            Self::Source(job) => &job.source().image,
            Self::Destination(job) => &job.destination().image,
            Self::Frame(image) => image,
        }
    }
}

type ExportMsg = (FrameIndex, MorphResult<PathBuf>);

enum Dispatch {
    Sent,
    Cancelled,
    Refused(FrameFailure),
}

/// Counting permit bounding the exports in flight, and with them the frame buffers they hold.
struct ExportSlots {
    free: Mutex<usize>,
    freed: Condvar,
}

impl ExportSlots {
    fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(capacity),
            freed: Condvar::new(),
        }
    }

    /// Block until a slot is free; `false` if `timeout` passes first.
    fn acquire(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut free = lock(&self.free);
        while *free == 0 {
            free = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return false;
                    }
                    self.freed
                        .wait_timeout(free, left)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
                None => self
                    .freed
                    .wait(free)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            };
        }
        *free -= 1;
        true
    }

    fn release(&self) {
        *lock(&self.free) += 1;
        self.freed.notify_one();
    }
}

/// Returns its slot when dropped, including when the export worker panics.
struct SlotGuard(Arc<ExportSlots>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Runs each export on its own named thread; results come back over a channel.
struct ExportDispatcher {
    sink: Arc<dyn ExportSink>,
    tx: Sender<ExportMsg>,
    slots: Arc<ExportSlots>,
    slot_timeout: Option<Duration>,
    cancel: CancelToken,
    pending: Mutex<BTreeSet<FrameIndex>>,
}

impl ExportDispatcher {
    fn new(
        sink: Arc<dyn ExportSink>,
        capacity: usize,
        slot_timeout: Option<Duration>,
        cancel: CancelToken,
    ) -> (Self, Receiver<ExportMsg>) {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Self {
            sink,
            tx,
            slots: Arc::new(ExportSlots::new(capacity)),
            slot_timeout,
            cancel,
            pending: Mutex::new(BTreeSet::new()),
        };
        (dispatcher, rx)
    }

    /// Hand `payload` to a new export worker once a slot is free.
    ///
    /// A frame still waiting for a slot when the job is cancelled is dropped unexported.
    fn dispatch(&self, index: FrameIndex, payload: Payload) -> Dispatch {
        if !self.slots.acquire(self.slot_timeout) {
            return Dispatch::Refused(FrameFailure {
                kind: FailureKind::Concurrency,
                message: format!(
                    "no export slot freed within {:?}",
                    self.slot_timeout.unwrap_or_default()
                ),
            });
        }
        let guard = SlotGuard(Arc::clone(&self.slots));
        if self.cancel.is_cancelled() {
            return Dispatch::Cancelled;
        }

        let sink = Arc::clone(&self.sink);
        let tx = self.tx.clone();
        lock(&self.pending).insert(index);

        let spawned = std::thread::Builder::new()
            .name(format!("linemorph-export-{index}"))
            .spawn(move || {
                let _guard = guard;
                let result = sink.export(index, payload.image());
                drop(payload);
                // The waiter may have given up already.
                let _ = tx.send((index, result));
            });

        match spawned {
            Ok(_) => Dispatch::Sent,
            Err(e) => {
                lock(&self.pending).remove(&index);
                Dispatch::Refused(FrameFailure {
                    kind: FailureKind::Concurrency,
                    message: format!("failed to spawn export worker: {e}"),
                })
            }
        }
    }

    /// Wait for every dispatched export and return their outcomes.
    fn finish(
        self,
        rx: Receiver<ExportMsg>,
        progress: &ProgressTracker,
        timeout: Option<Duration>,
    ) -> Vec<(FrameIndex, FrameOutcome)> {
        let Self { tx, pending, .. } = self;
        // Only worker clones remain, so a dead worker shows up as a disconnect.
        drop(tx);

        let mut pending = pending
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut out = Vec::with_capacity(pending.len());
        let deadline = timeout.map(|t| Instant::now() + t);

        while !pending.is_empty() {
            let received = match deadline {
                Some(deadline) => {
                    rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
                }
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((index, result)) => {
                    if !pending.remove(&index) {
                        continue;
                    }
                    let outcome = match result {
                        Ok(path) => FrameOutcome::Exported(path),
                        Err(e) => {
                            tracing::warn!(%index, error = %e, "export failed");
                            let mut failure = FrameFailure::from_error(&e);
                            if failure.kind == FailureKind::Render {
                                failure.kind = FailureKind::Export;
                            }
                            FrameOutcome::Failed(failure)
                        }
                    };
                    progress.advance(format!("exported frame {index}"));
                    out.push((index, outcome));
                }
                Err(RecvTimeoutError::Timeout) => {
                    let message = format!(
                        "export did not finish within {:?}",
                        timeout.unwrap_or_default()
                    );
                    out.extend(drain_as_concurrency(&mut pending, &message));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    out.extend(drain_as_concurrency(
                        &mut pending,
                        "export worker exited without reporting",
                    ));
                }
            }
        }
        out
    }
}

fn drain_as_concurrency(
    pending: &mut BTreeSet<FrameIndex>,
    message: &str,
) -> Vec<(FrameIndex, FrameOutcome)> {
    std::mem::take(pending)
        .into_iter()
        .map(|index| {
            tracing::warn!(%index, "{message}");
            (
                index,
                FrameOutcome::Failed(FrameFailure {
                    kind: FailureKind::Concurrency,
                    message: message.to_string(),
                }),
            )
        })
        .collect()
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/runner.rs"]
mod tests;
