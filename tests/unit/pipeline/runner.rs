use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use super::*;
use crate::geometry::line::LinePairing;
use crate::pipeline::export::InMemorySink;
use crate::pipeline::progress::ChannelProgress;
use crate::pipeline::report::JobStatus;

fn gradient(w: u32, h: u32, seed: u8) -> ImageRGBA {
    ImageRGBA::from_fn(w, h, |x, y| {
        [
            (x * 13) as u8 ^ seed,
            (y * 17) as u8,
            seed.wrapping_mul(3),
            255,
        ]
    })
    .unwrap()
}

fn job(frames: u32) -> Arc<MorphJob> {
    let lines = LinePairing::new(
        vec![
            FeatureLine::new((4.0, 4.0), (4.0, 16.0)),
            FeatureLine::new((10.0, 2.0), (18.0, 2.0)),
        ],
        vec![
            FeatureLine::new((6.0, 4.0), (7.0, 17.0)),
            FeatureLine::new((9.0, 3.0), (17.0, 4.0)),
        ],
    )
    .unwrap();
    Arc::new(
        MorphJob::new(
            MorphInput::at_origin(gradient(20, 18, 1)),
            MorphInput::at_origin(gradient(20, 18, 90)),
            lines,
            frames,
        )
        .unwrap(),
    )
}

fn quiet() -> ProgressTracker {
    ProgressTracker::new(0, Arc::new(NoProgress))
}

struct FailingAt(FrameIndex, InMemorySink);

impl ExportSink for FailingAt {
    fn export(&self, index: FrameIndex, image: &ImageRGBA) -> MorphResult<PathBuf> {
        if index == self.0 {
            return Err(MorphError::export(index, "disk full"));
        }
        self.1.export(index, image)
    }
}

struct Hanging(FrameIndex);

impl ExportSink for Hanging {
    fn export(&self, index: FrameIndex, _image: &ImageRGBA) -> MorphResult<PathBuf> {
        if index == self.0 {
            std::thread::sleep(Duration::from_secs(5));
        }
        Ok(PathBuf::from(format!("f_{index}")))
    }
}

struct Panicking(FrameIndex);

impl ExportSink for Panicking {
    fn export(&self, index: FrameIndex, _image: &ImageRGBA) -> MorphResult<PathBuf> {
        assert_ne!(index, self.0, "sink exploded");
        Ok(PathBuf::from(format!("f_{index}")))
    }
}

/// Records how many exports overlap.
#[derive(Default)]
struct Slow {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ExportSink for Slow {
    fn export(&self, index: FrameIndex, _image: &ImageRGBA) -> MorphResult<PathBuf> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(PathBuf::from(format!("f_{index}")))
    }
}

/// Fires the token while exporting `at`, then exports normally.
struct CancelsAt {
    at: FrameIndex,
    cancel: CancelToken,
    inner: InMemorySink,
}

impl ExportSink for CancelsAt {
    fn export(&self, index: FrameIndex, image: &ImageRGBA) -> MorphResult<PathBuf> {
        if index == self.at {
            self.cancel.cancel();
        }
        self.inner.export(index, image)
    }
}

#[test]
fn exports_every_slot_with_untouched_endpoints() {
    let job = job(3);
    let sink = Arc::new(InMemorySink::new("t"));
    let report = run_morph(
        Arc::clone(&job),
        sink.clone(),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.frames.len(), 5);
    for (i, r) in report.frames.iter().enumerate() {
        assert_eq!(r.index, FrameIndex(i as u32));
        assert_eq!(
            r.outcome,
            FrameOutcome::Exported(PathBuf::from(format!("t_{i}")))
        );
    }
    assert_eq!(sink.frame(FrameIndex(0)).as_ref(), Some(&job.source().image));
    assert_eq!(
        sink.frame(FrameIndex(4)).as_ref(),
        Some(&job.destination().image)
    );
}

#[test]
fn exported_in_betweens_match_single_frame_renders() {
    let job = job(2);
    let sink = Arc::new(InMemorySink::new("t"));
    run_morph(
        Arc::clone(&job),
        sink.clone(),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();

    let backend = create_backend(BackendKind::Serial, &BackendSettings::default()).unwrap();
    for k in 1..=2 {
        let preview = morph_frame(&job, k, backend.as_ref(), &CancelToken::new()).unwrap();
        assert_eq!(sink.frame(FrameIndex(k)), Some(preview));
    }
    assert!(morph_frame(&job, 0, backend.as_ref(), &CancelToken::new()).is_err());
    assert!(morph_frame(&job, 3, backend.as_ref(), &CancelToken::new()).is_err());
}

#[test]
fn parallel_scheduling_matches_sequential() {
    let job = job(4);
    let seq = Arc::new(InMemorySink::new("s"));
    let par = Arc::new(InMemorySink::new("p"));
    run_morph(
        Arc::clone(&job),
        seq.clone(),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();
    let opts = PipelineOpts {
        threading: MorphThreading {
            parallel: true,
            threads: Some(3),
        },
        backend: BackendKind::Serial,
        ..PipelineOpts::default()
    };
    let report = run_morph(job, par.clone(), &quiet(), &CancelToken::new(), &opts).unwrap();

    assert!(report.is_complete());
    assert_eq!(seq.take_frames(), par.take_frames());
}

#[test]
fn export_failure_is_contained_to_its_index() {
    let sink = Arc::new(FailingAt(FrameIndex(2), InMemorySink::new("t")));
    let report = run_morph(
        job(3),
        sink.clone(),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();

    assert_eq!(
        report.status,
        JobStatus::Partial {
            failed: vec![FrameIndex(2)]
        }
    );
    let FrameOutcome::Failed(failure) = &report.frames[2].outcome else {
        panic!("frame 2 should have failed");
    };
    assert_eq!(failure.kind, FailureKind::Export);
    assert!(failure.message.contains("disk full"));
    assert_eq!(
        sink.1.indices(),
        vec![FrameIndex(0), FrameIndex(1), FrameIndex(3), FrameIndex(4)]
    );
}

#[test]
fn hanging_export_times_out_as_concurrency_failure() {
    let opts = PipelineOpts {
        export_timeout: Some(Duration::from_millis(200)),
        ..PipelineOpts::default()
    };
    let report = run_morph(
        job(1),
        Arc::new(Hanging(FrameIndex(1))),
        &quiet(),
        &CancelToken::new(),
        &opts,
    )
    .unwrap();

    let FrameOutcome::Failed(failure) = &report.frames[1].outcome else {
        panic!("frame 1 should have timed out");
    };
    assert_eq!(failure.kind, FailureKind::Concurrency);
    assert!(report.frames[0].is_exported());
    assert!(report.frames[2].is_exported());
}

#[test]
fn dead_export_worker_is_reported() {
    let report = run_morph(
        job(2),
        Arc::new(Panicking(FrameIndex(0))),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();

    let FrameOutcome::Failed(failure) = &report.frames[0].outcome else {
        panic!("frame 0 should have failed");
    };
    assert_eq!(failure.kind, FailureKind::Concurrency);
    assert_eq!(
        report.status,
        JobStatus::Partial {
            failed: vec![FrameIndex(0)]
        }
    );
}

#[test]
fn cancelled_before_start_skips_everything() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let sink = Arc::new(InMemorySink::new("t"));
    let report = run_morph(
        job(3),
        sink.clone(),
        &quiet(),
        &cancel,
        &PipelineOpts::default(),
    )
    .unwrap();

    assert_eq!(report.status, JobStatus::Cancelled);
    assert!(
        report
            .frames
            .iter()
            .all(|r| r.outcome == FrameOutcome::Skipped)
    );
    assert!(sink.indices().is_empty());
}

#[test]
fn progress_is_monotonic_and_reaches_total() {
    let (tx, rx) = mpsc::channel();
    let tracker = ProgressTracker::for_frames(3, Arc::new(ChannelProgress::new(tx)));
    let opts = PipelineOpts {
        threading: MorphThreading {
            parallel: true,
            threads: Some(2),
        },
        ..PipelineOpts::default()
    };
    run_morph(
        job(3),
        Arc::new(InMemorySink::new("t")),
        &tracker,
        &CancelToken::new(),
        &opts,
    )
    .unwrap();
    drop(tracker);

    let events: Vec<_> = rx.iter().collect();
    assert!(events.windows(2).all(|w| w[0].completed <= w[1].completed));
    let last = events.last().unwrap();
    assert_eq!((last.completed, last.total), (14, 14));
    assert!(events.iter().any(|e| e.phase == "finishing exports"));
    assert!(events.iter().any(|e| e.phase == "dissolved frame 2/3"));
}

#[test]
fn pending_exports_are_bounded_by_frame_workers() {
    let sink = Arc::new(Slow::default());
    let report = run_morph(
        job(8),
        sink.clone(),
        &quiet(),
        &CancelToken::new(),
        &PipelineOpts::default(),
    )
    .unwrap();
    assert!(report.is_complete());
    let peak = sink.peak.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak {peak}");

    let sink = Arc::new(Slow::default());
    let opts = PipelineOpts {
        threading: MorphThreading {
            parallel: true,
            threads: Some(2),
        },
        ..PipelineOpts::default()
    };
    let report = run_morph(job(8), sink.clone(), &quiet(), &CancelToken::new(), &opts).unwrap();
    assert!(report.is_complete());
    let peak = sink.peak.load(Ordering::SeqCst);
    assert!((1..=4).contains(&peak), "peak {peak}");
}

#[test]
fn explicit_export_limit_serializes_exports() {
    let sink = Arc::new(Slow::default());
    let opts = PipelineOpts {
        max_pending_exports: Some(1),
        ..PipelineOpts::default()
    };
    let report = run_morph(job(4), sink.clone(), &quiet(), &CancelToken::new(), &opts).unwrap();

    assert!(report.is_complete());
    assert_eq!(sink.peak.load(Ordering::SeqCst), 1);
}

#[test]
fn export_slot_wait_respects_timeout() {
    let opts = PipelineOpts {
        max_pending_exports: Some(1),
        export_timeout: Some(Duration::from_millis(200)),
        ..PipelineOpts::default()
    };
    let report = run_morph(
        job(1),
        Arc::new(Hanging(FrameIndex(0))),
        &quiet(),
        &CancelToken::new(),
        &opts,
    )
    .unwrap();

    // The source export holds the only slot, so nothing else gets to start.
    for r in &report.frames {
        let FrameOutcome::Failed(failure) = &r.outcome else {
            panic!("frame {} should have failed", r.index);
        };
        assert_eq!(failure.kind, FailureKind::Concurrency);
    }
}

#[test]
fn cancelling_during_export_skips_remaining_frames() {
    let cancel = CancelToken::new();
    let sink = Arc::new(CancelsAt {
        at: FrameIndex(2),
        cancel: cancel.clone(),
        inner: InMemorySink::new("t"),
    });
    let opts = PipelineOpts {
        max_pending_exports: Some(1),
        ..PipelineOpts::default()
    };
    let report = run_morph(job(10), sink.clone(), &quiet(), &cancel, &opts).unwrap();

    assert_eq!(report.status, JobStatus::Cancelled);
    for i in [0, 1, 2, 11] {
        assert!(report.frames[i].is_exported(), "frame {i}");
    }
    for i in 3..=10 {
        assert_eq!(report.frames[i].outcome, FrameOutcome::Skipped, "frame {i}");
    }
    assert_eq!(
        sink.inner.indices(),
        vec![FrameIndex(0), FrameIndex(1), FrameIndex(2), FrameIndex(11)]
    );
}

#[test]
fn zero_threads_timeout_or_export_limit_are_rejected() {
    let opts = PipelineOpts {
        threading: MorphThreading {
            parallel: true,
            threads: Some(0),
        },
        ..PipelineOpts::default()
    };
    let sink = Arc::new(InMemorySink::new("t"));
    assert!(matches!(
        run_morph(job(1), sink.clone(), &quiet(), &CancelToken::new(), &opts),
        Err(MorphError::InvalidInput(_))
    ));

    let opts = PipelineOpts {
        export_timeout: Some(Duration::ZERO),
        ..PipelineOpts::default()
    };
    assert!(run_morph(job(1), sink, &quiet(), &CancelToken::new(), &opts).is_err());

    let opts = PipelineOpts {
        max_pending_exports: Some(0),
        ..PipelineOpts::default()
    };
    let sink = Arc::new(InMemorySink::new("t"));
    assert!(run_morph(job(1), sink, &quiet(), &CancelToken::new(), &opts).is_err());
}
