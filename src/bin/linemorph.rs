use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "linemorph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Morph a job into PNG frames `{base}_0.png ..= {base}_{N+1}.png`.
    Morph(MorphArgs),
    /// Render one in-between frame as a PNG.
    Frame(FrameArgs),
    /// Print the interpolated line sets of every in-between frame as JSON.
    Lines(LinesArgs),
}

#[derive(Parser, Debug)]
struct MorphArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory.
    #[arg(long)]
    out_dir: PathBuf,

    /// Override the number of in-between frames (1..=30).
    #[arg(long)]
    frames: Option<u32>,

    /// Render in-between frames concurrently.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Artifact base name; defaults to the job's, then to `morph-<unix seconds>`.
    #[arg(long)]
    base_name: Option<String>,

    /// Give up on an export after waiting this many seconds for it to start or finish.
    #[arg(long)]
    export_timeout_secs: Option<u64>,

    /// Frames allowed to wait on export at once; defaults to frame workers + 2.
    #[arg(long)]
    max_pending_exports: Option<usize>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// In-between frame index (1-based).
    #[arg(long)]
    frame: u32,

    /// Override the number of in-between frames (1..=30).
    #[arg(long)]
    frames: Option<u32>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct LinesArgs {
    /// Input job JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Override the number of in-between frames (1..=30).
    #[arg(long)]
    frames: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Morph(args) => cmd_morph(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Lines(args) => cmd_lines(args),
    }
}

fn load_spec(in_path: &Path, frames: Option<u32>) -> anyhow::Result<linemorph::MorphSpec> {
    let mut spec = linemorph::MorphSpec::load(in_path)?;
    if let Some(n) = frames {
        spec.frames = n;
    }
    Ok(spec)
}

fn job_root(in_path: &Path) -> &Path {
    in_path.parent().unwrap_or_else(|| Path::new("."))
}

fn default_base_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("morph-{secs}")
}

fn cmd_morph(args: MorphArgs) -> anyhow::Result<()> {
    let spec = load_spec(&args.in_path, args.frames)?;
    let base_name = args
        .base_name
        .or_else(|| spec.base_name.clone())
        .unwrap_or_else(default_base_name);
    let job = spec
        .into_job(job_root(&args.in_path))
        .with_context(|| format!("load morph job '{}'", args.in_path.display()))?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
    let sink = linemorph::PngDirSink::new(&args.out_dir, base_name)?;
    let progress = linemorph::ProgressTracker::for_frames(
        job.frames(),
        Arc::new(linemorph::TracingProgress),
    );
    let opts = linemorph::PipelineOpts {
        threading: linemorph::MorphThreading {
            parallel: args.parallel,
            threads: args.threads,
        },
        backend: linemorph::BackendKind::default(),
        export_timeout: args.export_timeout_secs.map(Duration::from_secs),
        max_pending_exports: args.max_pending_exports,
    };

    let report = linemorph::run_morph(
        Arc::new(job),
        Arc::new(sink),
        &progress,
        &linemorph::CancelToken::new(),
        &opts,
    )?;

    for r in &report.frames {
        match &r.outcome {
            linemorph::FrameOutcome::Exported(path) => eprintln!("wrote {}", path.display()),
            linemorph::FrameOutcome::Failed(f) => {
                eprintln!("frame {} failed ({}): {}", r.index, f.kind, f.message)
            }
            linemorph::FrameOutcome::Skipped => eprintln!("frame {} skipped", r.index),
        }
    }

    match report.status {
        linemorph::JobStatus::Complete => Ok(()),
        linemorph::JobStatus::Partial { failed } => {
            anyhow::bail!("{} of {} frames failed", failed.len(), report.frames.len())
        }
        linemorph::JobStatus::Cancelled => anyhow::bail!("morph cancelled"),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let spec = load_spec(&args.in_path, args.frames)?;
    let job = spec
        .into_job(job_root(&args.in_path))
        .with_context(|| format!("load morph job '{}'", args.in_path.display()))?;
    let backend = linemorph::create_backend(
        linemorph::BackendKind::default(),
        &linemorph::BackendSettings::default(),
    )?;
    let frame = linemorph::morph_frame(
        &job,
        args.frame,
        backend.as_ref(),
        &linemorph::CancelToken::new(),
    )?;

    linemorph::save_png(&frame, &args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_lines(args: LinesArgs) -> anyhow::Result<()> {
    let spec = load_spec(&args.in_path, args.frames)?;
    let sets = linemorph::interpolate_lines(&spec.pairing()?, spec.frames)?;
    let out: Vec<Vec<linemorph::config::LineDef>> = sets
        .into_iter()
        .map(|set| set.into_iter().map(Into::into).collect())
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize interpolated lines")?
    );
    Ok(())
}
