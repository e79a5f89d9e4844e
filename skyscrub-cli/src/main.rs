//! Command line front end for the skyscrub streak remover.
//!
//! Points the processing pipeline at a directory of TIFF frames and writes
//! the repaired sequence next to it:
//!
//! ```text
//! skyscrub ~/timelapses/2026-08-12/frames
//! skyscrub frames -o out --threads 8 --test-paint
//! ```
//!
//! Output lands in `<output>/<dirname>-skyscrub-v<version>/`, along with the
//! `config.json` that produced it. Rerunning against the same output
//! directory never overwrites existing frames.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use skyscrub::config::Config;
use skyscrub::frame::FrameState;
use skyscrub::image_io::{ImageSequence, TiffSequence};
use skyscrub::pipeline::Pipeline;
use skyscrub::review::Callbacks;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Detect and remove airplane light trails from timelapse sequences",
    long_about = "Detects airplane light trails in a night-sky timelapse by \
        differencing each frame against its temporal neighbors, confirms them \
        by tracking their motion across frames, and paints the affected pixels \
        over with data from an adjacent frame."
)]
struct Args {
    /// Directory containing the input TIFF sequence
    image_sequence: PathBuf,

    #[arg(
        short,
        long,
        default_value = ".",
        help = "Base directory for the output sequence"
    )]
    output: PathBuf,

    #[arg(
        short = 'j',
        long,
        help = "Worker threads for the detection and save stages [default: CPU count]"
    )]
    threads: Option<usize>,

    #[arg(
        long,
        help = "Load thresholds from a previous run's config.json instead of the defaults"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        help = "Seed threshold as a percentage of full pixel brightness",
        long_help = "Percentage difference between the same pixel on adjacent \
            frames required to seed an outlier group. Lower values catch \
            fainter trails at the cost of more false candidates."
    )]
    max_threshold: Option<f64>,

    #[arg(
        long,
        help = "Grow threshold as a percentage of full pixel brightness",
        long_help = "Lower percentage difference a pixel needs to be absorbed \
            into an already seeded group. Controls how far a group spreads \
            into the soft edges of a trail."
    )]
    min_threshold: Option<f64>,

    #[arg(long, help = "Ignore outlier groups smaller than this many pixels")]
    min_group_size: Option<usize>,

    #[arg(
        long,
        help = "Neighbor radius for the cross-frame window, in each direction"
    )]
    neighbors: Option<usize>,

    #[arg(
        long,
        help = "Write overlay frames tinting each group by its paint reason",
        long_help = "Instead of only repairing frames, also write a debug copy \
            of each frame with every outlier group tinted by the reason it \
            will or will not be painted. Overlays go to --test-paint-output."
    )]
    test_paint: bool,

    #[arg(long, help = "Directory for test paint overlays [default: <output dir>/test-paint]")]
    test_paint_output: Option<PathBuf>,

    #[arg(
        long,
        help = "Persist per-frame outlier groups so reruns skip detection"
    )]
    write_outlier_groups: bool,

    #[arg(long, help = "Print the effective config as JSON and exit")]
    print_config: bool,
}

fn build_config(args: &Args) -> Result<Config> {
    let sequence_dir = args
        .image_sequence
        .canonicalize()
        .with_context(|| format!("cannot access {}", args.image_sequence.display()))?;
    if !sequence_dir.is_dir() {
        bail!("{} is not a directory", sequence_dir.display());
    }
    let dirname = sequence_dir
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("cannot name sequence at {}", sequence_dir.display()))?
        .to_string();

    let mut config = match &args.config {
        Some(dir) => Config::read_from_dir(dir)
            .with_context(|| format!("loading config from {}", dir.display()))?,
        None => Config::default(),
    };
    config.image_sequence_path = sequence_dir.clone();
    config.image_sequence_dirname = dirname;
    config.output_path = args.output.clone();
    config.version = skyscrub::config::VERSION.to_string();

    let threads = args.threads.unwrap_or_else(num_cpus::get).max(1);
    config.num_concurrent_renders = threads;
    config.num_concurrent_saves = threads;

    if let Some(v) = args.max_threshold {
        config.outlier_max_threshold = v;
    }
    if let Some(v) = args.min_threshold {
        config.outlier_min_threshold = v;
    }
    if let Some(v) = args.min_group_size {
        config.min_group_size = v;
    }
    if let Some(v) = args.neighbors {
        config.number_final_processing_neighbors_needed = v;
    }
    config.test_paint = args.test_paint;
    config.test_paint_output_path = match &args.test_paint_output {
        Some(dir) => dir.clone(),
        None => config.output_dir().join("test-paint"),
    };
    config.write_outlier_group_files = args.write_outlier_groups;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let test_dir = config.test_paint.then(|| config.test_paint_output_path.clone());
    let sequence = TiffSequence::open(
        config.image_sequence_path.clone(),
        config.output_dir(),
        test_dir,
    )?;

    let progress = ProgressBar::new(sequence.frame_count() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    progress.set_message("frames");
    let bar = progress.clone();
    let callbacks = Callbacks {
        frame_state_change: Some(Arc::new(move |_, state| {
            if state == FrameState::Complete {
                bar.inc(1);
            }
        })),
        ..Callbacks::default()
    };

    let pipeline = Pipeline::new(config, callbacks)?;
    let summary = pipeline.run(&sequence)?;
    progress.finish_and_clear();

    println!(
        "{}/{} frames written, {} groups painted",
        summary.frames_completed, summary.frame_count, summary.groups_painted
    );
    if summary.frames_failed > 0 {
        bail!("{} frames failed, see the log for details", summary.frames_failed);
    }
    Ok(())
}
