use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vidscii::{AppConfig, CancelToken, Error, FramePipeline, FrameRate, FrameStore, Player, Progress, ProgressPhase, TransientDir};

/// Conventional exit status after SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(p) = explicit {
        return AppConfig::from_file(p).with_context(|| format!("loading config {}", p.display()));
    }

    // Look for vidscii.json in app data, then the current dir, then built-in defaults
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("vidscii");
        d.push("vidscii.json");
        tried.push(d);
    }
    tried.push(PathBuf::from("vidscii.json"));
    tried.push(PathBuf::from("vidscii.toml"));

    for p in &tried {
        if p.exists() {
            log::debug!("using config {}", p.display());
            return AppConfig::from_file(p).with_context(|| format!("loading config {}", p.display()));
        }
    }

    Ok(AppConfig::default())
}

#[derive(Parser, Debug)]
#[command(version, about = "Play a video in the terminal as ASCII art.")]
struct Args {
    /// Video file to play
    video: PathBuf,

    /// Output width in columns [default: 100]
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    columns: Option<u32>,

    /// Frame rate to sample and play at (e.g. 24, 29.97, 30000/1001); probed when omitted
    #[arg(long)]
    fps: Option<FrameRate>,

    /// Glyphs from densest to blank
    #[arg(long)]
    ramp: Option<String>,

    /// Character cell compensation applied to the row count
    #[arg(long)]
    font_ratio: Option<f32>,

    /// Directory for generated text frames (must not exist; removed on exit)
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Keep the decoded still images
    #[arg(long, default_value_t = false)]
    keep_stills: bool,

    /// Start playing without waiting for Enter
    #[arg(long, default_value_t = false)]
    no_wait: bool,

    /// Configuration file (JSON or TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    let cancel = CancelToken::new();
    let code = match run(args, &cancel) {
        Ok(()) => EXIT_INTERRUPTED,
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Interrupted)) => EXIT_INTERRUPTED,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

/// Request shutdown. Repeated interrupts only log: the process must stay alive
/// until the frame directory guards have run.
fn on_interrupt(cancel: &CancelToken) {
    if cancel.is_cancelled() {
        log::warn!("already shutting down");
        return;
    }
    cancel.cancel();
    eprintln!("\nCaught interrupt signal");
}

/// Generate frames and play them until interrupted. Every transient directory
/// is owned by a guard inside this function, so all of them are gone by the
/// time it returns.
fn run(args: Args, cancel: &CancelToken) -> Result<()> {
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || on_interrupt(&handler_token)).context("installing interrupt handler")?;

    let mut cfg = load_config(args.config.as_deref())?;
    if let Some(columns) = args.columns {
        cfg.columns = columns;
    }
    if let Some(ramp) = args.ramp {
        cfg.ramp = ramp;
    }
    if let Some(font_ratio) = args.font_ratio {
        cfg.font_ratio = font_ratio;
    }
    if args.no_wait {
        cfg.wait_for_enter = false;
    }
    cfg.validate()?;

    if !args.video.is_file() {
        return Err(Error::Usage(format!("video file {} not found", args.video.display())).into());
    }

    let mut options = cfg.pipeline_options()?.with_keep_stills(args.keep_stills);
    if let Some(rate) = args.fps {
        options = options.with_frame_rate(rate);
    }

    let frames_dir = match args.frames_dir {
        Some(dir) => TransientDir::create(dir)?,
        None => TransientDir::unique("frames")?,
    };
    let store = FrameStore::new(frames_dir);

    // Progress bar is created once the number of stills is known
    let progress_bar: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    let pb_clone = Arc::clone(&progress_bar);

    let pipeline = FramePipeline::new(cfg.media_backend(), options);
    let sequence = pipeline.produce_with_progress(&args.video, &store, cancel, move |progress: Progress| {
        match progress.phase {
            ProgressPhase::ProbingFrameRate | ProgressPhase::ExtractingFrames => {
                println!("{}", progress.message);
            }
            ProgressPhase::ConvertingFrames => {
                let Ok(mut pb_guard) = pb_clone.lock() else {
                    return;
                };
                let pb = pb_guard.get_or_insert_with(|| {
                    let pb = ProgressBar::new(progress.total as u64);
                    if let Ok(style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                    {
                        pb.set_style(style.progress_chars("#>-"));
                    }
                    pb
                });
                pb.set_position(progress.completed as u64);
            }
            ProgressPhase::Complete => {}
        }
    })?;

    let pb_opt = progress_bar.lock().ok().and_then(|mut guard| guard.take());
    if let Some(pb) = pb_opt {
        pb.finish_and_clear();
    }

    let rate = sequence.frame_rate;
    println!(
        "Generated {} frames of {}x{} glyphs",
        sequence.len(),
        sequence.width,
        sequence.height
    );
    println!("Original video frame rate: {:.3} fps", rate.as_f64());
    println!("Delay between frames: {:.2} milliseconds", rate.interval().as_secs_f64() * 1000.0);
    if cfg.wait_for_enter {
        println!("Press Enter to start the animation...");
    }

    let mut player = Player::new(rate).with_start_gate(cfg.wait_for_enter);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let stats = player.play(store, io::stdin(), &mut out, cancel)?;
    log::info!("played {} ticks", stats.ticks);
    Ok(())
}
