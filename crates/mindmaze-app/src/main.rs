//! MindMaze Application
//!
//! Entry point for the SSVEP-controlled maze game and its offline tools.
//!
//! # Usage
//!
//! ```bash
//! # Play with the synthetic board (default)
//! mindmaze
//!
//! # Replay a recording through the classifier while playing
//! mindmaze play --source replay --recording session.csv
//!
//! # Classify without a window, one JSON line per window
//! mindmaze classify --seconds 30 --json
//!
//! # Write a synthetic recording, then inspect it
//! mindmaze record --output synthetic.csv
//! mindmaze inspect synthetic.csv
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, RecvTimeoutError};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mindmaze_native::bridge::{BoardId, BrainFlowFormat, EegSource, ReplaySource, SyntheticBoard};
use mindmaze_native::classifier::{ClassifierWorker, MovementQueue, SharedStatus};
use mindmaze_native::config::{MindMazeConfig, SourceKind};
use mindmaze_native::game::GameSession;
use mindmaze_native::processing::spectrum::SpectralAnalyzer;
use mindmaze_native::processing::ssvep::SsvepDetector;
use mindmaze_native::recording::Recording;

/// Metadata lines shown in the data info panel
type InfoLines = Vec<(&'static str, String)>;

/// MindMaze
#[derive(Parser, Debug)]
#[command(name = "mindmaze")]
#[command(author, version, about = "SSVEP brain-computer interface maze game", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the maze game (default if no subcommand)
    Play {
        /// EEG source: synthetic, replay, or keyboard
        #[arg(short, long)]
        source: Option<SourceKind>,

        /// Recording to replay (implies --source replay)
        #[arg(short, long)]
        recording: Option<PathBuf>,
    },

    /// Run the classifier without a window and print its decisions
    Classify {
        /// How long to run
        #[arg(long, default_value = "10")]
        seconds: f64,

        /// EEG source: synthetic or replay
        #[arg(short, long)]
        source: Option<SourceKind>,

        /// Recording to replay (implies --source replay)
        #[arg(short, long)]
        recording: Option<PathBuf>,

        /// Print every window as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Write a synthetic SSVEP recording
    Record {
        /// Output CSV path
        #[arg(short, long, default_value = "synthetic_ssvep.csv")]
        output: PathBuf,

        /// Recording length; defaults to the config value
        #[arg(long)]
        seconds: Option<f64>,

        /// Generator seed; defaults to the config value
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print recording metadata and per-channel spectral peaks
    Inspect {
        /// Recording CSV
        path: PathBuf,
    },

    /// List supported board layouts
    Boards,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("MindMaze v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MindMazeConfig::load_or_default(cli.config.as_deref());

    match cli.command {
        None => play(&config)?,
        Some(Commands::Play { source, recording }) => {
            apply_source_overrides(&mut config, source, recording);
            play(&config)?;
        }
        Some(Commands::Classify { seconds, source, recording, json }) => {
            apply_source_overrides(&mut config, source, recording);
            classify(&config, seconds, json)?;
        }
        Some(Commands::Record { output, seconds, seed }) => {
            record(&config, &output, seconds, seed)?;
        }
        Some(Commands::Inspect { path }) => inspect(&config, &path)?,
        Some(Commands::Boards) => list_boards(),
    }

    Ok(())
}

fn apply_source_overrides(config: &mut MindMazeConfig, source: Option<SourceKind>, recording: Option<PathBuf>) {
    if recording.is_some() {
        config.source.kind = SourceKind::Replay;
        config.source.recording = recording;
    }
    if let Some(kind) = source {
        config.source.kind = kind;
    }
}

/// Build the configured EEG source with its info panel lines.
///
/// Returns `Ok(None)` for keyboard-only play.
fn open_source(config: &MindMazeConfig) -> anyhow::Result<Option<(Box<dyn EegSource>, InfoLines)>> {
    match config.source.kind {
        SourceKind::Keyboard => Ok(None),
        SourceKind::Synthetic => {
            let mut board = SyntheticBoard::new(config.board_config());
            board.start().context("failed to start synthetic board")?;
            let info = vec![
                ("Board", board.board().name().to_string()),
                ("Channels", board.channel_count().to_string()),
                ("Sample Rate", format!("{} Hz", board.sampling_rate())),
            ];
            let source: Box<dyn EegSource> = Box::new(board);
            Ok(Some((source, info)))
        }
        SourceKind::Replay => {
            let recording = load_replay(config);
            let info = recording.metadata().lines();
            let source: Box<dyn EegSource> =
                Box::new(ReplaySource::with_interval(recording, config.replay_hop()));
            Ok(Some((source, info)))
        }
    }
}

/// Load the configured recording, falling back to generated data
fn load_replay(config: &MindMazeConfig) -> Recording {
    let src = &config.source;
    let loaded = src.recording.as_deref().map(Recording::load_csv);
    let mut recording = match loaded {
        Some(Ok(recording)) => recording,
        Some(Err(e)) => {
            warn!(error = %e, "Could not load recording, generating synthetic data");
            Recording::synthetic_ssvep(&config.synthetic_params(), src.synthetic_seconds, src.seed)
        }
        None => {
            info!("No recording configured, generating synthetic data");
            Recording::synthetic_ssvep(&config.synthetic_params(), src.synthetic_seconds, src.seed)
        }
    };

    recording.pick_eeg_channels();
    if src.prefilter {
        if let Err(e) = recording.prefilter(src.prefilter_low_hz, src.prefilter_high_hz) {
            warn!(error = %e, "Prefilter failed, replaying unfiltered data");
        }
    }
    recording
}

/// Detector whose channel subset fits the source
fn detector_for(config: &MindMazeConfig, source: &dyn EegSource) -> anyhow::Result<SsvepDetector> {
    let ssvep = config.ssvep_config_for(source.channel_count())?;
    Ok(SsvepDetector::new(ssvep, source.sampling_rate())?)
}

/// Start the worker for a source; its queue is the worker's queue
fn start_worker(config: &MindMazeConfig, source: Box<dyn EegSource>) -> anyhow::Result<ClassifierWorker> {
    let detector = detector_for(config, source.as_ref())?;
    let queue = MovementQueue::new(config.classifier.queue_capacity);
    Ok(ClassifierWorker::spawn(source, detector, queue, config.worker_config())?)
}

fn play(config: &MindMazeConfig) -> anyhow::Result<()> {
    let (worker, info) = match open_source(config).and_then(|opened| {
        opened
            .map(|(source, info)| start_worker(config, source).map(|w| (w, info)))
            .transpose()
    }) {
        Ok(Some((worker, info))) => (Some(worker), info),
        Ok(None) => {
            info!("Keyboard-only mode");
            (None, Vec::new())
        }
        Err(e) => {
            warn!(error = %e, "EEG source unavailable, running keyboard-only");
            (None, Vec::new())
        }
    };

    let seed = config.game.maze_seed.unwrap_or_else(clock_seed);
    info!(seed, "Generating maze");
    let mut session = GameSession::new(config.game.layout(), &config.targets, seed)?;
    if let Some(worker) = &worker {
        session = session.with_queue(worker.queue().clone());
    }
    let status = worker.as_ref().map(ClassifierWorker::status);

    let result = run_game(config, session, status, info);

    if let Some(mut worker) = worker {
        worker.stop();
        let status = worker.snapshot();
        info!(
            windows = status.windows_processed,
            decisions = status.decisions,
            errors = status.errors,
            "Classifier stopped"
        );
    }
    result
}

/// Open the game window
fn run_game(
    config: &MindMazeConfig,
    session: GameSession,
    status: Option<SharedStatus>,
    info: InfoLines,
) -> anyhow::Result<()> {
    #[cfg(feature = "native")]
    {
        use mindmaze_native::viz::{run_app, ViewConfig};

        let view = ViewConfig { fps: config.game.fps, ..ViewConfig::default() };
        run_app(session, status, info, view).map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    #[cfg(not(feature = "native"))]
    {
        let _ = (config, session, status, info);
        anyhow::bail!(
            "Game window not enabled. Rebuild with --features native:\n\
             cargo run -p mindmaze-app --features native"
        );
    }

    Ok(())
}

fn classify(config: &MindMazeConfig, seconds: f64, json: bool) -> anyhow::Result<()> {
    let (source, _) = open_source(config)?.context("classify needs an EEG source, not keyboard")?;
    let detector = detector_for(config, source.as_ref())?;
    let queue = MovementQueue::new(config.classifier.queue_capacity);
    let (tx, rx) = unbounded();
    let mut worker = ClassifierWorker::spawn_observed(source, detector, queue, config.worker_config(), tx)?;

    info!(seconds, "Classifying");
    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match rx.recv_timeout(remaining) {
            Ok(detection) => {
                if json {
                    println!("{}", serde_json::to_string(&detection)?);
                } else if let Some(decision) = &detection.decision {
                    println!("{decision}");
                }
            }
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Classifier worker exited early");
                break;
            }
        }
    }

    worker.stop();
    let status = worker.snapshot();
    info!(
        windows = status.windows_processed,
        decisions = status.decisions,
        errors = status.errors,
        "Classification finished"
    );
    Ok(())
}

fn record(config: &MindMazeConfig, output: &Path, seconds: Option<f64>, seed: Option<u64>) -> anyhow::Result<()> {
    let seconds = seconds.unwrap_or(config.source.synthetic_seconds);
    let seed = seed.unwrap_or(config.source.seed);
    let recording = Recording::synthetic_ssvep(&config.synthetic_params(), seconds, seed);
    recording.save_csv(output)?;

    println!("Wrote {}", output.display());
    for (key, value) in recording.metadata().lines() {
        println!("  {key}: {value}");
    }
    Ok(())
}

fn inspect(config: &MindMazeConfig, path: &Path) -> anyhow::Result<()> {
    let recording = Recording::load_csv(path)?;
    for (key, value) in recording.metadata().lines() {
        println!("{key}: {value}");
    }

    // Largest power of two that fits, at most 2048
    let fft_size = prev_power_of_two(recording.len().min(2048));
    if fft_size < 16 {
        warn!(samples = recording.len(), "Recording too short for a spectrum");
        return Ok(());
    }
    let mut analyzer = SpectralAnalyzer::new(fft_size, recording.sample_rate());
    println!();
    println!("FFT size {fft_size}, resolution {:.3} Hz", analyzer.frequency_resolution());

    let header: Vec<String> = config.targets.iter().map(|t| format!("{}Hz", t.frequency_hz)).collect();
    println!("{:<10} {:>10} {:>12}  {}", "channel", "peak Hz", "peak PSD", header.join("  "));
    for (name, samples) in recording.channel_names().iter().zip(recording.data()) {
        let psd = analyzer.compute_psd(samples)?;
        let (peak_hz, peak_power) = analyzer.peak_frequency(&psd, 1.0, 50.0).unwrap_or((0.0, 0.0));
        let powers: Vec<String> =
            analyzer.stimulus_powers(&psd, &config.targets).iter().map(|p| format!("{p:.3e}")).collect();
        println!("{name:<10} {peak_hz:>10.2} {peak_power:>12.3e}  {}", powers.join("  "));
    }
    Ok(())
}

fn list_boards() {
    println!("Supported boards:");
    for board in BoardId::ALL {
        let format = BrainFlowFormat::for_board(board);
        let names = format.eeg_names();
        println!(
            "  {:<20} id {:>2}  {:>2} EEG ch @ {} Hz  [{}]",
            board.name(),
            board.id(),
            board.eeg_channels(),
            board.sampling_rate(),
            names.join(", ")
        );
    }
}

fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        0
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() ^ u64::from(d.subsec_nanos()))
}
