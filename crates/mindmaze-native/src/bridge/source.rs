//! EEG window sources
//!
//! The classifier worker only needs "give me the newest `n` samples". Two
//! sources implement that:
//!
//! - [`SyntheticBoard`]: a BrainFlow-layout board streamed by a background
//!   thread at the board's sample rate
//! - [`ReplaySource`]: a [`Recording`] played back window by window, looping

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use mindmaze_core::ProcessingError;

use super::streaming::{BoardId, BrainFlowBuffer, BrainFlowFormat};
use crate::processing::ssvep::EegWindow;
use crate::recording::Recording;
use crate::simulation::{SsvepSimulator, SyntheticParams};

/// Errors from an EEG source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Board stream is not running
    #[error("board stream not started")]
    NotStreaming,

    /// Streaming thread could not be spawned
    #[error("failed to spawn streaming thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Shared buffer lock was poisoned by a panicking thread
    #[error("board buffer lock poisoned")]
    Poisoned,

    /// Recording shorter than one window
    #[error("recording has {available} samples, window needs {required}")]
    RecordingTooShort {
        /// Samples in the recording
        available: usize,
        /// Samples per window
        required: usize,
    },

    /// Data could not be shaped into a window
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Any other read failure
    #[error("{0}")]
    Read(String),
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Something the classifier can pull EEG windows from.
pub trait EegSource: Send {
    /// Sampling rate in Hz
    fn sampling_rate(&self) -> f64;

    /// Number of EEG channels in each window
    fn channel_count(&self) -> usize;

    /// Human-readable description for logs and the info panel
    fn describe(&self) -> String;

    /// Most recent `len` samples.
    ///
    /// `Ok(None)` means the source has not accumulated a full window yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the source cannot be read; callers are expected
    /// to back off and retry.
    fn next_window(&mut self, len: usize) -> SourceResult<Option<EegWindow>>;

    /// Playback position in seconds, for sources that have one
    fn position_secs(&self) -> Option<f64> {
        None
    }
}

// ============================================================================
// Synthetic board
// ============================================================================

/// Synthetic board configuration
#[derive(Clone, Debug)]
pub struct SyntheticBoardConfig {
    /// Board layout to emulate
    pub board: BoardId,
    /// Samples kept in the ring buffer
    pub buffer_capacity: usize,
    /// How often the streaming thread wakes to push samples
    pub tick: Duration,
    /// Signal generator settings (rate and channel count follow the board)
    pub signal: SyntheticParams,
    /// Generator seed
    pub seed: u64,
}

impl Default for SyntheticBoardConfig {
    fn default() -> Self {
        Self {
            board: BoardId::Synthetic,
            // 45 s at 250 Hz, as BrainFlow's default ring buffer
            buffer_capacity: 45 * 250,
            tick: Duration::from_millis(20),
            signal: SyntheticParams { harmonic_ratio: 0.5, ..SyntheticParams::default() },
            seed: 42,
        }
    }
}

/// A board whose samples are generated on a background thread.
pub struct SyntheticBoard {
    config: SyntheticBoardConfig,
    buffer: Arc<Mutex<BrainFlowBuffer>>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticBoard {
    /// Create a stopped board
    #[must_use]
    pub fn new(config: SyntheticBoardConfig) -> Self {
        let format = BrainFlowFormat::for_board(config.board);
        let buffer = BrainFlowBuffer::new(format, config.buffer_capacity);
        Self { config, buffer: Arc::new(Mutex::new(buffer)), stop_tx: None, handle: None }
    }

    /// Board being emulated
    #[must_use]
    pub fn board(&self) -> BoardId {
        self.config.board
    }

    /// Whether the streaming thread is running
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.handle.is_some()
    }

    /// Start streaming. Calling this twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Spawn`] if the thread cannot be created.
    pub fn start(&mut self) -> SourceResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let board = self.config.board;
        let params = SyntheticParams {
            sample_rate: board.sampling_rate(),
            channel_count: board.eeg_channels(),
            ..self.config.signal.clone()
        };
        let simulator = SsvepSimulator::new(params, self.config.seed);
        let buffer = Arc::clone(&self.buffer);
        let tick = self.config.tick;
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("synthetic-board".into())
            .spawn(move || {
                let mut simulator = simulator;
                let start = Instant::now();
                let rate = simulator.params().sample_rate;
                loop {
                    match stop_rx.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let due = (start.elapsed().as_secs_f64() * rate) as u64;
                    let Ok(mut buffer) = buffer.lock() else {
                        warn!("Board buffer poisoned, stopping stream");
                        break;
                    };
                    while simulator.samples_generated() < due {
                        push_sample(&mut buffer, &mut simulator, start);
                    }
                }
                debug!("Synthetic board stream stopped");
            })
            .map_err(SourceError::Spawn)?;

        info!(board = %board, "Synthetic board streaming");
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop streaming and join the thread
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Synthetic board thread panicked");
            }
            info!(board = %self.config.board, "Synthetic board stopped");
        }
    }

    /// Samples currently buffered
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.lock().map_or(0, |b| b.len())
    }
}

fn push_sample(buffer: &mut BrainFlowBuffer, simulator: &mut SsvepSimulator, start: Instant) {
    let marker = simulator.attended().map_or(0, |i| i as i32 + 1);
    let sample = simulator.next_sample();
    let packet = buffer.format().packet(&sample, start.elapsed().as_secs_f64(), marker);
    buffer.push(packet);
}

impl EegSource for SyntheticBoard {
    fn sampling_rate(&self) -> f64 {
        self.config.board.sampling_rate()
    }

    fn channel_count(&self) -> usize {
        self.config.board.eeg_channels()
    }

    fn describe(&self) -> String {
        format!("{} ({} Hz)", self.config.board.name(), self.sampling_rate())
    }

    fn next_window(&mut self, len: usize) -> SourceResult<Option<EegWindow>> {
        if !self.is_streaming() {
            return Err(SourceError::NotStreaming);
        }
        let buffer = self.buffer.lock().map_err(|_| SourceError::Poisoned)?;
        if buffer.len() < len {
            return Ok(None);
        }
        let channels = buffer.current_eeg(len);
        Ok(Some(EegWindow::new(channels, self.sampling_rate())?))
    }
}

impl Drop for SyntheticBoard {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SyntheticBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticBoard")
            .field("board", &self.config.board)
            .field("streaming", &self.is_streaming())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Replay
// ============================================================================

/// Plays a recording back as if it were streaming.
///
/// Each read returns the window at the current position and then advances
/// by `hop` samples. When the next window would run past the end, playback
/// loops back to the start.
#[derive(Debug)]
pub struct ReplaySource {
    recording: Recording,
    hop: usize,
    position: usize,
    loops: usize,
}

impl ReplaySource {
    /// Create a replay source advancing `hop` samples per read
    #[must_use]
    pub fn new(recording: Recording, hop: usize) -> Self {
        Self { recording, hop: hop.max(1), position: 0, loops: 0 }
    }

    /// Hop derived from a wall-clock update interval
    #[must_use]
    pub fn with_interval(recording: Recording, interval: Duration) -> Self {
        let hop = (recording.sample_rate() * interval.as_secs_f64()) as usize;
        Self::new(recording, hop)
    }

    /// Underlying recording
    #[must_use]
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Current sample position
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Times playback has wrapped around
    #[must_use]
    pub fn loops(&self) -> usize {
        self.loops
    }
}

impl EegSource for ReplaySource {
    fn sampling_rate(&self) -> f64 {
        self.recording.sample_rate()
    }

    fn channel_count(&self) -> usize {
        self.recording.channel_count()
    }

    fn describe(&self) -> String {
        let meta = self.recording.metadata();
        format!("{} ({} ch, {} Hz, {:.1}s)", meta.label, meta.channels, meta.sample_rate, meta.duration_secs)
    }

    fn next_window(&mut self, len: usize) -> SourceResult<Option<EegWindow>> {
        let total = self.recording.len();
        if len > total {
            return Err(SourceError::RecordingTooShort { available: total, required: len });
        }
        if self.position + len > total {
            info!("Reached end of recording, looping back to beginning");
            self.position = 0;
            self.loops += 1;
        }

        let window = self
            .recording
            .window(self.position, len)
            .ok_or_else(|| SourceError::Read(format!("window at {} out of range", self.position)))?;
        self.position += self.hop;
        Ok(Some(window))
    }

    fn position_secs(&self) -> Option<f64> {
        Some(self.position as f64 / self.recording.sample_rate())
    }
}
