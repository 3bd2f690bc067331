//! EEG recordings on disk
//!
//! A recording is stored as CSV: `#` comment lines carrying metadata
//! (`sample_rate=<hz>`, `label=<text>`), a header line of channel names,
//! then one row per sample.
//!
//! ```text
//! # sample_rate=250
//! # label=Synthetic SSVEP Data
//! Fp1,Fp2,C3,C4,P3,P4,O1,O2
//! -3.120000,4.800000,...
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use mindmaze_core::{EegChannel, ProcessingError};

use crate::bridge::streaming::BrainFlowFormat;
use crate::bridge::BoardId;
use crate::processing::filters::{BandpassFilter, FilterError};
use crate::processing::ssvep::EegWindow;
use crate::simulation::{SsvepSimulator, SyntheticParams};

/// Maximum channels kept by [`Recording::pick_eeg_channels`]
pub const MAX_EEG_CHANNELS: usize = 8;

/// Errors while reading, writing or preparing a recording.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// File could not be opened, read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV structure, e.g. a row with the wrong field count
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: csv::Error,
    },

    /// Value that is not a number
    #[error("line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// No `sample_rate=` metadata line
    #[error("missing '# sample_rate=<hz>' line")]
    MissingSampleRate,

    /// Header present but no sample rows, or no header at all
    #[error("recording has no samples")]
    Empty,

    /// Inconsistent channel data
    #[error(transparent)]
    Shape(#[from] ProcessingError),

    /// Pre-filtering failed
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Summary shown in the data info panel and by `inspect`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// File name or label
    pub label: String,
    /// Channel count
    pub channels: usize,
    /// Sample rate (Hz)
    pub sample_rate: f64,
    /// Duration (s)
    pub duration_secs: f64,
    /// First few channel names, comma separated
    pub channel_names: String,
}

impl RecordingMetadata {
    /// `(key, value)` lines in display order
    #[must_use]
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("File", self.label.clone()),
            ("Channels", self.channels.to_string()),
            ("Sample Rate", format!("{} Hz", self.sample_rate)),
            ("Duration", format!("{:.1}s", self.duration_secs)),
            ("Ch Names", self.channel_names.clone()),
        ]
    }
}

/// Multichannel EEG held in memory, channels × samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Recording {
    sample_rate: f64,
    channel_names: Vec<String>,
    data: Vec<Vec<f64>>,
    label: String,
}

impl Recording {
    /// Build a recording.
    ///
    /// # Errors
    ///
    /// Fails on a bad sample rate, rows of different lengths, or a name
    /// count that does not match the row count.
    pub fn new(
        sample_rate: f64,
        channel_names: Vec<String>,
        data: Vec<Vec<f64>>,
        label: impl Into<String>,
    ) -> RecordingResult<Self> {
        // Reuses the window shape checks
        let window = EegWindow::new(data, sample_rate)?;
        if channel_names.len() != window.channel_count() {
            return Err(ProcessingError::ShapeMismatch {
                left_rows: channel_names.len(),
                right_rows: window.channel_count(),
            }
            .into());
        }
        Ok(Self { sample_rate, channel_names, data: window.channels, label: label.into() })
    }

    /// Generate the demonstration recording: background EEG with each
    /// frequency of `params` attended for an equal share of `seconds`.
    #[must_use]
    pub fn synthetic_ssvep(params: &SyntheticParams, seconds: f64, seed: u64) -> Self {
        let n_samples = (seconds * params.sample_rate) as usize;
        let segments = params.frequencies.len().max(1);
        let params = SyntheticParams { segment_secs: seconds / segments as f64, ..params.clone() };

        let mut sim = SsvepSimulator::new(params.clone(), seed);
        let data = sim.generate(n_samples);

        let names = if params.channel_count == BoardId::Synthetic.eeg_channels() {
            BrainFlowFormat::for_board(BoardId::Synthetic).eeg_names().to_vec()
        } else {
            (1..=params.channel_count).map(|i| format!("EEG_{i}")).collect()
        };

        info!(
            samples = n_samples,
            channels = params.channel_count,
            frequencies = ?params.frequencies,
            "Generated synthetic SSVEP recording"
        );

        Self {
            sample_rate: params.sample_rate,
            channel_names: names,
            data,
            label: "Synthetic SSVEP Data".to_string(),
        }
    }

    /// Read a recording from a CSV file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a parse error
    /// describing the first malformed line.
    pub fn load_csv(path: impl AsRef<Path>) -> RecordingResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RecordingError::Io { path: path.to_path_buf(), source })?;
        let mut recording = Self::read_csv(BufReader::new(file), path)?;
        if recording.label.is_empty() {
            recording.label = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        }
        info!(
            path = %path.display(),
            channels = recording.channel_count(),
            samples = recording.len(),
            sample_rate = recording.sample_rate,
            "Loaded recording"
        );
        Ok(recording)
    }

    /// Parse CSV from any reader; `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// See [`Recording::load_csv`].
    pub fn read_csv<R: Read>(mut reader: R, origin: &Path) -> RecordingResult<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| RecordingError::Io { path: origin.to_path_buf(), source })?;

        let mut sample_rate = None;
        let mut label = String::new();
        for (i, line) in text.lines().enumerate() {
            let Some((key, value)) = line.trim().strip_prefix('#').and_then(|c| c.split_once('=')) else {
                continue;
            };
            match key.trim() {
                "sample_rate" => {
                    let rate = value.trim().parse::<f64>().map_err(|e| RecordingError::Parse {
                        line: i + 1,
                        reason: format!("bad sample rate '{}': {e}", value.trim()),
                    })?;
                    sample_rate = Some(rate);
                }
                "label" => label = value.trim().to_string(),
                other => debug!(key = other, "Ignoring recording metadata"),
            }
        }

        let csv_err = |source| RecordingError::Csv { path: origin.to_path_buf(), source };
        let mut rows = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let names: Vec<String> = rows.headers().map_err(csv_err)?.iter().map(str::to_string).collect();
        if names.is_empty() {
            return Err(RecordingError::Empty);
        }

        let mut data: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
        for record in rows.records() {
            let record = record.map_err(csv_err)?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            for (field, row) in record.iter().zip(data.iter_mut()) {
                let value = field.parse::<f64>().map_err(|e| RecordingError::Parse {
                    line,
                    reason: format!("bad value '{field}': {e}"),
                })?;
                if !value.is_finite() {
                    return Err(RecordingError::Parse { line, reason: format!("non-finite value '{field}'") });
                }
                row.push(value);
            }
        }

        if data.first().map_or(true, Vec::is_empty) {
            return Err(RecordingError::Empty);
        }
        let sample_rate = sample_rate.ok_or(RecordingError::MissingSampleRate)?;
        Self::new(sample_rate, names, data, label)
    }

    /// Write the recording as CSV
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> RecordingResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| RecordingError::Io { path: path.to_path_buf(), source })?;
        self.write_csv(BufWriter::new(file))
            .map_err(|source| RecordingError::Csv { path: path.to_path_buf(), source })?;

        info!(path = %path.display(), samples = self.len(), "Saved recording");
        Ok(())
    }

    /// Write CSV to any writer
    ///
    /// # Errors
    ///
    /// Propagates writer errors.
    pub fn write_csv<W: Write>(&self, mut out: W) -> csv::Result<()> {
        writeln!(out, "# sample_rate={}", self.sample_rate)?;
        if !self.label.is_empty() {
            writeln!(out, "# label={}", self.label)?;
        }

        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&self.channel_names)?;
        for s in 0..self.len() {
            writer.write_record(self.data.iter().map(|ch| format!("{:.6}", ch[s])))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Keep at most eight EEG channels.
    ///
    /// Channels named after 10-20 positions are preferred (in 10-20
    /// preference order) and kept in file order; without any recognised
    /// names the first eight channels are used.
    pub fn pick_eeg_channels(&mut self) {
        let mut preferred: Vec<usize> = EegChannel::ALL
            .iter()
            .filter_map(|ch| self.channel_names.iter().position(|n| n == ch.name()))
            .take(MAX_EEG_CHANNELS)
            .collect();

        let keep = if preferred.is_empty() {
            (0..self.channel_count().min(MAX_EEG_CHANNELS)).collect()
        } else {
            preferred.sort_unstable();
            preferred
        };

        if keep.len() == self.channel_count() {
            return;
        }
        debug!(kept = ?keep, "Picking EEG channels");
        self.channel_names = keep.iter().map(|&i| self.channel_names[i].clone()).collect();
        self.data = keep.iter().map(|&i| std::mem::take(&mut self.data[i])).collect();
    }

    /// Broadband clean-up filter applied once after loading.
    ///
    /// # Errors
    ///
    /// Fails if the passband does not fit the sample rate or the recording
    /// is too short for zero-phase filtering.
    pub fn prefilter(&mut self, low_hz: f64, high_hz: f64) -> RecordingResult<()> {
        let filter = BandpassFilter::new(4, self.sample_rate, low_hz, high_hz)?;
        filter.filter_channels(&mut self.data)?;
        debug!(low_hz, high_hz, "Pre-filtered recording");
        Ok(())
    }

    /// Copy `len` samples starting at `start`, or `None` past the end
    #[must_use]
    pub fn window(&self, start: usize, len: usize) -> Option<EegWindow> {
        let end = start.checked_add(len)?;
        if end > self.len() {
            return None;
        }
        Some(EegWindow {
            channels: self.data.iter().map(|ch| ch[start..end].to_vec()).collect(),
            sample_rate: self.sample_rate,
        })
    }

    /// Summary for display
    #[must_use]
    pub fn metadata(&self) -> RecordingMetadata {
        let mut channel_names = self.channel_names.iter().take(4).cloned().collect::<Vec<_>>().join(", ");
        if self.channel_count() > 4 {
            channel_names.push_str("...");
        }
        RecordingMetadata {
            label: self.label.clone(),
            channels: self.channel_count(),
            sample_rate: self.sample_rate,
            duration_secs: self.duration_secs(),
            channel_names,
        }
    }

    /// Sample rate (Hz)
    #[must_use]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Channel names in row order
    #[must_use]
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Channel rows
    #[must_use]
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// Label or file name
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of channels
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.data.len()
    }

    /// Samples per channel
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// True when there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }
}
