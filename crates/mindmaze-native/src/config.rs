//! TOML configuration
//!
//! Every section and field is optional; anything missing takes the value
//! used by the live-board game.
//!
//! ```toml
//! [classifier]
//! window_size = 1000
//! threshold = 0.3
//!
//! [filter]
//! low_hz = 5.0
//! high_hz = 30.0
//!
//! [channels]
//! selection = [0, 4, 7]   # or "posterior"
//!
//! [source]
//! kind = "replay"
//! recording = "session.csv"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use mindmaze_core::StimulusTarget;

use crate::bridge::{BoardId, SyntheticBoardConfig};
use crate::classifier::WorkerConfig;
use crate::game::GameLayout;
use crate::processing::cca::MIN_ROWS;
use crate::processing::ssvep::{ChannelSelection, SsvepConfig};
use crate::simulation::SyntheticParams;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Values parse but make no sense together
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Classifier loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Samples per CCA window
    pub window_size: usize,
    /// Decision threshold (strictly greater wins)
    pub threshold: f64,
    /// Time between classifications (ms)
    pub update_interval_ms: u64,
    /// Wait when the source has too few samples (ms)
    pub retry_delay_ms: u64,
    /// Wait after an error (ms)
    pub error_backoff_ms: u64,
    /// Pending movements before the oldest is dropped
    pub queue_capacity: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            threshold: 0.3,
            update_interval_ms: 500,
            retry_delay_ms: 100,
            error_backoff_ms: 1000,
            queue_capacity: 8,
        }
    }
}

/// Band-pass settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Low cutoff (Hz)
    pub low_hz: f64,
    /// High cutoff (Hz)
    pub high_hz: f64,
    /// Butterworth order
    pub order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { low_hz: 5.0, high_hz: 30.0, order: 4 }
    }
}

/// Named channel subsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelPreset {
    /// Last three channels
    Posterior,
}

/// `[0, 4, 7]` or `"posterior"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSpec {
    /// Fixed indices into the EEG rows
    Indices(Vec<usize>),
    /// Named subset
    Preset(ChannelPreset),
}

impl From<&ChannelSpec> for ChannelSelection {
    fn from(spec: &ChannelSpec) -> Self {
        match spec {
            ChannelSpec::Indices(indices) => Self::Explicit(indices.clone()),
            ChannelSpec::Preset(ChannelPreset::Posterior) => Self::Posterior,
        }
    }
}

/// Channel subset settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Subset fed to the CCA. When absent, replay uses the posterior
    /// policy and live boards use `[0, 4, 7]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<ChannelSpec>,
}

impl ChannelsConfig {
    /// Detector channel selection for a source kind
    #[must_use]
    pub fn selection(&self, kind: SourceKind) -> ChannelSelection {
        match &self.selection {
            Some(spec) => spec.into(),
            None if kind == SourceKind::Replay => ChannelSelection::Posterior,
            None => ChannelSelection::live_default(),
        }
    }
}

/// Window and maze settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Window width (px)
    pub width: u32,
    /// Window height (px)
    pub height: u32,
    /// Maze cell edge (px)
    pub cell_size: u32,
    /// Border holding the stimuli (px)
    pub border: u32,
    /// Target frame rate
    pub fps: u32,
    /// Fixed maze seed; random when absent
    pub maze_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        let layout = GameLayout::default();
        Self {
            width: layout.width,
            height: layout.height,
            cell_size: layout.cell_size,
            border: layout.border,
            fps: 60,
            maze_seed: None,
        }
    }
}

impl GameConfig {
    /// Screen geometry
    #[must_use]
    pub fn layout(&self) -> GameLayout {
        GameLayout { width: self.width, height: self.height, cell_size: self.cell_size, border: self.border }
    }
}

/// Where EEG comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Streaming synthetic board
    #[default]
    Synthetic,
    /// Recording played back from disk
    Replay,
    /// No classifier, arrow keys only
    Keyboard,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "replay" => Ok(Self::Replay),
            "keyboard" => Ok(Self::Keyboard),
            other => Err(ConfigError::Invalid(format!("unknown source '{other}'"))),
        }
    }
}

/// EEG source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source kind
    pub kind: SourceKind,
    /// Board layout for the synthetic source
    pub board: BoardId,
    /// CSV recording for replay
    pub recording: Option<PathBuf>,
    /// Replay advance per read (ms); defaults to the update interval
    pub hop_ms: Option<u64>,
    /// Apply a broadband filter to recordings on load
    pub prefilter: bool,
    /// Broadband filter low cutoff (Hz)
    pub prefilter_low_hz: f64,
    /// Broadband filter high cutoff (Hz)
    pub prefilter_high_hz: f64,
    /// Length of the generated fallback recording (s)
    pub synthetic_seconds: f64,
    /// Seconds each synthetic stimulus stays attended on the board
    pub segment_secs: f64,
    /// Synthetic SSVEP amplitude (µV)
    pub signal_uv: f64,
    /// Seed for synthetic data
    pub seed: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            board: BoardId::Synthetic,
            recording: None,
            hop_ms: None,
            prefilter: true,
            prefilter_low_hz: 1.0,
            prefilter_high_hz: 50.0,
            synthetic_seconds: 300.0,
            segment_secs: 5.0,
            signal_uv: 3.0,
            seed: 42,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MindMazeConfig {
    /// Classifier loop
    pub classifier: ClassifierConfig,
    /// Band-pass
    pub filter: FilterConfig,
    /// Channel subset
    pub channels: ChannelsConfig,
    /// Stimulus targets in score order
    pub targets: Vec<StimulusTarget>,
    /// Game window
    pub game: GameConfig,
    /// EEG source
    pub source: SourceConfig,
}

impl Default for MindMazeConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            filter: FilterConfig::default(),
            channels: ChannelsConfig::default(),
            targets: StimulusTarget::default_set().to_vec(),
            game: GameConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl MindMazeConfig {
    /// Read and validate a config file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or fails
    /// [`MindMazeConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if given and usable, otherwise fall back to defaults
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Using default config");
                Self::default()
            }
        }
    }

    /// Parse from a TOML string
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|source| ConfigError::Parse { path: PathBuf::from("<string>"), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        let c = &self.classifier;
        if c.window_size < MIN_ROWS {
            return Err(invalid(format!("classifier.window_size must be at least {MIN_ROWS}")));
        }
        if !(0.0..1.0).contains(&c.threshold) {
            return Err(invalid("classifier.threshold must be in [0, 1)"));
        }
        if c.update_interval_ms == 0 {
            return Err(invalid("classifier.update_interval_ms must be positive"));
        }
        if self.targets.is_empty() {
            return Err(invalid("at least one target is required"));
        }
        if let Some(t) = self.targets.iter().find(|t| !(t.frequency_hz > 0.0)) {
            return Err(invalid(format!("target frequency {} must be positive", t.frequency_hz)));
        }
        let f = &self.filter;
        if !(f.low_hz > 0.0 && f.low_hz < f.high_hz) {
            return Err(invalid("filter needs 0 < low_hz < high_hz"));
        }
        if f.order == 0 {
            return Err(invalid("filter.order must be at least 1"));
        }
        if matches!(&self.channels.selection, Some(ChannelSpec::Indices(i)) if i.is_empty()) {
            return Err(invalid("channels.selection must not be empty"));
        }
        if self.game.fps == 0 || self.game.cell_size == 0 {
            return Err(invalid("game.fps and game.cell_size must be positive"));
        }
        Ok(())
    }

    /// Detector settings
    #[must_use]
    pub fn ssvep_config(&self) -> SsvepConfig {
        SsvepConfig {
            targets: self.targets.clone(),
            threshold: self.classifier.threshold,
            low_hz: self.filter.low_hz,
            high_hz: self.filter.high_hz,
            filter_order: self.filter.order,
            channels: self.channels.selection(self.source.kind),
        }
    }

    /// Detector settings for a source with `available` EEG channels.
    ///
    /// An unset selection that does not fit falls back to the posterior
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an explicit selection names a
    /// channel the source does not have.
    pub fn ssvep_config_for(&self, available: usize) -> ConfigResult<SsvepConfig> {
        let mut config = self.ssvep_config();
        if let Err(e) = config.channels.resolve(available) {
            if self.channels.selection.is_some() {
                return Err(invalid(format!("channels.selection does not fit a {available}-channel source: {e}")));
            }
            warn!(available, "Default channels do not fit the source, using the posterior policy");
            config.channels = ChannelSelection::Posterior;
        }
        Ok(config)
    }

    /// Worker timing
    #[must_use]
    pub fn worker_config(&self) -> WorkerConfig {
        let c = &self.classifier;
        WorkerConfig {
            window_size: c.window_size,
            update_interval: Duration::from_millis(c.update_interval_ms),
            retry_delay: Duration::from_millis(c.retry_delay_ms),
            error_backoff: Duration::from_millis(c.error_backoff_ms),
        }
    }

    /// Replay advance per read
    #[must_use]
    pub fn replay_hop(&self) -> Duration {
        Duration::from_millis(self.source.hop_ms.unwrap_or(self.classifier.update_interval_ms))
    }

    /// Synthetic signal settings, cycling through the configured targets
    #[must_use]
    pub fn synthetic_params(&self) -> SyntheticParams {
        SyntheticParams {
            frequencies: self.targets.iter().map(|t| t.frequency_hz).collect(),
            segment_secs: self.source.segment_secs,
            signal_uv: self.source.signal_uv,
            ..SyntheticParams::default()
        }
    }

    /// Synthetic board settings
    #[must_use]
    pub fn board_config(&self) -> SyntheticBoardConfig {
        let defaults = SyntheticBoardConfig::default();
        SyntheticBoardConfig {
            board: self.source.board,
            signal: SyntheticParams {
                harmonic_ratio: defaults.signal.harmonic_ratio,
                ..self.synthetic_params()
            },
            seed: self.source.seed,
            ..defaults
        }
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmaze_core::Direction;

    #[test]
    fn test_empty_file_is_default() {
        let config = MindMazeConfig::from_toml_str("").unwrap();
        assert_eq!(config, MindMazeConfig::default());
        assert_eq!(config.classifier.window_size, 1000);
        assert_eq!(config.ssvep_config(), SsvepConfig::default());
        assert_eq!(config.worker_config(), WorkerConfig::default());
        assert_eq!(config.game.layout(), GameLayout::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = MindMazeConfig::from_toml_str(
            r#"
            [classifier]
            threshold = 0.2
            update_interval_ms = 1000

            [filter]
            low_hz = 3.0
            high_hz = 40.0

            [channels]
            selection = "posterior"

            [source]
            kind = "replay"
            recording = "eeg.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.classifier.threshold, 0.2);
        assert_eq!(config.classifier.window_size, 1000);
        assert_eq!(config.filter.order, 4);
        assert_eq!(config.ssvep_config().channels, ChannelSelection::Posterior);
        assert_eq!(config.source.kind, SourceKind::Replay);
        assert_eq!(config.replay_hop(), Duration::from_millis(1000));
    }

    #[test]
    fn test_custom_targets() {
        let config = MindMazeConfig::from_toml_str(
            r#"
            [[targets]]
            frequency_hz = 7.5
            direction = "up"
            shape = "circle"
            color = [255, 255, 0]

            [[targets]]
            frequency_hz = 12.0
            direction = "down"
            shape = "triangle"
            color = [0, 255, 255]
            "#,
        )
        .unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[1].direction, Direction::Down);
        assert_eq!(config.synthetic_params().frequencies, vec![7.5, 12.0]);
    }

    #[test]
    fn test_validation() {
        let bad = [
            "[classifier]\nwindow_size = 5",
            "[classifier]\nthreshold = 1.0",
            "[filter]\nlow_hz = 30.0\nhigh_hz = 5.0",
            "[channels]\nselection = []",
            "targets = []",
        ];
        for text in bad {
            assert!(
                matches!(MindMazeConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "accepted: {text}"
            );
        }
        assert!(matches!(
            MindMazeConfig::from_toml_str("[classifier]\nthreshold = \"high\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_channel_selection_forms() {
        let config = MindMazeConfig::from_toml_str("[channels]\nselection = [1, 2]").unwrap();
        assert_eq!(config.channels.selection, Some(ChannelSpec::Indices(vec![1, 2])));
        assert_eq!(config.ssvep_config().channels, ChannelSelection::Explicit(vec![1, 2]));
        let text = config.to_toml_string().unwrap();
        assert_eq!(MindMazeConfig::from_toml_str(&text).unwrap(), config);

        let config = MindMazeConfig::from_toml_str("[channels]\nselection = \"posterior\"").unwrap();
        assert_eq!(config.channels.selection, Some(ChannelSpec::Preset(ChannelPreset::Posterior)));

        assert!(matches!(
            MindMazeConfig::from_toml_str("[channels]\nselection = \"frontal\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_unset_channels_follow_the_source() {
        let mut config = MindMazeConfig::default();
        assert_eq!(config.ssvep_config().channels, ChannelSelection::live_default());

        config.source.kind = SourceKind::Replay;
        assert_eq!(config.ssvep_config().channels, ChannelSelection::Posterior);
        assert_eq!(config.ssvep_config_for(4).unwrap().channels, ChannelSelection::Posterior);

        // A four-channel board cannot take the live default
        config.source.kind = SourceKind::Synthetic;
        assert_eq!(config.ssvep_config_for(8).unwrap().channels, ChannelSelection::live_default());
        assert_eq!(config.ssvep_config_for(4).unwrap().channels, ChannelSelection::Posterior);
    }

    #[test]
    fn test_explicit_channels_must_fit_the_source() {
        let mut config = MindMazeConfig::from_toml_str("[channels]\nselection = [0, 4, 7]").unwrap();
        config.source.kind = SourceKind::Replay;
        assert!(matches!(config.ssvep_config_for(4), Err(ConfigError::Invalid(_))));
        assert_eq!(config.ssvep_config_for(8).unwrap().channels, ChannelSelection::live_default());
    }

    #[test]
    fn test_toml_roundtrip_and_fallback() {
        let config = MindMazeConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(MindMazeConfig::from_toml_str(&text).unwrap(), config);

        let missing = MindMazeConfig::load_or_default(Some(Path::new("/nonexistent/mindmaze.toml")));
        assert_eq!(missing, MindMazeConfig::default());
    }

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!("Replay".parse::<SourceKind>().unwrap(), SourceKind::Replay);
        assert!("tape".parse::<SourceKind>().is_err());
    }
}
