//! Core types for MindMaze
//!
//! This module provides the types shared by the classifier and the game:
//! - Movement directions on the maze grid
//! - Flickering stimulus targets (frequency, shape, colour, direction)
//! - EEG channel identifiers following the 10-20 system
//! - Per-target CCA score vectors and the resulting decision

use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Directions
// ============================================================================

/// A single-cell move on the maze grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards row 0
    Up,
    /// Towards the last column
    Right,
    /// Towards the last row
    Down,
    /// Towards column 0
    Left,
}

impl Direction {
    /// All directions in stimulus order (top, right, bottom, left)
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Grid offset `(dx, dy)` for this direction
    #[inline]
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// Upper-case label used in logs and the move history
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Right => "RIGHT",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Stimulus Targets
// ============================================================================

/// Shape drawn for a flickering stimulus.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusShape {
    /// Filled circle
    Circle,
    /// Axis-aligned square
    Square,
    /// Upward-pointing triangle
    Triangle,
    /// Square rotated by 45°
    Diamond,
}

impl StimulusShape {
    /// Shape name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Circle => "Circle",
            Self::Square => "Square",
            Self::Triangle => "Triangle",
            Self::Diamond => "Diamond",
        }
    }
}

/// A flickering visual target and the movement it stands for.
///
/// Looking at a target flickering at `frequency_hz` evokes an SSVEP at the
/// same frequency (and its harmonics) over the visual cortex.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StimulusTarget {
    /// Flicker frequency in Hz
    pub frequency_hz: f64,
    /// Movement issued when this target is detected
    pub direction: Direction,
    /// Shape drawn on screen
    pub shape: StimulusShape,
    /// RGB colour
    pub color: [u8; 3],
}

impl StimulusTarget {
    /// Yellow
    pub const YELLOW: [u8; 3] = [255, 255, 0];
    /// Magenta
    pub const MAGENTA: [u8; 3] = [255, 0, 255];
    /// Cyan
    pub const CYAN: [u8; 3] = [0, 255, 255];
    /// Orange
    pub const ORANGE: [u8; 3] = [255, 165, 0];

    /// Create a new target
    #[must_use]
    pub const fn new(
        frequency_hz: f64,
        direction: Direction,
        shape: StimulusShape,
        color: [u8; 3],
    ) -> Self {
        Self { frequency_hz, direction, shape, color }
    }

    /// The four targets of the live game, in top/right/bottom/left order.
    #[must_use]
    pub const fn default_set() -> [Self; 4] {
        [
            Self::new(5.0, Direction::Up, StimulusShape::Circle, Self::YELLOW),
            Self::new(10.0, Direction::Right, StimulusShape::Square, Self::MAGENTA),
            Self::new(15.0, Direction::Down, StimulusShape::Triangle, Self::CYAN),
            Self::new(20.0, Direction::Left, StimulusShape::Diamond, Self::ORANGE),
        ]
    }

    /// Flicker half-period in milliseconds (time between visibility toggles)
    #[inline]
    #[must_use]
    pub fn toggle_interval_ms(&self) -> f64 {
        1000.0 / self.frequency_hz
    }
}

// ============================================================================
// EEG Channels (10-20 System)
// ============================================================================

/// Standard 10-20 electrode positions recognised in recordings.
///
/// The order matches the preference order used when picking EEG channels
/// from a recording with more than eight channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum EegChannel {
    Fp1 = 0,
    Fp2,
    F3,
    F4,
    C3,
    C4,
    P3,
    P4,
    O1,
    O2,
    F7,
    F8,
    T3,
    T4,
    T5,
    T6,
    Fz,
    Cz,
    Pz,
}

impl EegChannel {
    /// All channels in preference order
    pub const ALL: [Self; 19] = [
        Self::Fp1, Self::Fp2, Self::F3, Self::F4, Self::C3, Self::C4,
        Self::P3, Self::P4, Self::O1, Self::O2, Self::F7, Self::F8,
        Self::T3, Self::T4, Self::T5, Self::T6, Self::Fz, Self::Cz, Self::Pz,
    ];

    /// Get the 10-20 system name for this channel
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fp1 => "Fp1",
            Self::Fp2 => "Fp2",
            Self::F3 => "F3",
            Self::F4 => "F4",
            Self::C3 => "C3",
            Self::C4 => "C4",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::O1 => "O1",
            Self::O2 => "O2",
            Self::F7 => "F7",
            Self::F8 => "F8",
            Self::T3 => "T3",
            Self::T4 => "T4",
            Self::T5 => "T5",
            Self::T6 => "T6",
            Self::Fz => "Fz",
            Self::Cz => "Cz",
            Self::Pz => "Pz",
        }
    }

    /// Look up a channel by its 10-20 name (exact match)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ch| ch.name() == name)
    }

    /// Whether the electrode sits over the visual cortex
    #[inline]
    #[must_use]
    pub const fn is_occipital(self) -> bool {
        matches!(self, Self::O1 | Self::O2)
    }
}

// ============================================================================
// Scores and Decisions
// ============================================================================

/// One CCA score per stimulus target, in target order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyScores {
    scores: Vec<f64>,
}

impl FrequencyScores {
    /// Wrap a score vector
    #[must_use]
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }

    /// Copy scores from a slice
    #[must_use]
    pub fn from_slice(scores: &[f64]) -> Self {
        Self { scores: scores.to_vec() }
    }

    /// All-zero scores for `count` targets
    #[must_use]
    pub fn zeros(count: usize) -> Self {
        Self { scores: alloc::vec![0.0; count] }
    }

    /// Number of scores
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// True when there are no scores
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score for target `index`
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.scores.get(index).copied()
    }

    /// Iterate over scores in target order
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }

    /// Borrow the raw scores
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    /// Arg-max over the scores.
    ///
    /// NaN scores are skipped and the first index wins ties. Returns `None`
    /// when no finite score exists.
    #[must_use]
    pub fn best(&self) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &s) in self.scores.iter().enumerate() {
            if s.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if s <= b => {}
                _ => best = Some((i, s)),
            }
        }
        best
    }
}

/// A thresholded classification result for a single window.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Index of the winning target
    pub target_index: usize,
    /// Frequency of the winning target in Hz
    pub frequency_hz: f64,
    /// Winning CCA score
    pub score: f64,
    /// Movement issued
    pub direction: Direction,
}

impl Decision {
    /// Apply the threshold rule to a score vector.
    ///
    /// Returns a decision only when the arg-max score is strictly greater
    /// than `threshold`.
    #[must_use]
    pub fn from_scores(
        scores: &FrequencyScores,
        targets: &[StimulusTarget],
        threshold: f64,
    ) -> Option<Self> {
        let (index, score) = scores.best()?;
        let target = targets.get(index)?;
        (score > threshold).then_some(Self {
            target_index: index,
            frequency_hz: target.frequency_hz,
            score,
            direction: target.direction,
        })
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}Hz, {:.3})", self.direction, self.frequency_hz, self.score)
    }
}

// ============================================================================
// Tests
// ============================================================================
