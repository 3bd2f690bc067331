//! Classifier state published for the UI

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde::Serialize;

use mindmaze_core::{Decision, FrequencyScores};

use crate::processing::ssvep::Detection;

/// Movement history entries kept for display
pub const HISTORY_LEN: usize = 10;

/// Status shared between the worker and the render loop
pub type SharedStatus = Arc<Mutex<ClassifierStatus>>;

/// Latest classifier output and counters.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClassifierStatus {
    /// Source description
    pub source: String,
    /// Scores of the most recent window
    pub latest_scores: FrequencyScores,
    /// Last decision, e.g. `"UP (5Hz, 0.412)"`
    pub current_movement: Option<String>,
    /// Recent decisions as `"HH:MM:SS: UP"`, oldest first
    pub history: VecDeque<String>,
    /// Windows scored
    pub windows_processed: u64,
    /// Windows that produced a decision
    pub decisions: u64,
    /// Source or processing failures
    pub errors: u64,
    /// Most recent failure
    pub last_error: Option<String>,
    /// Playback position for replay sources
    pub position_secs: Option<f64>,
}

impl ClassifierStatus {
    /// Fresh status for a source
    #[must_use]
    pub fn new(source: impl Into<String>, targets: usize) -> Self {
        Self {
            source: source.into(),
            latest_scores: FrequencyScores::zeros(targets),
            ..Self::default()
        }
    }

    /// Wrap for sharing
    #[must_use]
    pub fn shared(self) -> SharedStatus {
        Arc::new(Mutex::new(self))
    }

    /// Record the outcome of one window
    pub fn record_detection(&mut self, detection: &Detection, position_secs: Option<f64>) {
        self.windows_processed += 1;
        self.latest_scores = detection.scores.clone();
        self.position_secs = position_secs;
        if let Some(decision) = &detection.decision {
            self.record_decision(decision);
        }
    }

    /// Record a failed read or scoring step
    pub fn record_error(&mut self, error: impl ToString) {
        self.errors += 1;
        self.last_error = Some(error.to_string());
    }

    /// Current movement label, `"None"` before the first decision
    #[must_use]
    pub fn current_movement_label(&self) -> &str {
        self.current_movement.as_deref().unwrap_or("None")
    }

    fn record_decision(&mut self, decision: &Decision) {
        self.decisions += 1;
        self.current_movement = Some(decision.to_string());

        let timestamp = Local::now().format("%H:%M:%S");
        if self.history.len() >= HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(format!("{timestamp}: {}", decision.direction.name()));
    }
}
