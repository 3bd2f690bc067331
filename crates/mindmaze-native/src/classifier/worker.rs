//! Background classification thread
//!
//! The worker pulls the newest window from an [`EegSource`] on a fixed
//! wall-clock interval, scores it, publishes the scores to a shared
//! [`ClassifierStatus`] and pushes any decision onto the [`MovementQueue`].
//! Read and scoring failures are logged and retried after a back-off; the
//! thread only exits when stopped.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use super::queue::MovementQueue;
use super::status::{ClassifierStatus, SharedStatus};
use crate::bridge::EegSource;
use crate::processing::ssvep::{Detection, SsvepDetector};

/// Worker timing and window length
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerConfig {
    /// Samples per window
    pub window_size: usize,
    /// Time between classifications
    pub update_interval: Duration,
    /// Wait when the source has not filled a window yet
    pub retry_delay: Duration,
    /// Wait after a failed read or scoring step
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            window_size: 1000,
            update_interval: Duration::from_millis(500),
            retry_delay: Duration::from_millis(100),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Outcome of one loop iteration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Processed,
    NotReady,
    Failed,
}

/// Handle to a running classifier thread. Dropping it stops the thread.
pub struct ClassifierWorker {
    status: SharedStatus,
    queue: MovementQueue,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ClassifierWorker {
    /// Start classifying windows from `source`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(
        source: Box<dyn EegSource>,
        detector: SsvepDetector,
        queue: MovementQueue,
        config: WorkerConfig,
    ) -> std::io::Result<Self> {
        Self::spawn_inner(source, detector, queue, config, None)
    }

    /// Like [`ClassifierWorker::spawn`], additionally sending every
    /// detection (with or without a decision) to `observer`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn_observed(
        source: Box<dyn EegSource>,
        detector: SsvepDetector,
        queue: MovementQueue,
        config: WorkerConfig,
        observer: Sender<Detection>,
    ) -> std::io::Result<Self> {
        Self::spawn_inner(source, detector, queue, config, Some(observer))
    }

    fn spawn_inner(
        source: Box<dyn EegSource>,
        detector: SsvepDetector,
        queue: MovementQueue,
        config: WorkerConfig,
        observer: Option<Sender<Detection>>,
    ) -> std::io::Result<Self> {
        let status = ClassifierStatus::new(source.describe(), detector.targets().len()).shared();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let mut worker_loop = WorkerLoop {
            source,
            detector,
            queue: queue.clone(),
            status: SharedStatus::clone(&status),
            observer,
            window_size: config.window_size,
        };

        info!(
            source = %worker_loop.source.describe(),
            window = config.window_size,
            interval_ms = config.update_interval.as_millis() as u64,
            "Classifier worker starting"
        );

        let handle = thread::Builder::new().name("ssvep-classifier".into()).spawn(move || {
            loop {
                let started = Instant::now();
                let wait = match worker_loop.step() {
                    Step::Processed => config.update_interval.saturating_sub(started.elapsed()),
                    Step::NotReady => config.retry_delay,
                    Step::Failed => config.error_backoff,
                };
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Classifier worker stopped");
        })?;

        Ok(Self { status, queue, stop_tx: Some(stop_tx), handle: Some(handle) })
    }

    /// Shared status handle
    #[must_use]
    pub fn status(&self) -> SharedStatus {
        SharedStatus::clone(&self.status)
    }

    /// Copy of the current status
    #[must_use]
    pub fn snapshot(&self) -> ClassifierStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Queue the worker pushes decisions onto
    #[must_use]
    pub fn queue(&self) -> &MovementQueue {
        &self.queue
    }

    /// Whether the thread is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Classifier worker panicked");
            }
        }
    }
}

impl Drop for ClassifierWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ClassifierWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierWorker")
            .field("running", &self.is_running())
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// State owned by the worker thread
struct WorkerLoop {
    source: Box<dyn EegSource>,
    detector: SsvepDetector,
    queue: MovementQueue,
    status: SharedStatus,
    observer: Option<Sender<Detection>>,
    window_size: usize,
}

impl WorkerLoop {
    fn step(&mut self) -> Step {
        let window = match self.source.next_window(self.window_size) {
            Ok(Some(window)) => window,
            Ok(None) => {
                debug!(window = self.window_size, "Waiting for a full window");
                return Step::NotReady;
            }
            Err(e) => {
                warn!(error = %e, "EEG source read failed");
                self.record_error(&e);
                return Step::Failed;
            }
        };

        let detection = match self.detector.classify(&window) {
            Ok(detection) => detection,
            Err(e) => {
                warn!(error = %e, "SSVEP classification failed");
                self.record_error(&e);
                return Step::Failed;
            }
        };

        let position = self.source.position_secs();
        if let Some(decision) = &detection.decision {
            if let Some(evicted) = self.queue.push(decision.direction) {
                debug!(evicted = %evicted, "Movement queue full, dropped oldest");
            }
            info!(
                freq_hz = decision.frequency_hz,
                score = decision.score,
                direction = %decision.direction,
                time_s = position,
                "Movement detected"
            );
        } else {
            debug!(scores = ?detection.scores.as_slice(), "No decision");
        }

        if let Ok(mut status) = self.status.lock() {
            status.record_detection(&detection, position);
        }
        if let Some(observer) = &self.observer {
            // Observer gone means nobody is listening any more
            if observer.send(detection).is_err() {
                self.observer = None;
            }
        }
        Step::Processed
    }

    fn record_error(&self, error: &dyn std::error::Error) {
        if let Ok(mut status) = self.status.lock() {
            status.record_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{SourceError, SourceResult};
    use crate::processing::ssvep::{EegWindow, SsvepConfig};

    /// Returns "not ready" a few times, then constant windows
    struct SlowSource {
        pending: usize,
    }

    impl EegSource for SlowSource {
        fn sampling_rate(&self) -> f64 {
            250.0
        }
        fn channel_count(&self) -> usize {
            8
        }
        fn describe(&self) -> String {
            "slow".into()
        }
        fn next_window(&mut self, len: usize) -> SourceResult<Option<EegWindow>> {
            if self.pending > 0 {
                self.pending -= 1;
                return Ok(None);
            }
            let channels = (0..8)
                .map(|c| (0..len).map(|i| ((i * (c + 3)) % 17) as f64).collect())
                .collect();
            Ok(Some(EegWindow::new(channels, 250.0).map_err(SourceError::from)?))
        }
    }

    /// Every other window carries a NaN, built without validation
    struct CorruptSource {
        calls: usize,
    }

    impl EegSource for CorruptSource {
        fn sampling_rate(&self) -> f64 {
            250.0
        }
        fn channel_count(&self) -> usize {
            8
        }
        fn describe(&self) -> String {
            "corrupt".into()
        }
        fn next_window(&mut self, len: usize) -> SourceResult<Option<EegWindow>> {
            self.calls += 1;
            let mut channels: Vec<Vec<f64>> = (0..8)
                .map(|c| (0..len).map(|i| ((i * (c + 3)) % 17) as f64).collect())
                .collect();
            if self.calls % 2 == 1 {
                channels[7][len / 2] = f64::NAN;
            }
            Ok(Some(EegWindow { channels, sample_rate: 250.0 }))
        }
    }

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            window_size: 500,
            update_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(5),
            error_backoff: Duration::from_millis(5),
        }
    }

    fn wait_for(worker: &ClassifierWorker, pred: impl Fn(&ClassifierStatus) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if pred(&worker.snapshot()) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_retries_until_window_ready() {
        let detector = SsvepDetector::new(SsvepConfig::default(), 250.0).unwrap();
        let mut worker = ClassifierWorker::spawn(
            Box::new(SlowSource { pending: 3 }),
            detector,
            MovementQueue::default(),
            fast_config(),
        )
        .unwrap();

        assert!(wait_for(&worker, |s| s.windows_processed >= 2));
        let status = worker.snapshot();
        assert_eq!(status.source, "slow");
        assert_eq!(status.errors, 0);
        assert!(status.latest_scores.iter().all(|s| (0.0..=1.0).contains(&s)));

        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_nan_window_is_an_error_not_a_hang() {
        let detector = SsvepDetector::new(SsvepConfig::default(), 250.0).unwrap();
        let mut worker = ClassifierWorker::spawn(
            Box::new(CorruptSource { calls: 0 }),
            detector,
            MovementQueue::default(),
            fast_config(),
        )
        .unwrap();

        assert!(wait_for(&worker, |s| s.errors >= 2 && s.windows_processed >= 2));
        assert!(worker.is_running());
        let status = worker.snapshot();
        assert!(status.last_error.unwrap().contains("Non-finite"));

        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn test_observer_sees_every_window() {
        let detector = SsvepDetector::new(SsvepConfig::default(), 250.0).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = ClassifierWorker::spawn_observed(
            Box::new(SlowSource { pending: 0 }),
            detector,
            MovementQueue::default(),
            fast_config(),
            tx,
        )
        .unwrap();

        let detection = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(detection.scores.len(), 4);
        drop(worker);
    }
}
