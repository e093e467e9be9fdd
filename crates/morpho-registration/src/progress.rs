//! Progress tracking and callbacks for registration workflows.
//!
//! The problem adapter reports every cost evaluation and the engine
//! reports the start and end of every pyramid level.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Information about one cost evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationInfo {
    /// Pyramid level, 0 is full resolution.
    pub level: usize,
    /// Optimization pass on the level, incremented by every refinement.
    pub pass: usize,
    /// Number of cost evaluations in the current epoch.
    pub func_evals: usize,
    /// Number of gradient evaluations in the current epoch.
    pub grad_evals: usize,
    /// Cost including the transformation's energy penalty.
    pub cost: f64,
    /// Cost relative to the first cost of the epoch.
    pub ratio: f64,
    /// Degrees of freedom of the transformation.
    pub degrees_of_freedom: usize,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

/// Information about one pyramid level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelInfo {
    /// Pyramid level, 0 is full resolution.
    pub level: usize,
    /// Total number of levels.
    pub levels: usize,
    /// Working grid extents.
    pub size: Vec<usize>,
    /// Degrees of freedom when the level started or finished.
    pub degrees_of_freedom: usize,
    /// Number of successful refinements, set when the level finished.
    pub refinements: usize,
}

/// Progress callback trait for monitoring registration progress.
pub trait ProgressCallback: Send + Sync {
    /// Called after every cost evaluation.
    fn on_evaluation(&self, info: &EvaluationInfo);

    /// Called when a pyramid level starts.
    fn on_level_start(&self, _info: &LevelInfo) {}

    /// Called when a pyramid level is done.
    fn on_level_complete(&self, _info: &LevelInfo) {}

    /// Called when registration starts.
    fn on_start(&self) {}

    /// Called when registration completes successfully.
    fn on_complete(&self, _elapsed: Duration) {}

    /// Called when registration fails.
    fn on_error(&self, _error: &str) {}
}

/// Console progress callback that logs to tracing.
#[derive(Debug, Clone)]
pub struct ConsoleProgressCallback {
    /// Log interval (evaluations).
    pub log_interval: usize,
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl ConsoleProgressCallback {
    /// Create a new console progress callback.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
        }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_evaluation(&self, info: &EvaluationInfo) {
        let count = info.func_evals + info.grad_evals;
        if count % self.log_interval == 0 {
            tracing::info!(
                "Level {} [{}|{}] cost: {:.6} ratio: {:.4} ({} dof, {:.2}s)",
                info.level,
                info.func_evals,
                info.grad_evals,
                info.cost,
                info.ratio,
                info.degrees_of_freedom,
                info.elapsed.as_secs_f64()
            );
        }
    }

    fn on_level_start(&self, info: &LevelInfo) {
        tracing::info!(
            "Start level {} of {} at size {:?} with {} parameters",
            info.levels - info.level,
            info.levels,
            info.size,
            info.degrees_of_freedom
        );
    }

    fn on_level_complete(&self, info: &LevelInfo) {
        tracing::info!(
            "Level {} done after {} refinements ({} parameters)",
            info.level,
            info.refinements,
            info.degrees_of_freedom
        );
    }

    fn on_start(&self) {
        tracing::info!("Registration started");
    }

    fn on_complete(&self, elapsed: Duration) {
        tracing::info!("Registration completed in {:.2}s", elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &str) {
        tracing::error!("Registration failed: {}", error);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// History callback that records all evaluations and levels.
#[derive(Debug, Clone, Default)]
pub struct HistoryCallback {
    evaluations: Arc<Mutex<Vec<EvaluationInfo>>>,
    levels: Arc<Mutex<Vec<LevelInfo>>>,
}

impl HistoryCallback {
    /// Create a new history callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the recorded evaluations.
    pub fn get_history(&self) -> Vec<EvaluationInfo> {
        lock(&self.evaluations).clone()
    }

    /// Get the recorded completed levels.
    pub fn get_levels(&self) -> Vec<LevelInfo> {
        lock(&self.levels).clone()
    }

    /// Clear the history.
    pub fn clear(&self) {
        lock(&self.evaluations).clear();
        lock(&self.levels).clear();
    }
}

impl ProgressCallback for HistoryCallback {
    fn on_evaluation(&self, info: &EvaluationInfo) {
        lock(&self.evaluations).push(info.clone());
    }

    fn on_level_complete(&self, info: &LevelInfo) {
        lock(&self.levels).push(info.clone());
    }
}

/// Progress tracker that manages multiple callbacks.
#[derive(Clone, Default)]
pub struct ProgressTracker {
    /// Registered callbacks.
    callbacks: Vec<Arc<dyn ProgressCallback>>,
    /// Start time.
    start_time: Arc<Mutex<Option<Instant>>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback.
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks.push(callback);
    }

    /// Builder-style `add_callback`.
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.add_callback(callback);
        self
    }

    /// Time since `start`, zero before it.
    pub fn elapsed(&self) -> Duration {
        let start_time = *lock(&self.start_time);
        start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Start tracking.
    pub fn start(&self) {
        *lock(&self.start_time) = Some(Instant::now());
        for callback in &self.callbacks {
            callback.on_start();
        }
    }

    /// Report an evaluation.
    pub fn evaluation(&self, info: &EvaluationInfo) {
        for callback in &self.callbacks {
            callback.on_evaluation(info);
        }
    }

    /// Report the start of a level.
    pub fn level_start(&self, info: &LevelInfo) {
        for callback in &self.callbacks {
            callback.on_level_start(info);
        }
    }

    /// Report the end of a level.
    pub fn level_complete(&self, info: &LevelInfo) {
        for callback in &self.callbacks {
            callback.on_level_complete(info);
        }
    }

    /// Complete tracking.
    pub fn complete(&self) {
        let elapsed = self.elapsed();
        for callback in &self.callbacks {
            callback.on_complete(elapsed);
        }
    }

    /// Report error.
    pub fn error(&self, error: &str) {
        for callback in &self.callbacks {
            callback.on_error(error);
        }
    }
}
