/*!
 * Batch progress tracking.
 *
 * The tracker is shared by every request task of a batch. Steps may arrive
 * in any order; the current step is the number of accepted updates, so the
 * percentage never decreases.
 */

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metadata attached to one progress step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub status: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(step: usize, status: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            step,
            status: status.into(),
            subject: subject.into(),
            title: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Point-in-time view of batch progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_step: usize,
    pub total_steps: usize,
    pub percentage: f64,
    pub elapsed_seconds: f64,
    pub estimated_remaining_seconds: f64,
}

/// Receives every accepted progress event
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, record: &StepRecord, snapshot: &ProgressSnapshot);
}

/// Thread-safe progress counter for one batch
pub struct ProgressTracker {
    total_steps: usize,
    current: AtomicUsize,
    steps: Mutex<BTreeMap<usize, StepRecord>>,
    started: Instant,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total_steps", &self.total_steps)
            .field("current", &self.current.load(Ordering::SeqCst))
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(total_steps: usize) -> Self {
        Self {
            total_steps,
            current: AtomicUsize::new(0),
            steps: Mutex::new(BTreeMap::new()),
            started: Instant::now(),
            observer: None,
        }
    }

    /// Forward every accepted update to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Record that step `record.step` finished.
    ///
    /// Returns false when the update was not counted: the index is outside
    /// `1..=total_steps`, or the counter is already saturated.
    pub fn update(&self, record: StepRecord) -> bool {
        if record.step == 0 || record.step > self.total_steps {
            warn!(
                "Ignoring progress update for step {} (expected 1..={})",
                record.step, self.total_steps
            );
            return false;
        }

        let total = self.total_steps;
        let accepted = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < total).then_some(current + 1)
            })
            .is_ok();

        if !accepted {
            debug!("Progress already complete, ignoring step {}", record.step);
            return false;
        }

        // Snapshots are taken under the lock so observers never see a regression
        let mut steps = self.steps.lock();
        let snapshot = self.snapshot();
        debug!(
            "Progress {}/{} ({:.2}%): step {} {} [{}]",
            snapshot.current_step,
            snapshot.total_steps,
            snapshot.percentage,
            record.step,
            record.status,
            record.subject
        );

        if let Some(observer) = &self.observer {
            observer.on_progress(&record, &snapshot);
        }
        steps.insert(record.step, record);
        true
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let current = self.current.load(Ordering::SeqCst);
        let elapsed = self.started.elapsed().as_secs_f64();

        let percentage = if self.total_steps == 0 {
            100.0
        } else {
            current as f64 / self.total_steps as f64 * 100.0
        };

        let remaining = if current == 0 {
            0.0
        } else {
            elapsed / current as f64 * (self.total_steps - current) as f64
        };

        ProgressSnapshot {
            current_step: current,
            total_steps: self.total_steps,
            percentage: round2(percentage),
            elapsed_seconds: round2(elapsed),
            estimated_remaining_seconds: round2(remaining),
        }
    }

    /// Step metadata ordered by step index
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().values().cloned().collect()
    }

    /// Highest step index reported so far; 0 before any update
    pub fn highest_step(&self) -> usize {
        self.steps.lock().keys().next_back().copied().unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.current.load(Ordering::SeqCst) >= self.total_steps
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
