/*!
 * Batch content generation pipeline.
 *
 * This module provides:
 * - `progress`: shared progress tracking for a batch
 * - `executor`: the per-request stage state machine
 * - `orchestrator`: concurrent dispatch and ordered collection of results
 * - `concurrency`: worker pool sizing per script provider
 */

pub mod concurrency;
pub mod executor;
pub mod orchestrator;
pub mod progress;

// Re-export main types
pub use concurrency::WorkerPoolProfile;
pub use executor::{CompletionPolicy, RequestProgress, StageExecutor, STEPS_PER_REQUEST};
pub use orchestrator::{BatchEntry, BatchReport, BatchSummary, ContentPipeline, ErrorRecord};
pub use progress::{ProgressObserver, ProgressSnapshot, ProgressTracker, StepRecord};
