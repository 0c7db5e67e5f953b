/*!
 * Tests for batch progress tracking
 */

use std::sync::Arc;
use std::thread;

use reelsmith::pipeline::{ProgressTracker, StepRecord};

use crate::common::RecordingObserver;

#[test]
fn test_update_shouldReportPercentageAndKeepMetadata() {
    let tracker = ProgressTracker::new(4);

    assert!(tracker.update(StepRecord::new(2, "script generated", "tides").with_title(Some("Tides".into()))));
    let snapshot = tracker.snapshot();

    assert_eq!(snapshot.current_step, 1);
    assert_eq!(snapshot.total_steps, 4);
    assert_eq!(snapshot.percentage, 25.0);
    assert_eq!(tracker.highest_step(), 2);
    let steps = tracker.steps();
    assert_eq!(steps[0].step, 2);
    assert_eq!(steps[0].title.as_deref(), Some("Tides"));
}

#[test]
fn test_update_outOfRange_shouldBeIgnored() {
    let tracker = ProgressTracker::new(3);

    assert!(!tracker.update(StepRecord::new(0, "zero", "s")));
    assert!(!tracker.update(StepRecord::new(4, "past the end", "s")));
    assert_eq!(tracker.snapshot().current_step, 0);
    assert!(tracker.steps().is_empty());
}

#[test]
fn test_update_pastTotal_shouldSaturate() {
    let tracker = ProgressTracker::new(2);
    assert!(tracker.update(StepRecord::new(1, "a", "s")));
    assert!(tracker.update(StepRecord::new(2, "b", "s")));
    assert!(!tracker.update(StepRecord::new(2, "again", "s")));

    assert!(tracker.is_complete());
    assert_eq!(tracker.snapshot().percentage, 100.0);
}

#[test]
fn test_observer_fromManyThreads_shouldSeeMonotonicProgress() {
    let observer = RecordingObserver::new();
    let tracker = Arc::new(ProgressTracker::new(200).with_observer(observer.clone()));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let step = worker * 25 + i + 1;
                    tracker.update(StepRecord::new(step, "done", format!("worker {}", worker)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let percentages = observer.percentages();
    assert_eq!(percentages.len(), 200);
    assert!(percentages.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percentages.last().copied(), Some(100.0));
    assert_eq!(tracker.steps().len(), 200);
}
