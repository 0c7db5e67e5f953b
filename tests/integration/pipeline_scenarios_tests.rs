/*!
 * End-to-end batch scenarios over mock collaborators
 */

use std::sync::Arc;
use std::time::Duration;

use reelsmith::content::{ContentRequest, ContentStatus, ServiceKind, StageKind};
use reelsmith::database::{ContentStore, MemoryStore};
use reelsmith::pipeline::{BatchEntry, CompletionPolicy, STEPS_PER_REQUEST};
use reelsmith::providers::mock::{MockMedia, MockProvider};

use crate::common::{self, RecordingObserver};

/// Two requests: the first with image and voice, the second with nothing optional
#[tokio::test]
async fn test_batch_withMixedServices_shouldOnlyCallEnabledStages() {
    let store = MemoryStore::new();
    let media = MockMedia::new();
    let observer = RecordingObserver::new();

    let report = common::mock_pipeline(MockProvider::working(), media.clone(), Arc::new(store.clone()))
        .with_observer(observer.clone())
        .process_batch(vec![
            ContentRequest::new("Coral reefs").with_services([ServiceKind::Image, ServiceKind::Voice]),
            ContentRequest::new("Desert winds"),
        ])
        .await;

    assert_eq!(report.entries.len(), 2);
    let first = report.entries[0].record().expect("first request should produce a record");
    let second = report.entries[1].record().expect("second request should produce a record");

    assert_eq!(first.status, ContentStatus::Completed);
    assert_eq!(first.progress, 100.0);
    assert!(first.generated_picture.as_deref().unwrap().starts_with("mock://image/"));
    assert!(first.generated_voice.as_deref().unwrap().starts_with("mock://voice/"));
    assert!(first.generated_music.is_none());
    assert!(first.generated_video.is_none());

    assert_eq!(second.status, ContentStatus::Completed);
    assert!(second.generated_picture.is_none());
    assert!(second.generated_voice.is_none());

    assert_eq!(media.calls_for(ServiceKind::Image), 1);
    assert_eq!(media.calls_for(ServiceKind::Voice), 1);
    assert_eq!(media.calls_for(ServiceKind::Music), 0);
    assert_eq!(media.calls_for(ServiceKind::Video), 0);

    // Voice narration is the scene narrations joined by newlines
    let voice_call = media
        .calls()
        .into_iter()
        .find(|call| call.kind == ServiceKind::Voice)
        .unwrap();
    assert_eq!(voice_call.input, "Opening narration\nClosing narration");

    assert_eq!(report.progress.current_step, 2 * STEPS_PER_REQUEST);
    assert_eq!(report.progress.percentage, 100.0);
    assert_eq!(observer.events().len(), 2 * STEPS_PER_REQUEST);

    // The store holds the same final state the report carries
    let stored = store.get(first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, first.status);
    assert_eq!(stored.generated_picture, first.generated_picture);
    assert_eq!(stored.generated_voice, first.generated_voice);
    assert_eq!(stored.current_step.as_deref(), Some("completed"));
}

/// A failing store create turns the request into an error entry at persist
#[tokio::test]
async fn test_batch_withFailingCreate_shouldYieldPersistErrors() {
    let store = MemoryStore::new().fail_creates();
    let media = MockMedia::new();

    let report = common::mock_pipeline(MockProvider::working(), media.clone(), Arc::new(store.clone()))
        .process_batch(vec![common::full_request("Moss")])
        .await;

    let error = report.entries[0].error().expect("request should fail");
    assert_eq!(error.stage, Some(StageKind::Persist));
    assert_eq!(error.subject, "Moss");
    assert!(store.is_empty());
    assert!(media.calls().is_empty());
    assert_eq!(report.progress.percentage, 100.0);
    assert!(report.steps.iter().filter(|s| s.status == "aborted").count() >= 4);
}

/// Optional stage failures are recorded but do not fail the request
#[tokio::test]
async fn test_batch_withFailingOptionalStage_shouldStillComplete() {
    let store = MemoryStore::new();
    let media = MockMedia::new().failing(ServiceKind::Music);

    let report = common::mock_pipeline(MockProvider::working(), media.clone(), Arc::new(store.clone()))
        .process_batch(vec![common::full_request("Thunderstorms")])
        .await;

    let record = report.entries[0].record().unwrap();
    assert_eq!(record.status, ContentStatus::Completed);
    assert!(record.generated_picture.is_some());
    assert!(record.generated_voice.is_some());
    assert!(record.generated_music.is_none());
    assert!(record.generated_video.is_some());
    assert_eq!(record.stage_failures.len(), 1);
    assert_eq!(record.stage_failures[0].stage, StageKind::Music);

    // Video still ran, with the artifacts that were produced
    let video_input = media
        .calls()
        .into_iter()
        .find(|call| call.kind == ServiceKind::Video)
        .unwrap()
        .input;
    let video: serde_json::Value = serde_json::from_str(&video_input).unwrap();
    assert_eq!(video["content_id"], record.id);
    assert!(video["music_url"].is_null());
    assert_eq!(video["image_url"], record.generated_picture.clone().unwrap());

    assert!(report.steps.iter().any(|s| s.status == "music failed"));
}

/// Strict policy marks the record failed when an optional stage fails
#[tokio::test]
async fn test_batch_withStrictPolicy_shouldFailRecord() {
    let store = MemoryStore::new();

    let report = common::mock_pipeline(
        MockProvider::working(),
        MockMedia::new().failing(ServiceKind::Image),
        Arc::new(store.clone()),
    )
    .with_policy(CompletionPolicy::Strict)
    .process_batch(vec![
        ContentRequest::new("Auroras").with_services([ServiceKind::Image]),
        ContentRequest::new("Comets"),
    ])
    .await;

    let failed = report.entries[0].record().unwrap();
    assert_eq!(failed.status, ContentStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap().contains("image"));
    assert_eq!(report.entries[1].record().unwrap().status, ContentStatus::Completed);

    let summary = report.summary();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors, 0);
}

/// Progress observed across a concurrent batch never goes backwards
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_progress_shouldBeMonotonicAndReachHundred() {
    let observer = RecordingObserver::new();
    let requests: Vec<ContentRequest> = (0..12)
        .map(|i| common::full_request(&format!("topic {}", i)))
        .collect();

    let report = common::mock_pipeline(
        MockProvider::working(),
        MockMedia::new().with_delay(Duration::from_millis(2)),
        Arc::new(MemoryStore::new()),
    )
    .with_max_concurrent_requests(4)
    .with_observer(observer.clone())
    .process_batch(requests)
    .await;

    let percentages = observer.percentages();
    assert_eq!(percentages.len(), 12 * STEPS_PER_REQUEST);
    assert!(percentages.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percentages.last().copied(), Some(100.0));
    assert_eq!(report.summary().completed, 12);

    let steps: Vec<usize> = report.steps.iter().map(|s| s.step).collect();
    assert_eq!(steps, (1..=12 * STEPS_PER_REQUEST).collect::<Vec<_>>());
}

/// Results come back in submission order even when later requests finish first
#[tokio::test]
async fn test_batch_withSlowFirstRequest_shouldPreserveOrder() {
    let report = common::mock_pipeline(
        MockProvider::slow(30),
        MockMedia::new(),
        Arc::new(MemoryStore::new()),
    )
    .with_max_concurrent_requests(3)
    .process_batch(vec![
        common::full_request("first"),
        ContentRequest::new("second"),
        ContentRequest::new("third"),
    ])
    .await;

    let subjects: Vec<&str> = report
        .entries
        .iter()
        .map(|entry| match entry {
            BatchEntry::Content(record) => record.video_subject.as_str(),
            BatchEntry::Error(error) => error.subject.as_str(),
        })
        .collect();
    assert_eq!(subjects, vec!["first", "second", "third"]);
}

/// A panicking script provider only takes down its own request
#[tokio::test]
async fn test_batch_withPanickingProvider_shouldReportEveryRequest() {
    let report = common::mock_pipeline(
        MockProvider::panicking(),
        MockMedia::new(),
        Arc::new(MemoryStore::new()),
    )
    .process_batch(vec![ContentRequest::new("a"), ContentRequest::new("b")])
    .await;

    assert_eq!(report.summary().errors, 2);
    for (index, entry) in report.entries.iter().enumerate() {
        let error = entry.error().unwrap();
        assert_eq!(error.index, index);
        assert_eq!(error.stage, None);
        assert!(error.message.contains("panicked"));
    }
    assert_eq!(report.progress.percentage, 100.0);
}

/// A stage timeout fails the script stage without hanging the batch
#[tokio::test]
async fn test_batch_withStageTimeout_shouldFailSlowScript() {
    let report = common::mock_pipeline(
        MockProvider::slow(500),
        MockMedia::new(),
        Arc::new(MemoryStore::new()),
    )
    .with_stage_timeout(Some(Duration::from_millis(20)))
    .process_batch(vec![ContentRequest::new("sloths")])
    .await;

    let error = report.entries[0].error().unwrap();
    assert_eq!(error.stage, Some(StageKind::Script));
    assert!(error.message.contains("timed out after 20ms"), "unexpected message: {}", error.message);
}

/// An unrenderable template fails every request at render, before any call
#[tokio::test]
async fn test_batch_withMissingTemplateVariable_shouldFailAtRender() {
    let provider = MockProvider::working();
    let pipeline = common::mock_pipeline(provider.clone(), MockMedia::new(), Arc::new(MemoryStore::new()));
    pipeline
        .templates()
        .write()
        .add_template("needs_mood", "About {videoSubject} in a {generalOptions_mood} mood", None);

    let report = pipeline
        .with_template_name("needs_mood")
        .process_batch(vec![ContentRequest::new("rain")])
        .await;

    let error = report.entries[0].error().unwrap();
    assert_eq!(error.stage, Some(StageKind::Render));
    assert!(error.message.contains("generalOptions_mood"));
    assert_eq!(provider.request_count(), 0);
}

/// An empty batch completes immediately
#[tokio::test]
async fn test_batch_empty_shouldReportFullProgress() {
    let report = common::mock_pipeline(MockProvider::working(), MockMedia::new(), Arc::new(MemoryStore::new()))
        .process_batch(Vec::new())
        .await;

    assert!(report.entries.is_empty());
    assert_eq!(report.progress.total_steps, 0);
    assert_eq!(report.progress.percentage, 100.0);
}
