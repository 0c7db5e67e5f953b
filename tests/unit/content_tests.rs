/*!
 * Tests for the request, script and record model
 */

use chrono::Utc;
use reelsmith::content::{
    ContentRecord, ContentRequest, ContentStatus, ContentUpdate, GeneratedScript, NewContent,
    Scene, ServiceKind, StageKind,
};
use reelsmith::errors::PersistenceError;

const REQUEST_JSON: &str = r#"{
    "videoSubject": "How bees communicate",
    "generalOptions": {
        "style": "documentary",
        "description": "Close-up footage of a hive",
        "sceneAmount": 4,
        "duration": 90,
        "tone": "curious",
        "vocabulary": "simple",
        "targetAudience": "children",
        "services": {
            "generate_image": true,
            "generate_voice": true,
            "generate_music": false
        }
    },
    "contentOptions": { "pacing": "calm" },
    "visualPromptOptions": { "style": "macro photography" }
}"#;

fn script() -> GeneratedScript {
    GeneratedScript {
        title: "The Waggle Dance".to_string(),
        description: "Bees dancing".to_string(),
        scenes: vec![
            Scene::new("A scout returns", "Bee landing on the comb"),
            Scene::new("She dances", "Figure-eight dance"),
        ],
    }
}

#[test]
fn test_contentRequest_fromJson_shouldReadNestedOptions() {
    let request: ContentRequest = serde_json::from_str(REQUEST_JSON).unwrap();

    assert_eq!(request.video_subject, "How bees communicate");
    assert_eq!(request.general_options.scene_amount, 4);
    assert_eq!(request.content_options.pacing, "calm");
    assert!(request.is_enabled(ServiceKind::Image));
    assert!(request.is_enabled(ServiceKind::Voice));
    assert!(!request.is_enabled(ServiceKind::Music));
    assert!(!request.is_enabled(ServiceKind::Video));
}

#[test]
fn test_contentRequest_withoutGeneralOptions_shouldFail() {
    let result = serde_json::from_str::<ContentRequest>(r#"{"videoSubject": "x"}"#);
    assert!(result.is_err());
}

#[test]
fn test_templateVariables_shouldExposeRequestFields() {
    let request: ContentRequest = serde_json::from_str(REQUEST_JSON).unwrap();
    let variables = request.template_variables();

    assert_eq!(variables["videoSubject"], "How bees communicate");
    assert_eq!(variables["generalOptions"]["style"], "documentary");
    assert_eq!(variables["visualPromptOptions"]["style"], "macro photography");
}

#[test]
fn test_newContent_shouldStartPendingWithMusicPrompt() {
    let request = ContentRequest::new("bees").with_style("playful");
    let new_content = NewContent::from_script(&request, &script());

    assert_eq!(new_content.status, ContentStatus::Pending);
    assert_eq!(new_content.title, "The Waggle Dance");
    assert_eq!(new_content.scenes.len(), 2);
    assert_eq!(new_content.visual_prompts[1].scene_number, 2);
    assert_eq!(new_content.music_prompt.description, "Create playful music for a video about bees");
}

#[test]
fn test_record_lifecycle_shouldRejectLeavingTerminalState() {
    let request = ContentRequest::new("bees");
    let new_content = NewContent::from_script(&request, &script());
    let mut record = ContentRecord::from_new(7, &new_content, Utc::now());

    record
        .apply(&ContentUpdate::new().status(ContentStatus::InProgress), Utc::now())
        .unwrap();
    record
        .apply(
            &ContentUpdate::new()
                .status(ContentStatus::Completed)
                .progress(150.0),
            Utc::now(),
        )
        .unwrap();
    assert_eq!(record.progress, 100.0);

    let error = record
        .apply(&ContentUpdate::new().status(ContentStatus::InProgress), Utc::now())
        .unwrap_err();
    assert_eq!(
        error,
        PersistenceError::InvalidTransition {
            from: ContentStatus::Completed,
            to: ContentStatus::InProgress,
        }
    );
    assert_eq!(record.status, ContentStatus::Completed);
}

#[test]
fn test_record_serialization_shouldUseSnakeCaseStatus() {
    let request = ContentRequest::new("bees");
    let new_content = NewContent::from_script(&request, &script());
    let record = ContentRecord::from_new(1, &new_content, Utc::now());

    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["status"], "pending");
    assert_eq!(value["stage_failures"], serde_json::json!([]));
}

#[test]
fn test_stageKind_mandatoryStages() {
    assert!(StageKind::Render.is_mandatory());
    assert!(StageKind::Persist.is_mandatory());
    assert!(!StageKind::Video.is_mandatory());
    assert_eq!(ServiceKind::Voice.stage(), StageKind::Voice);
}
