/*!
 * Tests for the prompt template engine
 */

use anyhow::Result;
use serde_json::json;

use reelsmith::content::{ContentOptions, ContentRequest, ServiceKind, VisualPromptOptions};
use reelsmith::errors::TemplateError;
use reelsmith::prompts::{flatten_variables, TemplateSet, DEFAULT_SEPARATOR};

use crate::common;

#[test]
fn test_builtinTemplate_withRequestVariables_shouldRenderEveryPlaceholder() -> Result<()> {
    let templates = TemplateSet::builtin()?;
    let request = ContentRequest::new("Northern lights").with_style("cinematic");

    let prompt = templates.render_validated("video_content", &request.template_variables())?;

    assert!(prompt.starts_with("Create a script for a short video about Northern lights."));
    assert!(prompt.contains("- Style: cinematic"));
    assert!(prompt.contains("\"video_title\""));
    assert!(!prompt.contains("{generalOptions_"));
    Ok(())
}

#[test]
fn test_builtinTemplate_withoutStyle_shouldReportMissingVariable() -> Result<()> {
    let templates = TemplateSet::builtin()?;
    let mut variables = ContentRequest::new("Northern lights").template_variables();
    variables["generalOptions"]
        .as_object_mut()
        .expect("generalOptions is an object")
        .remove("style");

    let error = templates.render("video_content", &variables).unwrap_err();

    assert_eq!(
        error,
        TemplateError::MissingVariable {
            key: "generalOptions_style".to_string()
        }
    );
    Ok(())
}

#[test]
fn test_fromFile_withYamlTemplates_shouldLoadComponents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "templates.yaml",
        r#"
teaser:
  max_length: 200
  template: "Teaser about {videoSubject} in a {generalOptions_tone} tone."
"#,
    )?;

    let templates = TemplateSet::from_file(&path)?;
    let prompt = templates.render("teaser", &json!({
        "videoSubject": "tides",
        "generalOptions": {"tone": "calm"}
    }))?;

    assert_eq!(prompt, "Teaser about tides in a calm tone.");
    assert_eq!(templates.required_variables("teaser")?, vec!["videoSubject", "generalOptions_tone"]);
    Ok(())
}

#[test]
fn test_fromFile_withMissingFile_shouldFailToLoad() {
    let result = TemplateSet::from_file("/nonexistent/templates.yaml");
    assert!(matches!(result, Err(TemplateError::Load(_))));
}

#[test]
fn test_addTemplate_shouldBeRenderableImmediately() -> Result<()> {
    let mut templates = TemplateSet::builtin()?;
    templates.add_template("hook", "Stop scrolling: {videoSubject}!", Some(100));

    let prompt = templates.render_validated("hook", &json!({"videoSubject": "octopus"}))?;
    assert_eq!(prompt, "Stop scrolling: octopus!");

    assert!(templates.remove_template("hook"));
    assert!(matches!(
        templates.render("hook", &json!({})),
        Err(TemplateError::NotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_flatten_shouldRenderScalarsAsText() {
    let flat = flatten_variables(
        &json!({"generalOptions": {"sceneAmount": 3, "services": ["image", "voice"], "draft": false}}),
        DEFAULT_SEPARATOR,
    );

    assert_eq!(flat["generalOptions_sceneAmount"], "3");
    assert_eq!(flat["generalOptions_services"], "image, voice");
    assert_eq!(flat["generalOptions_draft"], "false");
}

fn fully_specified_request() -> ContentRequest {
    let mut request = ContentRequest::new("Coral reefs")
        .with_style("documentary")
        .with_services(ServiceKind::ALL);
    request.general_options.description = "Reef life at dawn".to_string();
    request.content_options = ContentOptions {
        pacing: "slow".to_string(),
        description: "Calm narration".to_string(),
    };
    request.visual_prompt_options = VisualPromptOptions {
        picture_description: "Wide reef shots".to_string(),
        style: "underwater photography".to_string(),
        image_details: "soft light".to_string(),
        shot_details: "slow pans".to_string(),
    };
    request
}

#[test]
fn test_render_withSameVariables_shouldBeDeterministic() -> Result<()> {
    let templates = TemplateSet::builtin()?;
    let variables = fully_specified_request().template_variables();

    let first = templates.render("video_content", &variables)?;
    let second = templates.render("video_content", &variables)?;
    assert_eq!(first, second);

    let flat = flatten_variables(&variables, DEFAULT_SEPARATOR);
    assert_eq!(templates.render_flat("video_content", &flat)?, first);
    assert_eq!(templates.render_flat("video_content", &flat)?, first);
    Ok(())
}

#[test]
fn test_renderValidated_subjectWithBraces_shouldKeepSubjectText() -> Result<()> {
    let templates = TemplateSet::builtin()?;
    let request = ContentRequest::new("The {self} keyword in Rust");

    let prompt = templates.render_validated("video_content", &request.template_variables())?;

    assert!(prompt.contains("The {self} keyword in Rust"));
    Ok(())
}
