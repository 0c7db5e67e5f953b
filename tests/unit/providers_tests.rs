/*!
 * Tests for script and media collaborators
 */

use reelsmith::content::ServiceKind;
use reelsmith::errors::{GenerationError, ProviderError};
use reelsmith::providers::anthropic::AnthropicRequest;
use reelsmith::providers::mock::{MockMedia, MockProvider};
use reelsmith::providers::openai::OpenAIRequest;
use reelsmith::providers::{
    HttpMediaClient, LlmScriptWriter, MediaGenerator, PlaceholderMedia, ScriptGenerator, VideoInput,
};

#[tokio::test]
async fn test_scriptWriter_withWorkingProvider_shouldParseScript() {
    let provider = MockProvider::working();
    let writer = LlmScriptWriter::new(provider.clone());

    let script = writer.generate_script("Glaciers\nMore details").await.unwrap();

    assert_eq!(script.title, "Video: Glaciers");
    assert_eq!(script.scenes.len(), 2);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_scriptWriter_withProseReply_shouldBeInvalidScript() {
    let writer = LlmScriptWriter::new(MockProvider::invalid());
    let result = writer.generate_script("Glaciers").await;
    assert!(matches!(result, Err(GenerationError::InvalidScript(_))));
}

#[tokio::test]
async fn test_scriptWriter_withFailingProvider_shouldKeepProviderError() {
    let writer = LlmScriptWriter::new(MockProvider::failing());
    let result = writer.generate_script("Glaciers").await;
    assert!(matches!(
        result,
        Err(GenerationError::Provider(ProviderError::ApiError { status_code: 500, .. }))
    ));
}

#[tokio::test]
async fn test_scriptWriter_withIntermittentProvider_shouldFailEveryNth() {
    let writer = LlmScriptWriter::new(MockProvider::intermittent(3));

    let mut outcomes = Vec::new();
    for _ in 0..6 {
        outcomes.push(writer.generate_script("topic").await.is_ok());
    }

    assert_eq!(outcomes, vec![true, true, false, true, true, false]);
}

#[tokio::test]
async fn test_placeholderMedia_shouldReturnFixedUrls() {
    let media = PlaceholderMedia;

    assert_eq!(
        media.generate_image("a lake").await.unwrap(),
        "http://example.com/generated_image.jpg"
    );
    assert_eq!(
        media.generate_music("calm").await.unwrap(),
        PlaceholderMedia::url_for(ServiceKind::Music)
    );
}

#[tokio::test]
async fn test_httpMediaClient_withoutEndpoint_shouldFailThatStage() {
    let client = HttpMediaClient::new(None, 5);

    let error = client.generate_voice("hello").await.unwrap_err();

    match error {
        GenerationError::Service { stage, message } => {
            assert_eq!(stage, ServiceKind::Voice.stage());
            assert!(message.contains("no endpoint"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_httpMediaClient_withInvalidEndpoint_shouldRejectIt() {
    let result = HttpMediaClient::new(None, 5).with_endpoint(ServiceKind::Image, "not a url");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_mockMedia_shouldRecordCallsAndFailConfiguredKinds() {
    let media = MockMedia::new().failing(ServiceKind::Music);

    let image = media.generate_image("forest").await.unwrap();
    let music = media.generate_music("forest").await;
    let video = media
        .generate_video(&VideoInput {
            content_id: 4,
            script: "narration".to_string(),
            image_url: Some(image.clone()),
            voice_url: None,
            music_url: None,
        })
        .await
        .unwrap();

    assert!(image.starts_with("mock://image/"));
    assert!(music.is_err());
    assert!(video.starts_with("mock://video/"));
    assert_eq!(media.calls_for(ServiceKind::Image), 1);
    assert_eq!(media.calls_for(ServiceKind::Music), 1);
    assert!(media.calls().last().unwrap().input.contains("\"content_id\":4"));
}

#[test]
fn test_requestBuilders_shouldSerializeExpectedShape() {
    let openai = OpenAIRequest::new("gpt-4o-mini")
        .add_message("system", "Be brief")
        .add_message("user", "Hi")
        .temperature(0.5)
        .json_object();
    let value = serde_json::to_value(&openai).unwrap();
    assert_eq!(value["model"], "gpt-4o-mini");
    assert_eq!(value["messages"][1]["content"], "Hi");
    assert_eq!(value["response_format"]["type"], "json_object");

    let anthropic = AnthropicRequest::new("claude-3-haiku-20240307", 800)
        .system("Be brief")
        .add_message("user", "Hi");
    let value = serde_json::to_value(&anthropic).unwrap();
    assert_eq!(value["max_tokens"], 800);
    assert_eq!(value["system"], "Be brief");
}
