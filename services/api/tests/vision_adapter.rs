//! Vision adapter test against a mock OpenAI-compatible endpoint.

use api_lib::adapters::OpenAiVisionAdapter;
use serde_json::json;
use std::time::Duration;
use tutorial_core::{AnalysisProvider, ImageEncoder, RawImage, TUTORIAL_PROMPT};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

#[tokio::test]
async fn screenshot_is_sent_inline_and_reply_text_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "vision-test"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "vision-test",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"title\":\"Share a photo\",\"description\":\"d\",\"steps\":[\"a\"]}"
                },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = ImageEncoder::default()
        .encode(RawImage::from_bytes(JPEG.to_vec(), None))
        .await
        .unwrap();
    let adapter = OpenAiVisionAdapter::from_credentials(
        "test-key",
        Some(&server.uri()),
        "vision-test".into(),
        Duration::from_secs(5),
    )
    .unwrap();

    let reply = adapter.describe_image(&image, TUTORIAL_PROMPT).await.unwrap();
    assert!(reply.contains("Share a photo"));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let parts = &body["messages"][0]["content"];
    assert_eq!(parts[0]["type"], "image_url");
    assert!(parts[0]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(parts[1]["text"], TUTORIAL_PROMPT);
}
