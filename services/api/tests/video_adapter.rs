//! HTTP video adapter tests against a mock job API.

use api_lib::adapters::HttpVideoAdapter;
use serde_json::json;
use std::time::Duration;
use tutorial_core::{
    EncodedImage, ImageEncoder, JobId, JobStatus, PortError, RawImage, Submission, VideoProvider,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: [u8; 12] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

async fn screenshot() -> EncodedImage {
    ImageEncoder::default()
        .encode(RawImage::from_bytes(PNG.to_vec(), None))
        .await
        .unwrap()
}

fn adapter(server: &MockServer, api_key: Option<&str>) -> HttpVideoAdapter {
    HttpVideoAdapter::new(
        &server.uri(),
        api_key.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn immediate_results_are_returned_as_ready() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-video"))
        .and(body_partial_json(json!({
            "mime_type": "image/png",
            "prompt": "Show how to share a photo"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "video_url": "https://cdn.example.com/v.mp4"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let submission = adapter(&server, None)
        .submit(&screenshot().await, Some("Show how to share a photo"))
        .await
        .unwrap();

    match submission {
        Submission::Ready(video) => assert_eq!(video.as_str(), "https://cdn.example.com/v.mp4"),
        other => panic!("expected a ready video, got {:?}", other),
    }
}

#[tokio::test]
async fn queued_jobs_are_polled_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "job-42"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "video_url": "/static/videos/job-42.mp4"
        })))
        .mount(&server)
        .await;

    let adapter = adapter(&server, None);
    let job_id = match adapter.submit(&screenshot().await, None).await.unwrap() {
        Submission::Pending(job_id) => job_id,
        other => panic!("expected a pending job, got {:?}", other),
    };
    assert_eq!(job_id.as_str(), "job-42");

    let poll = adapter.poll(&job_id).await.unwrap();
    assert_eq!(poll.status, JobStatus::Succeeded);
    assert_eq!(
        poll.result.unwrap().as_str(),
        format!("{}/static/videos/job-42.mp4", server.uri())
    );
}

#[tokio::test]
async fn processing_jobs_report_pending() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .mount(&server)
        .await;

    let poll = adapter(&server, None)
        .poll(&JobId::new("job-7").unwrap())
        .await
        .unwrap();
    assert_eq!(poll.status, JobStatus::Pending);
    assert!(poll.result.is_none());
}

#[tokio::test]
async fn refused_submissions_are_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "failed"})))
        .mount(&server)
        .await;

    let result = adapter(&server, None).submit(&screenshot().await, None).await;
    assert!(matches!(result, Err(PortError::Unavailable(_))));
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = adapter(&server, None).poll(&JobId::new("job-1").unwrap()).await;
    assert!(matches!(result, Err(PortError::Unavailable(msg)) if msg.contains("overloaded")));
}

#[tokio::test]
async fn submissions_without_video_or_task_are_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
        .mount(&server)
        .await;

    let result = adapter(&server, None).submit(&screenshot().await, None).await;
    assert!(matches!(result, Err(PortError::Unexpected(_))));
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/job-1"))
        .and(header("authorization", "Bearer secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .expect(1)
        .mount(&server)
        .await;

    let poll = adapter(&server, Some("secret-key"))
        .poll(&JobId::new("job-1").unwrap())
        .await
        .unwrap();
    assert_eq!(poll.status, JobStatus::Pending);
}
