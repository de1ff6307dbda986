//! services/api/src/adapters/video_http.rs
//!
//! This module contains the adapter for an HTTP video-generation job API.
//! It implements the `VideoProvider` port from the `core` crate.
//!
//! Wire contract:
//! - `POST {base}/generate-video` with `{image_base64, mime_type, prompt}` answers
//!   `{status?, video_url?, task_id?}`.
//! - `GET {base}/tasks/{task_id}` answers `{status, video_url?}`.
//!
//! Responses are normalized here so the core never sees provider-specific shapes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use tutorial_core::{
    domain::{JobId, JobPoll, JobStatus, Submission, VideoRef},
    encoder::EncodedImage,
    ports::{PortError, PortResult, VideoProvider},
};
use url::Url;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct GenerateVideoRequest<'a> {
    image_base64: &'a str,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateVideoResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Deserialize)]
struct TaskStatusResponse {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `VideoProvider` over a generic submit-then-poll HTTP API.
#[derive(Clone)]
pub struct HttpVideoAdapter {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpVideoAdapter {
    /// Default timeout for a single request; the poll loop bounds the overall wait.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a new `HttpVideoAdapter`.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> PortResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| PortError::Unexpected(format!("Invalid video API URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PortError::Unexpected(format!(
                "Video API URL {} cannot be used as a base",
                base_url
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("Video API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Resolves relative result paths against the API origin.
    fn resolve(&self, raw: Option<String>) -> Option<VideoRef> {
        let raw = raw.filter(|raw| !raw.trim().is_empty())?;
        let url = self.base_url.join(raw.trim()).ok()?;
        VideoRef::new(url.to_string())
    }

    async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unavailable(format!(
                "Video provider returned {}: {}",
                status, body
            )));
        }
        Ok(response)
    }
}

//=========================================================================================
// `VideoProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl VideoProvider for HttpVideoAdapter {
    async fn submit(&self, image: &EncodedImage, prompt: Option<&str>) -> PortResult<Submission> {
        let url = self.endpoint(&["generate-video"])?;
        let body = GenerateVideoRequest {
            image_base64: image.base64(),
            mime_type: image.mime_type(),
            prompt,
        };
        debug!(%url, "Submitting video generation request.");

        let response: GenerateVideoResponse = self
            .send(self.http.post(url).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid submission response: {}", e)))?;

        if let Some(status) = &response.status {
            if JobStatus::from_provider(status) == JobStatus::Failed {
                return Err(PortError::Unavailable(format!(
                    "Video provider refused the request with status '{}'",
                    status
                )));
            }
        }
        if let Some(video) = self.resolve(response.video_url) {
            return Ok(Submission::Ready(video));
        }
        response
            .task_id
            .and_then(JobId::new)
            .map(Submission::Pending)
            .ok_or_else(|| {
                PortError::Unexpected(
                    "Submission response carried neither a video nor a task id".to_string(),
                )
            })
    }

    async fn poll(&self, job_id: &JobId) -> PortResult<JobPoll> {
        let url = self.endpoint(&["tasks", job_id.as_str()])?;
        let response: TaskStatusResponse = self
            .send(self.http.get(url))
            .await?
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Invalid task status response: {}", e)))?;

        Ok(JobPoll {
            status: JobStatus::from_provider(&response.status),
            result: self.resolve(response.video_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(base: &str) -> HttpVideoAdapter {
        HttpVideoAdapter::new(base, None, HttpVideoAdapter::REQUEST_TIMEOUT).unwrap()
    }

    #[test]
    fn endpoints_keep_the_base_path() {
        let adapter = adapter("http://127.0.0.1:8001/api");
        assert_eq!(
            adapter.endpoint(&["generate-video"]).unwrap().as_str(),
            "http://127.0.0.1:8001/api/generate-video"
        );
        assert_eq!(
            adapter.endpoint(&["tasks", "a/b"]).unwrap().as_str(),
            "http://127.0.0.1:8001/api/tasks/a%2Fb"
        );
    }

    #[test]
    fn relative_video_paths_resolve_against_the_origin() {
        let adapter = adapter("http://127.0.0.1:8001");
        assert_eq!(
            adapter
                .resolve(Some("/static/videos/clip.mp4".to_string()))
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8001/static/videos/clip.mp4"
        );
        assert_eq!(
            adapter
                .resolve(Some("https://cdn.example.com/v.mp4".to_string()))
                .unwrap()
                .as_str(),
            "https://cdn.example.com/v.mp4"
        );
        assert!(adapter.resolve(None).is_none());
        assert!(adapter.resolve(Some("  ".to_string())).is_none());
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpVideoAdapter::new("not a url", None, Duration::from_secs(1)).is_err());
        assert!(HttpVideoAdapter::new("mailto:video@example.com", None, Duration::from_secs(1)).is_err());
    }
}
