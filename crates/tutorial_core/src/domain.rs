//! crates/tutorial_core/src/domain.rs
//!
//! Defines the core data structures for tutorial generation.
//! Lessons are the only persisted values; everything else here is transient
//! state owned by a single pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Lessons
//=========================================================================================

/// Unique, time-ordered identifier of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(Uuid);

impl LessonId {
    /// Generates a fresh identifier. UUIDv7 keeps ids sortable by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LessonId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LessonId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LessonId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A finished "how-to" tutorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    /// Human readable, e.g. "June 15".
    pub created_at: String,
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<VideoRef>,
}

/// Formats a creation instant the way lessons display it.
pub fn display_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d").to_string()
}

/// A resolvable reference to a synthesized video. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoRef(String);

impl VideoRef {
    /// Returns `None` for blank input so a placeholder can never be stored.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "video reference must not be blank".to_string())
    }
}

impl From<VideoRef> for String {
    fn from(value: VideoRef) -> Self {
        value.0
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Analysis
//=========================================================================================

/// Structured tutorial content extracted from a screenshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
}

impl AnalysisResult {
    /// The content used whenever the analysis provider cannot deliver.
    pub fn fallback() -> Self {
        Self {
            title: "New Tutorial".to_string(),
            description: "A guide based on your screenshot.".to_string(),
            steps: vec![
                "Open the app.".to_string(),
                "Locate the item shown.".to_string(),
                "Tap to proceed.".to_string(),
            ],
        }
    }
}

//=========================================================================================
// Video generation jobs
//=========================================================================================

/// Provider-assigned identifier of an asynchronous video job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Normalizes a provider status word. Unknown words mean the job is still running.
    pub fn from_provider(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "completed" => Self::Succeeded,
            "failed" | "error" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What a provider answered to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The video is already available.
    Ready(VideoRef),
    /// The video is being produced by a job that must be polled.
    Pending(JobId),
}

/// One normalized job status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPoll {
    pub status: JobStatus,
    pub result: Option<VideoRef>,
}

impl JobPoll {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            result: None,
        }
    }

    pub fn succeeded(result: VideoRef) -> Self {
        Self {
            status: JobStatus::Succeeded,
            result: Some(result),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: JobStatus::Failed,
            result: None,
        }
    }
}

/// Tracks a submitted job through its polls.
///
/// Status only moves from `Pending` to a terminal state; reports received
/// after that are ignored.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    job_id: JobId,
    status: JobStatus,
    result: Option<VideoRef>,
    polls: u32,
}

impl GenerationJob {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Pending,
            result: None,
            polls: 0,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&VideoRef> {
        self.result.as_ref()
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Applies a status report from the provider.
    pub fn record(&mut self, poll: JobPoll) {
        if self.status.is_terminal() {
            return;
        }
        self.polls += 1;
        match (poll.status, poll.result) {
            (JobStatus::Succeeded, Some(video)) => {
                self.status = JobStatus::Succeeded;
                self.result = Some(video);
            }
            // A success without a usable reference is no video at all.
            (JobStatus::Succeeded, None) | (JobStatus::Failed, _) => {
                self.status = JobStatus::Failed;
            }
            (JobStatus::Pending, _) => {}
        }
    }

    /// Counts a poll whose request itself failed; the job is assumed to still be running.
    pub fn record_unreachable(&mut self) {
        if !self.status.is_terminal() {
            self.polls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(url: &str) -> VideoRef {
        VideoRef::new(url).unwrap()
    }

    #[test]
    fn provider_status_vocabulary_is_normalized() {
        assert_eq!(JobStatus::from_provider("success"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_provider("Completed"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_provider("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::from_provider("ERROR"), JobStatus::Failed);
        assert_eq!(JobStatus::from_provider("processing"), JobStatus::Pending);
        assert_eq!(JobStatus::from_provider(""), JobStatus::Pending);
    }

    #[test]
    fn blank_video_refs_are_rejected() {
        assert!(VideoRef::new("   ").is_none());
        assert_eq!(video(" https://cdn/v.mp4 ").as_str(), "https://cdn/v.mp4");
        assert!(serde_json::from_str::<VideoRef>("\"\"").is_err());
    }

    #[test]
    fn job_leaves_pending_only_once() {
        let mut job = GenerationJob::new(JobId::new("task-1").unwrap());
        job.record(JobPoll::pending());
        job.record_unreachable();
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.polls(), 2);

        job.record(JobPoll::succeeded(video("https://cdn/v.mp4")));
        assert_eq!(job.status(), JobStatus::Succeeded);

        job.record(JobPoll::failed());
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.polls(), 3);
        assert_eq!(job.result(), Some(&video("https://cdn/v.mp4")));
    }

    #[test]
    fn success_without_reference_counts_as_failure() {
        let mut job = GenerationJob::new(JobId::new("task-2").unwrap());
        job.record(JobPoll {
            status: JobStatus::Succeeded,
            result: None,
        });
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.result().is_none());
    }

    #[test]
    fn lesson_serializes_with_camel_case_and_omits_missing_video() {
        let lesson = Lesson {
            id: LessonId::new(),
            title: "How to share a photo".to_string(),
            description: "Share photos with family.".to_string(),
            steps: vec!["Open Photos.".to_string()],
            created_at: "June 15".to_string(),
            thumbnail_url: "data:image/png;base64,AAAA".to_string(),
            video_url: None,
        };
        let json = serde_json::to_value(&lesson).unwrap();
        assert_eq!(json["thumbnailUrl"], "data:image/png;base64,AAAA");
        assert_eq!(json["createdAt"], "June 15");
        assert!(json.get("videoUrl").is_none());
    }

    #[test]
    fn display_date_uses_month_and_day() {
        let at = DateTime::parse_from_rfc3339("2025-06-05T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(display_date(at), "June 5");
    }
}
