//! crates/tutorial_core/src/ports.rs
//!
//! Defines the service contracts (traits) the generation pipeline depends on.
//! These traits form the boundary of the hexagonal architecture, so the core
//! stays independent of any particular vision model, video vendor or database.

use async_trait::async_trait;

use crate::domain::{JobId, JobPoll, Lesson, LessonId, Submission};
use crate::encoder::EncodedImage;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Sends the image and the instruction prompt to a vision model and returns its raw text.
    async fn describe_image(&self, image: &EncodedImage, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Requests a demonstration video for the image.
    async fn submit(&self, image: &EncodedImage, prompt: Option<&str>) -> PortResult<Submission>;

    /// Fetches the current state of a previously submitted job.
    async fn poll(&self, job_id: &JobId) -> PortResult<JobPoll>;
}

#[async_trait]
pub trait LessonStore: Send + Sync {
    /// Persists a lesson as the most recent entry. Existing ids are never overwritten.
    async fn create(&self, lesson: &Lesson) -> PortResult<()>;

    /// Returns every lesson, most recent first.
    async fn list(&self) -> PortResult<Vec<Lesson>>;

    /// Looks a lesson up by id. Absence is `Ok(None)`.
    async fn get_by_id(&self, id: &LessonId) -> PortResult<Option<Lesson>>;
}
