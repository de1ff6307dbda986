//! crates/tutorial_core/src/pipeline.rs
//!
//! The generation pipeline: encode, analyze, synthesize a video, persist.
//!
//! Only encoding and the final store write can fail a run. Analysis falls back
//! to generic content and video synthesis falls back to "no video", so a
//! readable screenshot always produces a lesson.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::analysis::AnalysisClient;
use crate::domain::{display_date, Lesson, LessonId};
use crate::encoder::{EncodingError, ImageEncoder, RawImage};
use crate::ports::{LessonStore, PortError};
use crate::video::{VideoOrchestrator, VideoOutcome};

//=========================================================================================
// Run status
//=========================================================================================

/// What happened to the demonstration video, for the progress message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoState {
    Attached,
    TookTooLong,
    NotAvailable,
}

impl From<&VideoOutcome> for VideoState {
    fn from(outcome: &VideoOutcome) -> Self {
        match outcome {
            VideoOutcome::Immediate(_) | VideoOutcome::Completed { .. } => Self::Attached,
            VideoOutcome::TimedOut { .. } => Self::TookTooLong,
            _ => Self::NotAvailable,
        }
    }
}

/// Observable progress of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStatus {
    Idle,
    Encoding,
    Analyzing,
    SynthesizingVideo,
    Persisting { video: VideoState },
    Ready { lesson_id: LessonId, has_video: bool },
    Failed { reason: String },
    Cancelled,
}

impl PipelineStatus {
    /// Stable machine-readable name of the stage.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Encoding => "encoding",
            Self::Analyzing => "analyzing",
            Self::SynthesizingVideo => "synthesizing_video",
            Self::Persisting { .. } => "persisting",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Progress text shown to the user.
    pub fn message(&self) -> String {
        match self {
            Self::Idle => "Waiting for a screenshot.".to_string(),
            Self::Encoding => "Preparing your screenshot...".to_string(),
            Self::Analyzing => "Analyzing your screenshot...".to_string(),
            Self::SynthesizingVideo => {
                "Creating your video guide... This may take a minute.".to_string()
            }
            Self::Persisting {
                video: VideoState::Attached,
            } => "Saving your video guide...".to_string(),
            Self::Persisting {
                video: VideoState::TookTooLong,
            } => "Video generation took too long, but your text guide is ready!".to_string(),
            Self::Persisting {
                video: VideoState::NotAvailable,
            } => "No video guide this time, but your text guide is ready!".to_string(),
            Self::Ready { .. } => "Your guide is ready.".to_string(),
            Self::Failed { .. } => {
                "Something went wrong processing your screenshot. Please try again.".to_string()
            }
            Self::Cancelled => "Generation cancelled.".to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ready { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Could not read the screenshot: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Could not save the lesson: {0}")]
    Persistence(#[source] PortError),
    #[error("Generation was cancelled")]
    Cancelled,
}

/// Handle to a single submission: status subscription and cancellation.
pub struct GenerationRun {
    status: watch::Sender<PipelineStatus>,
    cancel: CancellationToken,
}

impl Default for GenerationRun {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationRun {
    pub fn new() -> Self {
        let (status, _) = watch::channel(PipelineStatus::Idle);
        Self {
            status,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status.borrow().clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that is cancelled together with this run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn set(&self, status: PipelineStatus) {
        self.status.send_replace(status);
    }

    fn ensure_active(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//=========================================================================================
// Controller
//=========================================================================================

pub struct PipelineController {
    encoder: ImageEncoder,
    analysis: AnalysisClient,
    video: VideoOrchestrator,
    store: Arc<dyn LessonStore>,
    settle_delay: Duration,
}

impl PipelineController {
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

    pub fn new(
        encoder: ImageEncoder,
        analysis: AnalysisClient,
        video: VideoOrchestrator,
        store: Arc<dyn LessonStore>,
    ) -> Self {
        Self {
            encoder,
            analysis,
            video,
            store,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
        }
    }

    /// Pause applied before reporting a lesson that has no video.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Runs one submission to completion without outside observation.
    pub async fn run(&self, raw: RawImage) -> Result<Lesson, PipelineError> {
        self.run_with(raw, &GenerationRun::new()).await
    }

    /// Runs one submission, publishing progress on `run`.
    pub async fn run_with(
        &self,
        raw: RawImage,
        run: &GenerationRun,
    ) -> Result<Lesson, PipelineError> {
        let result = self.execute(raw, run).await;
        match &result {
            Ok(lesson) => {
                info!(lesson_id = %lesson.id, "Lesson ready.");
                run.set(PipelineStatus::Ready {
                    lesson_id: lesson.id,
                    has_video: lesson.video_url.is_some(),
                });
            }
            Err(PipelineError::Cancelled) => {
                info!("Generation cancelled before the lesson was saved.");
                run.set(PipelineStatus::Cancelled);
            }
            Err(e) => {
                error!(error = %e, "Generation failed.");
                run.set(PipelineStatus::Failed {
                    reason: e.to_string(),
                });
            }
        }
        result
    }

    async fn execute(&self, raw: RawImage, run: &GenerationRun) -> Result<Lesson, PipelineError> {
        let cancel = run.cancellation_token();

        run.set(PipelineStatus::Encoding);
        let image = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            image = self.encoder.encode(raw) => image?,
        };
        info!(mime = image.mime_type(), bytes = image.byte_len(), "Screenshot encoded.");

        run.ensure_active()?;
        run.set(PipelineStatus::Analyzing);
        let analysis = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            analysis = self.analysis.analyze(&image) => analysis,
        };

        run.ensure_active()?;
        run.set(PipelineStatus::SynthesizingVideo);
        let outcome = self
            .video
            .synthesize_detailed(&image, Some(&analysis.title), &cancel)
            .await;

        run.ensure_active()?;
        run.set(PipelineStatus::Persisting {
            video: VideoState::from(&outcome),
        });
        let video_url = outcome.into_video();
        let has_video = video_url.is_some();

        let lesson = Lesson {
            id: LessonId::new(),
            title: analysis.title,
            description: analysis.description,
            steps: analysis.steps,
            created_at: display_date(Utc::now()),
            thumbnail_url: image.data_url(),
            video_url,
        };
        self.store
            .create(&lesson)
            .await
            .map_err(PipelineError::Persistence)?;

        if !has_video && !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(lesson)
    }
}
