//! crates/tutorial_core/src/video.rs
//!
//! Best-effort demonstration video synthesis.
//!
//! A submission either returns a video right away or a job id. Jobs are polled
//! on a fixed interval until they reach a terminal status, the poll budget runs
//! out, or the run is cancelled. Every failure path ends in "no video".

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{GenerationJob, JobStatus, Submission, VideoRef};
use crate::encoder::EncodedImage;
use crate::ports::VideoProvider;

const ANIMATION_INSTRUCTION: &str =
    "Animate this interface to show a user tapping the main button. Educational style, clear visibility.";

/// Builds the generation prompt from the tutorial title, if there is one.
pub fn video_prompt(hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => format!("{hint}. {ANIMATION_INSTRUCTION}"),
        None => ANIMATION_INSTRUCTION.to_string(),
    }
}

/// How often and how long a pending job is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 30,
        }
    }
}

impl PollPolicy {
    /// Upper bound on the whole synthesis attempt, submission included.
    pub fn ceiling(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// How a synthesis attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoOutcome {
    /// The provider answered the submission with a finished video.
    Immediate(VideoRef),
    Completed { video: VideoRef, polls: u32 },
    Failed { polls: u32 },
    TimedOut { polls: u32 },
    Cancelled { polls: u32 },
    /// The submission itself was refused or could not be sent.
    Rejected(String),
    /// No provider is configured.
    Unavailable,
}

impl VideoOutcome {
    pub fn into_video(self) -> Option<VideoRef> {
        match self {
            Self::Immediate(video) | Self::Completed { video, .. } => Some(video),
            _ => None,
        }
    }

    pub fn polls(&self) -> u32 {
        match self {
            Self::Completed { polls, .. }
            | Self::Failed { polls }
            | Self::TimedOut { polls }
            | Self::Cancelled { polls } => *polls,
            _ => 0,
        }
    }
}

#[derive(Clone)]
pub struct VideoOrchestrator {
    provider: Option<Arc<dyn VideoProvider>>,
    policy: PollPolicy,
}

impl VideoOrchestrator {
    pub fn new(provider: Option<Arc<dyn VideoProvider>>, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    /// Returns a video reference, or `None` when no video could be produced.
    pub async fn synthesize(
        &self,
        image: &EncodedImage,
        hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Option<VideoRef> {
        self.synthesize_detailed(image, hint, cancel)
            .await
            .into_video()
    }

    pub async fn synthesize_detailed(
        &self,
        image: &EncodedImage,
        hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> VideoOutcome {
        let Some(provider) = &self.provider else {
            info!("No video provider configured, skipping video synthesis.");
            return VideoOutcome::Unavailable;
        };
        if cancel.is_cancelled() {
            return VideoOutcome::Cancelled { polls: 0 };
        }

        let prompt = video_prompt(hint);
        let started = Instant::now();
        let deadline = started + self.policy.ceiling();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => VideoOutcome::Cancelled { polls: 0 },
            submission = provider.submit(image, Some(&prompt)) => match submission {
                Ok(Submission::Ready(video)) => VideoOutcome::Immediate(video),
                Ok(Submission::Pending(job_id)) => {
                    info!(job_id = %job_id, "Video job submitted, polling for the result.");
                    self.poll_job(provider.as_ref(), GenerationJob::new(job_id), started, cancel)
                        .await
                }
                Err(e) => {
                    warn!(error = %e, "Video submission was rejected.");
                    VideoOutcome::Rejected(e.to_string())
                }
            },
            _ = sleep_until(deadline) => VideoOutcome::TimedOut { polls: 0 },
        };

        match &outcome {
            VideoOutcome::Immediate(_) | VideoOutcome::Completed { .. } => {
                info!(polls = outcome.polls(), "Video synthesized.");
            }
            VideoOutcome::TimedOut { polls } => {
                warn!(polls, "Video job did not finish within the poll budget.");
            }
            VideoOutcome::Failed { polls } => warn!(polls, "Video job failed."),
            VideoOutcome::Cancelled { polls } => info!(polls, "Video polling cancelled."),
            _ => {}
        }
        outcome
    }

    /// Polls on a fixed schedule measured from submission: poll `k` is sent
    /// `k * interval` after `started`, and a poll that has not answered when the
    /// next one is due counts as unreachable. Nothing outlives `policy.ceiling()`.
    async fn poll_job(
        &self,
        provider: &dyn VideoProvider,
        mut job: GenerationJob,
        started: Instant,
        cancel: &CancellationToken,
    ) -> VideoOutcome {
        let deadline = started + self.policy.ceiling();
        while job.polls() < self.policy.max_attempts {
            let due = started + self.policy.interval * (job.polls() + 1);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return VideoOutcome::Cancelled { polls: job.polls() },
                _ = sleep_until(due) => {}
            }

            let answer_by = (due + self.policy.interval).min(deadline);
            let report = tokio::select! {
                biased;
                _ = cancel.cancelled() => return VideoOutcome::Cancelled { polls: job.polls() },
                report = provider.poll(job.job_id()) => Some(report),
                _ = sleep_until(answer_by) => None,
            };

            match report {
                Some(Ok(poll)) => job.record(poll),
                Some(Err(e)) => {
                    debug!(error = %e, "Poll request failed, treating the job as still running.");
                    job.record_unreachable();
                }
                None => {
                    debug!("Poll request did not answer in time, treating the job as still running.");
                    job.record_unreachable();
                }
            }
            debug!(job_id = %job.job_id(), polls = job.polls(), status = ?job.status(), "Polled video job.");

            match job.status() {
                JobStatus::Pending => continue,
                JobStatus::Failed => return VideoOutcome::Failed { polls: job.polls() },
                JobStatus::Succeeded => {
                    return match job.result() {
                        Some(video) => VideoOutcome::Completed {
                            video: video.clone(),
                            polls: job.polls(),
                        },
                        None => VideoOutcome::Failed { polls: job.polls() },
                    };
                }
            }
        }
        VideoOutcome::TimedOut { polls: job.polls() }
    }
}
