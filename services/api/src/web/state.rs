//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use tutorial_core::{
    ports::{AnalysisProvider, LessonStore, VideoProvider},
    AnalysisClient, ImageEncoder, PipelineController, VideoOrchestrator,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub lessons: Arc<dyn LessonStore>,
    pub pipeline: Arc<PipelineController>,
}

impl AppState {
    /// Wires the generation pipeline from explicitly constructed providers.
    pub fn new(
        config: Arc<Config>,
        lessons: Arc<dyn LessonStore>,
        analysis_provider: Option<Arc<dyn AnalysisProvider>>,
        video_provider: Option<Arc<dyn VideoProvider>>,
    ) -> Self {
        let pipeline = PipelineController::new(
            ImageEncoder::new(config.max_image_bytes),
            AnalysisClient::new(analysis_provider).with_timeout(config.analysis_timeout),
            VideoOrchestrator::new(video_provider, config.poll_policy),
            lessons.clone(),
        )
        .with_settle_delay(config.settle_delay);

        Self {
            config,
            lessons,
            pipeline: Arc::new(pipeline),
        }
    }
}
