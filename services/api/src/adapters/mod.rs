pub mod db;
pub mod video_http;
pub mod vision_llm;

pub use db::DbAdapter;
pub use video_http::HttpVideoAdapter;
pub use vision_llm::OpenAiVisionAdapter;

use crate::config::{AnalysisProviderKind, Config, VideoProviderKind};
use std::sync::Arc;
use tracing::{info, warn};
use tutorial_core::ports::{AnalysisProvider, PortResult, VideoProvider};

/// Selects the analysis backend from configuration. `None` means every
/// screenshot gets the fallback tutorial.
pub fn analysis_provider(config: &Config) -> PortResult<Option<Arc<dyn AnalysisProvider>>> {
    match config.analysis_provider {
        AnalysisProviderKind::Disabled => {
            info!("Screenshot analysis disabled by configuration.");
            Ok(None)
        }
        AnalysisProviderKind::OpenAi => match &config.openai_api_key {
            Some(api_key) => {
                info!(model = %config.analysis_model, "Using OpenAI-compatible vision analysis.");
                let adapter = OpenAiVisionAdapter::from_credentials(
                    api_key,
                    config.openai_base_url.as_deref(),
                    config.analysis_model.clone(),
                    config.analysis_timeout,
                )?;
                Ok(Some(Arc::new(adapter)))
            }
            None => {
                warn!("OPENAI_API_KEY is not set; screenshots will get the fallback tutorial.");
                Ok(None)
            }
        },
    }
}

/// Selects the video backend from configuration. `None` means lessons are text-only.
pub fn video_provider(config: &Config) -> PortResult<Option<Arc<dyn VideoProvider>>> {
    match config.video_provider {
        VideoProviderKind::Disabled => {
            info!("Video synthesis disabled by configuration.");
            Ok(None)
        }
        VideoProviderKind::Http => match &config.video_api_url {
            Some(url) => {
                info!(%url, "Using HTTP video job API.");
                let adapter = HttpVideoAdapter::new(
                    url,
                    config.video_api_key.clone(),
                    HttpVideoAdapter::REQUEST_TIMEOUT,
                )?;
                Ok(Some(Arc::new(adapter)))
            }
            None => {
                warn!("VIDEO_API_URL is not set; lessons will be text-only.");
                Ok(None)
            }
        },
    }
}
