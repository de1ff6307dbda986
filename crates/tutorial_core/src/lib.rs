pub mod analysis;
pub mod domain;
pub mod encoder;
pub mod pipeline;
pub mod ports;
pub mod video;

pub use analysis::{AnalysisClient, TUTORIAL_PROMPT};
pub use domain::{
    AnalysisResult, GenerationJob, JobId, JobPoll, JobStatus, Lesson, LessonId, Submission,
    VideoRef,
};
pub use encoder::{EncodedImage, EncodingError, ImageEncoder, RawImage};
pub use pipeline::{
    GenerationRun, PipelineController, PipelineError, PipelineStatus, VideoState,
};
pub use ports::{AnalysisProvider, LessonStore, PortError, PortResult, VideoProvider};
pub use video::{PollPolicy, VideoOrchestrator, VideoOutcome};
