//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;
use tutorial_core::{AnalysisClient, ImageEncoder, PipelineController, PollPolicy};

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which vision model backend analyzes screenshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisProviderKind {
    OpenAi,
    Disabled,
}

impl FromStr for AnalysisProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "none" | "disabled" => Ok(Self::Disabled),
            other => Err(format!("'{}' is not a known analysis provider", other)),
        }
    }
}

/// Which video generation backend produces demonstration clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoProviderKind {
    Http,
    Disabled,
}

impl FromStr for VideoProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "none" | "disabled" => Ok(Self::Disabled),
            other => Err(format!("'{}' is not a known video provider", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub seed_sample_lessons: bool,
    pub analysis_provider: AnalysisProviderKind,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub analysis_model: String,
    pub analysis_timeout: Duration,
    pub video_provider: VideoProviderKind,
    pub video_api_url: Option<String>,
    pub video_api_key: Option<String>,
    pub poll_policy: PollPolicy,
    pub max_image_bytes: usize,
    pub settle_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            database_url: "sqlite://lessons.db?mode=rwc".to_string(),
            log_level: Level::INFO,
            cors_origin: "http://localhost:3000".to_string(),
            seed_sample_lessons: false,
            analysis_provider: AnalysisProviderKind::OpenAi,
            openai_api_key: None,
            openai_base_url: None,
            analysis_model: "gpt-4o-mini".to_string(),
            analysis_timeout: AnalysisClient::DEFAULT_TIMEOUT,
            video_provider: VideoProviderKind::Http,
            video_api_url: None,
            video_api_key: None,
            poll_policy: PollPolicy::default(),
            max_image_bytes: ImageEncoder::DEFAULT_MAX_BYTES,
            settle_delay: PipelineController::DEFAULT_SETTLE_DELAY,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // --- Server and Database Settings ---
        let bind_address = parse_or("BIND_ADDRESS", &lookup, defaults.bind_address)?;
        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url);

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);
        let seed_sample_lessons =
            parse_or("SEED_SAMPLE_LESSONS", &lookup, defaults.seed_sample_lessons)?;

        // --- Providers (API keys are optional) ---
        let analysis_provider = parse_or("ANALYSIS_PROVIDER", &lookup, defaults.analysis_provider)?;
        let openai_api_key = non_empty(lookup("OPENAI_API_KEY"));
        let openai_base_url = non_empty(lookup("OPENAI_BASE_URL"));
        let analysis_model = lookup("ANALYSIS_MODEL").unwrap_or(defaults.analysis_model);
        let analysis_timeout_secs: u64 = parse_or(
            "ANALYSIS_TIMEOUT_SECS",
            &lookup,
            defaults.analysis_timeout.as_secs(),
        )?;

        let video_provider = parse_or("VIDEO_PROVIDER", &lookup, defaults.video_provider)?;
        let video_api_url = non_empty(lookup("VIDEO_API_URL"));
        let video_api_key = non_empty(lookup("VIDEO_API_KEY"));

        // --- Pipeline Settings ---
        let interval_secs: u64 = parse_or(
            "VIDEO_POLL_INTERVAL_SECS",
            &lookup,
            defaults.poll_policy.interval.as_secs(),
        )?;
        let max_attempts: u32 = parse_or(
            "VIDEO_POLL_ATTEMPTS",
            &lookup,
            defaults.poll_policy.max_attempts,
        )?;
        let max_image_bytes = parse_or("MAX_IMAGE_BYTES", &lookup, defaults.max_image_bytes)?;
        let settle_delay_ms: u64 = parse_or(
            "SETTLE_DELAY_MS",
            &lookup,
            defaults.settle_delay.as_millis() as u64,
        )?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            seed_sample_lessons,
            analysis_provider,
            openai_api_key,
            openai_base_url,
            analysis_model,
            analysis_timeout: Duration::from_secs(analysis_timeout_secs),
            video_provider,
            video_api_url,
            video_api_key,
            poll_policy: PollPolicy {
                interval: Duration::from_secs(interval_secs),
                max_attempts,
            },
            max_image_bytes,
            settle_delay: Duration::from_millis(settle_delay_ms),
        })
    }
}

fn parse_or<T, F>(name: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
