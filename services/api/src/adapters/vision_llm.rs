//! services/api/src/adapters/vision_llm.rs
//!
//! This module contains the adapter for the screenshot-analysis vision model.
//! It implements the `AnalysisProvider` port from the `core` crate against any
//! OpenAI-compatible chat completions endpoint.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tutorial_core::{
    encoder::EncodedImage,
    ports::{AnalysisProvider, PortError, PortResult},
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnalysisProvider` using an OpenAI-compatible vision model.
#[derive(Clone)]
pub struct OpenAiVisionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVisionAdapter {
    /// Creates a new `OpenAiVisionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client from credentials, optionally pointing at a compatible endpoint.
    /// Every HTTP request is bounded by `timeout`.
    pub fn from_credentials(
        api_key: &str,
        base_url: Option<&str>,
        model: String,
        timeout: Duration,
    ) -> PortResult<Self> {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = base_url {
            config = config.with_api_base(base_url);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self::new(
            Client::with_config(config).with_http_client(http),
            model,
        ))
    }
}

//=========================================================================================
// `AnalysisProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnalysisProvider for OpenAiVisionAdapter {
    /// Sends the screenshot inline as a data URL together with the tutorial prompt.
    async fn describe_image(&self, image: &EncodedImage, prompt: &str) -> PortResult<String> {
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(image.data_url())
                    .detail(ImageDetail::High)
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?,
            )
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(vec![image_part.into(), text_part.into()])
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(800u32)
            .temperature(0.4)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::Reqwest(e) => PortError::Unavailable(e.to_string()),
                other => PortError::Unexpected(other.to_string()),
            })?;

        // Extract the text content from the first choice in the response.
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                PortError::Unexpected("Vision model response contained no text content.".to_string())
            })
    }
}
