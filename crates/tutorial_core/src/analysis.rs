//! crates/tutorial_core/src/analysis.rs
//!
//! Turns a screenshot into tutorial content through the configured
//! `AnalysisProvider`. This client never fails: every provider problem is
//! absorbed into `AnalysisResult::fallback()`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::AnalysisResult;
use crate::encoder::EncodedImage;
use crate::ports::AnalysisProvider;

/// The instruction sent along with every screenshot.
pub const TUTORIAL_PROMPT: &str = "Analyze this mobile app screenshot. Create a title for a 'How-to' tutorial based on what is shown. Write a short 1-sentence description. Then list 3-5 simple step-by-step instructions a senior user would follow to perform the action shown. Respond with ONLY a JSON object of the form {\"title\": string, \"description\": string, \"steps\": [string]}.";

#[derive(Debug, thiserror::Error)]
pub enum TutorialParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("response JSON has the wrong shape: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("response is missing a usable `{0}`")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
struct RawTutorial {
    title: Option<String>,
    description: Option<String>,
    steps: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AnalysisClient {
    provider: Option<Arc<dyn AnalysisProvider>>,
    timeout: Duration,
}

impl AnalysisClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// `None` means no provider is configured (e.g. missing credentials); every
    /// analysis then yields the fallback.
    pub fn new(provider: Option<Arc<dyn AnalysisProvider>>) -> Self {
        Self {
            provider,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Longest wait for the provider before settling for the fallback.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn analyze(&self, image: &EncodedImage) -> AnalysisResult {
        let Some(provider) = &self.provider else {
            warn!("No analysis provider configured, using fallback tutorial.");
            return AnalysisResult::fallback();
        };

        let reply =
            tokio::time::timeout(self.timeout, provider.describe_image(image, TUTORIAL_PROMPT)).await;
        let text = match reply {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "Screenshot analysis failed, using fallback tutorial.");
                return AnalysisResult::fallback();
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Screenshot analysis timed out, using fallback tutorial.");
                return AnalysisResult::fallback();
            }
        };

        match parse_tutorial(&text) {
            Ok(result) => {
                info!(title = %result.title, steps = result.steps.len(), "Screenshot analyzed.");
                result
            }
            Err(e) => {
                warn!(error = %e, "Unusable analysis response, using fallback tutorial.");
                AnalysisResult::fallback()
            }
        }
    }
}

/// Parses model output into tutorial content, tolerating prose and markdown
/// fences around the JSON object.
pub fn parse_tutorial(text: &str) -> Result<AnalysisResult, TutorialParseError> {
    let object = extract_json_object(text).ok_or(TutorialParseError::NoJsonObject)?;
    let raw: RawTutorial = serde_json::from_value(Value::Object(object))?;

    let title = non_blank(raw.title).ok_or(TutorialParseError::MissingField("title"))?;
    let description =
        non_blank(raw.description).ok_or(TutorialParseError::MissingField("description"))?;
    let steps: Vec<String> = raw
        .steps
        .unwrap_or_default()
        .into_iter()
        .filter_map(|step| non_blank(Some(step)))
        .collect();
    if steps.is_empty() {
        return Err(TutorialParseError::MissingField("steps"));
    }

    Ok(AnalysisResult {
        title,
        description,
        steps,
    })
}

/// Returns the first well-formed JSON object found in `text`.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let mut values =
                serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Object(object))) => Some(object),
                _ => None,
            }
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{ImageEncoder, RawImage};
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: Mutex<Option<PortResult<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(reply: PortResult<String>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AnalysisProvider for ScriptedProvider {
        async fn describe_image(&self, _image: &EncodedImage, prompt: &str) -> PortResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(PortError::Unexpected("no reply scripted".into())))
        }
    }

    async fn screenshot() -> EncodedImage {
        ImageEncoder::default()
            .encode(RawImage::from_bytes(
                vec![0xFF, 0xD8, 0xFF, 0xE0],
                Some("image/jpeg".into()),
            ))
            .await
            .unwrap()
    }

    async fn analyze_with(reply: PortResult<String>) -> AnalysisResult {
        let client = AnalysisClient::new(Some(ScriptedProvider::new(reply)));
        client.analyze(&screenshot().await).await
    }

    #[test]
    fn parses_plain_json() {
        let result = parse_tutorial(
            r#"{"title":"Share a photo","description":"Send a picture.","steps":["a","b","c"]}"#,
        )
        .unwrap();
        assert_eq!(result.title, "Share a photo");
        assert_eq!(result.steps, vec!["a", "b", "c"]);
    }

    #[test]
    fn extracts_json_from_fenced_prose() {
        let text = "Sure! Here is your tutorial:\n```json\n{\"title\": \"Call a friend\", \"description\": \"Place a call.\", \"steps\": [\"Open Phone.\", \"Tap Contacts.\", \"Tap the name.\"]}\n```\nLet me know {if} you need more.";
        let result = parse_tutorial(text).unwrap();
        assert_eq!(result.title, "Call a friend");
        assert_eq!(result.steps.len(), 3);
    }

    #[test]
    fn skips_braces_that_are_not_json() {
        let text = "Use {curly} words, then {\"title\":\"T\",\"description\":\"D\",\"steps\":[\"S\"]}";
        assert_eq!(parse_tutorial(text).unwrap().title, "T");
    }

    #[test]
    fn blank_steps_are_dropped_in_order() {
        let result = parse_tutorial(
            r#"{"title":"T","description":"D","steps":["first"," ","second"]}"#,
        )
        .unwrap();
        assert_eq!(result.steps, vec!["first", "second"]);
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(matches!(
            parse_tutorial(r#"{"description":"D","steps":["S"]}"#),
            Err(TutorialParseError::MissingField("title"))
        ));
        assert!(matches!(
            parse_tutorial(r#"{"title":"T","description":"  ","steps":["S"]}"#),
            Err(TutorialParseError::MissingField("description"))
        ));
        assert!(matches!(
            parse_tutorial(r#"{"title":"T","description":"D","steps":[]}"#),
            Err(TutorialParseError::MissingField("steps"))
        ));
        assert!(matches!(
            parse_tutorial("no json here"),
            Err(TutorialParseError::NoJsonObject)
        ));
    }

    #[tokio::test]
    async fn sends_the_tutorial_prompt() {
        let provider = ScriptedProvider::new(Ok(
            r#"{"title":"T","description":"D","steps":["S"]}"#.to_string()
        ));
        let client = AnalysisClient::new(Some(provider.clone()));
        client.analyze(&screenshot().await).await;
        assert_eq!(
            *provider.prompts.lock().unwrap(),
            vec![TUTORIAL_PROMPT.to_string()]
        );
    }

    #[tokio::test]
    async fn provider_errors_yield_the_fallback() {
        let result = analyze_with(Err(PortError::Unavailable("connection refused".into()))).await;
        assert_eq!(result, AnalysisResult::fallback());
    }

    #[tokio::test]
    async fn unparseable_responses_yield_the_fallback() {
        let result = analyze_with(Ok("I cannot help with that.".to_string())).await;
        assert_eq!(result.title, "New Tutorial");
        assert_eq!(result.steps.len(), 3);
    }

    #[tokio::test]
    async fn missing_provider_yields_the_fallback() {
        let client = AnalysisClient::new(None);
        let result = client.analyze(&screenshot().await).await;
        assert!(!result.title.is_empty());
        assert!(!result.description.is_empty());
        assert!(!result.steps.is_empty());
    }

    struct StalledProvider;

    #[async_trait]
    impl AnalysisProvider for StalledProvider {
        async fn describe_image(&self, _image: &EncodedImage, _prompt: &str) -> PortResult<String> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_yields_the_fallback_after_the_timeout() {
        let client = AnalysisClient::new(Some(Arc::new(StalledProvider)))
            .with_timeout(Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let result = client.analyze(&screenshot().await).await;

        assert_eq!(result, AnalysisResult::fallback());
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }
}
