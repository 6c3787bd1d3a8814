mod gemini;
pub mod models;
mod prompt;
pub mod response;

pub use gemini::{list_generate_models, GeminiModel, GEMINI_API_BASE};
pub use models::{EventTime, RawEventCandidate};
pub use prompt::build_prompt;

use crate::config::Config;
use crate::error::{Error, SyncResult};
use crate::utils::RetryPolicy;
use async_trait::async_trait;
use tracing::{info, warn};

/// A text-in, text-out language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier, used in logs
    fn name(&self) -> &str;

    /// Send one prompt and return the raw reply
    async fn complete(&self, prompt: &str) -> SyncResult<String>;
}

/// Turns update text into event intervals
#[async_trait]
pub trait EventExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> SyncResult<Vec<RawEventCandidate>>;
}

/// What a single model produced for the prompt
enum ModelOutcome {
    /// A parsed array, possibly empty; ends the search
    Parsed(Vec<RawEventCandidate>),
    /// The reply was not a JSON array
    Malformed(Error),
    /// The call itself failed
    Failed(Error),
}

/// Extracts events by asking models in priority order
pub struct GeminiEventParser {
    models: Vec<Box<dyn LanguageModel>>,
    retry: RetryPolicy,
}

impl GeminiEventParser {
    /// Create a parser over the configured Gemini models
    pub fn new(config: &Config) -> Self {
        let models = config
            .gemini_models
            .iter()
            .map(|model| {
                Box::new(GeminiModel::new(&config.gemini_api_key, model)) as Box<dyn LanguageModel>
            })
            .collect();

        Self::with_models(
            models,
            RetryPolicy::new(config.extract_max_attempts, config.extract_retry_delay),
        )
    }

    /// Create a parser over arbitrary models
    pub fn with_models(models: Vec<Box<dyn LanguageModel>>, retry: RetryPolicy) -> Self {
        Self { models, retry }
    }

    async fn ask(model: &dyn LanguageModel, prompt: &str) -> ModelOutcome {
        match model.complete(prompt).await {
            Ok(reply) => match response::parse_candidates(&reply) {
                Ok(candidates) => ModelOutcome::Parsed(candidates),
                Err(e) => ModelOutcome::Malformed(e),
            },
            Err(e) => ModelOutcome::Failed(e),
        }
    }

    /// One pass over the model list.
    ///
    /// A reply that cannot be parsed counts as "no events" once every model
    /// has been tried; only a pass in which every call failed is an error.
    async fn extract_once(&self, text: &str) -> SyncResult<Vec<RawEventCandidate>> {
        let prompt = build_prompt(text);
        let mut last_failure: Option<Error> = None;
        let mut malformed_replies = 0;

        for model in &self.models {
            match Self::ask(model.as_ref(), &prompt).await {
                ModelOutcome::Parsed(candidates) => {
                    info!(
                        "Model {} identified {} event(s)",
                        model.name(),
                        candidates.len()
                    );
                    return Ok(candidates);
                }
                ModelOutcome::Malformed(e) => {
                    warn!("Model {} returned an unusable reply: {}", model.name(), e);
                    malformed_replies += 1;
                }
                ModelOutcome::Failed(e) => {
                    warn!("Model {} failed: {}", model.name(), e);
                    last_failure = Some(e);
                }
            }
        }

        if malformed_replies > 0 {
            warn!(
                "No model returned a usable event list ({} unusable replies), treating as no events",
                malformed_replies
            );
            return Ok(Vec::new());
        }

        Err(Error::ModelsExhausted(
            last_failure
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no models configured".to_string()),
        ))
    }
}

#[async_trait]
impl EventExtractor for GeminiEventParser {
    async fn extract(&self, text: &str) -> SyncResult<Vec<RawEventCandidate>> {
        self.retry
            .run("Event extraction", move || self.extract_once(text))
            .await
    }
}
