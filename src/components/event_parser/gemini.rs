use super::prompt::SYSTEM_PROMPT;
use super::LanguageModel;
use crate::error::{model_error, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use rig::completion::{Chat, Message};
use rig::providers::gemini::Client as GeminiClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Gemini REST root used for model discovery
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Generation method the extraction relies on
const GENERATE_CONTENT: &str = "generateContent";

/// Upper bound for one model call
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// Names of all models under `base_url` that support `generateContent`
pub async fn list_generate_models(base_url: &str, api_key: &str) -> SyncResult<Vec<String>> {
    let client = Client::builder().timeout(MODEL_TIMEOUT).build()?;
    let mut names = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut url = Url::parse(&format!("{}/models", base_url.trim_end_matches('/')))
            .map_err(|e| model_error(&format!("Invalid Gemini API base: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", api_key);
            if let Some(token) = &page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(model_error(&format!(
                "Failed to list models: HTTP {} - {}",
                status, body
            )));
        }

        let page: ModelsPage = response
            .json()
            .await
            .map_err(|e| model_error(&format!("Failed to parse model list: {}", e)))?;
        debug!("Model list page with {} entries", page.models.len());

        names.extend(
            page.models
                .into_iter()
                .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_CONTENT))
                .map(|m| m.name),
        );

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(names)
}

/// One Gemini model reached through Rig
pub struct GeminiModel {
    client: GeminiClient,
    model: String,
}

impl GeminiModel {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            client: GeminiClient::new(api_key),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> SyncResult<String> {
        info!("Using Gemini model: {}", self.model);

        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_PROMPT)
            .temperature(0.2)
            .build();

        let response = tokio::time::timeout(
            MODEL_TIMEOUT,
            agent.chat(prompt.to_string(), Vec::<Message>::new()),
        )
        .await
        .map_err(|_| model_error(&format!("{} timed out after {:?}", self.model, MODEL_TIMEOUT)))?
        .map_err(|e| model_error(&format!("{} request failed: {}", self.model, e)))?;

        Ok(response)
    }
}
