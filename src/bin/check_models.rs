use ftmo_calendar_sync::components::event_parser::{
    list_generate_models, GeminiModel, LanguageModel, GEMINI_API_BASE,
};
use ftmo_calendar_sync::config::Config;
use ftmo_calendar_sync::startup;
use tracing::{error, info, warn};

const PROBE_PROMPT: &str = "Hello, are you working?";

/// List the available Gemini models, then probe each configured one in priority order
#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    let config = Config::load()?;

    match list_generate_models(GEMINI_API_BASE, &config.gemini_api_key).await {
        Ok(available) => {
            info!("Available Gemini models:");
            for name in &available {
                info!("- {}", name);
            }
            for name in &config.gemini_models {
                let qualified = format!("models/{}", name);
                if !available.iter().any(|a| a == name || *a == qualified) {
                    warn!("Configured model {} is not in the available list", name);
                }
            }
        }
        Err(e) => error!("Could not list models: {}", e),
    }

    info!("Testing model generation...");
    let mut working = 0;
    for name in &config.gemini_models {
        let model = GeminiModel::new(&config.gemini_api_key, name);
        match model.complete(PROBE_PROMPT).await {
            Ok(reply) => {
                let preview: String = reply.chars().take(40).collect();
                info!("SUCCESS: {} responded: {}...", name, preview);
                working += 1;
            }
            Err(e) => error!("FAILED: {} - {}", name, e),
        }
    }

    info!("{}/{} configured models are usable", working, config.gemini_models.len());
    Ok(())
}
