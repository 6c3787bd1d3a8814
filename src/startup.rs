use crate::components::google_calendar::TokenManager;
use crate::components::{FtmoScraper, GeminiEventParser, GoogleCalendarClient, Reconciler};
use crate::config::Config;
use crate::error::Error;
use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn,rig=warn")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the run configuration; missing required values are fatal
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("FATAL: failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

/// Authorize against the calendar, wire the components and run once
pub async fn run(config: Config) -> miette::Result<()> {
    info!("--- Running FTMO Update Check: {} ---", Local::now());

    let token = TokenManager::from_config(&config).get_token().await.map_err(|e| {
        error!("FATAL: no usable calendar credentials: {}", e);
        e
    })?;

    let calendar = GoogleCalendarClient::new(token.access_token, config.timezone)?;
    let scraper = FtmoScraper::new(&config)?;
    let parser = GeminiEventParser::new(&config);
    let reconciler = Reconciler::new(&config, scraper, parser, calendar);

    match reconciler.run().await {
        Ok(outcome) => {
            info!("--- Check Finished ({}) ---", outcome);
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {:?}", e);
            Err(e.into())
        }
    }
}
