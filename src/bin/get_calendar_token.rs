use ftmo_calendar_sync::components::google_calendar::TokenManager;
use ftmo_calendar_sync::config::Config;
use ftmo_calendar_sync::startup;
use tracing::info;

/// Grant calendar access interactively and store the token file
#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    // Load configuration
    let config = Config::load()?;

    // Browser consent, then persist the token
    let token_manager = TokenManager::from_config(&config);
    token_manager.reauthorize().await?;

    info!("Token successfully saved to {}", config.token_file.display());

    Ok(())
}
