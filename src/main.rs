use ftmo_calendar_sync::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting FTMO calendar sync");

    // Load configuration
    let config = startup::load_config()?;

    // Run the pipeline once
    startup::run(config).await
}
