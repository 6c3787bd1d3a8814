use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(
        code(ftmo_sync::environment),
        help("Set the variable in the environment or in a .env file")
    )]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(ftmo_sync::config))]
    Config(String),

    #[error("Network error: {0}")]
    #[diagnostic(code(ftmo_sync::network))]
    Network(String),

    #[error("Scrape error: {0}")]
    #[diagnostic(code(ftmo_sync::scrape))]
    Scrape(String),

    #[error("Malformed model response: {0}")]
    #[diagnostic(code(ftmo_sync::malformed_response))]
    MalformedResponse(String),

    #[error("Model error: {0}")]
    #[diagnostic(code(ftmo_sync::model))]
    Model(String),

    #[error("All models failed, last error: {0}")]
    #[diagnostic(
        code(ftmo_sync::models_exhausted),
        help("Check GEMINI_API_KEY and GEMINI_MODELS, or run check_models")
    )]
    ModelsExhausted(String),

    #[error("Authorization error: {0}")]
    #[diagnostic(
        code(ftmo_sync::auth),
        help("Run get_calendar_token to grant calendar access again")
    )]
    Auth(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(ftmo_sync::google_calendar))]
    GoogleCalendar(String),

    #[error(transparent)]
    #[diagnostic(code(ftmo_sync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(ftmo_sync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(ftmo_sync::other))]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create network errors
pub fn network_error(message: &str) -> Error {
    Error::Network(message.to_string())
}

/// Helper to create model errors
pub fn model_error(message: &str) -> Error {
    Error::Model(message.to_string())
}

/// Helper to create authorization errors
pub fn auth_error(message: &str) -> Error {
    Error::Auth(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
