use crate::error::{config_error, env_error, SyncResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default trading updates page
pub const DEFAULT_FTMO_URL: &str = "https://ftmo.com/en/trading-updates/";
/// Default relevance keywords, matched case-insensitively
pub const DEFAULT_KEYWORDS: &[&str] = &["maintenance", "crypto market is closed", "ctrader"];
/// Default title of every created event
pub const DEFAULT_EVENT_SUMMARY: &str = "cTrader Maintenance/Crypto Market Closure";
/// Default display name of the sub-calendar
pub const DEFAULT_CALENDAR_NAME: &str = "Trading";
/// FTMO publishes its times in GMT+3, which is `Etc/GMT-3` in IANA notation
pub const DEFAULT_TIMEZONE: &str = "Etc/GMT-3";
/// Gemini models in priority order
pub const DEFAULT_GEMINI_MODELS: &[&str] =
    &["gemini-2.0-flash", "gemini-1.5-flash", "gemini-1.5-pro"];
/// Accepted values for the lookahead window, in days
pub const LOOKAHEAD_RANGE: std::ops::RangeInclusive<i64> = 1..=3650;

/// Immutable run configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: String,
    /// Gemini model identifiers, tried in order
    pub gemini_models: Vec<String>,
    /// Page that publishes the trading updates
    pub ftmo_url: String,
    /// Lowercased keywords, any of which marks an update as relevant
    pub keywords: Vec<String>,
    /// Title used for every created event
    pub event_summary: String,
    /// Display name of the calendar events are written to
    pub calendar_name: String,
    /// Zone every event is expressed in
    pub timezone: Tz,
    /// Days ahead scanned for existing events
    pub lookahead_days: i64,
    /// Page fetch timeout
    pub fetch_timeout: Duration,
    /// Page fetch attempts before giving up
    pub fetch_max_attempts: u32,
    /// Pause between page fetch attempts
    pub fetch_retry_delay: Duration,
    /// Whole-extraction attempts before the run fails
    pub extract_max_attempts: u32,
    /// Pause between extraction attempts
    pub extract_retry_delay: Duration,
    /// OAuth client secret file (installed application format)
    pub credentials_file: PathBuf,
    /// Refreshable token file
    pub token_file: PathBuf,
    /// Loopback port used by the consent flow
    pub oauth_redirect_port: u16,
}

impl Config {
    /// Load configuration from the process environment and an optional .env file
    pub fn load() -> SyncResult<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Required
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| env_error("GEMINI_API_KEY"))?;

        let ftmo_url = lookup("FTMO_URL").unwrap_or_else(|| DEFAULT_FTMO_URL.to_string());

        let keywords = match lookup("KEYWORDS") {
            Some(raw) => split_list(&raw)
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            None => DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        };

        let gemini_models = match lookup("GEMINI_MODELS") {
            Some(raw) => split_list(&raw),
            None => DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        if gemini_models.is_empty() {
            return Err(config_error("GEMINI_MODELS must name at least one model"));
        }

        let event_summary =
            lookup("EVENT_SUMMARY").unwrap_or_else(|| DEFAULT_EVENT_SUMMARY.to_string());
        let calendar_name =
            lookup("CALENDAR_NAME").unwrap_or_else(|| DEFAULT_CALENDAR_NAME.to_string());

        let tz_name = lookup("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid TIMEZONE: {}", tz_name)))?;

        let lookahead_days = parse_or(&lookup, "LOOKAHEAD_DAYS", 7i64)?;
        if !LOOKAHEAD_RANGE.contains(&lookahead_days) {
            return Err(config_error(&format!(
                "Invalid LOOKAHEAD_DAYS: {} (expected {}..={})",
                lookahead_days,
                LOOKAHEAD_RANGE.start(),
                LOOKAHEAD_RANGE.end()
            )));
        }
        let fetch_max_attempts = parse_or(&lookup, "FETCH_MAX_ATTEMPTS", 3u32)?;
        let fetch_retry_delay =
            Duration::from_secs(parse_or(&lookup, "FETCH_RETRY_DELAY_SECS", 5u64)?);
        let extract_max_attempts = parse_or(&lookup, "EXTRACT_MAX_ATTEMPTS", 3u32)?;
        let extract_retry_delay =
            Duration::from_secs(parse_or(&lookup, "EXTRACT_RETRY_DELAY_SECS", 10u64)?);
        let oauth_redirect_port = parse_or(&lookup, "OAUTH_REDIRECT_PORT", 8080u16)?;

        let credentials_file = PathBuf::from(
            lookup("GOOGLE_CREDENTIALS_FILE").unwrap_or_else(|| "credentials.json".to_string()),
        );
        let token_file =
            PathBuf::from(lookup("GOOGLE_TOKEN_FILE").unwrap_or_else(|| "token.json".to_string()));

        Ok(Config {
            gemini_api_key,
            gemini_models,
            ftmo_url,
            keywords,
            event_summary,
            calendar_name,
            timezone,
            lookahead_days,
            fetch_timeout: Duration::from_secs(30),
            fetch_max_attempts,
            fetch_retry_delay,
            extract_max_attempts,
            extract_retry_delay,
            credentials_file,
            token_file,
            oauth_redirect_port,
        })
    }
}

/// Split a comma-separated list, dropping blank entries
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> SyncResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format: {}", key, raw))),
        None => Ok(default),
    }
}
