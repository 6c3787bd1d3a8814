mod auth;
mod client;
pub mod models;
mod time;
pub mod token;

pub use auth::{authorization_url, exchange_code, BrowserConsent};
pub use client::{GoogleCalendarClient, GOOGLE_CALENDAR_API, PRIMARY_CALENDAR};
pub use models::{CalendarEvent, CreateOutcome, EventKey, NormalizedEvent};
pub use time::{get_event_start, parse_event_time};
pub use token::{ClientSecret, ConsentFlow, StoredToken, TokenManager};

use async_trait::async_trait;
use std::collections::HashSet;

/// Remote calendar the reconciler writes to.
///
/// Read failures fail open and write failures are swallowed here, so the
/// reconciler never has to handle provider errors.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Id of the calendar named `name`, created if missing; falls back to
    /// the primary calendar on any error
    async fn resolve_calendar(&self, name: &str) -> String;

    /// Keys of events starting within the next `lookahead_days`; empty on error
    async fn list_upcoming(&self, calendar_id: &str, lookahead_days: i64) -> HashSet<EventKey>;

    /// Create one event unless it already ended
    async fn create_event(&self, calendar_id: &str, event: &NormalizedEvent) -> CreateOutcome;
}
