use super::models::{
    CalendarEvent, CalendarListEntry, CalendarListPage, CreateOutcome, EventKey, EventsPage,
    NormalizedEvent,
};
use super::time::get_event_start;
use super::CalendarStore;
use crate::error::{google_calendar_error, SyncResult};
use crate::utils::time::format_wall_clock;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};
use url::Url;

pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

/// Identity used when no named calendar can be resolved
pub const PRIMARY_CALENDAR: &str = "primary";

/// Google Calendar REST client
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    access_token: String,
    timezone: Tz,
}

impl GoogleCalendarClient {
    pub fn new(access_token: impl Into<String>, timezone: Tz) -> SyncResult<Self> {
        Self::with_base_url(GOOGLE_CALENDAR_API, access_token, timezone)
    }

    /// Client talking to another API root (used against local test servers)
    pub fn with_base_url(
        base_url: &str,
        access_token: impl Into<String>,
        timezone: Tz,
    ) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timezone,
        })
    }

    fn url(&self, path: &str) -> SyncResult<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))
    }

    fn events_path(calendar_id: &str) -> String {
        format!("/calendars/{}/events", urlencoding::encode(calendar_id))
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> SyncResult<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to {}: {}", action, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to {}: HTTP {} - {}",
                action, status, error_body
            )));
        }

        Ok(response)
    }

    /// All calendars on the user's calendar list
    pub async fn fetch_calendars(&self) -> SyncResult<Vec<CalendarListEntry>> {
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url("/users/me/calendarList")?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: CalendarListPage = self
                .send(self.client.get(url), "list calendars")
                .await?
                .json()
                .await
                .map_err(|e| {
                    google_calendar_error(&format!("Failed to parse calendar list: {}", e))
                })?;

            calendars.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    /// Create a secondary calendar and return its id
    pub async fn insert_calendar(&self, name: &str) -> SyncResult<String> {
        let url = self.url("/calendars")?;
        let body = json!({
            "summary": name,
            "timeZone": self.timezone.name(),
        });

        let created: CalendarListEntry = self
            .send(self.client.post(url).json(&body), "create calendar")
            .await?
            .json()
            .await
            .map_err(|e| {
                google_calendar_error(&format!("Failed to parse created calendar: {}", e))
            })?;

        Ok(created.id)
    }

    /// Events starting between `time_min` and `time_max`, recurring events expanded
    pub async fn fetch_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> SyncResult<Vec<CalendarEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&Self::events_path(calendar_id))?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("timeMin", &time_min.to_rfc3339())
                    .append_pair("timeMax", &time_max.to_rfc3339())
                    .append_pair("singleEvents", "true")
                    .append_pair("orderBy", "startTime");
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: EventsPage = self
                .send(self.client.get(url), "fetch events")
                .await?
                .json()
                .await
                .map_err(|e| {
                    google_calendar_error(&format!("Failed to parse events response: {}", e))
                })?;

            events.extend(page.items);
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }

    /// Insert one event, returning the created resource
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &NormalizedEvent,
    ) -> SyncResult<CalendarEvent> {
        let url = self.url(&Self::events_path(calendar_id))?;
        let tz_name = self.timezone.name();
        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": {
                "dateTime": format_wall_clock(&event.start.with_timezone(&self.timezone)),
                "timeZone": tz_name,
            },
            "end": {
                "dateTime": format_wall_clock(&event.end.with_timezone(&self.timezone)),
                "timeZone": tz_name,
            },
        });

        self.send(self.client.post(url).json(&body), "create event")
            .await?
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse created event: {}", e)))
    }

    /// Duplicate keys for a set of listed events; events without a summary
    /// or a parseable start are skipped
    pub fn event_keys(&self, events: &[CalendarEvent]) -> HashSet<EventKey> {
        events
            .iter()
            .filter_map(|event| {
                let summary = event.summary.clone()?;
                match get_event_start(event, &self.timezone) {
                    Ok(Some(start)) => Some(EventKey { summary, start }),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("Skipping event {}: {}", event.id, e);
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarClient {
    async fn resolve_calendar(&self, name: &str) -> String {
        let calendars = match self.fetch_calendars().await {
            Ok(calendars) => calendars,
            Err(e) => {
                error!("Could not list calendars, using '{}': {}", PRIMARY_CALENDAR, e);
                return PRIMARY_CALENDAR.to_string();
            }
        };

        if let Some(found) = calendars.into_iter().find(|c| c.summary == name) {
            info!("Using calendar '{}' ({})", name, found.id);
            return found.id;
        }

        info!("Calendar '{}' not found, creating it", name);
        match self.insert_calendar(name).await {
            Ok(id) => {
                info!("Created calendar '{}' ({})", name, id);
                id
            }
            Err(e) => {
                error!("Could not create calendar '{}', using '{}': {}", name, PRIMARY_CALENDAR, e);
                PRIMARY_CALENDAR.to_string()
            }
        }
    }

    async fn list_upcoming(&self, calendar_id: &str, lookahead_days: i64) -> HashSet<EventKey> {
        let now = Utc::now();
        let Some(time_max) = Duration::try_days(lookahead_days.max(0))
            .and_then(|window| now.checked_add_signed(window))
        else {
            error!("Lookahead of {} days is out of range, assuming no events", lookahead_days);
            return HashSet::new();
        };

        match self.fetch_events(calendar_id, now, time_max).await {
            Ok(events) => {
                let keys = self.event_keys(&events);
                debug!("Found {} upcoming event(s), {} usable keys", events.len(), keys.len());
                keys
            }
            Err(e) => {
                error!("Could not list upcoming events, assuming none: {}", e);
                HashSet::new()
            }
        }
    }

    async fn create_event(&self, calendar_id: &str, event: &NormalizedEvent) -> CreateOutcome {
        if event.has_ended(Utc::now()) {
            info!(
                "Event '{}' ending {} is in the past, not creating it",
                event.summary, event.end
            );
            return CreateOutcome::SkippedPast;
        }

        match self.insert_event(calendar_id, event).await {
            Ok(created) => {
                info!(
                    "Event created successfully: {}",
                    created.html_link.as_deref().unwrap_or(&created.id)
                );
                CreateOutcome::Created
            }
            Err(e) => {
                error!("An error occurred while creating the calendar event: {}", e);
                CreateOutcome::Failed
            }
        }
    }
}
