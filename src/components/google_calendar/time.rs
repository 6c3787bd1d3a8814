use super::models::{CalendarEvent, EventDateTime};
use crate::error::{google_calendar_error, SyncResult};
use crate::utils::time::localize;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

/// Convert an API start/end into the configured zone.
/// Date-only values (all-day events) map to local midnight.
pub fn parse_event_time(value: &EventDateTime, tz: &Tz) -> SyncResult<Option<DateTime<Tz>>> {
    if let Some(date_time) = &value.date_time {
        let dt = DateTime::parse_from_rfc3339(date_time).map_err(|e| {
            google_calendar_error(&format!("Failed to parse datetime '{}': {}", date_time, e))
        })?;
        Ok(Some(dt.with_timezone(tz)))
    } else if let Some(date) = &value.date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| google_calendar_error(&format!("Failed to parse date: {}", e)))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| google_calendar_error("Failed to create datetime"))?;
        let local = localize(&midnight, tz)
            .ok_or_else(|| google_calendar_error("Invalid local time"))?;
        Ok(Some(local))
    } else {
        Ok(None)
    }
}

/// Get event start time in the configured zone
pub fn get_event_start(event: &CalendarEvent, tz: &Tz) -> SyncResult<Option<DateTime<Tz>>> {
    parse_event_time(&event.start, tz)
}
