mod common;

use chrono::{Duration, TimeZone, Utc};
use chrono_tz::Tz;
use common::MockServer;
use ftmo_calendar_sync::components::google_calendar::{
    CalendarStore, CreateOutcome, EventKey, GoogleCalendarClient, NormalizedEvent,
};
use serde_json::json;

const TZ: Tz = chrono_tz::Etc::GMTMinus3;
const SUMMARY: &str = "cTrader Maintenance/Crypto Market Closure";

fn client(server: &MockServer) -> GoogleCalendarClient {
    GoogleCalendarClient::with_base_url(&server.base_url, "test-access-token", TZ).unwrap()
}

fn event_in(hours_from_now: i64, length_hours: i64) -> NormalizedEvent {
    let start = (Utc::now() + Duration::hours(hours_from_now)).with_timezone(&TZ);
    NormalizedEvent {
        summary: SUMMARY.to_string(),
        description: "Due to ctrader maintenance, crypto market is closed.".to_string(),
        start,
        end: start + Duration::hours(length_hours),
    }
}

#[tokio::test]
async fn test_resolve_finds_calendar_by_exact_name() {
    let server = MockServer::start(|req| match req.path() {
        "/users/me/calendarList" => (
            200,
            json!({"items": [
                {"id": "personal-id", "summary": "trading"},
                {"id": "trading-id", "summary": "Trading"}
            ]})
            .to_string(),
        ),
        _ => (404, "{}".to_string()),
    });

    let id = client(&server).resolve_calendar("Trading").await;

    assert_eq!(id, "trading-id");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("Authorization"), Some("Bearer test-access-token"));
}

#[tokio::test]
async fn test_resolve_creates_missing_calendar() {
    let server = MockServer::start(|req| match (req.method.as_str(), req.path()) {
        ("GET", "/users/me/calendarList") => (200, json!({"items": []}).to_string()),
        ("POST", "/calendars") => (200, json!({"id": "new-id", "summary": "Trading"}).to_string()),
        _ => (404, "{}".to_string()),
    });

    let id = client(&server).resolve_calendar("Trading").await;

    assert_eq!(id, "new-id");
    let create = &server.requests()[1];
    assert_eq!(create.json()["summary"], "Trading");
    assert_eq!(create.json()["timeZone"], "Etc/GMT-3");
}

#[tokio::test]
async fn test_resolve_falls_back_to_primary() {
    let server = MockServer::start(|_| (500, json!({"error": "backend"}).to_string()));
    assert_eq!(client(&server).resolve_calendar("Trading").await, "primary");

    let server = MockServer::start(|req| match req.method.as_str() {
        "GET" => (200, json!({"items": []}).to_string()),
        _ => (403, json!({"error": "forbidden"}).to_string()),
    });
    assert_eq!(client(&server).resolve_calendar("Trading").await, "primary");
}

#[tokio::test]
async fn test_list_upcoming_builds_keys_across_pages() {
    let server = MockServer::start(|req| {
        if req.url.contains("pageToken=p2") {
            (
                200,
                json!({"items": [
                    {"id": "3", "summary": "Holiday", "start": {"date": "2025-06-02"}, "end": {"date": "2025-06-03"}}
                ]})
                .to_string(),
            )
        } else {
            (
                200,
                json!({
                    "items": [
                        {"id": "1", "summary": SUMMARY,
                         "start": {"dateTime": "2025-06-01T02:00:00+03:00", "timeZone": "Etc/GMT-3"},
                         "end": {"dateTime": "2025-06-01T05:00:00+03:00", "timeZone": "Etc/GMT-3"}},
                        {"id": "2", "start": {"dateTime": "2025-06-01T08:00:00Z"}},
                        {"id": "4", "summary": "Broken", "start": {"dateTime": "soon"}}
                    ],
                    "nextPageToken": "p2"
                })
                .to_string(),
            )
        }
    });

    let keys = client(&server)
        .list_upcoming("team@group.calendar.google.com", 7)
        .await;

    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&EventKey {
        summary: SUMMARY.to_string(),
        start: TZ.with_ymd_and_hms(2025, 6, 1, 2, 0, 0).unwrap(),
    }));
    assert!(keys.contains(&EventKey {
        summary: "Holiday".to_string(),
        start: TZ.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
    }));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].path(),
        "/calendars/team%40group.calendar.google.com/events"
    );
    assert!(requests[0].url.contains("singleEvents=true"));
    assert!(requests[0].url.contains("orderBy=startTime"));
    assert!(requests[0].url.contains("timeMin="));
    assert!(requests[0].url.contains("timeMax="));
}

#[tokio::test]
async fn test_list_upcoming_fails_open() {
    let server = MockServer::start(|_| (503, json!({"error": "unavailable"}).to_string()));

    let keys = client(&server).list_upcoming("trading-id", 7).await;

    assert!(keys.is_empty());
}

#[tokio::test]
async fn test_create_event_sends_zoned_times() {
    let server = MockServer::start(|_| {
        (
            200,
            json!({"id": "evt-1", "htmlLink": "https://calendar.google.com/event?eid=1"})
                .to_string(),
        )
    });
    let event = event_in(24, 3);

    let outcome = client(&server).create_event("trading-id", &event).await;

    assert_eq!(outcome, CreateOutcome::Created);
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path(), "/calendars/trading-id/events");

    let body = requests[0].json();
    assert_eq!(body["summary"], SUMMARY);
    assert_eq!(body["description"], event.description.as_str());
    assert_eq!(
        body["start"]["dateTime"],
        event.start.format("%Y-%m-%dT%H:%M:%S").to_string()
    );
    assert_eq!(body["start"]["timeZone"], "Etc/GMT-3");
    assert_eq!(
        body["end"]["dateTime"],
        event.end.format("%Y-%m-%dT%H:%M:%S").to_string()
    );
    assert_eq!(body["end"]["timeZone"], "Etc/GMT-3");
}

#[tokio::test]
async fn test_create_event_skips_elapsed_event() {
    let server = MockServer::start(|_| (200, json!({"id": "x"}).to_string()));
    let mut event = event_in(-3, 0);
    event.end = (Utc::now() - Duration::minutes(1)).with_timezone(&TZ);

    let outcome = client(&server).create_event("trading-id", &event).await;

    assert_eq!(outcome, CreateOutcome::SkippedPast);
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_create_event_failure_is_swallowed() {
    let server = MockServer::start(|_| (400, json!({"error": "bad request"}).to_string()));

    let outcome = client(&server).create_event("trading-id", &event_in(2, 1)).await;

    assert_eq!(outcome, CreateOutcome::Failed);
}

#[tokio::test]
async fn test_list_upcoming_with_unrepresentable_window_is_empty() {
    let server = MockServer::start(|_| (200, json!({"items": []}).to_string()));

    let keys = client(&server).list_upcoming("trading-id", 9_999_999_999_999).await;

    assert!(keys.is_empty());
    assert!(server.requests().is_empty());
}
