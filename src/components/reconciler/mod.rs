pub mod models;

pub use models::{RunOutcome, RunSummary};

use super::event_parser::{EventExtractor, RawEventCandidate};
use super::ftmo_scraper::TextSource;
use super::google_calendar::{CalendarStore, CreateOutcome, NormalizedEvent};
use crate::config::Config;
use crate::error::SyncResult;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, warn};

/// Case-insensitive match of any keyword; keywords are expected lowercase
pub fn is_relevant(text: &str, keywords: &[String]) -> bool {
    let text = text.to_lowercase();
    keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}

/// Attach the configured zone to one candidate.
/// `None` when either endpoint does not exist in the zone.
pub fn normalize(
    candidate: &RawEventCandidate,
    summary: &str,
    description: &str,
    tz: &Tz,
) -> Option<NormalizedEvent> {
    Some(NormalizedEvent {
        summary: summary.to_string(),
        description: description.to_string(),
        start: candidate.start.in_zone(tz)?,
        end: candidate.end.in_zone(tz)?,
    })
}

/// Scrape → filter → extract → dedup → create, once per invocation
pub struct Reconciler<S, E, C> {
    source: S,
    extractor: E,
    store: C,
    url: String,
    keywords: Vec<String>,
    summary: String,
    calendar_name: String,
    timezone: Tz,
    lookahead_days: i64,
}

impl<S, E, C> Reconciler<S, E, C>
where
    S: TextSource,
    E: EventExtractor,
    C: CalendarStore,
{
    pub fn new(config: &Config, source: S, extractor: E, store: C) -> Self {
        Self {
            source,
            extractor,
            store,
            url: config.ftmo_url.clone(),
            keywords: config.keywords.clone(),
            summary: config.event_summary.clone(),
            calendar_name: config.calendar_name.clone(),
            timezone: config.timezone,
            lookahead_days: config.lookahead_days,
        }
    }

    /// Run the pipeline once. Only extraction errors are returned.
    pub async fn run(&self) -> SyncResult<RunOutcome> {
        // Fetching
        let Some(text) = self.source.fetch(&self.url).await else {
            info!("Process finished: could not retrieve update text");
            return Ok(RunOutcome::NothingRetrieved);
        };

        // Filtering
        if !is_relevant(&text, &self.keywords) {
            info!("No relevant updates found containing the specified keywords");
            return Ok(RunOutcome::NoRelevantUpdate);
        }
        info!("Relevant update found. Parsing details with AI...");

        // Extracting
        let candidates = self.extractor.extract(&text).await?;
        if candidates.is_empty() {
            info!("AI did not find any event to schedule");
            return Ok(RunOutcome::NoEvents);
        }

        // Deduping
        let calendar_id = self.store.resolve_calendar(&self.calendar_name).await;
        let mut existing = self
            .store
            .list_upcoming(&calendar_id, self.lookahead_days)
            .await;

        // Creating
        let mut summary = RunSummary::default();
        for candidate in &candidates {
            let Some(event) = normalize(candidate, &self.summary, &text, &self.timezone) else {
                warn!(
                    "Dropping candidate with a time that does not exist in {}: {:?}",
                    self.timezone, candidate
                );
                summary.invalid += 1;
                continue;
            };

            let key = event.key();
            if existing.contains(&key) {
                info!("Event '{}' at {} already exists, skipping", event.summary, event.start);
                summary.duplicates += 1;
                continue;
            }

            if event.has_ended(Utc::now()) {
                info!("Event '{}' ended at {}, skipping", event.summary, event.end);
                summary.past += 1;
                continue;
            }

            match self.store.create_event(&calendar_id, &event).await {
                CreateOutcome::Created => {
                    summary.created += 1;
                    existing.insert(key);
                }
                CreateOutcome::SkippedPast => summary.past += 1,
                CreateOutcome::Failed => summary.failed += 1,
            }
        }

        let outcome = RunOutcome::Completed(summary);
        info!("Check finished: {}", outcome);
        Ok(outcome)
    }
}
