// Export components
pub mod event_parser;
pub mod ftmo_scraper;
pub mod google_calendar;
pub mod reconciler;

pub use event_parser::{EventExtractor, GeminiEventParser, LanguageModel};
pub use ftmo_scraper::{FtmoScraper, TextSource};
pub use google_calendar::{CalendarStore, GoogleCalendarClient};
pub use reconciler::{Reconciler, RunOutcome, RunSummary};
