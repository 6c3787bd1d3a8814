use crate::error::{Error, SyncResult};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// Container holding the latest trading update
pub const PRIMARY_SELECTOR: &str = "div.trup-primary";

/// Tried in order when the primary container is missing
pub const FALLBACK_SELECTORS: &[&str] = &["div.trading-updates", "article", "main"];

/// Extract the latest update text from a trading updates page
pub fn extract_update_text(page: &str) -> SyncResult<String> {
    let document = Html::parse_document(page);

    let candidates = std::iter::once(PRIMARY_SELECTOR).chain(FALLBACK_SELECTORS.iter().copied());
    for (index, css) in candidates.enumerate() {
        let selector = Selector::parse(css)
            .map_err(|e| Error::Scrape(format!("Invalid selector '{}': {:?}", css, e)))?;

        let Some(element) = document.select(&selector).next() else {
            continue;
        };

        let text = element_text(element);
        if text.is_empty() {
            continue;
        }

        if index > 0 {
            warn!(
                "Update container '{}' not found, fell back to '{}'. The page structure may have changed",
                PRIMARY_SELECTOR, css
            );
        }
        return Ok(text);
    }

    Err(Error::Scrape(format!(
        "Could not find the trading update container ('{}' or any fallback)",
        PRIMARY_SELECTOR
    )))
}

/// All text nodes below `element`, trimmed and joined with single spaces
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
