use super::models::{EventTime, RawEventCandidate};
use crate::error::{Error, SyncResult};
use serde_json::Value;
use tracing::{debug, warn};

/// Remove a surrounding markdown code fence (```json ... ```), if any
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Language tag such as `json`
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a model reply into candidates.
///
/// Invalid JSON or a non-array top level is a malformed response. Elements
/// lacking `start_time` or `end_time` are dropped silently; elements whose
/// timestamps cannot be parsed are dropped with a warning.
pub fn parse_candidates(response: &str) -> SyncResult<Vec<RawEventCandidate>> {
    let json = strip_code_fence(response);

    let value: Value = serde_json::from_str(json)
        .map_err(|e| Error::MalformedResponse(format!("invalid JSON ({}): {}", e, json)))?;

    let items = value
        .as_array()
        .ok_or_else(|| Error::MalformedResponse(format!("expected a JSON array, got: {}", json)))?;

    Ok(items.iter().filter_map(candidate_from_value).collect())
}

fn candidate_from_value(item: &Value) -> Option<RawEventCandidate> {
    let start = item.get("start_time").and_then(Value::as_str);
    let end = item.get("end_time").and_then(Value::as_str);

    let (Some(start), Some(end)) = (start, end) else {
        debug!("Dropping element without start_time/end_time: {}", item);
        return None;
    };

    match (EventTime::parse(start), EventTime::parse(end)) {
        (Some(start), Some(end)) => Some(RawEventCandidate { start, end }),
        _ => {
            warn!("Dropping element with unparseable times: {} / {}", start, end);
            None
        }
    }
}
