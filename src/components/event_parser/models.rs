use crate::utils::time::{localize, parse_naive_datetime, parse_offset_datetime};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;

/// A timestamp as the model reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Wall-clock time in the source text's zone
    Naive(NaiveDateTime),
    /// Time that already carries an explicit offset
    Offset(DateTime<FixedOffset>),
}

impl EventTime {
    /// Parse an ISO-8601 string, with or without offset
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(dt) = parse_offset_datetime(value) {
            return Some(EventTime::Offset(dt));
        }
        parse_naive_datetime(value).map(EventTime::Naive)
    }

    /// Express this time in `tz`: naive values get the zone attached,
    /// offset values are converted
    pub fn in_zone(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        match self {
            EventTime::Naive(naive) => localize(naive, tz),
            EventTime::Offset(dt) => Some(dt.with_timezone(tz)),
        }
    }
}

/// An extracted interval before zone attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEventCandidate {
    pub start: EventTime,
    pub end: EventTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_time_keeps_wall_clock() {
        let time = EventTime::parse("2025-06-01T02:00:00").unwrap();
        assert!(matches!(time, EventTime::Naive(_)));

        let zoned = time.in_zone(&chrono_tz::Etc::GMTMinus3).unwrap();
        assert_eq!(zoned.to_rfc3339(), "2025-06-01T02:00:00+03:00");
    }

    #[test]
    fn test_offset_time_is_converted() {
        let time = EventTime::parse("2025-06-01T00:00:00+01:00").unwrap();
        assert!(matches!(time, EventTime::Offset(_)));

        let zoned = time.in_zone(&chrono_tz::Etc::GMTMinus3).unwrap();
        assert_eq!(zoned.to_rfc3339(), "2025-06-01T02:00:00+03:00");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(EventTime::parse("next Sunday").is_none());
        assert!(EventTime::parse("").is_none());
    }
}
