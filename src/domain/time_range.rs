// Time ranges, timestamp parsing and range filtering
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

/// Backend date-time format: local time, no zone, zero padded.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Anything that carries an (optional) instant.
pub trait Timestamped {
    fn timestamp(&self) -> Option<NaiveDateTime>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TimeRange {
    #[default]
    Last24Hours,
    Last7Days,
    Last30Days,
    Last90Days,
    AllTime,
}

impl TimeRange {
    /// Unrecognized tokens mean "all time".
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "24h" | "Last 24 hours" => TimeRange::Last24Hours,
            "7d" | "Last 7 days" => TimeRange::Last7Days,
            "30d" | "Last 30 days" => TimeRange::Last30Days,
            "90d" | "Last 90 days" => TimeRange::Last90Days,
            _ => TimeRange::AllTime,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            TimeRange::Last24Hours => "24h",
            TimeRange::Last7Days => "7d",
            TimeRange::Last30Days => "30d",
            TimeRange::Last90Days => "90d",
            TimeRange::AllTime => "all",
        }
    }

    fn span(&self) -> Option<Duration> {
        match self {
            TimeRange::Last24Hours => Some(Duration::hours(24)),
            TimeRange::Last7Days => Some(Duration::days(7)),
            TimeRange::Last30Days => Some(Duration::days(30)),
            TimeRange::Last90Days => Some(Duration::days(90)),
            TimeRange::AllTime => None,
        }
    }

    pub fn cutoff(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self.span() {
            Some(span) => now - span,
            None => all_time_epoch(),
        }
    }

    /// `(start, end)` for a backend range query ending at `now`.
    pub fn bounds(&self, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        (self.cutoff(now), now)
    }
}

/// Cutoff used for the unbounded range.
pub fn all_time_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Keep records whose timestamp is present and not older than the cutoff.
pub fn filter_by_range<T>(records: &[T], range: TimeRange, now: NaiveDateTime) -> Vec<T>
where
    T: Timestamped + Clone,
{
    let cutoff = range.cutoff(now);
    records
        .iter()
        .filter(|r| matches!(r.timestamp(), Some(ts) if ts >= cutoff))
        .cloned()
        .collect()
}

pub fn format_local_datetime(instant: NaiveDateTime) -> String {
    instant.format(LOCAL_DATETIME_FORMAT).to_string()
}

/// Parse a backend timestamp. Zoned (RFC 3339) values are normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        return Some(ts);
    }
    // Naive values are local wall-clock time, so offset instants are brought
    // into the same frame.
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Local).naive_local())
}
