use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// Countdown display: `MM:SS`, or `H:MM:SS` from one hour up.
pub(crate) fn format_remaining(seconds: u64) -> String {
    let remaining = Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX));
    let hours = remaining.whole_hours();
    let minutes = remaining.whole_minutes() % 60;
    let secs = remaining.whole_seconds() % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
