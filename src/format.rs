//! Human-facing text: relative times, dates, counts and previews.

use time::macros::format_description;
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

pub const EMPTY_COLLECTION: &str = "No notes yet";
pub const EMPTY_FILTERED: &str = "No notes found";
pub const RECENT_PREVIEW_CHARS: usize = 50;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const FOUR_WEEKS: i64 = 4 * WEEK;

/// "just now", "5 minutes ago", ... up to four weeks, then the calendar date.
/// Units are always plural ("1 minutes ago") so the output is fixed per
/// bucket. Timestamps ahead of `now` read as "just now".
pub fn relative_time(timestamp: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - timestamp).whole_seconds();
    if seconds < MINUTE {
        return "just now".to_string();
    }
    let (count, unit) = if seconds < HOUR {
        (seconds / MINUTE, "minutes")
    } else if seconds < DAY {
        (seconds / HOUR, "hours")
    } else if seconds < WEEK {
        (seconds / DAY, "days")
    } else if seconds < FOUR_WEEKS {
        (seconds / WEEK, "weeks")
    } else {
        return format_date(timestamp);
    };
    format!("{count} {unit} ago")
}

pub fn format_date(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| timestamp.date().to_string())
}

pub fn format_datetime(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_else(|_| timestamp.to_string())
}

pub fn note_count_label(count: usize) -> String {
    if count == 1 {
        "1 note".to_string()
    } else {
        format!("{count} notes")
    }
}

pub fn empty_state(filtered: bool) -> &'static str {
    if filtered {
        EMPTY_FILTERED
    } else {
        EMPTY_COLLECTION
    }
}

/// First `max` graphemes of `text`, with "..." appended when cut.
pub fn preview(text: &str, max: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// Recent-list preview: the first [`RECENT_PREVIEW_CHARS`] graphemes of the
/// content, always followed by "...".
pub fn recent_preview(content: &str) -> String {
    let head: String = single_line(content)
        .graphemes(true)
        .take(RECENT_PREVIEW_CHARS)
        .collect();
    format!("{head}...")
}

/// Collapses line breaks so multi-line content fits on one row.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
