use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};

/// Placeholder printed for a missing field value
pub const NOT_SPECIFIED: &str = "Non spécifié";

/// Placeholder printed for a missing table cell
pub const NOT_AVAILABLE: &str = "N/A";

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Case-insensitive substring test. `needle` should already be lowercased.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(needle)
}

/// Case-insensitive ordering without caring about locale
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Return the value, or the given placeholder when blank
pub fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Parse the calendar date out of an ISO date or datetime string.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.date_naive());
    }
    date.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

/// Format a date string as DD/MM/YYYY, falling back to the raw text
pub fn format_date(date: &str) -> String {
    match parse_date(date) {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => date.to_string(),
    }
}

/// Format a Strapi time value ("08:30:00.000") as "08:30"
pub fn format_time(time: &str) -> String {
    let time = time.trim();
    match time.get(..5) {
        Some(hm) if hm.as_bytes().get(2) == Some(&b':') => hm.to_string(),
        _ => time.to_string(),
    }
}

/// "08:30 - 10:00", with whichever end is known
pub fn format_time_range(start: &str, end: &str) -> String {
    match (start.trim().is_empty(), end.trim().is_empty()) {
        (false, false) => format!("{} - {}", format_time(start), format_time(end)),
        (false, true) => format_time(start),
        (true, false) => format_time(end),
        (true, true) => String::new(),
    }
}

/// Percentage with one decimal, as shown on screen
pub fn format_percent_display(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Percentage with two decimals, as printed in reports
pub fn format_percent_print(value: f64) -> String {
    format!("{:.2}%", value)
}
