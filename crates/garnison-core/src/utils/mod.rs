//! Utility functions for string formatting and manipulation.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{
    cmp_ignore_case, contains_ignore_case, format_date, format_percent_display,
    format_percent_print, format_time_range, or_placeholder, parse_date, truncate, NOT_AVAILABLE,
    NOT_SPECIFIED,
};
