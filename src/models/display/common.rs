//! Common display utilities and helpers

use chrono::{DateTime, Local, Utc};

/// Truncate string to max characters with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Local `YYYY-MM-DD HH:MM`, or "N/A" when the server sent no timestamp
pub fn format_datetime(dt: Option<&DateTime<Utc>>) -> String {
    match dt {
        Some(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "N/A".to_string(),
    }
}
