//! Shared helper functions for CLI commands

use chrono::Duration;

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Compact age for cache listings: `42s`, `5m`, `2h 3m`
pub fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s => {
            let minutes = (s % 3600) / 60;
            if minutes == 0 {
                format!("{}h", s / 3600)
            } else {
                format!("{}h {}m", s / 3600, minutes)
            }
        }
    }
}

/// `Name (id)` when the name is known, else just the id
pub fn format_target(id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} ({})", name, id),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("ünïcödé names", 6), "ünï...");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(42)), "42s");
        assert_eq!(format_age(Duration::minutes(5)), "5m");
        assert_eq!(format_age(Duration::minutes(123)), "2h 3m");
        assert_eq!(format_age(Duration::hours(3)), "3h");
        assert_eq!(format_age(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_format_target() {
        assert_eq!(format_target("team_1", Some("Platform")), "Platform (team_1)");
        assert_eq!(format_target("team_1", None), "team_1");
    }
}
