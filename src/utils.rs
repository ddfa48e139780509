//! Shared utility functions.

/// Format a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use devloop::utils::format_duration;
///
/// assert_eq!(format_duration(Duration::seconds(30)), "30s");
/// assert_eq!(format_duration(Duration::seconds(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::seconds(3660)), "1h 1m");
/// ```
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);

    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86_400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(Duration::seconds(0)), "0s");
        assert_eq!(format_duration(Duration::seconds(59)), "59s");
        assert_eq!(format_duration(Duration::seconds(61)), "1m 1s");
        assert_eq!(format_duration(Duration::seconds(7322)), "2h 2m");
        assert_eq!(format_duration(Duration::seconds(90_000)), "1d 1h");
    }

    #[test]
    fn negative_durations_clamp_to_zero() {
        assert_eq!(format_duration(Duration::seconds(-5)), "0s");
    }
}
