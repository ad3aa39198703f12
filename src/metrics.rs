//! Derived-metric arithmetic shared by the live ticking display and the
//! frozen record written at clock-out. Keeping these in one place guarantees
//! the two never diverge.

/// Renders a minute count as zero-padded `HH:MM`.
pub fn format_duration(minutes: u64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Renders a second count as zero-padded `HH:MM:SS`.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Tracked time minus idle time, in hours, floored at zero.
pub fn productive_hours(total_minutes: u64, idle_minutes: u64) -> f64 {
    total_minutes.saturating_sub(idle_minutes) as f64 / 60.0
}

/// Share of elapsed time spent non-idle, rounded to a whole percent.
///
/// An empty session counts as fully efficient. The result is deliberately not
/// clamped below zero: simulated idle time can exceed elapsed time and a
/// negative reading is more honest than a silent floor.
pub fn efficiency_percent(elapsed_seconds: u64, idle_minutes: u64) -> i64 {
    if elapsed_seconds == 0 {
        return 100;
    }
    let productive = elapsed_seconds as i64 - idle_minutes as i64 * 60;
    (productive as f64 / elapsed_seconds as f64 * 100.0).round() as i64
}
