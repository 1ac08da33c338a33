/// Renders seconds as `MM:SS`. Minutes do not roll over into hours.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Renders a minute estimate without a trailing `.0`.
pub fn format_minutes(minutes: f32) -> String {
    if minutes.fract() == 0.0 {
        format!("{} min", minutes as u64)
    } else {
        format!("{:.1} min", minutes)
    }
}
