//! Human-readable time formatting
//!
//! Provides consistent time display for log lines and UI texts across Muse.

/// Format selection thresholds (seconds)
const SHORT_FORMAT_MAX: f64 = 100.0; // < 100s → X.XXs
const MEDIUM_FORMAT_MAX: f64 = 6000.0; // < 100m → M:SS.Xs
                                       // >= 100m → H:MM:SS

/// Format a duration in seconds for logs.
///
/// - Short format (`X.XXs`): below 100 seconds
/// - Medium format (`M:SS.Xs`): below 100 minutes
/// - Long format (`H:MM:SS`): anything longer
///
/// Negative values get a leading minus sign.
///
/// # Examples
///
/// ```
/// use muse_common::human_time::format_human_time;
///
/// assert_eq!(format_human_time(4.5), "4.50s");
/// assert_eq!(format_human_time(330.0), "5:30.0s");
/// assert_eq!(format_human_time(7200.0), "2:00:00");
/// ```
pub fn format_human_time(seconds: f64) -> String {
    let is_negative = seconds < 0.0;
    let abs_seconds = seconds.abs();

    let formatted = if abs_seconds < SHORT_FORMAT_MAX {
        format!("{:.2}s", abs_seconds)
    } else if abs_seconds < MEDIUM_FORMAT_MAX {
        let minutes = (abs_seconds / 60.0).floor() as i64;
        let secs = abs_seconds - (minutes as f64 * 60.0);
        format!("{}:{:04.1}s", minutes, secs)
    } else {
        let whole = abs_seconds as i64;
        let hours = whole / 3600;
        let mins = (whole % 3600) / 60;
        let secs = whole % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    };

    if is_negative {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Format a track position or length given in milliseconds, media-player style.
///
/// Unknown lengths (negative values, as reported by playback backends before
/// media is parsed) render as `--:--`.
///
/// # Examples
///
/// ```
/// use muse_common::human_time::format_track_time;
///
/// assert_eq!(format_track_time(185_000), "3:05");
/// assert_eq!(format_track_time(3_723_000), "1:02:03");
/// assert_eq!(format_track_time(-1), "--:--");
/// ```
pub fn format_track_time(millis: i64) -> String {
    if millis < 0 {
        return "--:--".to_string();
    }
    let total_secs = millis / 1000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
