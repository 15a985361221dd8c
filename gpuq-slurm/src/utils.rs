use chrono::{Local, NaiveDateTime, TimeDelta};

/// The timestamp format Slurm uses in `scontrol` output, e.g.
/// `2024-08-12T09:30:00`. Slurm prints naive local time, so deltas are
/// computed against the local clock rather than UTC.
pub const SLURM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_slurm_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, SLURM_TIME_FORMAT).ok()
}

/// Formats the absolute magnitude of a delta as `Dd:HHh:MMm:SSs`.
///
/// A logically negative delta (say, an end time that has already passed
/// when we expected it in the future) still reports its magnitude; the
/// display layer has no use for signs.
fn format_delta(delta: TimeDelta) -> String {
    let total = delta.num_seconds().abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{days}d:{hours:02}h:{minutes:02}m:{seconds:02}s")
}

/// Computes and formats the delta between a raw Slurm timestamp and `now`.
///
/// `is_future` picks the direction: remaining time for a job end still
/// ahead of us, elapsed time for one behind us. An unparseable timestamp
/// (Slurm emits things like `Unknown` or `N/A`) yields the literal
/// `UNKNOWN` instead of failing the record.
pub fn format_time_delta_at(time_point: &str, now: NaiveDateTime, is_future: bool) -> String {
    match parse_slurm_time(time_point) {
        Some(t) => {
            let delta = if is_future { t - now } else { now - t };
            format_delta(delta)
        }
        None => "UNKNOWN".to_string(),
    }
}

/// Convenience wrapper over [`format_time_delta_at`] using the current
/// local time.
pub fn format_time_delta(time_point: &str, is_future: bool) -> String {
    format_time_delta_at(time_point, Local::now().naive_local(), is_future)
}

/// Truncates `value` to `width` characters and left-justifies it, giving
/// every table cell a fixed footprint.
pub fn pad_cell(value: &str, width: usize) -> String {
    let truncated: String = value.chars().take(width).collect();
    format!("{truncated:<width$}")
}
