//! Display formatting for sizes, timestamps and durations.

use chrono::{DateTime, Datelike, Local, TimeZone};

const BINARY_UNITS: [&str; 5] = ["bytes", "KiB", "MiB", "GiB", "TiB"];
const BIT_UNITS: [&str; 5] = ["bits", "Kbit", "Mbit", "Gbit", "Tbit"];

/// Render a byte count with binary units, e.g. `1.5 KiB`.
///
/// A unit step happens only when the value is strictly greater than 1024.
/// The figure is rounded to two decimals with trailing zeros dropped.
#[must_use]
pub fn format_size(bytes: f64) -> String {
    scale(bytes, 1024.0, &BINARY_UNITS)
}

/// Render a bit rate with decimal units, e.g. `12.5 Mbit`.
#[must_use]
pub fn format_size_bits(bits: f64) -> String {
    scale(bits, 1000.0, &BIT_UNITS)
}

fn scale(value: f64, step: f64, units: &[&str]) -> String {
    let mut scaled = value;
    let mut unit = 0;
    while scaled > step && unit + 1 < units.len() {
        scaled /= step;
        unit += 1;
    }
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{rounded} {}", units[unit])
}

/// Render unix seconds as `YYYY-MM-DD HH:MM` in `tz`; invalid input yields `-`.
#[must_use]
pub fn format_datetime<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_opt(timestamp, 0)
        .single()
        .map_or_else(|| "-".to_string(), |time| time.format("%Y-%m-%d %H:%M").to_string())
}

/// [`format_datetime`] in the local time zone.
#[must_use]
pub fn format_local_datetime(timestamp: i64) -> String {
    format_datetime(timestamp, &Local)
}

/// Last backup column: `Never` for zero, otherwise a local timestamp.
#[must_use]
pub fn format_last_backup(timestamp: i64) -> String {
    if timestamp == 0 {
        "Never".to_string()
    } else {
        format_local_datetime(timestamp)
    }
}

/// Render seconds as `1d 2h 3m 4s`, skipping leading zero units.
#[must_use]
pub fn format_duration(seconds: i64) -> String {
    if seconds <= 0 {
        return "0s".to_string();
    }
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{secs}s"));
    parts.join(" ")
}

/// Remaining time of a process; unknown (negative) estimates render as `-`.
#[must_use]
pub fn format_eta(eta_ms: i64) -> String {
    if eta_ms < 0 {
        "-".to_string()
    } else {
        format_duration(eta_ms / 1000)
    }
}

/// Progress column: negative percentages mean the process is still indexing.
#[must_use]
pub fn format_progress(pcdone: i64) -> String {
    if pcdone < 0 {
        "indexing".to_string()
    } else {
        format!("{pcdone}%")
    }
}

/// Year-only axis label for yearly usage graphs.
///
/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD` and RFC 3339 timestamps; other
/// labels are returned unchanged.
#[must_use]
pub fn graph_year(label: &str) -> String {
    let trimmed = label.trim();
    if let Ok(time) = DateTime::parse_from_rfc3339(trimmed) {
        return time.year().to_string();
    }
    let bytes = trimmed.as_bytes();
    let has_year = bytes.len() >= 4
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && (bytes.len() == 4 || bytes[4] == b'-');
    if has_year {
        trimmed[..4].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn sizes_step_only_above_the_threshold() {
        assert_eq!(format_size(0.0), "0 bytes");
        assert_eq!(format_size(1024.0), "1024 bytes");
        assert_eq!(format_size(1536.0), "1.5 KiB");
        assert_eq!(format_size(1_048_576.0 + 1.0), "1 MiB");
        assert_eq!(format_size(5.0 * 1024.0_f64.powi(4)), "5 TiB");
        assert_eq!(format_size(3.0 * 1024.0_f64.powi(5)), "3072 TiB");
        assert_eq!(format_size(-2048.0), "-2048 bytes");
    }

    #[test]
    fn bit_rates_use_decimal_units() {
        assert_eq!(format_size_bits(999.0), "999 bits");
        assert_eq!(format_size_bits(12_500_000.0), "12.5 Mbit");
        assert_eq!(format_size_bits(1_234.0), "1.23 Kbit");
    }

    #[test]
    fn datetimes_render_in_the_given_zone() {
        assert_eq!(format_datetime(0, &Utc), "1970-01-01 00:00");
        let plus_two = FixedOffset::east_opt(2 * 3600).expect("offset");
        assert_eq!(format_datetime(1_700_000_000, &plus_two), "2023-11-15 00:13");
        assert_eq!(format_datetime(i64::MAX, &Utc), "-");
    }

    #[test]
    fn last_backup_zero_is_never() {
        assert_eq!(format_last_backup(0), "Never");
        assert_ne!(format_last_backup(1_700_000_000), "Never");
    }

    #[test]
    fn durations_skip_leading_zero_units() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3_725), "1h 2m 5s");
        assert_eq!(format_duration(90_061), "1d 1h 1m 1s");
        assert_eq!(format_eta(-1), "-");
        assert_eq!(format_eta(61_500), "1m 1s");
        assert_eq!(format_progress(-1), "indexing");
        assert_eq!(format_progress(42), "42%");
    }

    #[test]
    fn graph_year_extracts_the_year() {
        assert_eq!(graph_year("2021"), "2021");
        assert_eq!(graph_year("2022-05"), "2022");
        assert_eq!(graph_year("2023-05-17"), "2023");
        assert_eq!(graph_year("2024-02-01T10:00:00Z"), "2024");
        assert_eq!(graph_year("Q1"), "Q1");
        assert_eq!(graph_year("20210"), "20210");
    }
}
