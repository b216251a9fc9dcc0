use crate::settings::{AppSettings, TimestampFormat, DEVICE_TIMEZONE};
use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;

/// Zone used to render overlay and record timestamps
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayZone {
    Device,
    Named(Tz),
}

impl DisplayZone {
    pub fn localize(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            DisplayZone::Device => at.with_timezone(&Local).fixed_offset(),
            DisplayZone::Named(tz) => at.with_timezone(tz).fixed_offset(),
        }
    }
}

/// Resolve the configured timezone, falling back to the device zone on parse errors
pub fn resolve_timezone(name: &str) -> DisplayZone {
    if name.is_empty() || name.eq_ignore_ascii_case(DEVICE_TIMEZONE) {
        return DisplayZone::Device;
    }
    match name.parse::<Tz>() {
        Ok(tz) => DisplayZone::Named(tz),
        Err(_) => {
            tracing::warn!(
                "Invalid timestamp timezone '{}', falling back to device time",
                name
            );
            DisplayZone::Device
        }
    }
}

/// Date and time strings for one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub date: String,
    pub time: String,
}

impl Stamp {
    /// Overlay form: "Sat, Oct 18, 2026" and "14:05" / "02:05 PM"
    pub fn overlay(at: DateTime<Utc>, settings: &AppSettings) -> Self {
        let local = resolve_timezone(&settings.timezone).localize(at);
        let time = match settings.timestamp_format {
            TimestampFormat::TwelveHour => local.format("%I:%M %p"),
            TimestampFormat::TwentyFourHour => local.format("%H:%M"),
        };
        Self {
            date: local.format("%a, %b %-d, %Y").to_string(),
            time: time.to_string(),
        }
    }

    /// Record form: "10/18/2026" and "14:05:09" / "2:05:09 PM"
    pub fn record(at: DateTime<Utc>, settings: &AppSettings) -> Self {
        let local = resolve_timezone(&settings.timezone).localize(at);
        let time = match settings.timestamp_format {
            TimestampFormat::TwelveHour => local.format("%-I:%M:%S %p"),
            TimestampFormat::TwentyFourHour => local.format("%H:%M:%S"),
        };
        Self {
            date: local.format("%-m/%-d/%Y").to_string(),
            time: time.to_string(),
        }
    }
}

/// Recording counter as `MM:SS`
pub fn format_recording_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings(format: TimestampFormat, timezone: &str) -> AppSettings {
        AppSettings {
            timestamp_format: format,
            timezone: timezone.to_string(),
            ..AppSettings::default()
        }
    }

    #[test]
    fn test_overlay_formats() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 14, 5, 9).unwrap();

        let stamp = Stamp::overlay(at, &settings(TimestampFormat::TwentyFourHour, "UTC"));
        assert_eq!(stamp.date, "Sun, Oct 18, 2026");
        assert_eq!(stamp.time, "14:05");

        let stamp = Stamp::overlay(at, &settings(TimestampFormat::TwelveHour, "UTC"));
        assert_eq!(stamp.time, "02:05 PM");
    }

    #[test]
    fn test_record_formats_with_named_zone() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

        let stamp = Stamp::record(at, &settings(TimestampFormat::TwelveHour, "America/New_York"));
        assert_eq!(stamp.date, "1/1/2026");
        assert_eq!(stamp.time, "10:04:05 PM");

        let stamp = Stamp::record(at, &settings(TimestampFormat::TwentyFourHour, "Asia/Tokyo"));
        assert_eq!(stamp.date, "1/2/2026");
        assert_eq!(stamp.time, "12:04:05");
    }

    #[test]
    fn test_resolve_timezone_fallback() {
        assert_eq!(resolve_timezone("device"), DisplayZone::Device);
        assert_eq!(resolve_timezone(""), DisplayZone::Device);
        assert_eq!(resolve_timezone("Not/AZone"), DisplayZone::Device);
        assert_eq!(
            resolve_timezone("Europe/Berlin"),
            DisplayZone::Named(chrono_tz::Europe::Berlin)
        );
    }

    #[test]
    fn test_recording_duration_format() {
        assert_eq!(format_recording_duration(0), "00:00");
        assert_eq!(format_recording_duration(65), "01:05");
        assert_eq!(format_recording_duration(3600), "60:00");
    }
}
