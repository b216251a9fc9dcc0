use serde::{Deserialize, Serialize};
use std::fmt;

/// Colour scheme preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

/// What the capture button does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Video,
    Photo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoResolution {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "auto")]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimestampFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

/// Timezone value meaning "whatever the device is set to"
pub const DEVICE_TIMEZONE: &str = "device";

/// Persisted capture preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub theme: Theme,
    pub default_mode: CameraMode,
    pub video_resolution: VideoResolution,
    pub timestamp_format: TimestampFormat,
    pub timezone: String,
    pub location_tagging: bool,
    /// Days after which saved media is removed; 0 keeps media forever
    pub auto_delete_days: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            default_mode: CameraMode::Video,
            video_resolution: VideoResolution::Hd1080,
            timestamp_format: TimestampFormat::TwentyFourHour,
            timezone: DEVICE_TIMEZONE.to_string(),
            location_tagging: false,
            auto_delete_days: 0,
        }
    }
}

/// Partial settings update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub default_mode: Option<CameraMode>,
    pub video_resolution: Option<VideoResolution>,
    pub timestamp_format: Option<TimestampFormat>,
    pub timezone: Option<String>,
    pub location_tagging: Option<bool>,
    pub auto_delete_days: Option<u32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    pub fn apply_to(&self, settings: &mut AppSettings) {
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(mode) = self.default_mode {
            settings.default_mode = mode;
        }
        if let Some(resolution) = self.video_resolution {
            settings.video_resolution = resolution;
        }
        if let Some(format) = self.timestamp_format {
            settings.timestamp_format = format;
        }
        if let Some(timezone) = &self.timezone {
            settings.timezone = timezone.clone();
        }
        if let Some(tagging) = self.location_tagging {
            settings.location_tagging = tagging;
        }
        if let Some(days) = self.auto_delete_days {
            settings.auto_delete_days = days;
        }
    }
}

impl From<AppSettings> for SettingsPatch {
    fn from(settings: AppSettings) -> Self {
        Self {
            theme: Some(settings.theme),
            default_mode: Some(settings.default_mode),
            video_resolution: Some(settings.video_resolution),
            timestamp_format: Some(settings.timestamp_format),
            timezone: Some(settings.timezone),
            location_tagging: Some(settings.location_tagging),
            auto_delete_days: Some(settings.auto_delete_days),
        }
    }
}

impl VideoResolution {
    pub const ALL: [VideoResolution; 4] = [
        VideoResolution::Hd720,
        VideoResolution::Hd1080,
        VideoResolution::Uhd4k,
        VideoResolution::Auto,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VideoResolution::Hd720 => "720p",
            VideoResolution::Hd1080 => "1080p",
            VideoResolution::Uhd4k => "4K",
            VideoResolution::Auto => "auto",
        }
    }

    /// Frame size requested from the device, `None` lets the device choose
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            VideoResolution::Hd720 => Some((1280, 720)),
            VideoResolution::Hd1080 => Some((1920, 1080)),
            VideoResolution::Uhd4k => Some((3840, 2160)),
            VideoResolution::Auto => None,
        }
    }
}

impl fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for VideoResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoResolution::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resolution '{}'", s))
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("unknown theme '{}'", s)),
        }
    }
}

impl std::str::FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Ok(CameraMode::Video),
            "photo" => Ok(CameraMode::Photo),
            _ => Err(format!("unknown camera mode '{}'", s)),
        }
    }
}

impl std::str::FromStr for TimestampFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "12h" => Ok(TimestampFormat::TwelveHour),
            "24h" => Ok(TimestampFormat::TwentyFourHour),
            _ => Err(format!("unknown timestamp format '{}'", s)),
        }
    }
}
