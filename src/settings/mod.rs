mod store;
mod types;
#[cfg(test)]
mod tests;

pub use store::SettingsStore;
pub use types::{
    AppSettings, CameraMode, SettingsPatch, Theme, TimestampFormat, VideoResolution,
    DEVICE_TIMEZONE,
};
