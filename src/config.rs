use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StampcamConfig {
    pub storage: StorageConfig,
    pub location: LocationConfig,
    pub session: SessionConfig,
    pub library: LibraryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Directory holding the persisted key-value records
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocationConfig {
    /// Maximum time between delivered watch updates
    #[serde(default = "default_watch_interval_seconds")]
    pub watch_interval_seconds: u64,

    /// Movement that triggers a watch update before the interval elapses
    #[serde(default = "default_min_distance_meters")]
    pub min_distance_meters: f64,

    /// Decimal places used when an address is not available
    #[serde(default = "default_coordinate_precision")]
    pub coordinate_precision: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Overlay clock refresh period
    #[serde(default = "default_clock_tick_millis")]
    pub clock_tick_millis: u64,

    /// Recording duration display refresh period
    #[serde(default = "default_recording_tick_millis")]
    pub recording_tick_millis: u64,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LibraryConfig {
    /// Apply the auto-delete policy when the app context starts
    #[serde(default = "default_prune_on_startup")]
    pub prune_on_startup: bool,
}

impl LocationConfig {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_seconds)
    }
}

impl SessionConfig {
    pub fn clock_tick(&self) -> Duration {
        Duration::from_millis(self.clock_tick_millis)
    }

    pub fn recording_tick(&self) -> Duration {
        Duration::from_millis(self.recording_tick_millis)
    }
}

impl StampcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("stampcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("storage.data_dir", default_data_dir())?
            .set_default(
                "location.watch_interval_seconds",
                default_watch_interval_seconds(),
            )?
            .set_default("location.min_distance_meters", default_min_distance_meters())?
            .set_default(
                "location.coordinate_precision",
                default_coordinate_precision() as u64,
            )?
            .set_default("session.clock_tick_millis", default_clock_tick_millis())?
            .set_default(
                "session.recording_tick_millis",
                default_recording_tick_millis(),
            )?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as u64,
            )?
            .set_default("library.prune_on_startup", default_prune_on_startup())?
            .add_source(File::with_name(&path_str).required(false))
            // STAMPCAM_SESSION__CLOCK_TICK_MILLIS=500
            .add_source(
                Environment::with_prefix("STAMPCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: StampcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "Storage data_dir must not be empty".to_string(),
            ));
        }

        if self.location.watch_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Location watch_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if !self.location.min_distance_meters.is_finite() || self.location.min_distance_meters < 0.0
        {
            return Err(ConfigError::Message(
                "Location min_distance_meters must be a non-negative number".to_string(),
            ));
        }

        if self.session.clock_tick_millis == 0 || self.session.recording_tick_millis == 0 {
            return Err(ConfigError::Message(
                "Session tick periods must be greater than 0".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for StampcamConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: default_data_dir(),
            },
            location: LocationConfig {
                watch_interval_seconds: default_watch_interval_seconds(),
                min_distance_meters: default_min_distance_meters(),
                coordinate_precision: default_coordinate_precision(),
            },
            session: SessionConfig {
                clock_tick_millis: default_clock_tick_millis(),
                recording_tick_millis: default_recording_tick_millis(),
                event_bus_capacity: default_event_bus_capacity(),
            },
            library: LibraryConfig {
                prune_on_startup: default_prune_on_startup(),
            },
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        StampcamConfig::default().session
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        StampcamConfig::default().location
    }
}

// Default value functions
fn default_data_dir() -> String {
    "./stampcam-data".to_string()
}

fn default_watch_interval_seconds() -> u64 {
    30
}
fn default_min_distance_meters() -> f64 {
    10.0
}
fn default_coordinate_precision() -> usize {
    6
}

fn default_clock_tick_millis() -> u64 {
    1000
}
fn default_recording_tick_millis() -> u64 {
    1000
}
fn default_event_bus_capacity() -> usize {
    64
}

fn default_prune_on_startup() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = StampcamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.location.watch_interval(), Duration::from_secs(30));
        assert_eq!(config.location.min_distance_meters, 10.0);
        assert_eq!(config.session.clock_tick(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StampcamConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.location, LocationConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stampcam.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[location]\nwatch_interval_seconds = 5\n").unwrap();
        writeln!(file, "[storage]\ndata_dir = \"/tmp/elsewhere\"").unwrap();

        let config = StampcamConfig::load_from_file(&path).unwrap();
        assert_eq!(config.location.watch_interval_seconds, 5);
        assert_eq!(config.location.min_distance_meters, 10.0);
        assert_eq!(config.storage.data_dir, "/tmp/elsewhere");
    }

    #[test]
    fn test_config_validation() {
        let mut config = StampcamConfig::default();
        config.location.watch_interval_seconds = 0;
        assert!(config.validate().is_err());

        config.location.watch_interval_seconds = 30;
        config.location.min_distance_meters = -1.0;
        assert!(config.validate().is_err());

        config.location.min_distance_meters = 0.0;
        assert!(config.validate().is_ok());

        config.session.event_bus_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = StampcamConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[storage]"));
        assert!(rendered.contains("watch_interval_seconds = 30"));
    }
}
