pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod library;
pub mod location;
pub mod platform;
pub mod session;
pub mod settings;
pub mod storage;

pub use app::{AppContext, AppState, LifecycleEvent, ScreenLifecycle};
pub use config::StampcamConfig;
pub use error::{DeviceError, LocationError, Result, StampcamError};
pub use events::{EventBus, SessionEvent};
pub use library::{format_duration, format_location, maps_url, PruneReport, VideoLibrary};
pub use location::{LocationData, LocationService, WatchSubscription};
pub use platform::Platform;
pub use session::{
    CaptureSession, CaptureSessionBuilder, Facing, Notice, PermissionKind, PermissionStatus,
    SessionSnapshot, SessionState, WeakCaptureSession,
};
pub use settings::{AppSettings, SettingsPatch, SettingsStore};
pub use storage::{MediaType, SavedMedia, Storage};
