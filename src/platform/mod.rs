//! Seams to the platform: camera hardware, permission dialogs, geolocation and the
//! device media library. Hosts supply real implementations; `simulated` provides
//! in-process ones.

mod local;
pub mod simulated;

pub use local::LocalMediaLibrary;

use crate::error::{DeviceError, LocationError, Result};
use crate::location::{GeocodedAddress, LocationData};
use crate::session::{Facing, PermissionKind, PermissionStatus};
use crate::settings::VideoResolution;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Handle to a file written by the camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFile {
    pub uri: String,
}

impl CapturedFile {
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self { uri: uri.into() }
    }
}

/// Resolves once a recording ends, whether stopped by the user or by the device
pub struct RecordingHandle {
    outcome: oneshot::Receiver<std::result::Result<CapturedFile, DeviceError>>,
}

/// Device-side half of a `RecordingHandle`
pub struct RecordingCompleter {
    outcome: oneshot::Sender<std::result::Result<CapturedFile, DeviceError>>,
}

impl RecordingHandle {
    pub fn channel() -> (RecordingCompleter, RecordingHandle) {
        let (tx, rx) = oneshot::channel();
        (RecordingCompleter { outcome: tx }, RecordingHandle { outcome: rx })
    }

    pub async fn finished(self) -> std::result::Result<CapturedFile, DeviceError> {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => Err(DeviceError::RecordingFailed {
                details: "recording ended without producing a file".to_string(),
            }),
        }
    }
}

impl RecordingCompleter {
    pub fn complete(self, outcome: std::result::Result<CapturedFile, DeviceError>) {
        let _ = self.outcome.send(outcome);
    }
}

#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Prompt for (or look up) a single permission
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus>;
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(
        &self,
        facing: Facing,
        resolution: VideoResolution,
    ) -> std::result::Result<(), DeviceError>;

    async fn take_picture(&self) -> std::result::Result<CapturedFile, DeviceError>;

    async fn start_recording(&self) -> std::result::Result<RecordingHandle, DeviceError>;

    /// Ask the device to end the current recording; the handle then resolves
    async fn stop_recording(&self) -> std::result::Result<(), DeviceError>;

    /// Release the device. Must be safe to call when nothing is open.
    async fn close(&self);
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> std::result::Result<LocationData, LocationError>;

    async fn reverse_geocode(
        &self,
        location: &LocationData,
    ) -> std::result::Result<Vec<GeocodedAddress>, LocationError>;

    /// Raw position fixes as the platform produces them
    async fn watch_positions(
        &self,
    ) -> std::result::Result<mpsc::Receiver<LocationData>, LocationError>;
}

#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Remove a captured file from the device media store
    async fn delete_asset(&self, uri: &str) -> Result<()>;
}

/// The platform services a capture session needs
#[derive(Clone)]
pub struct Platform {
    pub camera: Arc<dyn CameraDevice>,
    pub permissions: Arc<dyn PermissionProvider>,
    pub location: Arc<dyn LocationProvider>,
    pub media_library: Arc<dyn MediaLibrary>,
}
