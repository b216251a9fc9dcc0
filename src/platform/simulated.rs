use super::{
    CameraDevice, CapturedFile, LocationProvider, MediaLibrary, PermissionProvider, Platform,
    RecordingCompleter, RecordingHandle,
};
use crate::error::{DeviceError, LocationError, Result, StampcamError};
use crate::location::{GeocodedAddress, LocationData};
use crate::session::{Facing, PermissionKind, PermissionStatus};
use crate::settings::VideoResolution;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Permission provider answering from a preset table (everything granted by default)
#[derive(Default)]
pub struct SimulatedPermissions {
    answers: Mutex<HashMap<PermissionKind, PermissionStatus>>,
    requests: Mutex<Vec<PermissionKind>>,
}

impl SimulatedPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, kind: PermissionKind, status: PermissionStatus) {
        self.answers.lock().insert(kind, status);
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<PermissionKind> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PermissionProvider for SimulatedPermissions {
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus> {
        self.requests.lock().push(kind);
        let status = self
            .answers
            .lock()
            .get(&kind)
            .copied()
            .unwrap_or(PermissionStatus::Granted);
        debug!("Simulated {} permission: {}", kind, status);
        Ok(status)
    }
}

#[derive(Default)]
struct CameraState {
    opened: Option<(Facing, VideoResolution)>,
    open_count: u32,
    close_count: u32,
    file_counter: u32,
    fail_open: bool,
    fail_capture: bool,
    fail_recording_start: bool,
    recording: Option<(RecordingCompleter, String)>,
}

/// Camera that writes nothing and hands out `sim://` URIs
#[derive(Default)]
pub struct SimulatedCamera {
    state: Mutex<CameraState>,
}

impl SimulatedCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }

    pub fn set_fail_capture(&self, fail: bool) {
        self.state.lock().fail_capture = fail;
    }

    pub fn set_fail_recording_start(&self, fail: bool) {
        self.state.lock().fail_recording_start = fail;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().opened.is_some()
    }

    pub fn opened_with(&self) -> Option<(Facing, VideoResolution)> {
        self.state.lock().opened
    }

    pub fn open_count(&self) -> u32 {
        self.state.lock().open_count
    }

    pub fn close_count(&self) -> u32 {
        self.state.lock().close_count
    }

    pub fn is_recording(&self) -> bool {
        self.state.lock().recording.is_some()
    }

    /// End the current recording from the device side (e.g. storage full)
    pub fn end_recording_from_device(
        &self,
        outcome: Option<DeviceError>,
    ) -> bool {
        let Some((completer, uri)) = self.state.lock().recording.take() else {
            return false;
        };
        match outcome {
            None => completer.complete(Ok(CapturedFile::new(uri))),
            Some(error) => completer.complete(Err(error)),
        }
        true
    }

    fn next_uri(state: &mut CameraState, extension: &str) -> String {
        state.file_counter += 1;
        format!("sim://capture/{:04}.{}", state.file_counter, extension)
    }
}

#[async_trait]
impl CameraDevice for SimulatedCamera {
    async fn open(
        &self,
        facing: Facing,
        resolution: VideoResolution,
    ) -> std::result::Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(DeviceError::OpenFailed {
                details: "simulated device busy".to_string(),
            });
        }
        state.opened = Some((facing, resolution));
        state.open_count += 1;
        Ok(())
    }

    async fn take_picture(&self) -> std::result::Result<CapturedFile, DeviceError> {
        let mut state = self.state.lock();
        if state.opened.is_none() {
            return Err(DeviceError::NotReady);
        }
        if state.fail_capture {
            return Err(DeviceError::CaptureFailed {
                details: "simulated encoder failure".to_string(),
            });
        }
        Ok(CapturedFile::new(Self::next_uri(&mut state, "jpg")))
    }

    async fn start_recording(&self) -> std::result::Result<RecordingHandle, DeviceError> {
        let mut state = self.state.lock();
        if state.opened.is_none() {
            return Err(DeviceError::NotReady);
        }
        if state.fail_recording_start {
            return Err(DeviceError::RecordingFailed {
                details: "simulated encoder failure".to_string(),
            });
        }
        if state.recording.is_some() {
            return Err(DeviceError::RecordingFailed {
                details: "already recording".to_string(),
            });
        }
        let uri = Self::next_uri(&mut state, "mp4");
        let (completer, handle) = RecordingHandle::channel();
        state.recording = Some((completer, uri));
        Ok(handle)
    }

    async fn stop_recording(&self) -> std::result::Result<(), DeviceError> {
        let Some((completer, uri)) = self.state.lock().recording.take() else {
            return Err(DeviceError::RecordingFailed {
                details: "not recording".to_string(),
            });
        };
        completer.complete(Ok(CapturedFile::new(uri)));
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.lock();
        // Dropping the completer resolves any pending handle with an error
        state.recording = None;
        if state.opened.take().is_some() {
            state.close_count += 1;
        }
    }
}

#[derive(Default)]
struct LocationState {
    current: Option<LocationData>,
    addresses: Vec<GeocodedAddress>,
    fail_geocode: bool,
    watchers: Vec<mpsc::Sender<LocationData>>,
}

/// Location provider fed by `push_fix`
#[derive(Default)]
pub struct SimulatedLocation {
    state: Mutex<LocationState>,
}

impl SimulatedLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fix(self, location: LocationData) -> Self {
        self.state.lock().current = Some(location);
        self
    }

    pub fn with_address(self, address: GeocodedAddress) -> Self {
        self.state.lock().addresses = vec![address];
        self
    }

    pub fn set_fail_geocode(&self, fail: bool) {
        self.state.lock().fail_geocode = fail;
    }

    pub fn set_address(&self, address: Option<GeocodedAddress>) {
        self.state.lock().addresses = address.into_iter().collect();
    }

    /// Publish a new fix to the one-shot query and every live watcher
    pub fn push_fix(&self, location: LocationData) {
        let mut state = self.state.lock();
        state.current = Some(location);
        state
            .watchers
            .retain(|tx| !tx.is_closed() && tx.try_send(location).is_ok());
    }

    pub fn watcher_count(&self) -> usize {
        let mut state = self.state.lock();
        state.watchers.retain(|tx| !tx.is_closed());
        state.watchers.len()
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocation {
    async fn current_position(&self) -> std::result::Result<LocationData, LocationError> {
        self.state
            .lock()
            .current
            .ok_or_else(|| LocationError::Unavailable {
                details: "no simulated fix".to_string(),
            })
    }

    async fn reverse_geocode(
        &self,
        _location: &LocationData,
    ) -> std::result::Result<Vec<GeocodedAddress>, LocationError> {
        let state = self.state.lock();
        if state.fail_geocode {
            return Err(LocationError::Geocode {
                details: "simulated geocoder offline".to_string(),
            });
        }
        Ok(state.addresses.clone())
    }

    async fn watch_positions(
        &self,
    ) -> std::result::Result<mpsc::Receiver<LocationData>, LocationError> {
        let (tx, rx) = mpsc::channel(32);
        self.state.lock().watchers.push(tx);
        Ok(rx)
    }
}

/// Media library that records deletions
#[derive(Default)]
pub struct SimulatedMediaLibrary {
    deleted: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl SimulatedMediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl MediaLibrary for SimulatedMediaLibrary {
    async fn delete_asset(&self, uri: &str) -> Result<()> {
        if *self.fail.lock() {
            return Err(StampcamError::MediaRemoval {
                uri: uri.to_string(),
                details: "simulated media store refused".to_string(),
            });
        }
        self.deleted.lock().push(uri.to_string());
        Ok(())
    }
}

/// A full simulated platform with typed access to each part
#[derive(Clone)]
pub struct SimulatedPlatform {
    pub camera: Arc<SimulatedCamera>,
    pub permissions: Arc<SimulatedPermissions>,
    pub location: Arc<SimulatedLocation>,
    pub media_library: Arc<SimulatedMediaLibrary>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self {
            camera: Arc::new(SimulatedCamera::new()),
            permissions: Arc::new(SimulatedPermissions::new()),
            location: Arc::new(SimulatedLocation::new()),
            media_library: Arc::new(SimulatedMediaLibrary::new()),
        }
    }

    pub fn with_location(mut self, location: SimulatedLocation) -> Self {
        self.location = Arc::new(location);
        self
    }

    pub fn platform(&self) -> Platform {
        Platform {
            camera: self.camera.clone(),
            permissions: self.permissions.clone(),
            location: self.location.clone(),
            media_library: self.media_library.clone(),
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}
