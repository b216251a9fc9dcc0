use super::overlay::{format_recording_duration, Stamp};
use super::types::{
    Facing, Notice, OverlaySnapshot, PermissionKind, PermissionSet, PermissionStatus,
    SessionSnapshot, SessionState,
};
use crate::config::SessionConfig;
use crate::error::{DeviceError, Result, StampcamError};
use crate::events::{EventBus, SessionEvent};
use crate::location::{LocationData, LocationService, WatchSubscription};
use crate::platform::{CameraDevice, CapturedFile, PermissionProvider, RecordingHandle};
use crate::settings::{CameraMode, SettingsStore};
use crate::storage::{MediaType, NewMedia, SavedMedia, Storage};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

pub const PHOTO_SAVED: &str = "Photo saved!";
pub const VIDEO_SAVED: &str = "Video saved!";

/// How long `stop_recording` waits for the device to hand over the file
const RECORDING_FINISH_TIMEOUT: Duration = Duration::from_secs(10);

type FinishOutcome = Result<Option<SavedMedia>>;

/// Lifecycle of one capture screen: permissions, device, overlay clock, location
/// watch, photo capture and video recording.
///
/// Clones share the same session. Device-touching operations are serialized;
/// `stop` is not, it invalidates whatever is in flight instead.
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    config: SessionConfig,
    settings: SettingsStore,
    storage: Arc<Storage>,
    location: LocationService,
    camera: Arc<dyn CameraDevice>,
    permissions: Arc<dyn PermissionProvider>,
    events: Arc<EventBus>,
    core: Mutex<SessionCore>,
    device_lock: tokio::sync::Mutex<()>,
}

struct SessionCore {
    state: SessionState,
    /// Bumped by `start` and `stop`; work carrying an older value is stale
    epoch: u64,
    facing: Facing,
    mode: CameraMode,
    permissions: PermissionSet,
    overlay: OverlaySnapshot,
    recording: Option<ActiveRecording>,
    notice: Option<Notice>,
    /// A device open is in flight
    opening: bool,
    /// Camera-ready arrived before the in-flight open returned
    ready_latched: bool,
    tasks: SessionTasks,
}

struct ActiveRecording {
    started: Instant,
    display_seconds: u64,
}

/// Session handle that does not keep the session alive
#[derive(Clone)]
pub struct WeakCaptureSession {
    inner: Weak<SessionInner>,
}

impl WeakCaptureSession {
    pub fn upgrade(&self) -> Option<CaptureSession> {
        self.inner.upgrade().map(|inner| CaptureSession { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

#[derive(Default)]
struct SessionTasks {
    token: Option<CancellationToken>,
    clock: Option<JoinHandle<()>>,
    locator: Option<JoinHandle<()>>,
    counter: Option<(CancellationToken, JoinHandle<()>)>,
    watch: Option<WatchSubscription>,
    finisher: Option<JoinHandle<FinishOutcome>>,
}

impl SessionTasks {
    fn is_idle(&self) -> bool {
        self.token.is_none()
            && self.clock.is_none()
            && self.locator.is_none()
            && self.counter.is_none()
            && self.watch.is_none()
            && self.finisher.is_none()
    }

    fn stop_counter(&mut self) {
        if let Some((token, counter)) = self.counter.take() {
            token.cancel();
            counter.abort();
        }
    }

    fn release(mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
        if let Some(locator) = self.locator.take() {
            locator.abort();
        }
        self.stop_counter();
        if let Some(mut watch) = self.watch.take() {
            watch.cancel();
        }
        if let Some(finisher) = self.finisher.take() {
            finisher.abort();
        }
    }
}

impl CaptureSession {
    pub(super) fn new(
        config: SessionConfig,
        settings: SettingsStore,
        storage: Arc<Storage>,
        location: LocationService,
        camera: Arc<dyn CameraDevice>,
        permissions: Arc<dyn PermissionProvider>,
        events: Arc<EventBus>,
    ) -> Self {
        let mode = settings.get().default_mode;
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                config,
                settings,
                storage,
                location,
                camera,
                permissions,
                events,
                core: Mutex::new(SessionCore {
                    state: SessionState::Uninitialized,
                    epoch: 0,
                    facing: Facing::Back,
                    mode,
                    permissions: PermissionSet::default(),
                    overlay: OverlaySnapshot::default(),
                    recording: None,
                    notice: None,
                    opening: false,
                    ready_latched: false,
                    tasks: SessionTasks::default(),
                }),
                device_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakCaptureSession {
        WeakCaptureSession {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.inner.events)
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    pub fn facing(&self) -> Facing {
        self.inner.core.lock().facing
    }

    pub fn mode(&self) -> CameraMode {
        self.inner.core.lock().mode
    }

    pub fn permissions(&self) -> PermissionSet {
        self.inner.core.lock().permissions
    }

    pub fn notice(&self) -> Option<Notice> {
        self.inner.core.lock().notice.clone()
    }

    pub fn dismiss_notice(&self) {
        self.inner.core.lock().notice = None;
    }

    /// Screen focus: tear down anything held and acquire from scratch
    pub async fn start(&self) -> SessionState {
        let span = self.inner.span();
        self.inner.start().instrument(span).await
    }

    /// Re-run the permission round after a denial or a device failure
    pub async fn retry(&self) -> Result<SessionState> {
        let state = self.state();
        if !state.is_retryable() {
            return Err(StampcamError::invalid_state("retry", state));
        }
        Ok(self.start().await)
    }

    /// Device callback: the preview is live and capture can begin
    ///
    /// A callback that lands while the device open is still in flight is held
    /// and applied once the open returns.
    pub fn camera_ready(&self) -> bool {
        let inner = &self.inner;
        let mut core = inner.core.lock();
        if core.opening {
            debug!("Camera ready before the open returned, holding it");
            core.ready_latched = true;
            return true;
        }
        if core.state != SessionState::Opening {
            debug!("Ignoring camera-ready while {}", core.state);
            return false;
        }
        inner.set_state(&mut core, SessionState::Ready);
        true
    }

    pub async fn take_photo(&self) -> Result<SavedMedia> {
        let span = self.inner.span();
        self.inner.take_photo().instrument(span).await
    }

    pub async fn start_recording(&self) -> Result<()> {
        let span = self.inner.span();
        self.inner.start_recording().instrument(span).await
    }

    /// User stop; resolves once the video record is saved (or discarded)
    pub async fn stop_recording(&self) -> Result<Option<SavedMedia>> {
        let span = self.inner.span();
        self.inner.stop_recording().instrument(span).await
    }

    pub async fn toggle_facing(&self) -> Result<Facing> {
        let span = self.inner.span();
        self.inner.toggle_facing().instrument(span).await
    }

    pub fn set_mode(&self, mode: CameraMode) -> Result<()> {
        let mut core = self.inner.core.lock();
        if core.state == SessionState::Recording {
            return Err(StampcamError::invalid_state("change mode", core.state));
        }
        core.mode = mode;
        Ok(())
    }

    /// Screen blur or app background: release everything
    pub async fn stop(&self) {
        let span = self.inner.span();
        self.inner.stop().instrument(span).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let tagging = self.inner.settings.get().location_tagging;
        let core = self.inner.core.lock();
        let mut overlay = core.overlay.clone();
        if !tagging {
            overlay.location = None;
            overlay.address = None;
        }
        SessionSnapshot {
            state: core.state,
            facing: core.facing,
            mode: core.mode,
            permissions: core.permissions,
            overlay,
            recording_display: core
                .recording
                .as_ref()
                .map(|r| format_recording_duration(r.display_seconds)),
            notice: core.notice.clone(),
            capture_enabled: core.state == SessionState::Ready,
        }
    }

    #[cfg(test)]
    pub(crate) fn has_background_tasks(&self) -> bool {
        !self.inner.core.lock().tasks.is_idle()
    }
}

impl SessionInner {
    fn span(&self) -> Span {
        info_span!("capture_session", session_id = %self.id)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.core.lock().epoch == epoch
    }

    /// State to report when `epoch` has been superseded
    fn stale_state(&self, epoch: u64) -> Option<SessionState> {
        let core = self.core.lock();
        (core.epoch != epoch).then_some(core.state)
    }

    fn set_state(&self, core: &mut SessionCore, to: SessionState) {
        let from = core.state;
        if from == to {
            return;
        }
        core.state = to;
        self.events.publish(SessionEvent::StateChanged { from, to });
    }

    fn raise_notice(&self, core: &mut SessionCore, notice: Notice) {
        core.notice = Some(notice.clone());
        self.events.publish(SessionEvent::NoticeRaised { notice });
    }

    /// Mark a device open as in flight; false when `epoch` is stale
    fn begin_open(&self, epoch: u64) -> bool {
        let mut core = self.core.lock();
        if core.epoch != epoch {
            return false;
        }
        core.opening = true;
        core.ready_latched = false;
        true
    }

    /// Clear the in-flight open, returning whether camera-ready already arrived
    fn end_open(core: &mut SessionCore) -> bool {
        core.opening = false;
        std::mem::take(&mut core.ready_latched)
    }

    fn notify_current(&self, epoch: u64, notice: Notice) {
        let mut core = self.core.lock();
        if core.epoch == epoch {
            self.raise_notice(&mut core, notice);
        }
    }

    /// Log a device failure and surface it as a notice
    fn capture_failed(&self, epoch: u64, error: DeviceError) -> StampcamError {
        let error = StampcamError::Device(error);
        error!("Capture failed: {}", error);
        self.notify_current(epoch, Notice::error(error.user_message()));
        error
    }

    fn require_ready(&self, core: &mut SessionCore, operation: &str) -> Result<()> {
        match core.state {
            SessionState::Ready => Ok(()),
            SessionState::Recording => Err(StampcamError::invalid_state(operation, core.state)),
            _ => {
                let error = StampcamError::Device(DeviceError::NotReady);
                self.raise_notice(core, Notice::error(error.user_message()));
                Err(error)
            }
        }
    }

    async fn request_permission(&self, kind: PermissionKind) -> PermissionStatus {
        match self.permissions.request(kind).await {
            Ok(status) => {
                debug!("{} permission {}", kind, status);
                status
            }
            Err(e) => {
                warn!("{} permission request failed, treating as denied: {}", kind, e);
                PermissionStatus::Denied
            }
        }
    }

    async fn start(self: &Arc<Self>) -> SessionState {
        let _device = self.device_lock.lock().await;
        let settings = self.settings.get();

        let (epoch, tasks, was_recording) = {
            let mut core = self.core.lock();
            core.epoch += 1;
            let tasks = std::mem::take(&mut core.tasks);
            let was_recording = core.recording.take().is_some();
            core.mode = settings.default_mode;
            core.notice = None;
            core.permissions = PermissionSet::default();
            core.overlay = OverlaySnapshot::default();
            Self::end_open(&mut core);
            self.set_state(&mut core, SessionState::RequestingPermissions);
            (core.epoch, tasks, was_recording)
        };
        self.release_device(tasks, was_recording).await;
        info!("Starting capture session");

        let camera = self.request_permission(PermissionKind::Camera).await;
        let microphone = self.request_permission(PermissionKind::Microphone).await;
        let location = if settings.location_tagging {
            self.request_permission(PermissionKind::Location).await
        } else {
            PermissionStatus::Undetermined
        };
        let permissions = PermissionSet {
            camera,
            microphone,
            location,
        };

        {
            let mut core = self.core.lock();
            if core.epoch != epoch {
                debug!("Session stopped during the permission round");
                return core.state;
            }
            core.permissions = permissions;
            self.events
                .publish(SessionEvent::PermissionsResolved { permissions });
            if !camera.is_granted() {
                warn!("Camera permission not granted");
                self.set_state(&mut core, SessionState::PermissionDenied);
                return core.state;
            }
        }
        if !microphone.is_granted() {
            warn!("Microphone permission not granted, video recording disabled");
        }

        self.acquire(epoch, permissions).await
    }

    /// Open the device and start the clock and location feeds
    async fn acquire(self: &Arc<Self>, epoch: u64, permissions: PermissionSet) -> SessionState {
        let settings = self.settings.get();
        let facing = self.core.lock().facing;
        if !self.begin_open(epoch) {
            return self.core.lock().state;
        }

        if let Err(e) = self.camera.open(facing, settings.video_resolution).await {
            let error = StampcamError::Device(e);
            error!("Failed to open camera: {}", error);
            let mut core = self.core.lock();
            if core.epoch == epoch {
                Self::end_open(&mut core);
                self.raise_notice(&mut core, Notice::error(error.user_message()));
                self.set_state(&mut core, SessionState::DeviceFailed);
            }
            return core.state;
        }
        debug!(
            "Camera opened: {} facing at {}",
            facing, settings.video_resolution
        );

        self.refresh_clock(epoch);
        let started = {
            let mut core = self.core.lock();
            if core.epoch == epoch {
                let token = CancellationToken::new();
                core.tasks.clock = Some(self.spawn_clock(epoch, token.clone()));
                core.tasks.token = Some(token);
                // Location runs beside the device, never under the device lock
                if permissions.location.is_granted() && settings.location_tagging {
                    core.tasks.locator = Some(self.spawn_locator(epoch));
                }
                let latched = Self::end_open(&mut core);
                self.set_state(&mut core, SessionState::Opening);
                if latched {
                    self.set_state(&mut core, SessionState::Ready);
                }
                true
            } else {
                false
            }
        };
        if !started {
            debug!("Session stopped while opening the camera, releasing it");
            self.camera.close().await;
            return self.core.lock().state;
        }

        self.core.lock().state
    }

    /// One-shot fix and address, then the continuous watch
    fn spawn_locator(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let location = self.location.clone();
        tokio::spawn(
            async move {
                if let Some(fix) = location.get_current_location().await {
                    let Some(inner) = weak.upgrade() else { return };
                    inner.apply_location(epoch, fix).await;
                }

                let on_update = weak.clone();
                let watch = location.watch_with_config(move |fix| {
                    let weak = on_update.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.apply_location(epoch, fix).await;
                        }
                    }
                });
                let Some(inner) = weak.upgrade() else { return };
                let mut core = inner.core.lock();
                if core.epoch == epoch {
                    core.tasks.watch = Some(watch);
                }
            }
            .instrument(self.span()),
        )
    }

    async fn release_device(&self, tasks: SessionTasks, was_recording: bool) {
        tasks.release();
        if was_recording {
            warn!("Discarding the recording in progress");
            if let Err(e) = self.camera.stop_recording().await {
                debug!("Device already stopped recording: {}", e);
            }
        }
        self.camera.close().await;
    }

    fn refresh_clock(&self, epoch: u64) {
        let stamp = Stamp::overlay(Utc::now(), &self.settings.get());
        let mut core = self.core.lock();
        if core.epoch != epoch {
            return;
        }
        core.overlay.date = stamp.date.clone();
        core.overlay.time = stamp.time.clone();
        self.events.publish(SessionEvent::ClockTick {
            date: stamp.date,
            time: stamp.time,
        });
    }

    fn spawn_clock(self: &Arc<Self>, epoch: u64, token: CancellationToken) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.clock_tick();
        tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            let Some(inner) = weak.upgrade() else { break };
                            inner.refresh_clock(epoch);
                        }
                    }
                }
                debug!("Overlay clock stopped");
            }
            .instrument(self.span()),
        )
    }

    fn advance_counter(&self, epoch: u64) {
        let mut core = self.core.lock();
        if core.epoch != epoch {
            return;
        }
        let Some(recording) = core.recording.as_mut() else {
            return;
        };
        recording.display_seconds += 1;
        let elapsed_seconds = recording.display_seconds;
        self.events
            .publish(SessionEvent::RecordingTick { elapsed_seconds });
    }

    fn spawn_counter(self: &Arc<Self>, epoch: u64, token: CancellationToken) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.recording_tick();
        tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            let Some(inner) = weak.upgrade() else { break };
                            inner.advance_counter(epoch);
                        }
                    }
                }
            }
            .instrument(self.span()),
        )
    }

    async fn apply_location(&self, epoch: u64, fix: LocationData) {
        if !self.settings.get().location_tagging {
            debug!("Location tagging off, ignoring location update");
            return;
        }
        if !self.is_current(epoch) {
            return;
        }
        let address = self.location.reverse_geocode(&fix).await;

        let tagging = self.settings.get().location_tagging;
        let mut core = self.core.lock();
        if core.epoch != epoch || !tagging {
            return;
        }
        core.overlay.location = Some(fix);
        core.overlay.address = Some(address.clone());
        self.events.publish(SessionEvent::LocationUpdated {
            location: fix,
            address: Some(address),
        });
    }

    /// Build and persist a record for a captured file
    async fn save_capture(
        &self,
        file: CapturedFile,
        media_type: MediaType,
        duration: u64,
    ) -> Result<SavedMedia> {
        let settings = self.settings.get();
        let captured_at = Utc::now();
        let stamp = Stamp::record(captured_at, &settings);
        let (location, address) = if settings.location_tagging {
            let core = self.core.lock();
            (core.overlay.location, core.overlay.address.clone())
        } else {
            (None, None)
        };

        let saved = self
            .storage
            .save_media(NewMedia {
                uri: file.uri,
                media_type,
                duration,
                location,
                address,
                timestamp: captured_at,
                resolution: settings.video_resolution.to_string(),
                date: stamp.date,
                time: stamp.time,
            })
            .await?;

        self.events.publish(SessionEvent::MediaSaved {
            id: saved.id.clone(),
            media_type,
            duration,
        });
        Ok(saved)
    }

    async fn take_photo(&self) -> Result<SavedMedia> {
        let _device = self.device_lock.lock().await;
        let epoch = {
            let mut core = self.core.lock();
            self.require_ready(&mut core, "take photo")?;
            core.epoch
        };

        let file = self
            .camera
            .take_picture()
            .await
            .map_err(|e| self.capture_failed(epoch, e))?;
        if let Some(state) = self.stale_state(epoch) {
            return Err(StampcamError::invalid_state("save photo", state));
        }

        match self.save_capture(file, MediaType::Image, 0).await {
            Ok(saved) => {
                info!("Photo saved: {}", saved.id);
                self.notify_current(epoch, Notice::success(PHOTO_SAVED));
                Ok(saved)
            }
            Err(e) => {
                error!("Failed to save photo: {}", e);
                self.notify_current(epoch, Notice::error(e.user_message()));
                Err(e)
            }
        }
    }

    async fn start_recording(self: &Arc<Self>) -> Result<()> {
        let _device = self.device_lock.lock().await;
        let epoch = {
            let mut core = self.core.lock();
            self.require_ready(&mut core, "start recording")?;
            if !core.permissions.microphone.is_granted() {
                let error = StampcamError::PermissionDenied {
                    permission: PermissionKind::Microphone,
                };
                warn!("Refusing to record: {}", error);
                self.raise_notice(&mut core, Notice::error(error.user_message()));
                return Err(error);
            }
            core.epoch
        };

        let handle = self
            .camera
            .start_recording()
            .await
            .map_err(|e| self.capture_failed(epoch, e))?;

        if let Some(state) = self.begin_recording(epoch, handle) {
            debug!("Session stopped while the recording was starting");
            if let Err(e) = self.camera.stop_recording().await {
                debug!("Device already stopped recording: {}", e);
            }
            return Err(StampcamError::invalid_state("start recording", state));
        }
        info!("Recording started");
        Ok(())
    }

    /// Enter `Recording`; returns the current state instead when `epoch` is stale
    fn begin_recording(self: &Arc<Self>, epoch: u64, handle: RecordingHandle) -> Option<SessionState> {
        let mut core = self.core.lock();
        if core.epoch != epoch {
            return Some(core.state);
        }
        let token = core
            .tasks
            .token
            .as_ref()
            .map(|t| t.child_token())
            .unwrap_or_else(CancellationToken::new);
        core.recording = Some(ActiveRecording {
            started: Instant::now(),
            display_seconds: 0,
        });
        core.tasks.counter = Some((token.clone(), self.spawn_counter(epoch, token)));
        core.tasks.finisher = Some(self.spawn_finisher(epoch, handle));
        self.set_state(&mut core, SessionState::Recording);
        None
    }

    /// Waits for the device to end the recording, whoever asked for it
    fn spawn_finisher(
        self: &Arc<Self>,
        epoch: u64,
        handle: RecordingHandle,
    ) -> JoinHandle<FinishOutcome> {
        let weak = Arc::downgrade(self);
        tokio::spawn(
            async move {
                let outcome = handle.finished().await;
                let stopped = Instant::now();
                match weak.upgrade() {
                    Some(inner) => inner.finish_recording(epoch, outcome, stopped).await,
                    None => Ok(None),
                }
            }
            .instrument(self.span()),
        )
    }

    async fn finish_recording(
        &self,
        epoch: u64,
        outcome: std::result::Result<CapturedFile, DeviceError>,
        stopped: Instant,
    ) -> FinishOutcome {
        let started = {
            let mut core = self.core.lock();
            if core.epoch != epoch {
                debug!("Discarding recording from a released session");
                return Ok(None);
            }
            core.tasks.stop_counter();
            core.recording.as_ref().map(|r| r.started)
        };
        let Some(started) = started else {
            return Ok(None);
        };

        let result = match outcome {
            Ok(file) => {
                // Wall-clock length; the display counter can drift from it
                let duration = stopped.saturating_duration_since(started).as_secs();
                self.save_capture(file, MediaType::Video, duration).await
            }
            Err(e) => Err(StampcamError::Device(e)),
        };

        let mut core = self.core.lock();
        let current = core.epoch == epoch;
        if current {
            core.recording = None;
            core.tasks.finisher = None;
            self.set_state(&mut core, SessionState::Ready);
        }
        match result {
            Ok(saved) => {
                info!("Video saved: {} ({}s)", saved.id, saved.duration);
                if current {
                    self.raise_notice(&mut core, Notice::success(VIDEO_SAVED));
                }
                Ok(Some(saved))
            }
            Err(e) => {
                error!("Failed to save video: {}", e);
                if current {
                    self.raise_notice(&mut core, Notice::error(e.user_message()));
                }
                Err(e)
            }
        }
    }

    async fn stop_recording(&self) -> Result<Option<SavedMedia>> {
        let _device = self.device_lock.lock().await;
        let (epoch, finisher) = {
            let mut core = self.core.lock();
            if core.state != SessionState::Recording {
                return Err(StampcamError::invalid_state("stop recording", core.state));
            }
            (core.epoch, core.tasks.finisher.take())
        };

        if let Err(e) = self.camera.stop_recording().await {
            warn!("Camera did not accept the stop request: {}", e);
        }
        let Some(mut finisher) = finisher else {
            return Ok(None);
        };

        match tokio::time::timeout(RECORDING_FINISH_TIMEOUT, &mut finisher).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) if e.is_cancelled() => Ok(None),
            Ok(Err(e)) => Err(StampcamError::system(format!(
                "recording completion task failed: {}",
                e
            ))),
            Err(_) => {
                finisher.abort();
                let error = StampcamError::Device(DeviceError::RecordingFailed {
                    details: "device never delivered the recording".to_string(),
                });
                error!("{}", error);
                let mut core = self.core.lock();
                if core.epoch == epoch {
                    core.tasks.stop_counter();
                    core.recording = None;
                    self.set_state(&mut core, SessionState::Ready);
                    self.raise_notice(&mut core, Notice::error(error.user_message()));
                }
                Err(error)
            }
        }
    }

    async fn toggle_facing(&self) -> Result<Facing> {
        let _device = self.device_lock.lock().await;
        let (epoch, facing, reopen) = {
            let mut core = self.core.lock();
            if core.state == SessionState::Recording {
                return Err(StampcamError::invalid_state("switch camera", core.state));
            }
            core.facing = core.facing.toggled();
            let reopen = matches!(core.state, SessionState::Opening | SessionState::Ready);
            if reopen {
                core.opening = true;
                core.ready_latched = false;
                self.set_state(&mut core, SessionState::Opening);
            }
            (core.epoch, core.facing, reopen)
        };
        info!("Switched to {} camera", facing);
        if !reopen {
            return Ok(facing);
        }

        let resolution = self.settings.get().video_resolution;
        self.camera.close().await;
        if let Err(e) = self.camera.open(facing, resolution).await {
            let error = StampcamError::Device(e);
            error!("Failed to reopen camera: {}", error);
            let mut core = self.core.lock();
            if core.epoch == epoch {
                Self::end_open(&mut core);
                self.raise_notice(&mut core, Notice::error(error.user_message()));
                self.set_state(&mut core, SessionState::DeviceFailed);
            }
            return Err(error);
        }
        let current = {
            let mut core = self.core.lock();
            let current = core.epoch == epoch;
            if current && Self::end_open(&mut core) {
                self.set_state(&mut core, SessionState::Ready);
            }
            current
        };
        if !current {
            self.camera.close().await;
        }
        Ok(facing)
    }

    async fn stop(&self) {
        let (tasks, was_recording) = {
            let mut core = self.core.lock();
            core.epoch += 1;
            let tasks = std::mem::take(&mut core.tasks);
            let was_recording = core.recording.take().is_some();
            Self::end_open(&mut core);
            self.set_state(&mut core, SessionState::TornDown);
            (tasks, was_recording)
        };
        self.release_device(tasks, was_recording).await;
        info!("Capture session released");
    }
}
