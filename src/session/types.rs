use crate::location::LocationData;
use crate::settings::CameraMode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Camera,
    Microphone,
    Location,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Camera => f.write_str("Camera"),
            PermissionKind::Microphone => f.write_str("Microphone"),
            PermissionKind::Location => f.write_str("Location"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Not asked during this session
    #[default]
    Undetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        *self == PermissionStatus::Granted
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Undetermined => f.write_str("undetermined"),
            PermissionStatus::Granted => f.write_str("granted"),
            PermissionStatus::Denied => f.write_str("denied"),
        }
    }
}

/// Outcome of the permission round at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    pub camera: PermissionStatus,
    pub microphone: PermissionStatus,
    pub location: PermissionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    RequestingPermissions,
    PermissionDenied,
    /// Device opened, waiting for the camera-ready callback
    Opening,
    DeviceFailed,
    Ready,
    Recording,
    TornDown,
}

impl SessionState {
    /// States a user retry can leave
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionState::PermissionDenied | SessionState::DeviceFailed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::RequestingPermissions => "requesting_permissions",
            SessionState::PermissionDenied => "permission_denied",
            SessionState::Opening => "opening",
            SessionState::DeviceFailed => "device_failed",
            SessionState::Ready => "ready",
            SessionState::Recording => "recording",
            SessionState::TornDown => "torn_down",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    Back,
    Front,
}

impl Facing {
    pub fn toggled(self) -> Self {
        match self {
            Facing::Back => Facing::Front,
            Facing::Front => Facing::Back,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Back => f.write_str("back"),
            Facing::Front => f.write_str("front"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What the overlay draws on top of the preview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub date: String,
    pub time: String,
    pub location: Option<LocationData>,
    pub address: Option<String>,
}

/// Everything a capture screen needs to render
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub facing: Facing,
    pub mode: CameraMode,
    pub permissions: PermissionSet,
    pub overlay: OverlaySnapshot,
    /// Display counter, `MM:SS`, while recording
    pub recording_display: Option<String>,
    pub notice: Option<Notice>,
    pub capture_enabled: bool,
}
