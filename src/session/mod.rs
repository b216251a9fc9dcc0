mod builder;
mod controller;
mod overlay;
mod types;

pub use builder::CaptureSessionBuilder;
pub use controller::{CaptureSession, WeakCaptureSession, PHOTO_SAVED, VIDEO_SAVED};
pub use overlay::{format_recording_duration, resolve_timezone, DisplayZone, Stamp};
pub use types::{
    Facing, Notice, NoticeLevel, OverlaySnapshot, PermissionKind, PermissionSet,
    PermissionStatus, SessionSnapshot, SessionState,
};
