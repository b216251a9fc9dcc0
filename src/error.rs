use thiserror::Error;

use crate::session::PermissionKind;

#[derive(Error, Debug)]
pub enum StampcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: PermissionKind },

    #[error("Camera device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Storage error: {details}")]
    Storage { details: String },

    #[error("Failed to remove media asset {uri}: {details}")]
    MediaRemoval { uri: String, details: String },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("System error: {message}")]
    System { message: String },
}

/// Errors reported by a camera device implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("failed to open camera: {details}")]
    OpenFailed { details: String },

    #[error("camera is not ready")]
    NotReady,

    #[error("photo capture failed: {details}")]
    CaptureFailed { details: String },

    #[error("recording failed: {details}")]
    RecordingFailed { details: String },
}

/// Errors reported by a location provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {details}")]
    Unavailable { details: String },

    #[error("reverse geocoding failed: {details}")]
    Geocode { details: String },
}

impl StampcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn storage<S: Into<String>>(details: S) -> Self {
        Self::Storage {
            details: details.into(),
        }
    }

    pub fn invalid_state<O: Into<String>, S: ToString>(operation: O, state: S) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Whether the user can recover from this error without restarting the app
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StampcamError::PermissionDenied { .. }
                | StampcamError::Device(_)
                | StampcamError::Location(_)
                | StampcamError::Storage { .. }
                | StampcamError::MediaRemoval { .. }
                | StampcamError::InvalidState { .. }
        )
    }

    /// Short message suitable for a dismissible notice
    pub fn user_message(&self) -> String {
        match self {
            StampcamError::PermissionDenied {
                permission: PermissionKind::Microphone,
            } => "Microphone access is required to record video with audio".to_string(),
            StampcamError::PermissionDenied { permission } => {
                format!("{} permission is required", permission)
            }
            StampcamError::Device(DeviceError::NotReady) => "Camera is not ready".to_string(),
            StampcamError::Device(DeviceError::CaptureFailed { .. }) => {
                "Failed to take picture".to_string()
            }
            StampcamError::Device(DeviceError::RecordingFailed { .. }) => {
                "Failed to record video".to_string()
            }
            StampcamError::Device(e) => format!("Camera error: {}", e),
            StampcamError::Storage { .. } => "Failed to save media".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StampcamError>;
