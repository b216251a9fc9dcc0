use crate::location::LocationData;
use crate::session::{Notice, NoticeLevel, PermissionSet, SessionState};
use crate::storage::MediaType;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events emitted by capture sessions and the media library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The capture session moved between states
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// The permission round finished
    PermissionsResolved { permissions: PermissionSet },
    /// Overlay clock refreshed
    ClockTick { date: String, time: String },
    /// Display counter advanced while recording
    RecordingTick { elapsed_seconds: u64 },
    /// A new location (and address) reached the overlay
    LocationUpdated {
        location: LocationData,
        address: Option<String>,
    },
    /// A capture was written to storage
    MediaSaved {
        id: String,
        media_type: MediaType,
        duration: u64,
    },
    /// A record was removed from the library
    MediaDeleted { id: String },
    /// A user-facing notice was raised
    NoticeRaised { notice: Notice },
}

impl SessionEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            SessionEvent::StateChanged { from, to } => {
                format!("Session state {} -> {}", from, to)
            }
            SessionEvent::PermissionsResolved { permissions } => format!(
                "Permissions resolved: camera={} microphone={} location={}",
                permissions.camera, permissions.microphone, permissions.location
            ),
            SessionEvent::ClockTick { date, time } => format!("Clock {} {}", date, time),
            SessionEvent::RecordingTick { elapsed_seconds } => {
                format!("Recording for {}s", elapsed_seconds)
            }
            SessionEvent::LocationUpdated { location, address } => format!(
                "Location {:.6}, {:.6} ({})",
                location.latitude,
                location.longitude,
                address.as_deref().unwrap_or("no address")
            ),
            SessionEvent::MediaSaved {
                id,
                media_type,
                duration,
            } => format!("Saved {} {} ({}s)", media_type, id, duration),
            SessionEvent::MediaDeleted { id } => format!("Deleted media {}", id),
            SessionEvent::NoticeRaised { notice } => format!("Notice: {}", notice.message),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::PermissionsResolved { .. } => "permissions_resolved",
            SessionEvent::ClockTick { .. } => "clock_tick",
            SessionEvent::RecordingTick { .. } => "recording_tick",
            SessionEvent::LocationUpdated { .. } => "location_updated",
            SessionEvent::MediaSaved { .. } => "media_saved",
            SessionEvent::MediaDeleted { .. } => "media_deleted",
            SessionEvent::NoticeRaised { .. } => "notice_raised",
        }
    }
}

/// Broadcast bus for session events
///
/// Publishing never fails: with no subscribers the event is simply dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: SessionEvent) -> usize {
        match &event {
            SessionEvent::StateChanged { from, to } => {
                info!("Session state changed: {} -> {}", from, to);
            }
            SessionEvent::MediaSaved { .. } | SessionEvent::MediaDeleted { .. } => {
                info!("{}", event.description());
            }
            SessionEvent::NoticeRaised { notice } if notice.level == NoticeLevel::Error => {
                warn!("{}", event.description());
            }
            SessionEvent::ClockTick { .. } | SessionEvent::RecordingTick { .. } => {}
            _ => debug!("{}", event.description()),
        }

        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = SessionEvent::RecordingTick { elapsed_seconds: 3 };
        assert_eq!(bus.publish(event.clone()), 2);

        let got = timeout(Duration::from_millis(100), first.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, event);
        let got = timeout(Duration::from_millis(100), second.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        let delivered = bus.publish(SessionEvent::MediaDeleted {
            id: "1".to_string(),
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_type_and_description() {
        let event = SessionEvent::StateChanged {
            from: SessionState::Ready,
            to: SessionState::Recording,
        };
        assert_eq!(event.event_type(), "state_changed");
        assert_eq!(event.description(), "Session state ready -> recording");

        let saved = SessionEvent::MediaSaved {
            id: "42".to_string(),
            media_type: MediaType::Video,
            duration: 7,
        };
        assert_eq!(saved.description(), "Saved video 42 (7s)");
    }
}
