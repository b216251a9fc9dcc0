mod geo;
mod service;
mod types;
mod watch;

pub use geo::{distance_meters, format_coordinates};
pub use service::{LocationService, ADDRESS_LOOKUP_FAILED, UNKNOWN_ADDRESS};
pub use types::{GeocodedAddress, LocationData};
pub use watch::WatchSubscription;
