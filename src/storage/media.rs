use crate::location::LocationData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::Video => f.write_str("video"),
            MediaType::Image => f.write_str("image"),
        }
    }
}

/// A captured video or photo as stored under `saved_media`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMedia {
    pub id: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// Whole seconds, 0 for photos
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub location: Option<LocationData>,
    #[serde(default)]
    pub address: Option<String>,
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub created_at: DateTime<Utc>,
}

/// A capture handed to storage; id and creation time are assigned on save
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedia {
    pub uri: String,
    pub media_type: MediaType,
    pub duration: u64,
    pub location: Option<LocationData>,
    pub address: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub resolution: String,
    pub date: String,
    pub time: String,
}

impl NewMedia {
    pub(crate) fn into_saved(self, id: String, created_at: DateTime<Utc>) -> SavedMedia {
        SavedMedia {
            id,
            uri: self.uri,
            media_type: self.media_type,
            duration: self.duration,
            location: self.location,
            address: self.address,
            timestamp: self.timestamp,
            resolution: self.resolution,
            date: self.date,
            time: self.time,
            created_at,
        }
    }
}

impl SavedMedia {
    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Fill display strings that older records may lack
    pub(crate) fn with_display_fallbacks(mut self) -> Self {
        if self.date.is_empty() {
            self.date = self.timestamp.format("%-m/%-d/%Y").to_string();
        }
        if self.time.is_empty() {
            self.time = self.timestamp.format("%H:%M:%S").to_string();
        }
        self
    }
}
