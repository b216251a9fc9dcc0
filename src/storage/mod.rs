mod adapter;
mod kv;
mod media;
#[cfg(test)]
mod tests;

pub use adapter::{Storage, MEDIA_KEY, SETTINGS_KEY};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use media::{MediaType, NewMedia, SavedMedia};
