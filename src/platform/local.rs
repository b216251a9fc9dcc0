use super::MediaLibrary;
use crate::error::{Result, StampcamError};
use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::debug;

/// Media library over the local filesystem, for `file://` URIs
///
/// Other schemes have no local file behind them and are treated as already gone.
#[derive(Debug, Default, Clone)]
pub struct LocalMediaLibrary;

impl LocalMediaLibrary {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaLibrary for LocalMediaLibrary {
    async fn delete_asset(&self, uri: &str) -> Result<()> {
        let Some(path) = uri.strip_prefix("file://") else {
            debug!("No local file behind {}, nothing to remove", uri);
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Media file {} already removed", path);
                Ok(())
            }
            Err(e) => Err(StampcamError::MediaRemoval {
                uri: uri.to_string(),
                details: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_removes_local_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"frames").unwrap();
        let uri = format!("file://{}", path.display());

        let library = LocalMediaLibrary::new();
        library.delete_asset(&uri).await.unwrap();
        assert!(!path.exists());

        // Second removal is a no-op
        library.delete_asset(&uri).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_file_uris_are_ignored() {
        let library = LocalMediaLibrary::new();
        assert!(library.delete_asset("sim://capture/0001.mp4").await.is_ok());
    }
}
