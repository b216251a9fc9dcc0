use super::AppContext;
use crate::config::StampcamConfig;
use crate::error::Result;
use crate::library::PruneReport;
use crate::platform::Platform;
use crate::storage::FileKeyValueStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

impl AppContext {
    /// Open the file-backed store under the configured data directory and
    /// bring up the shared services
    pub async fn initialize(config: StampcamConfig, platform: Platform) -> Result<Self> {
        config.validate()?;
        info!("Opening data directory {}", config.storage.data_dir);

        let store = FileKeyValueStore::open(&config.storage.data_dir)
            .await
            .map_err(|e| {
                error!("Failed to open data directory: {}", e);
                e
            })?;
        let context = Self::with_store(config, Arc::new(store), platform).await;

        if context.config.library.prune_on_startup {
            context.prune_expired_media().await;
        }

        info!("Application services initialized");
        Ok(context)
    }

    /// Apply the auto-delete setting to the library
    pub async fn prune_expired_media(&self) -> PruneReport {
        let days = self.settings.get().auto_delete_days;
        match self.library.prune_expired(days, Utc::now()).await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to prune expired media: {}", e);
                PruneReport::default()
            }
        }
    }
}
