use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use mongodb::{Client, Database};

use crate::config::{Settings, StorageBackend};
use crate::store::{MemoryStore, MongoStore, QrStore};
use crate::utils::short_code::ShortCodeGenerator;

pub async fn get_database(uri: &str, name: &str) -> Result<Database> {
    let client = Client::with_uri_str(uri)
        .await
        .context("Failed to create MongoDB client")?;
    Ok(client.database(name))
}

/// Builds the store selected by `STORAGE_BACKEND`.
pub async fn connect_store(settings: &Settings) -> Result<Arc<dyn QrStore>> {
    let generator = ShortCodeGenerator::new(settings.short_code_max_attempts);
    let store: Arc<dyn QrStore> = match settings.storage {
        StorageBackend::Memory => Arc::new(MemoryStore::new(generator)),
        StorageBackend::MongoDb => {
            let db = get_database(&settings.mongodb_uri, &settings.database_name).await?;
            Arc::new(
                MongoStore::new(db, generator)
                    .await
                    .context("Failed to prepare MongoDB collections")?,
            )
        }
    };
    info!("Using {} storage backend", store.backend_name());
    Ok(store)
}
