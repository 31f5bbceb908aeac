pub mod config;

use std::sync::Arc;

use anyhow::Result;
use showroom_axum::{ShowroomApp, ShowroomState, TokenGate};
use showroom_blob::{
    DefaultUrlStrategy, HeroResolver, HeroStore, ImageAdapter, ImageConfig, ImageIngestor,
    ImageStore, MemoryStore, OwnerKey, OwnerStore, SettingsStore,
};
use showroom_core::{ShowroomConfig, ShowroomConfigSnapshot};
use tracing::{info, warn};

/// Build the HTTP app from configuration.
///
/// Storage is SQLite when the `sqlite` feature is enabled and `database.url`
/// is set, in-memory otherwise.
pub async fn build(config: &ShowroomConfig) -> Result<ShowroomApp> {
    let snapshot = config.snapshot();
    let owners = catalog_owners(&snapshot)?;

    #[cfg(feature = "sqlite")]
    if let Some(url) = snapshot.get_string("database.url") {
        let store = Arc::new(showroom_blob::SqliteStore::connect(&url).await?);
        for owner in &owners {
            store.add_owner(owner).await?;
        }
        info!(%url, owners = owners.len(), "using sqlite storage");
        return assemble(store, &snapshot);
    }

    let store = Arc::new(MemoryStore::new());
    for owner in &owners {
        store.add_owner(owner);
    }
    info!(owners = owners.len(), "using in-memory storage");
    assemble(store, &snapshot)
}

fn catalog_owners(snapshot: &ShowroomConfigSnapshot) -> Result<Vec<OwnerKey>> {
    let raw = snapshot.get("catalog.owners").unwrap_or_default();
    let owners = raw
        .split(',')
        .filter(|key| !key.trim().is_empty())
        .map(OwnerKey::parse)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(owners)
}

fn assemble<S>(store: Arc<S>, snapshot: &ShowroomConfigSnapshot) -> Result<ShowroomApp>
where
    S: ImageStore + OwnerStore + HeroStore + SettingsStore + 'static,
{
    let image_config = ImageConfig::from_snapshot(snapshot);
    let urls = Arc::new(DefaultUrlStrategy::new(image_config.public_base.clone()));
    let hero = HeroResolver::new(
        store.clone(),
        store.clone(),
        urls,
        ImageIngestor::new(&image_config)?,
    );
    let images = ImageAdapter::new(store, image_config)?;

    let gate = TokenGate::parse(snapshot.get("auth.tokens").unwrap_or_default());
    if gate.is_empty() {
        warn!("auth.tokens is empty; every write request will be rejected");
    }

    Ok(ShowroomApp::new(
        ShowroomState::new(images, hero),
        Arc::new(gate),
    ))
}
