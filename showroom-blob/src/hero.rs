use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::delivery::{hero_etag, legacy_hero_etag};
use crate::legacy::{decode_legacy_hero, LEGACY_HERO_KEY};
use crate::{
    Delivery, HeroStore, ImageError, ImageIngestor, ImageResult, ImageSource, ImageUrlStrategy,
    OpenedImage, SettingsStore,
};

/// Settings key recording that the current hero table has been written to
pub const HERO_MIGRATED_KEY: &str = "hero_image.migrated";

/// Which representation a hero read is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeroSource {
    Current,
    Legacy,
}

/// Visibility state of the hero image; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeroState {
    NoImage,
    LegacyOnly,
    Current,
}

/// A hero image ready for delivery
#[derive(Debug, Clone)]
pub struct ResolvedHero {
    pub source: HeroSource,
    pub image: OpenedImage,
}

/// Result of storing a new hero image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroReceipt {
    pub id: i64,
    pub mime_type: String,
    pub size_bytes: u64,
    pub image_url: String,
}

/// Reads and writes the site-wide hero image.
///
/// Reads prefer the current table; the legacy settings value is consulted
/// only while the current table has never been written.
pub struct HeroResolver {
    heroes: Arc<dyn HeroStore>,
    settings: Arc<dyn SettingsStore>,
    urls: Arc<dyn ImageUrlStrategy>,
    ingestor: ImageIngestor,
}

impl HeroResolver {
    pub fn new(
        heroes: Arc<dyn HeroStore>,
        settings: Arc<dyn SettingsStore>,
        urls: Arc<dyn ImageUrlStrategy>,
        ingestor: ImageIngestor,
    ) -> Self {
        Self {
            heroes,
            settings,
            urls,
            ingestor,
        }
    }

    /// Find the hero image; `None` when nothing usable is stored
    pub async fn resolve(&self) -> ImageResult<Option<ResolvedHero>> {
        if let Some(record) = self.heroes.latest_hero().await? {
            let etag = hero_etag(&record);
            return Ok(Some(ResolvedHero {
                source: HeroSource::Current,
                image: OpenedImage {
                    bytes: record.bytes,
                    mime_type: record.mime_type,
                    etag,
                    last_modified: Some(record.updated_at),
                },
            }));
        }

        if self.is_migrated().await? {
            debug!("hero table is empty after migration; legacy value ignored");
            return Ok(None);
        }

        let Some(raw) = self.settings.get_setting(LEGACY_HERO_KEY).await? else {
            return Ok(None);
        };

        match decode_legacy_hero(&raw) {
            Ok(decoded) => {
                let etag = legacy_hero_etag(&decoded.mime_type, &decoded.bytes);
                Ok(Some(ResolvedHero {
                    source: HeroSource::Legacy,
                    image: OpenedImage {
                        bytes: decoded.bytes,
                        mime_type: decoded.mime_type,
                        etag,
                        last_modified: None,
                    },
                }))
            }
            Err(err) => {
                warn!(error = %err, "legacy hero image could not be decoded");
                Ok(None)
            }
        }
    }

    /// Conditional read; a missing or undecodable hero is `NotFound`
    pub async fn open(&self, if_none_match: Option<&str>) -> ImageResult<Delivery> {
        let hero = self
            .resolve()
            .await?
            .ok_or_else(|| ImageError::not_found("hero image"))?;
        Ok(Delivery::resolve(hero.image, if_none_match))
    }

    /// Current visibility state. Once migrated, a vanished current row reads
    /// as `NoImage`, never as `LegacyOnly`.
    pub async fn state(&self) -> ImageResult<HeroState> {
        Ok(match self.resolve().await? {
            Some(hero) if hero.source == HeroSource::Legacy => HeroState::LegacyOnly,
            Some(_) => HeroState::Current,
            None => HeroState::NoImage,
        })
    }

    /// Validate and store a new hero image in the current table.
    ///
    /// The legacy value is never written.
    pub async fn store(&self, source: ImageSource) -> ImageResult<HeroReceipt> {
        let image = self.ingestor.ingest(source).await?;
        let record = self.heroes.put_hero(&image.mime_type, image.bytes).await?;
        self.settings.set_setting(HERO_MIGRATED_KEY, "true").await?;

        info!(hero_id = record.id, mime_type = %record.mime_type, "hero image stored");
        Ok(HeroReceipt {
            id: record.id,
            mime_type: record.mime_type,
            size_bytes: record.bytes.len() as u64,
            image_url: self.urls.hero_url(),
        })
    }

    async fn is_migrated(&self) -> ImageResult<bool> {
        Ok(self
            .settings
            .get_setting(HERO_MIGRATED_KEY)
            .await?
            .is_some_and(|v| v == "true"))
    }
}
