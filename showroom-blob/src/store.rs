use async_trait::async_trait;
use bytes::Bytes;

use crate::{HeroRecord, ImageId, ImageRecord, ImageResult, OwnerKey, Slot};

/// Per-owner image rows, unique on `(owner, slot)`
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Insert or overwrite the image in `slot`; an overwrite keeps the row id
    /// and refreshes `updated_at`
    async fn put(
        &self,
        owner: &OwnerKey,
        slot: Slot,
        mime_type: &str,
        bytes: Bytes,
    ) -> ImageResult<ImageRecord>;

    /// Get an image, scoped to its owner
    async fn get(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<Option<ImageRecord>>;

    /// Get an image by id alone
    async fn get_by_id(&self, id: ImageId) -> ImageResult<Option<ImageRecord>>;

    /// All images for an owner, slot ascending
    async fn list_by_owner(&self, owner: &OwnerKey) -> ImageResult<Vec<ImageRecord>>;

    /// Occupied slot numbers for an owner
    async fn occupied_slots(&self, owner: &OwnerKey) -> ImageResult<Vec<Slot>> {
        Ok(self
            .list_by_owner(owner)
            .await?
            .into_iter()
            .map(|r| r.slot)
            .collect())
    }

    /// Delete one image; returns whether a row was removed
    async fn delete_one(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<bool>;

    /// Delete every image of an owner; returns the number of rows removed
    async fn delete_all_for_owner(&self, owner: &OwnerKey) -> ImageResult<u64>;
}

/// The owning record and its denormalized `image_url` column
#[async_trait]
pub trait OwnerStore: Send + Sync {
    async fn owner_exists(&self, owner: &OwnerKey) -> ImageResult<bool>;

    /// Overwrite the owner's projection (`None` clears it)
    async fn write_projection(&self, owner: &OwnerKey, projection: Option<&str>)
        -> ImageResult<()>;

    async fn read_projection(&self, owner: &OwnerKey) -> ImageResult<Option<String>>;
}

/// Current-format hero image rows
#[async_trait]
pub trait HeroStore: Send + Sync {
    async fn put_hero(&self, mime_type: &str, bytes: Bytes) -> ImageResult<HeroRecord>;

    /// The most recently updated row, if any
    async fn latest_hero(&self) -> ImageResult<Option<HeroRecord>>;
}

/// Generic key/value settings table
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_setting(&self, key: &str) -> ImageResult<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> ImageResult<()>;
}

/// Strategy for generating externally addressable image URLs
pub trait ImageUrlStrategy: Send + Sync {
    /// URL of one owner image
    fn image_url(&self, owner: &OwnerKey, id: ImageId) -> String;

    /// URL of the hero image
    fn hero_url(&self) -> String;
}

/// Default strategy: `{base}/images/{id}?owner={owner}` and `{base}/hero-image`
#[derive(Debug, Clone, Default)]
pub struct DefaultUrlStrategy {
    base: String,
}

impl DefaultUrlStrategy {
    pub fn new<S: Into<String>>(base: S) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ImageUrlStrategy for DefaultUrlStrategy {
    fn image_url(&self, owner: &OwnerKey, id: ImageId) -> String {
        format!(
            "{}/images/{}?owner={}",
            self.base,
            id,
            urlencoding::encode(owner.as_str())
        )
    }

    fn hero_url(&self) -> String {
        format!("{}/hero-image", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_urls_escape_owner_keys() {
        let urls = DefaultUrlStrategy::new("https://cars.example/");
        let owner = OwnerKey("vw golf/7".to_string());
        assert_eq!(
            urls.image_url(&owner, ImageId(12)),
            "https://cars.example/images/12?owner=vw%20golf%2F7"
        );
        assert_eq!(urls.hero_url(), "https://cars.example/hero-image");
    }

    #[test]
    fn empty_base_gives_root_relative_urls() {
        let urls = DefaultUrlStrategy::default();
        assert_eq!(
            urls.image_url(&OwnerKey("a".into()), ImageId(1)),
            "/images/1?owner=a"
        );
    }
}
