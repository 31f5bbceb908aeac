use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::projection::sync_projection;
use crate::slots::{next_free_slot, resolve_slot, SlotAllocation};
use crate::{
    delivery::image_etag, BatchItem, BatchReceipt, DefaultUrlStrategy, Delivery, ImageConfig,
    ImageError, ImageId, ImageIngestor, ImageReceipt, ImageResult, ImageSource, ImageStore,
    ImageSummary, ImageUrlStrategy, OpenedImage, OwnerKey, OwnerStore, Slot,
};

/// The main image adapter: everything the HTTP layer needs for owner images.
///
/// Every mutating call finishes by rewriting the owner's `image_url`
/// projection and only reports success once that write went through.
pub struct ImageAdapter {
    images: Arc<dyn ImageStore>,
    owners: Arc<dyn OwnerStore>,
    urls: Arc<dyn ImageUrlStrategy>,
    ingestor: ImageIngestor,
    config: ImageConfig,
}

impl ImageAdapter {
    /// Create an adapter over one store that holds both images and owners
    pub fn new<S>(store: Arc<S>, config: ImageConfig) -> ImageResult<Self>
    where
        S: ImageStore + OwnerStore + 'static,
    {
        let urls = Arc::new(DefaultUrlStrategy::new(config.public_base.clone()));
        let ingestor = ImageIngestor::new(&config)?;
        Ok(Self::with_parts(store.clone(), store, urls, ingestor, config))
    }

    /// Create with explicit collaborators
    pub fn with_parts(
        images: Arc<dyn ImageStore>,
        owners: Arc<dyn OwnerStore>,
        urls: Arc<dyn ImageUrlStrategy>,
        ingestor: ImageIngestor,
        config: ImageConfig,
    ) -> Self {
        Self {
            images,
            owners,
            urls,
            ingestor,
            config,
        }
    }

    /// All images of an owner, slot ascending
    pub async fn list(&self, owner: &OwnerKey) -> ImageResult<Vec<ImageSummary>> {
        self.require_owner(owner).await?;
        let records = self.images.list_by_owner(owner).await?;
        Ok(records
            .into_iter()
            .map(|r| ImageSummary {
                url: self.urls.image_url(owner, r.id),
                id: r.id,
                sort_order: r.slot,
                mime_type: r.mime_type,
            })
            .collect())
    }

    /// Validate one image and store it in `sort_order` (or the next free slot)
    pub async fn ingest(
        &self,
        owner: &OwnerKey,
        source: ImageSource,
        sort_order: Option<i64>,
    ) -> ImageResult<ImageReceipt> {
        self.require_owner(owner).await?;
        self.ingest_unchecked(owner, source, sort_order).await
    }

    /// Ingest several images independently; a failed item does not stop the rest
    pub async fn ingest_batch(
        &self,
        owner: &OwnerKey,
        sources: Vec<ImageSource>,
    ) -> ImageResult<BatchReceipt> {
        self.require_owner(owner).await?;

        let mut results = Vec::with_capacity(sources.len());
        let mut projection_stale = false;
        for (index, source) in sources.into_iter().enumerate() {
            match self.ingest_unchecked(owner, source, None).await {
                Ok(receipt) => results.push(BatchItem::succeeded(index, &receipt)),
                Err(err) => {
                    projection_stale |= matches!(err, ImageError::ProjectionSync { .. });
                    warn!(owner = %owner, index, error = %err, "batch image rejected");
                    results.push(BatchItem::failed(index, &err));
                }
            }
        }

        // a row may have been written without its projection; the batch only
        // succeeds once the projection matches the stored rows again
        let image_url_list = if projection_stale {
            self.sync(owner).await?
        } else {
            self.owners.read_projection(owner).await?
        };
        Ok(BatchReceipt {
            results,
            image_url_list,
        })
    }

    /// Remove one image; unknown ids are a no-op
    pub async fn delete_one(&self, owner: &OwnerKey, id: ImageId) -> ImageResult<Option<String>> {
        self.require_owner(owner).await?;
        let removed = self.images.delete_one(owner, id).await?;
        debug!(owner = %owner, image_id = %id, removed, "image delete");
        self.sync(owner).await
    }

    /// Remove every image of an owner
    pub async fn delete_all(&self, owner: &OwnerKey) -> ImageResult<Option<String>> {
        self.require_owner(owner).await?;
        let removed = self.images.delete_all_for_owner(owner).await?;
        info!(owner = %owner, removed, "all images deleted");
        self.sync(owner).await
    }

    /// Drop all images of an owner that is being deleted.
    ///
    /// The owner record may already be gone, so the projection is only
    /// cleared when it still exists.
    pub async fn purge_owner(&self, owner: &OwnerKey) -> ImageResult<u64> {
        let removed = self.images.delete_all_for_owner(owner).await?;
        if self.owners.owner_exists(owner).await? {
            self.sync(owner).await?;
        }
        info!(owner = %owner, removed, "owner images purged");
        Ok(removed)
    }

    /// Recompute and store the owner's projection
    pub async fn sync(&self, owner: &OwnerKey) -> ImageResult<Option<String>> {
        sync_projection(
            self.images.as_ref(),
            self.owners.as_ref(),
            self.urls.as_ref(),
            owner,
        )
        .await
    }

    /// The owner's stored projection
    pub async fn projection(&self, owner: &OwnerKey) -> ImageResult<Option<String>> {
        self.owners.read_projection(owner).await
    }

    /// Conditional read of one image
    pub async fn open(
        &self,
        owner: &OwnerKey,
        id: ImageId,
        if_none_match: Option<&str>,
    ) -> ImageResult<Delivery> {
        let record = self
            .images
            .get(owner, id)
            .await?
            .ok_or_else(|| ImageError::not_found(format!("image {id} of vehicle {owner}")))?;

        let image = OpenedImage {
            etag: image_etag(&record),
            last_modified: Some(record.updated_at),
            mime_type: record.mime_type,
            bytes: record.bytes,
        };
        Ok(Delivery::resolve(image, if_none_match))
    }

    /// URL of one image
    pub fn image_url(&self, owner: &OwnerKey, id: ImageId) -> String {
        self.urls.image_url(owner, id)
    }

    /// Get configuration
    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    async fn ingest_unchecked(
        &self,
        owner: &OwnerKey,
        source: ImageSource,
        sort_order: Option<i64>,
    ) -> ImageResult<ImageReceipt> {
        let max_slots = self.config.max_slots;

        // Reject what can be rejected before touching the network
        match sort_order {
            Some(value) => {
                Slot::checked(value, max_slots)?;
            }
            None => {
                let occupied = self.images.occupied_slots(owner).await?;
                if next_free_slot(&occupied, max_slots) == SlotAllocation::Exhausted {
                    return Err(ImageError::CapacityExceeded { max_slots });
                }
            }
        }

        let image = self.ingestor.ingest(source).await?;

        let occupied = self.images.occupied_slots(owner).await?;
        let slot = resolve_slot(sort_order, &occupied, max_slots)?;
        let replaced = occupied.contains(&slot);

        let size_bytes = image.bytes.len() as u64;
        let record = self
            .images
            .put(owner, slot, &image.mime_type, image.bytes)
            .await?;
        info!(
            owner = %owner,
            image_id = %record.id,
            slot = %slot,
            size_bytes,
            replaced,
            "image stored"
        );

        let image_url_list = self.sync(owner).await?;
        Ok(ImageReceipt {
            image_id: record.id,
            sort_order: record.slot,
            url: self.urls.image_url(owner, record.id),
            mime_type: record.mime_type,
            size_bytes,
            replaced,
            image_url_list,
        })
    }

    async fn require_owner(&self, owner: &OwnerKey) -> ImageResult<()> {
        if self.owners.owner_exists(owner).await? {
            Ok(())
        } else {
            Err(ImageError::not_found(format!("vehicle {owner}")))
        }
    }
}
