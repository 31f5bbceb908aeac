//! The `image_url` projection: a `|`-joined, slot-ascending list of image
//! URLs written onto the owner's own record after every slot mutation.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    ImageError, ImageRecord, ImageResult, ImageStore, ImageUrlStrategy, OwnerKey, OwnerStore,
};

/// Delimiter between URLs in the projection
pub const PROJECTION_DELIMITER: &str = "|";

/// Ordered image URLs of one owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageUrlList(pub Vec<String>);

impl ImageUrlList {
    /// URLs for `records`, which must already be slot ascending
    pub fn from_records(
        owner: &OwnerKey,
        records: &[ImageRecord],
        urls: &dyn ImageUrlStrategy,
    ) -> Self {
        Self(records.iter().map(|r| urls.image_url(owner, r.id)).collect())
    }

    /// Stored form: joined string, or `None` when there are no images
    pub fn to_projection(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.join(PROJECTION_DELIMITER))
        }
    }

    /// Split a stored projection back into URLs
    pub fn parse(projection: Option<&str>) -> Self {
        Self(
            projection
                .unwrap_or_default()
                .split(PROJECTION_DELIMITER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Recompute the owner's projection from the stored rows and write it back.
///
/// This runs after the slot mutation, not in the same transaction, on every
/// backend. A failure here is reported as `ProjectionSync`: the slot mutation
/// that preceded it has already happened and the caller must not report
/// success.
pub async fn sync_projection(
    images: &dyn ImageStore,
    owners: &dyn OwnerStore,
    urls: &dyn ImageUrlStrategy,
    owner: &OwnerKey,
) -> ImageResult<Option<String>> {
    let result = async {
        let records = images.list_by_owner(owner).await?;
        let projection = ImageUrlList::from_records(owner, &records, urls).to_projection();
        owners.write_projection(owner, projection.as_deref()).await?;
        Ok::<_, ImageError>(projection)
    }
    .await;

    result.map_err(|e| {
        error!(owner = %owner, error = %e, "image_url projection sync failed");
        ImageError::projection_sync(owner.as_str(), e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultUrlStrategy, ImageId};

    #[test]
    fn empty_list_projects_to_none() {
        assert_eq!(ImageUrlList::default().to_projection(), None);
        assert!(ImageUrlList::parse(None).is_empty());
        assert!(ImageUrlList::parse(Some("")).is_empty());
    }

    #[test]
    fn join_and_split_agree() {
        let urls = DefaultUrlStrategy::default();
        let owner = OwnerKey("car|1".to_string());
        let list = ImageUrlList(vec![
            urls.image_url(&owner, ImageId(3)),
            urls.image_url(&owner, ImageId(1)),
        ]);
        let stored = list.to_projection().unwrap();
        assert_eq!(stored, "/images/3?owner=car%7C1|/images/1?owner=car%7C1");
        assert_eq!(ImageUrlList::parse(Some(stored.as_str())), list);
        assert_eq!(list.len(), 2);
    }
}
