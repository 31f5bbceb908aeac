use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ImageError, ImageResult};

/// Maximum number of image slots per owner.
pub const MAX_SLOTS: u32 = 5;

/// Maximum size of a single stored image (4 MiB).
pub const MAX_IMAGE_BYTES: u64 = 4 * 1024 * 1024;

/// Identifier of the entity (a vehicle) that owns a set of image slots
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKey(pub String);

impl OwnerKey {
    /// Build an owner key, rejecting blank input
    pub fn parse<S: Into<String>>(raw: S) -> ImageResult<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ImageError::validation("owner key must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored image row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub i64);

impl ImageId {
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ImageId {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ImageId)
            .map_err(|_| ImageError::not_found(format!("image {s}")))
    }
}

/// Position of an image within an owner's set; also the upsert key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u32);

impl Slot {
    /// Validate an explicitly requested slot against `0 <= slot < max_slots`
    pub fn checked(value: i64, max_slots: u32) -> ImageResult<Self> {
        if value < 0 || value >= i64::from(max_slots) {
            return Err(ImageError::validation(format!(
                "sortOrder {value} is out of range (must be 0-{})",
                max_slots.saturating_sub(1)
            )));
        }
        Ok(Self(value as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stored image belonging to one owner
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    pub owner: OwnerKey,
    pub slot: Slot,
    pub mime_type: String,
    pub bytes: Bytes,
    pub updated_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One row of the current hero image table
#[derive(Debug, Clone)]
pub struct HeroRecord {
    pub id: i64,
    pub mime_type: String,
    pub bytes: Bytes,
    pub updated_at: DateTime<Utc>,
}

/// Validated image content, ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// Listing entry returned by `GET /images`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSummary {
    pub id: ImageId,
    pub sort_order: Slot,
    pub mime_type: String,
    pub url: String,
}

/// Lower-case a content type and drop its parameters (`image/PNG; q=1` -> `image/png`)
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// True when a (normalized) content type names an image
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/") && mime.len() > "image/".len()
}
