//! Conditional delivery: weak validators and `If-None-Match` handling.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::{HeroRecord, ImageRecord};

/// Caching directive for stored images. They are per-entity and can be
/// overwritten in place, so clients must revalidate every time.
pub const CACHE_CONTROL: &str = "private, no-cache, must-revalidate";

/// Image content ready to be sent
#[derive(Debug, Clone)]
pub struct OpenedImage {
    pub bytes: Bytes,
    pub mime_type: String,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl OpenedImage {
    pub fn content_length(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Outcome of a conditional read
#[derive(Debug, Clone)]
pub enum Delivery {
    /// The client's validator still matches; send 304 with no body
    NotModified { etag: String },
    /// Send the content
    Content(OpenedImage),
}

impl Delivery {
    /// Compare `if_none_match` against the image's validator
    pub fn resolve(image: OpenedImage, if_none_match: Option<&str>) -> Self {
        match if_none_match {
            Some(header) if etag_matches(header, &image.etag) => {
                Delivery::NotModified { etag: image.etag }
            }
            _ => Delivery::Content(image),
        }
    }

    pub fn etag(&self) -> &str {
        match self {
            Delivery::NotModified { etag } => etag,
            Delivery::Content(image) => &image.etag,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, Delivery::NotModified { .. })
    }
}

/// Validator of an owner image, from `(id, updated_at, byte length)`
pub fn image_etag(record: &ImageRecord) -> String {
    format!(
        "W/\"{}-{:x}-{}\"",
        record.id,
        record.updated_at.timestamp_micros(),
        record.size_bytes()
    )
}

/// Validator of a current hero row, from `(mime type, byte length, row id)`
pub fn hero_etag(record: &HeroRecord) -> String {
    format!(
        "W/\"hero-{}-{}-{}\"",
        etag_safe(&record.mime_type),
        record.bytes.len(),
        record.id
    )
}

/// Validator of a decoded legacy hero payload; the legacy value can be
/// rewritten in place, so the tag carries a digest of the bytes
pub fn legacy_hero_etag(mime_type: &str, bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let short: String = digest[..8].iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "W/\"hero-legacy-{}-{}-{short}\"",
        etag_safe(mime_type),
        bytes.len()
    )
}

/// Keep only characters allowed inside an entity tag
fn etag_safe(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '+' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// `If-None-Match` semantics: `*`, comma-separated lists, weak comparison
pub fn etag_matches(header: &str, etag: &str) -> bool {
    let ours = opaque_tag(etag);
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && opaque_tag(candidate) == ours)
    })
}

fn opaque_tag(tag: &str) -> &str {
    tag.trim().strip_prefix("W/").unwrap_or(tag.trim())
}
