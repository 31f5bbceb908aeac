//! # showroom-blob: per-vehicle image storage
//!
//! `showroom-blob` stores up to [`MAX_SLOTS`] ordered images per vehicle and
//! one site-wide hero image, and keeps the vehicle's denormalized
//! `image_url` column in step with its images.
//!
//! ## Write path
//!
//! ```text
//! ImageSource ──► ImageIngestor ──► slot allocation ──► ImageStore::put ──► projection sync
//!  (upload | URL)   (type, size)      (lowest free)       (upsert)           (owner.image_url)
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use showroom_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> ImageResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let owner = OwnerKey::parse("golf-7")?;
//! store.add_owner(&owner);
//!
//! let images = ImageAdapter::new(store, ImageConfig::default())?;
//! let receipt = images
//!     .ingest(&owner, ImageSource::upload(vec![1u8, 2, 3], Some("image/png")), None)
//!     .await?;
//!
//! assert_eq!(receipt.image_url_list.as_deref(), Some(receipt.url.as_str()));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod config;
pub mod delivery;
mod error;
pub mod hero;
mod ingest;
pub mod legacy;
mod memory;
pub mod projection;
mod receipt;
pub mod slots;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod store;
mod types;

pub use adapter::ImageAdapter;
pub use config::ImageConfig;
pub use delivery::{Delivery, OpenedImage, CACHE_CONTROL};
pub use error::{ImageError, ImageResult};
pub use hero::{HeroReceipt, HeroResolver, HeroSource, HeroState, ResolvedHero};
pub use ingest::{ImageIngestor, ImageSource};
pub use memory::MemoryStore;
pub use projection::ImageUrlList;
pub use receipt::{BatchItem, BatchReceipt, ImageReceipt};
pub use slots::SlotAllocation;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
pub use store::{
    DefaultUrlStrategy, HeroStore, ImageStore, ImageUrlStrategy, OwnerStore, SettingsStore,
};
pub use types::{
    is_image_mime, normalize_mime, HeroRecord, ImageId, ImageRecord, ImageSummary, IngestedImage,
    OwnerKey, Slot, MAX_IMAGE_BYTES, MAX_SLOTS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Delivery, HeroResolver, ImageAdapter, ImageConfig, ImageError, ImageId, ImageResult,
        ImageSource, MemoryStore, OwnerKey,
    };
}
