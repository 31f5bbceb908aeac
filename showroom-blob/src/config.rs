use std::time::Duration;

use showroom_core::ShowroomConfigSnapshot;

use crate::{MAX_IMAGE_BYTES, MAX_SLOTS};

/// Configuration for image operations
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Number of image slots per owner
    pub max_slots: u32,

    /// Absolute max size allowed for a single image
    pub max_image_bytes: u64,

    /// Upper bound for a remote image fetch, connect through last byte
    pub fetch_timeout: Duration,

    /// Prefix put in front of every generated image URL ("" = root-relative)
    pub public_base: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_slots: MAX_SLOTS,
            max_image_bytes: MAX_IMAGE_BYTES,
            fetch_timeout: Duration::from_secs(10),
            public_base: String::new(),
        }
    }
}

impl ImageConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `images.*` keys, falling back to the defaults for anything unset or unparsable
    pub fn from_snapshot(snapshot: &ShowroomConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            max_slots: snapshot
                .get_usize("images.max_slots")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .map(|v| v.min(MAX_SLOTS))
                .unwrap_or(defaults.max_slots),
            max_image_bytes: snapshot
                .get_u64("images.max_bytes")
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_image_bytes),
            fetch_timeout: snapshot
                .get_u64("images.fetch_timeout_secs")
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            public_base: snapshot
                .get_string("images.public_base")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base),
        }
    }

    /// Set the number of slots per owner; never above [`MAX_SLOTS`]
    pub fn with_max_slots(mut self, slots: u32) -> Self {
        self.max_slots = slots.min(MAX_SLOTS);
        self
    }

    /// Set max image size
    pub fn with_max_image_bytes(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    /// Set the remote fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the public URL prefix
    pub fn with_public_base<S: Into<String>>(mut self, base: S) -> Self {
        self.public_base = base.into().trim_end_matches('/').to_string();
        self
    }
}
