use thiserror::Error;

/// Result type for image operations
pub type ImageResult<T> = Result<T, ImageError>;

/// Errors that can occur during image operations
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid request: {message}")]
    Validation { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Image limit reached: at most {max_slots} images per vehicle")]
    CapacityExceeded { max_slots: u32 },

    #[error("Remote image fetch failed: {reason}")]
    UpstreamFetch { reason: String },

    #[error("Image is {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("Legacy hero image payload could not be decoded: {reason}")]
    LegacyDecode { reason: String },

    #[error("Storage backend error: {source}")]
    Storage {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Images changed but the image_url projection for {owner} was not written: {source}")]
    ProjectionSync {
        owner: String,
        #[source]
        source: Box<ImageError>,
    },
}

impl ImageError {
    /// Create a storage error from any error type
    pub fn storage<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(error),
        }
    }

    /// Create a storage error from a message
    pub fn storage_msg<S: Into<String>>(message: S) -> Self {
        let message: String = message.into();
        Self::Storage {
            source: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create an upstream fetch error
    pub fn upstream<S: Into<String>>(reason: S) -> Self {
        Self::UpstreamFetch {
            reason: reason.into(),
        }
    }

    /// Create a legacy decode error
    pub fn legacy<S: Into<String>>(reason: S) -> Self {
        Self::LegacyDecode {
            reason: reason.into(),
        }
    }

    /// Wrap a projection write failure for `owner`
    pub fn projection_sync<S: Into<String>>(owner: S, source: ImageError) -> Self {
        Self::ProjectionSync {
            owner: owner.into(),
            source: Box::new(source),
        }
    }

    /// Short machine-readable label, used in batch results and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::CapacityExceeded { .. } => "capacity_exceeded",
            Self::UpstreamFetch { .. } => "upstream_fetch",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::LegacyDecode { .. } => "legacy_decode",
            Self::Storage { .. } => "storage",
            Self::ProjectionSync { .. } => "projection_sync",
        }
    }
}
