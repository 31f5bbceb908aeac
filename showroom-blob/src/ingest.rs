use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::debug;

use crate::{is_image_mime, normalize_mime, ImageConfig, ImageError, ImageResult, IngestedImage};

/// Where an image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Bytes uploaded by the caller together with their claimed content type
    Upload {
        bytes: Bytes,
        content_type: Option<String>,
    },
    /// A remote http(s) URL to fetch
    Remote { url: String },
}

impl ImageSource {
    pub fn upload<S: Into<String>>(bytes: impl Into<Bytes>, content_type: Option<S>) -> Self {
        Self::Upload {
            bytes: bytes.into(),
            content_type: content_type.map(Into::into),
        }
    }

    pub fn remote<S: Into<String>>(url: S) -> Self {
        Self::Remote { url: url.into() }
    }
}

/// Turns an [`ImageSource`] into validated `(bytes, mime_type)`.
///
/// Never writes anything; the caller hands the result to the write path.
#[derive(Debug, Clone)]
pub struct ImageIngestor {
    client: Client,
    max_image_bytes: u64,
}

impl ImageIngestor {
    pub fn new(config: &ImageConfig) -> ImageResult<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(concat!("showroom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageError::upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ImageConfig) -> Self {
        Self {
            client,
            max_image_bytes: config.max_image_bytes,
        }
    }

    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_bytes
    }

    pub async fn ingest(&self, source: ImageSource) -> ImageResult<IngestedImage> {
        let image = match source {
            ImageSource::Upload {
                bytes,
                content_type,
            } => self.accept_upload(bytes, content_type.as_deref())?,
            ImageSource::Remote { url } => self.fetch_remote(&url).await?,
        };
        self.check_size(image.bytes.len() as u64)?;
        Ok(image)
    }

    fn accept_upload(&self, bytes: Bytes, content_type: Option<&str>) -> ImageResult<IngestedImage> {
        let mime_type = content_type.map(normalize_mime).unwrap_or_default();
        if !is_image_mime(&mime_type) {
            return Err(ImageError::validation(format!(
                "content type '{}' is not an image",
                content_type.unwrap_or("none")
            )));
        }
        if bytes.is_empty() {
            return Err(ImageError::validation("uploaded file is empty"));
        }
        Ok(IngestedImage { bytes, mime_type })
    }

    async fn fetch_remote(&self, raw: &str) -> ImageResult<IngestedImage> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ImageError::validation(format!("invalid image URL '{raw}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ImageError::validation(format!(
                "unsupported URL scheme '{}' (only http and https)",
                url.scheme()
            )));
        }

        debug!(%url, "fetching remote image");
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ImageError::upstream(describe_fetch_error(&url, &e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::upstream(format!("{url} answered {status}")));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(normalize_mime)
            .unwrap_or_default();
        if !is_image_mime(&declared) {
            return Err(ImageError::upstream(format!(
                "{url} is not an image (content type '{declared}')"
            )));
        }

        let declared_len = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(len) = declared_len {
            self.check_size(len)?;
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ImageError::upstream(describe_fetch_error(&url, &e)))?
        {
            body.extend_from_slice(&chunk);
            self.check_size(body.len() as u64)?;
        }

        if body.is_empty() {
            return Err(ImageError::upstream(format!("{url} returned an empty body")));
        }

        Ok(IngestedImage {
            bytes: body.freeze(),
            mime_type: declared,
        })
    }

    fn check_size(&self, size: u64) -> ImageResult<()> {
        if size > self.max_image_bytes {
            return Err(ImageError::PayloadTooLarge {
                size,
                max: self.max_image_bytes,
            });
        }
        Ok(())
    }
}

fn describe_fetch_error(url: &Url, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out fetching {url}")
    } else if err.is_connect() {
        format!("could not connect to {url}")
    } else {
        format!("fetching {url} failed: {err}")
    }
}
