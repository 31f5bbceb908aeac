//! Streaming `multipart/form-data` parsing for image uploads.
//!
//! Parts named in [`MultipartConfig::file_fields`] are collected as files;
//! everything else is read as a text field. Size limits are enforced while
//! the body streams in, so an oversized upload is cut off early.

use std::collections::{HashMap, HashSet};

use axum::body::Body;
use bytes::Bytes;
use multer::{Constraints, Multipart, SizeLimit};
use showroom_blob::{ImageConfig, ImageSource};
use showroom_core::errors::ShowroomError;
use tracing::debug;

/// Slack for part headers and text fields on top of the file payloads
const OVERHEAD_BYTES: u64 = 64 * 1024;

/// Configuration for multipart parsing
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum size of one file part in bytes
    pub max_file_size: u64,
    /// Maximum size of the whole request body in bytes
    pub max_total_size: u64,
    /// Field names carrying files
    pub file_fields: HashSet<String>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self::for_images(&ImageConfig::default())
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits derived from the image limits: one slot-full of images plus overhead.
    ///
    /// The per-file cap sits one byte above the image limit so the exact
    /// boundary is decided by the ingestor.
    pub fn for_images(config: &ImageConfig) -> Self {
        let per_file = config.max_image_bytes.saturating_add(1);
        Self {
            max_file_size: per_file,
            max_total_size: per_file
                .saturating_mul(u64::from(config.max_slots.max(1)))
                .saturating_add(OVERHEAD_BYTES),
            file_fields: HashSet::from(["file".to_string()]),
        }
    }

    /// Set maximum file size in bytes
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set maximum total request size in bytes
    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = size;
        self
    }

    /// Add field name to treat as file
    pub fn file_field(mut self, field_name: &str) -> Self {
        self.file_fields.insert(field_name.to_string());
        self
    }
}

/// One uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn into_source(self) -> ImageSource {
        ImageSource::Upload {
            bytes: self.bytes,
            content_type: self.content_type,
        }
    }
}

/// A parsed form: files in submission order plus text fields
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

fn map_multer_error(err: multer::Error) -> ShowroomError {
    match err {
        multer::Error::FieldSizeExceeded { limit, field_name } => {
            ShowroomError::payload_too_large(format!(
                "Field '{}' is too large (limit {limit} bytes)",
                field_name.as_deref().unwrap_or("unknown")
            ))
        }
        multer::Error::StreamSizeExceeded { limit } => ShowroomError::payload_too_large(format!(
            "Request body exceeds the maximum size of {limit} bytes"
        )),
        other => ShowroomError::bad_request(format!("Failed to parse multipart data: {other}")),
    }
}

/// Parse a multipart body whose `Content-Type` header is `content_type`
pub async fn parse_multipart(
    content_type: &str,
    body: Body,
    config: &MultipartConfig,
) -> Result<MultipartForm, ShowroomError> {
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| ShowroomError::bad_request("Missing boundary in multipart content-type"))?;

    let constraints = Constraints::new().size_limit(
        SizeLimit::new()
            .whole_stream(config.max_total_size)
            .per_field(config.max_file_size),
    );
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(map_multer_error)? {
        let name = field.name().unwrap_or("unknown").to_string();

        if config.file_fields.contains(&name) {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(|ct| ct.to_string());
            let bytes = field.bytes().await.map_err(map_multer_error)?;
            debug!(field = %name, size = bytes.len(), content_type = ?content_type, "file part received");
            form.files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                bytes,
            });
        } else {
            let value = field.text().await.map_err(map_multer_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
