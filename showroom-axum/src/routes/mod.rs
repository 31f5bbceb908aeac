//! Route handlers and the request-body handling they share.

pub mod hero;
pub mod images;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap},
};
use http_body_util::LengthLimitError;
use serde::Deserialize;
use serde_json::json;
use showroom_blob::ImageSource;
use showroom_core::errors::ShowroomError;

use crate::multipart::{parse_multipart, MultipartConfig, UploadedFile};

/// Upper bound for JSON request bodies; they only carry URLs
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// Images submitted in one request, in submission order
#[derive(Debug, Default)]
pub struct Submission {
    pub sources: Vec<ImageSource>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonSubmission {
    source_url: Option<String>,
    #[serde(default)]
    source_urls: Vec<String>,
    sort_order: Option<i64>,
}

fn parse_sort_order(raw: &str) -> Result<Option<i64>, ShowroomError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| {
        ShowroomError::bad_request("Invalid sortOrder")
            .with_errors(json!({ "sortOrder": ["must be an integer"] }))
    })
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

fn is_json(mime: &str) -> bool {
    mime == "application/json" || mime.ends_with("+json")
}

/// Read a `multipart/form-data` (`file` parts, optional `sortOrder`) or JSON
/// (`sourceUrl`, `sourceUrls`, optional `sortOrder`) image submission
pub async fn read_submission(
    headers: &HeaderMap,
    body: Body,
    multipart: &MultipartConfig,
) -> Result<Submission, ShowroomError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "multipart/form-data" {
        let form = parse_multipart(content_type, body, multipart).await?;
        let sort_order = match form.field("sortOrder") {
            Some(raw) => parse_sort_order(raw)?,
            None => None,
        };
        return Ok(Submission {
            sources: form.files.into_iter().map(UploadedFile::into_source).collect(),
            sort_order,
        });
    }

    if is_json(&mime) {
        let bytes = axum::body::to_bytes(body, JSON_BODY_LIMIT)
            .await
            .map_err(|e| {
                if exceeds_limit(&e) {
                    ShowroomError::payload_too_large(format!(
                        "JSON body exceeds the maximum size of {JSON_BODY_LIMIT} bytes"
                    ))
                } else {
                    ShowroomError::bad_request(format!("Failed to read the request body: {e}"))
                }
            })?;
        let parsed: JsonSubmission = serde_json::from_slice(&bytes).map_err(|e| {
            ShowroomError::bad_request("Failed to parse the request body as JSON")
                .with_errors(json!({ "_schema": [e.to_string()] }))
        })?;

        let sources = parsed
            .source_url
            .into_iter()
            .chain(parsed.source_urls)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .map(ImageSource::remote)
            .collect();
        return Ok(Submission {
            sources,
            sort_order: parsed.sort_order,
        });
    }

    Err(ShowroomError::bad_request(
        "Expected a multipart/form-data or application/json body",
    ))
}
