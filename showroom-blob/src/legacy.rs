//! Decoder for the hero image as it used to be stored inside the settings
//! table.
//!
//! Two historical shapes exist:
//! - JSON: `{"mimeType": "image/png", "data": "<base64 or data: URI>"}`
//! - an older ad-hoc text form holding `mimeType: '<value>'` and
//!   `data: '<value>'` fragments somewhere in the string
//!
//! Decoding is attempted strictly (JSON) first and falls back to a permissive
//! text scan. Every failure is a [`ImageError::LegacyDecode`].

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{is_image_mime, normalize_mime, ImageError, ImageResult, IngestedImage};

/// Settings key holding the legacy payload
pub const LEGACY_HERO_KEY: &str = "hero_image";

/// MIME type assumed when none can be recovered
pub const DEFAULT_LEGACY_MIME: &str = "image/png";

const BASE64_MARKER: &str = "base64,";

static MIME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bmimeType\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid mimeType pattern")
});

static DATA_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bdata\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid data pattern")
});

static DATA_URI_MIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*data:([^;,]+)[;,]").expect("valid data URI pattern"));

/// Fields recovered from a legacy value before base64 decoding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyFields {
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
    pub data: String,
}

/// Decode a raw legacy settings value into image bytes
pub fn decode_legacy_hero(raw: &str) -> ImageResult<IngestedImage> {
    let fields = parse_legacy_fields(raw)?;

    let data_uri_mime = DATA_URI_MIME
        .captures(&fields.data)
        .and_then(|c| c.get(1))
        .map(|m| normalize_mime(m.as_str()))
        .filter(|m| is_image_mime(m));

    let mime_type = fields
        .mime_type
        .as_deref()
        .map(normalize_mime)
        .filter(|m| !m.is_empty())
        .or(data_uri_mime)
        .unwrap_or_else(|| DEFAULT_LEGACY_MIME.to_string());

    let bytes = decode_base64(payload_of(&fields.data))?;
    if bytes.is_empty() {
        return Err(ImageError::legacy("payload decodes to zero bytes"));
    }

    Ok(IngestedImage {
        bytes: Bytes::from(bytes),
        mime_type,
    })
}

/// Strict JSON first, then the tolerant text scan
pub fn parse_legacy_fields(raw: &str) -> ImageResult<LegacyFields> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => {
            serde_json::from_value::<LegacyFields>(serde_json::Value::Object(map))
                .map_err(|e| ImageError::legacy(format!("JSON payload has no usable data: {e}")))
        }
        Ok(serde_json::Value::String(inner)) => scan_legacy_text(&inner),
        Ok(_) => Err(ImageError::legacy("JSON payload is not an object")),
        Err(_) => scan_legacy_text(raw),
    }
}

/// Pull the first quoted `mimeType:` and `data:` values out of free text
pub fn scan_legacy_text(raw: &str) -> ImageResult<LegacyFields> {
    let data = first_quoted(&DATA_LABEL, raw)
        .ok_or_else(|| ImageError::legacy("no data field found"))?;
    Ok(LegacyFields {
        mime_type: first_quoted(&MIME_LABEL, raw),
        data,
    })
}

fn first_quoted(pattern: &Regex, raw: &str) -> Option<String> {
    pattern
        .captures(raw)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Everything after the last `base64,` marker, or the whole value
fn payload_of(data: &str) -> &str {
    match data.rfind(BASE64_MARKER) {
        Some(idx) => &data[idx + BASE64_MARKER.len()..],
        None => data,
    }
}

fn decode_base64(payload: &str) -> ImageResult<Vec<u8>> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ImageError::legacy("empty base64 payload"));
    }
    for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(bytes) = engine.decode(&cleaned) {
            return Ok(bytes);
        }
    }
    Err(ImageError::legacy("payload is not valid base64"))
}
