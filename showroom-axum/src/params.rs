use axum::http::{header::IF_NONE_MATCH, HeaderMap};
use serde::Deserialize;
use showroom_blob::{ImageId, OwnerKey};
use showroom_core::errors::ShowroomError;

/// `?owner=` query parameter of the image routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerQuery {
    pub owner: Option<String>,
}

impl OwnerQuery {
    pub fn owner_key(&self) -> Result<OwnerKey, ShowroomError> {
        let raw = self
            .owner
            .as_deref()
            .ok_or_else(|| ShowroomError::bad_request("Missing 'owner' query parameter"))?;
        OwnerKey::parse(raw).map_err(|_| ShowroomError::bad_request("Empty 'owner' query parameter"))
    }
}

/// Path ids that do not parse can never name a stored image
pub fn parse_image_id(raw: &str) -> Result<ImageId, ShowroomError> {
    raw.parse::<ImageId>()
        .map_err(|_| ShowroomError::not_found(format!("No image with id '{raw}'")))
}

pub fn if_none_match(headers: &HeaderMap) -> Option<&str> {
    headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok())
}
