//! Turning a [`Delivery`] into an HTTP response.

use axum::{
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, LAST_MODIFIED},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use showroom_blob::{Delivery, CACHE_CONTROL as CACHE_DIRECTIVE};

/// RFC 7231 IMF-fixdate
fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn delivery_response(delivery: Delivery) -> Response {
    match delivery {
        Delivery::NotModified { etag } => (
            StatusCode::NOT_MODIFIED,
            [(ETAG, etag), (CACHE_CONTROL, CACHE_DIRECTIVE.to_string())],
        )
            .into_response(),
        Delivery::Content(image) => {
            let mut response = (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, image.mime_type),
                    (ETAG, image.etag),
                    (CACHE_CONTROL, CACHE_DIRECTIVE.to_string()),
                ],
                image.bytes,
            )
                .into_response();
            if let Some(modified) = image.last_modified {
                if let Ok(value) = HeaderValue::from_str(&http_date(modified)) {
                    response.headers_mut().insert(LAST_MODIFIED, value);
                }
            }
            response
        }
    }
}
