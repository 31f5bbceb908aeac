use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use showroom_blob::ImageError;
use showroom_core::errors::ShowroomError;
use tracing::error;

#[derive(Debug)]
pub struct ShowroomAxumError(pub anyhow::Error);

impl From<anyhow::Error> for ShowroomAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ShowroomError> for ShowroomAxumError {
    fn from(e: ShowroomError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<ImageError> for ShowroomAxumError {
    fn from(e: ImageError) -> Self {
        Self(image_error_to_showroom(e).into_anyhow())
    }
}

/// Map a component error onto the HTTP error taxonomy
pub fn image_error_to_showroom(err: ImageError) -> ShowroomError {
    let message = err.to_string();
    match err {
        ImageError::Validation { .. } => ShowroomError::bad_request(message),
        // legacy decode failures normally never leave the resolver
        ImageError::NotFound { .. } | ImageError::LegacyDecode { .. } => {
            ShowroomError::not_found(message)
        }
        ImageError::CapacityExceeded { max_slots } => {
            ShowroomError::conflict(message).with_data(json!({ "maxSlots": max_slots }))
        }
        ImageError::PayloadTooLarge { size, max } => ShowroomError::payload_too_large(message)
            .with_data(json!({ "size": size, "maxBytes": max })),
        ImageError::UpstreamFetch { .. } => ShowroomError::unprocessable(message),
        other @ (ImageError::Storage { .. } | ImageError::ProjectionSync { .. }) => {
            ShowroomError::general_error(message).with_source(anyhow::Error::new(other))
        }
    }
}

fn render(err: &ShowroomError) -> Response {
    if !err.kind.is_client_error() {
        error!(error = %err, source = ?err.source, "request failed");
    }
    let safe = err.sanitize_for_client();
    let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(safe.to_json())).into_response()
}

impl IntoResponse for ShowroomAxumError {
    fn into_response(self) -> Response {
        // Preserve the structured fields even when wrapped by anyhow contexts
        if let Some(err) = self
            .0
            .chain()
            .find_map(|e| e.downcast_ref::<ShowroomError>())
        {
            return render(err);
        }

        let err = match self.0.downcast::<ImageError>() {
            Ok(image) => image_error_to_showroom(image),
            Err(other) => ShowroomError::normalize(other),
        };
        render(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showroom_core::ErrorKind;

    #[test]
    fn component_errors_map_to_statuses() {
        let cases = [
            (ImageError::validation("bad"), ErrorKind::BadRequest),
            (ImageError::not_found("image 1"), ErrorKind::NotFound),
            (ImageError::CapacityExceeded { max_slots: 5 }, ErrorKind::Conflict),
            (
                ImageError::PayloadTooLarge { size: 11, max: 10 },
                ErrorKind::PayloadTooLarge,
            ),
            (ImageError::upstream("timed out"), ErrorKind::Unprocessable),
            (ImageError::storage_msg("disk"), ErrorKind::GeneralError),
            (
                ImageError::projection_sync("car", ImageError::storage_msg("disk")),
                ErrorKind::GeneralError,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(image_error_to_showroom(err).kind, kind);
        }
    }

    #[test]
    fn capacity_carries_the_limit() {
        let err = image_error_to_showroom(ImageError::CapacityExceeded { max_slots: 5 });
        assert_eq!(err.code(), 409);
        assert_eq!(err.data, Some(json!({ "maxSlots": 5 })));
    }

    #[test]
    fn foreign_errors_render_as_general_errors() {
        let response = ShowroomAxumError(anyhow::anyhow!("socket closed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let wrapped = ShowroomError::forbidden("read-only").into_anyhow().context("gate");
        let response = ShowroomAxumError(wrapped).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn storage_details_stay_out_of_the_body() {
        let err = image_error_to_showroom(ImageError::storage_msg("disk"));
        assert!(err.source.is_some());
        assert!(err.sanitize_for_client().source.is_none());
    }
}
