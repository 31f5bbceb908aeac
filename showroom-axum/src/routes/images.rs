use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use showroom_core::errors::ShowroomError;
use tracing::debug;

use crate::delivery::delivery_response;
use crate::params::{if_none_match, parse_image_id, OwnerQuery};
use crate::routes::{read_submission, Submission};
use crate::{ShowroomAxumError, ShowroomState};

/// `/images` and `/images/{id}`, all scoped by `?owner=`
pub fn routes() -> Router<ShowroomState> {
    Router::new()
        .route(
            "/images",
            get(list_images).post(create_images).delete(delete_all_images),
        )
        .route("/images/{id}", get(get_image).delete(delete_image))
}

async fn list_images(
    State(state): State<ShowroomState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ShowroomAxumError> {
    let owner = query.owner_key()?;
    let images = state.images.list(&owner).await?;
    Ok(Json(json!({ "images": images })))
}

async fn create_images(
    State(state): State<ShowroomState>,
    Query(query): Query<OwnerQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, ShowroomAxumError> {
    let owner = query.owner_key()?;
    let Submission {
        mut sources,
        sort_order,
    } = read_submission(&headers, body, &state.multipart).await?;

    if sources.len() > 1 {
        if sort_order.is_some() {
            debug!(owner = %owner, "sortOrder ignored for a multi-image submission");
        }
        let batch = state.images.ingest_batch(&owner, sources).await?;
        return Ok(Json(json!({
            "success": batch.any_succeeded(),
            "results": batch.results,
            "imageUrlList": batch.image_url_list,
        })));
    }

    let source = sources.pop().ok_or_else(|| {
        ShowroomError::bad_request("No image supplied: send a 'file' part or a 'sourceUrl'")
    })?;
    let receipt = state.images.ingest(&owner, source, sort_order).await?;
    Ok(Json(json!({
        "success": true,
        "imageId": receipt.image_id,
        "sortOrder": receipt.sort_order,
        "url": receipt.url,
        "imageUrlList": receipt.image_url_list,
    })))
}

async fn get_image(
    State(state): State<ShowroomState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
    headers: HeaderMap,
) -> Result<Response, ShowroomAxumError> {
    let owner = query.owner_key()?;
    let id = parse_image_id(&id)?;
    let delivery = state
        .images
        .open(&owner, id, if_none_match(&headers))
        .await?;
    Ok(delivery_response(delivery))
}

async fn delete_image(
    State(state): State<ShowroomState>,
    Path(id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ShowroomAxumError> {
    let owner = query.owner_key()?;
    let id = parse_image_id(&id)?;
    let image_url_list = state.images.delete_one(&owner, id).await?;
    Ok(Json(json!({ "success": true, "imageUrlList": image_url_list })))
}

async fn delete_all_images(
    State(state): State<ShowroomState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Value>, ShowroomAxumError> {
    let owner = query.owner_key()?;
    let image_url_list = state.images.delete_all(&owner).await?;
    Ok(Json(json!({ "success": true, "imageUrlList": image_url_list })))
}
