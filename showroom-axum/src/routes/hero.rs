use axum::{
    body::Body,
    extract::State,
    http::HeaderMap,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use showroom_core::errors::ShowroomError;

use crate::delivery::delivery_response;
use crate::params::if_none_match;
use crate::routes::read_submission;
use crate::{ShowroomAxumError, ShowroomState};

pub fn routes() -> Router<ShowroomState> {
    Router::new().route("/hero-image", get(get_hero).post(store_hero))
}

async fn get_hero(
    State(state): State<ShowroomState>,
    headers: HeaderMap,
) -> Result<Response, ShowroomAxumError> {
    let delivery = state.hero.open(if_none_match(&headers)).await?;
    Ok(delivery_response(delivery))
}

async fn store_hero(
    State(state): State<ShowroomState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>, ShowroomAxumError> {
    let mut sources = read_submission(&headers, body, &state.multipart)
        .await?
        .sources;
    if sources.len() > 1 {
        return Err(ShowroomError::bad_request("The hero image takes exactly one image").into());
    }
    let source = sources
        .pop()
        .ok_or_else(|| ShowroomError::bad_request("No image supplied: send a 'file' part"))?;

    let receipt = state.hero.store(source).await?;
    Ok(Json(json!({ "success": true, "imageUrl": receipt.image_url })))
}
