use axum::Json;

use crate::api::models::slugs::{SlugRequest, SlugResponse};
use crate::errors::Result;
use crate::json::StrictJson;
use crate::naming::slugify;

pub async fn create_slug(StrictJson(request): StrictJson<SlugRequest>) -> Result<Json<SlugResponse>> {
    let slug = slugify(&request.text)?;
    Ok(Json(SlugResponse { slug }))
}
