use std::sync::Arc;

use axum::extract::State;
use macros::route;

use crate::{
	extract::{Created, Identity, Json, Path, Query},
	openapi::tag,
};

use super::{model, GalleryService, RouteError};

/// Create gallery
/// Creates a gallery curated by the caller. The slug is derived from the title.
#[route(tag = tag::GALLERY)]
pub async fn create_gallery(
	State(galleries): State<Arc<GalleryService>>,
	identity: Identity,
	Json(input): Json<model::CreateGalleryInput>,
) -> Result<Created<model::GalleryEnvelope>, RouteError> {
	let gallery = galleries.create(&identity, input.gallery).await?;

	Ok(Created(model::GalleryEnvelope { gallery }))
}

/// Get gallery
/// Returns a single gallery by its slug or id, with its author and stories.
#[route(tag = tag::GALLERY)]
pub async fn get_gallery(
	State(galleries): State<Arc<GalleryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::GalleryEnvelope>, RouteError> {
	let gallery = galleries.get(&identity, &path.id).await?;

	Ok(Json(model::GalleryEnvelope { gallery }))
}

/// List galleries
/// Returns a page of galleries matching every given filter, newest first.
#[route(tag = tag::GALLERY)]
pub async fn list_galleries(
	State(galleries): State<Arc<GalleryService>>,
	identity: Identity,
	Query(query): Query<model::ListGalleriesQuery>,
) -> Result<Json<model::GalleryPage>, RouteError> {
	Ok(Json(galleries.list(&identity, &query).await?))
}

/// Update gallery
/// Updates a gallery by its slug or id. Only the curator can update it.
#[route(tag = tag::GALLERY)]
pub async fn update_gallery(
	State(galleries): State<Arc<GalleryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
	Json(input): Json<model::UpdateGalleryInput>,
) -> Result<Json<model::GalleryEnvelope>, RouteError> {
	let gallery = galleries.update(&identity, &path.id, input.gallery).await?;

	Ok(Json(model::GalleryEnvelope { gallery }))
}

/// Delete gallery
/// Deletes a gallery by its slug or id, returning it. The stories are kept.
#[route(tag = tag::GALLERY)]
pub async fn delete_gallery(
	State(galleries): State<Arc<GalleryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::GalleryEnvelope>, RouteError> {
	let gallery = galleries.delete(&identity, &path.id).await?;

	Ok(Json(model::GalleryEnvelope { gallery }))
}
