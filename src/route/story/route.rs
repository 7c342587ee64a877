use std::sync::Arc;

use axum::extract::State;
use macros::route;

use crate::{
	extract::{Created, Identity, Json, Path, Query},
	openapi::tag,
};

use super::{model, RouteError, StoryService};

/// Create story
/// Creates a story authored by the caller. The slug is derived from the title.
#[route(tag = tag::STORY)]
pub async fn create_story(
	State(stories): State<Arc<StoryService>>,
	identity: Identity,
	Json(input): Json<model::CreateStoryInput>,
) -> Result<Created<model::StoryEnvelope>, RouteError> {
	let story = stories.create(&identity, input.story).await?;

	Ok(Created(model::StoryEnvelope { story }))
}

/// Get story
/// Returns a single story by its slug or id, with its author.
#[route(tag = tag::STORY)]
pub async fn get_story(
	State(stories): State<Arc<StoryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::StoryEnvelope>, RouteError> {
	let story = stories.get(&identity, &path.id).await?;

	Ok(Json(model::StoryEnvelope { story }))
}

/// List stories
/// Returns a page of stories matching every given filter, newest first.
#[route(tag = tag::STORY)]
pub async fn list_stories(
	State(stories): State<Arc<StoryService>>,
	identity: Identity,
	Query(query): Query<model::ListStoriesQuery>,
) -> Result<Json<model::StoryPage>, RouteError> {
	Ok(Json(stories.list(&identity, &query).await?))
}

/// Update story
/// Updates a story by its slug or id. Only the author can update it.
#[route(tag = tag::STORY)]
pub async fn update_story(
	State(stories): State<Arc<StoryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
	Json(input): Json<model::UpdateStoryInput>,
) -> Result<Json<model::StoryEnvelope>, RouteError> {
	let story = stories.update(&identity, &path.id, input.story).await?;

	Ok(Json(model::StoryEnvelope { story }))
}

/// Delete story
/// Deletes a story by its slug or id, returning it. Only the author can delete it.
#[route(tag = tag::STORY)]
pub async fn delete_story(
	State(stories): State<Arc<StoryService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::StoryEnvelope>, RouteError> {
	let story = stories.delete(&identity, &path.id).await?;

	Ok(Json(model::StoryEnvelope { story }))
}
