use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod service;

pub use service::GalleryService;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown gallery {0}")]
	UnknownGallery(String),
	#[error("no author named any of {0}")]
	UnknownAuthor(String),
	#[error("no story titled any of {0}")]
	UnknownStory(String),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			post_with(create_gallery, create_gallery_docs)
				.get_with(list_galleries, list_galleries_docs),
		)
		.api_route(
			"/:id",
			get_with(get_gallery, get_gallery_docs)
				.patch_with(update_gallery, update_gallery_docs)
				.delete_with(delete_gallery, delete_gallery_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::NOT_FOUND
	}

	fn into_message(self) -> error::Message<'static> {
		match self {
			Self::UnknownGallery(..) => {
				error::Message::new("GALLERY_NOT_FOUND").content("Gallery not found.")
			}
			Self::UnknownAuthor(names) => error::Message::new("AUTHOR_NOT_FOUND")
				.content("No author matches the filter.")
				.detail("author", names),
			Self::UnknownStory(titles) => error::Message::new("STORY_NOT_FOUND")
				.content("No story matches the filter.")
				.detail("story", titles),
		}
	}
}
