pub use crate::route::model::{comma_ids, comma_list, default_limit, KeyInput};

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
	populate::Embed,
	route::{story::model::StoryView, user::model::Profile},
	store::Entity,
};

/// A subtitle is optional, but at least three characters long when given.
fn validate_subtitle(subtitle: &str) -> Result<(), ValidationError> {
	if !subtitle.is_empty() && subtitle.chars().count() < 3 {
		let mut error = ValidationError::new("length");
		error.message = Some("must be empty or at least 3 characters long".into());

		return Err(error);
	}

	Ok(())
}

/// An ordered collection of stories, curated by a user.
#[model]
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
	/// The unique identifier of the gallery.
	#[model(skip)]
	pub id: Uuid,
	#[validate(length(min = 3))]
	pub title: String,
	#[serde(default)]
	#[validate(length(max = 256), custom(function = "validate_subtitle"))]
	pub subtitle: String,
	/// Cover image url.
	#[serde(default)]
	pub cover: String,
	#[serde(default)]
	pub tag_list: Vec<String>,
	/// The user that curates the gallery.
	#[model(skip)]
	pub author: Uuid,
	/// Ids of the stories in the gallery, in display order.
	#[serde(default)]
	pub stories: Vec<Uuid>,
	#[model(skip)]
	pub slug: String,
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

impl Entity for Gallery {
	const COLLECTION: &'static str = "galleries";

	fn id(&self) -> Uuid {
		self.id
	}
}

/// A gallery with its author and stories populated.
#[derive(Clone, Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryView {
	pub id: Uuid,
	pub title: String,
	pub subtitle: String,
	pub cover: String,
	pub tag_list: Vec<String>,
	pub author: Embed<Profile>,
	/// Stories that no longer exist are `null`.
	pub stories: Vec<Embed<StoryView>>,
	pub slug: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl GalleryView {
	pub fn new(gallery: Gallery, author: Embed<Profile>, stories: Vec<Embed<StoryView>>) -> Self {
		Self {
			id: gallery.id,
			title: gallery.title,
			subtitle: gallery.subtitle,
			cover: gallery.cover,
			tag_list: gallery.tag_list,
			author,
			stories,
			slug: gallery.slug,
			created_at: gallery.created_at,
			updated_at: gallery.updated_at,
		}
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CreateGalleryInput {
	#[validate(nested)]
	pub gallery: CreateGallery,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UpdateGalleryInput {
	#[validate(nested)]
	pub gallery: UpdateGallery,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct GalleryEnvelope {
	pub gallery: GalleryView,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
	pub galleries: Vec<GalleryView>,
	pub galleries_count: u64,
}

/// Filters for listing galleries. Every set matches any of its items.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ListGalleriesQuery {
	/// Comma-separated gallery ids.
	#[serde(default, deserialize_with = "comma_ids")]
	#[schemars(with = "Option<String>")]
	pub id: Vec<Uuid>,
	/// Comma-separated titles.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub title: Vec<String>,
	/// Comma-separated tags.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub tag: Vec<String>,
	/// Comma-separated curator usernames.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub author: Vec<String>,
	/// Comma-separated titles of contained stories.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub story: Vec<String>,
	#[serde(default = "default_limit")]
	#[validate(range(min = 1, max = 100))]
	pub limit: u64,
	#[serde(default)]
	pub offset: u64,
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("", true)]
	#[case("ab", false)]
	#[case("abc", true)]
	#[case("Été", true)]
	fn test_subtitle(#[case] subtitle: &str, #[case] valid: bool) {
		assert_eq!(validate_subtitle(subtitle).is_ok(), valid);
	}
}
