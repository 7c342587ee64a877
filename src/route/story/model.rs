pub use crate::route::model::{comma_ids, comma_list, default_limit, KeyInput};

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{populate::Embed, route::user::model::Profile, store::Entity};

/// A single story, written by a user.
#[model]
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Story {
	/// The unique identifier of the story.
	#[model(skip)]
	pub id: Uuid,
	/// The title of the story.
	#[validate(length(min = 3))]
	pub title: String,
	/// Rich text, limited to `b`, `i`, `strong`, `h1`, `h2`, `h3`, `p` and `br`.
	#[serde(default)]
	pub body: String,
	/// A short description.
	#[serde(default)]
	pub info: String,
	/// Cover image url.
	#[serde(default)]
	pub cover: String,
	#[serde(default)]
	pub tag_list: Vec<String>,
	/// The user that wrote the story.
	#[model(skip)]
	pub author: Uuid,
	/// Human readable identifier, derived from the title at creation.
	#[model(skip)]
	pub slug: String,
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

impl Entity for Story {
	const COLLECTION: &'static str = "stories";

	fn id(&self) -> Uuid {
		self.id
	}
}

/// A story with its relations populated.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryView {
	pub id: Uuid,
	pub title: String,
	pub body: String,
	pub info: String,
	pub cover: String,
	pub tag_list: Vec<String>,
	pub author: Embed<Profile>,
	pub slug: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl StoryView {
	pub fn new(story: Story, author: Embed<Profile>) -> Self {
		Self {
			id: story.id,
			title: story.title,
			body: story.body,
			info: story.info,
			cover: story.cover,
			tag_list: story.tag_list,
			author,
			slug: story.slug,
			created_at: story.created_at,
			updated_at: story.updated_at,
		}
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CreateStoryInput {
	#[validate(nested)]
	pub story: CreateStory,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UpdateStoryInput {
	#[validate(nested)]
	pub story: UpdateStory,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
pub struct StoryEnvelope {
	pub story: StoryView,
}

#[derive(Clone, Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryPage {
	pub stories: Vec<StoryView>,
	pub stories_count: u64,
}

/// Filters for listing stories. Every set matches any of its items.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ListStoriesQuery {
	/// Comma-separated story ids.
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
	/// Comma-separated author usernames.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub author: Vec<String>,
	#[serde(default = "default_limit")]
	#[validate(range(min = 1, max = 100))]
	pub limit: u64,
	#[serde(default)]
	pub offset: u64,
}
