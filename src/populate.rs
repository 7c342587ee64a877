//! Embeds referenced entities into responses.
//!
//! Each relation is fetched with a single batched lookup per call.
use std::collections::{HashMap, HashSet};

use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::{
	route::{
		gallery::model::{Gallery, GalleryView},
		story::model::{Story, StoryView},
		user::model::{Profile, User},
	},
	store::{Collection, StoreError},
};

/// A reference to another entity, as it appears in a response.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Embed<T> {
	/// The referenced entity.
	Entity(T),
	/// The referenced entity no longer exists. Serialized as `null`.
	Missing,
}

fn embed<T: Clone>(found: &HashMap<Uuid, T>, id: Uuid) -> Embed<T> {
	found.get(&id).cloned().map_or(Embed::Missing, Embed::Entity)
}

/// Entities fetched for one population call, keyed by id.
struct Found {
	authors: HashMap<Uuid, Profile>,
	stories: HashMap<Uuid, StoryView>,
}

/// Embeds the author of stories, and the curator and stories of galleries.
/// Stories embedded in a gallery carry their own author, and go no deeper.
#[derive(Clone)]
pub struct Populator {
	users: Collection<User>,
	stories: Collection<Story>,
}

impl Populator {
	pub fn new(users: Collection<User>, stories: Collection<Story>) -> Self {
		Self { users, stories }
	}

	async fn profiles(
		&self,
		ids: impl IntoIterator<Item = Uuid>,
	) -> Result<HashMap<Uuid, Profile>, StoreError> {
		let ids = ids.into_iter().collect::<HashSet<_>>();

		Ok(self
			.users
			.find_by_ids(ids)
			.await?
			.into_iter()
			.map(|user| (user.id, user.into()))
			.collect())
	}

	pub async fn stories(&self, stories: Vec<Story>) -> Result<Vec<StoryView>, StoreError> {
		let authors = self
			.profiles(stories.iter().map(|story| story.author))
			.await?;

		Ok(stories
			.into_iter()
			.map(|story| {
				let author = embed(&authors, story.author);

				StoryView::new(story, author)
			})
			.collect())
	}

	pub async fn story(&self, story: Story) -> Result<StoryView, StoreError> {
		let authors = self.profiles([story.author]).await?;
		let author = embed(&authors, story.author);

		Ok(StoryView::new(story, author))
	}

	async fn find_for(&self, galleries: &[Gallery]) -> Result<Found, StoreError> {
		let authors = self
			.profiles(galleries.iter().map(|gallery| gallery.author))
			.await?;

		let ids = galleries
			.iter()
			.flat_map(|gallery| gallery.stories.iter().copied())
			.collect::<HashSet<_>>();
		let stories = self.stories.find_by_ids(ids).await?;
		let stories = self
			.stories(stories)
			.await?
			.into_iter()
			.map(|story| (story.id, story))
			.collect();

		Ok(Found { authors, stories })
	}

	fn assemble(gallery: Gallery, found: &Found) -> GalleryView {
		let author = embed(&found.authors, gallery.author);
		let stories = gallery
			.stories
			.iter()
			.map(|id| embed(&found.stories, *id))
			.collect();

		GalleryView::new(gallery, author, stories)
	}

	pub async fn galleries(&self, galleries: Vec<Gallery>) -> Result<Vec<GalleryView>, StoreError> {
		let found = self.find_for(&galleries).await?;

		Ok(galleries
			.into_iter()
			.map(|gallery| Self::assemble(gallery, &found))
			.collect())
	}

	pub async fn gallery(&self, gallery: Gallery) -> Result<GalleryView, StoreError> {
		let found = self.find_for(std::slice::from_ref(&gallery)).await?;

		Ok(Self::assemble(gallery, &found))
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use chrono::Utc;
	use serde_json::json;

	use super::*;
	use crate::store::MemoryStore;

	struct Fixture {
		populator: Populator,
		users: Collection<User>,
		stories: Collection<Story>,
	}

	fn fixture() -> Fixture {
		let store = Arc::new(MemoryStore::default());
		let users = Collection::new(store.clone());
		let stories = Collection::new(store);

		Fixture {
			populator: Populator::new(users.clone(), stories.clone()),
			users,
			stories,
		}
	}

	async fn user(users: &Collection<User>, username: &str) -> User {
		let now = Utc::now();

		users
			.insert(&User {
				id: Uuid::nil(),
				username: username.into(),
				email: format!("{username}@x.com"),
				password_hash: String::new(),
				image: String::new(),
				bio: None,
				created_at: now,
				updated_at: now,
			})
			.await
			.unwrap()
	}

	async fn story(stories: &Collection<Story>, author: Uuid, title: &str) -> Story {
		let now = Utc::now();

		stories
			.insert(&Story {
				id: Uuid::nil(),
				title: title.into(),
				body: String::new(),
				info: String::new(),
				cover: String::new(),
				tag_list: Vec::new(),
				author,
				slug: title.to_lowercase(),
				created_at: now,
				updated_at: now,
			})
			.await
			.unwrap()
	}

	fn gallery(author: Uuid, stories: Vec<Uuid>) -> Gallery {
		let now = Utc::now();

		Gallery {
			id: Uuid::new_v4(),
			title: "Trips".into(),
			subtitle: String::new(),
			cover: String::new(),
			tag_list: Vec::new(),
			author,
			stories,
			slug: "trips".into(),
			created_at: now,
			updated_at: now,
		}
	}

	#[tokio::test]
	async fn test_story_author() {
		let Fixture {
			populator,
			users,
			stories,
		} = fixture();
		let ana = user(&users, "ana").await;
		let written = story(&stories, ana.id, "Trip").await;
		let orphan = story(&stories, Uuid::new_v4(), "Lost").await;

		let views = populator
			.stories(vec![written.clone(), orphan])
			.await
			.unwrap();

		assert_eq!(serde_json::to_value(&views[0].author).unwrap()["username"], "ana");
		assert_eq!(views[1].author, Embed::Missing);
		assert_eq!(serde_json::to_value(&views[1]).unwrap()["author"], json!(null));

		let view = populator.story(written).await.unwrap();

		assert_eq!(view.author, views[0].author);
	}

	#[tokio::test]
	async fn test_gallery_stories_are_nested() {
		let Fixture {
			populator,
			users,
			stories,
		} = fixture();
		let ana = user(&users, "ana").await;
		let bob = user(&users, "bob").await;
		let first = story(&stories, bob.id, "First").await;
		let second = story(&stories, ana.id, "Second").await;
		let missing = Uuid::new_v4();

		let view = populator
			.gallery(gallery(ana.id, vec![second.id, missing, first.id]))
			.await
			.unwrap();
		let value = serde_json::to_value(&view).unwrap();

		assert_eq!(value["author"]["username"], "ana");
		assert_eq!(value["stories"][0]["title"], "Second");
		assert_eq!(value["stories"][1], json!(null));
		assert_eq!(value["stories"][2]["author"]["username"], "bob");

		let views = populator
			.galleries(vec![
				gallery(bob.id, vec![first.id]),
				gallery(Uuid::new_v4(), Vec::new()),
			])
			.await
			.unwrap();

		assert_eq!(serde_json::to_value(&views[0]).unwrap()["author"]["username"], "bob");
		assert_eq!(views[0].stories.len(), 1);
		assert_eq!(views[1].author, Embed::Missing);
		assert!(views[1].stories.is_empty());
	}
}
