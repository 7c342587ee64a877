use std::{sync::Arc, time::Duration};

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{model, Error, RouteError};
use crate::{
	cache::ActionCache,
	content,
	events::{Change, EventBus},
	extract::Identity,
	populate::Populator,
	route::user::{self, UserService},
	store::{Collection, Filter, Query, Sort, StoreError, ID_FIELD},
};

pub const SERVICE: &str = "stories";

/// Services whose entities are embedded in story responses.
const EMBEDS: &[&str] = &[user::service::SERVICE];

pub struct StoryService {
	stories: Collection<model::Story>,
	users: Arc<UserService>,
	populator: Populator,
	events: Arc<EventBus>,
	get_cache: Arc<ActionCache<model::StoryView>>,
	list_cache: Arc<ActionCache<model::StoryPage>>,
}

impl StoryService {
	pub fn new(
		stories: Collection<model::Story>,
		users: Arc<UserService>,
		populator: Populator,
		events: Arc<EventBus>,
		cache_ttl: Duration,
	) -> Self {
		let get_cache = ActionCache::new(SERVICE, EMBEDS, cache_ttl);
		let list_cache = ActionCache::new(SERVICE, EMBEDS, cache_ttl);

		events.subscribe(get_cache.clone());
		events.subscribe(list_cache.clone());

		Self {
			stories,
			users,
			populator,
			events,
			get_cache,
			list_cache,
		}
	}

	/// Drops expired cached responses.
	pub fn retain_fresh(&self) {
		self.get_cache.retain_fresh();
		self.list_cache.retain_fresh();
	}

	async fn find(&self, key: &str) -> Result<model::Story, RouteError> {
		Ok(content::resolve(&self.stories, key)
			.await?
			.ok_or_else(|| Error::UnknownStory(key.to_owned()))?)
	}

	/// Resolves titles to ids. Unknown titles are skipped.
	pub async fn ids_by_title(&self, titles: &[String]) -> Result<Vec<Uuid>, StoreError> {
		let filter = Filter::new().any_of("title", titles.iter().cloned());
		let stories = self.stories.find(&Query::new(filter)).await?;

		Ok(stories.into_iter().map(|story| story.id).collect())
	}

	pub async fn create(
		&self,
		identity: &Identity,
		input: model::CreateStory,
	) -> Result<model::StoryView, RouteError> {
		let author = content::author_of(identity)?;
		let slug = content::unique_slug(&self.stories, &input.title).await?;
		let now = Utc::now();

		let story = self
			.stories
			.insert(&model::Story {
				id: Uuid::nil(),
				slug,
				title: input.title,
				body: content::sanitize(&input.body),
				info: input.info,
				cover: input.cover,
				tag_list: input.tag_list,
				author,
				created_at: now,
				updated_at: now,
			})
			.await?;

		let view = self.populator.story(story).await?;

		tracing::info!(story = %view.id, slug = %view.slug, author = %identity.username, "created story");
		self.events.emit(SERVICE, Change::Created, view.id);

		Ok(view)
	}

	pub async fn get(&self, identity: &Identity, key: &str) -> Result<model::StoryView, RouteError> {
		let cache_key = format!("{}|{key}", identity.id);

		if let Some(view) = self.get_cache.get(&cache_key) {
			return Ok(view);
		}

		let generation = self.get_cache.generation();

		let story = self.find(key).await?;
		let view = self.populator.story(story).await?;

		self.get_cache.insert(cache_key, view.clone(), generation);

		Ok(view)
	}

	pub async fn list(
		&self,
		identity: &Identity,
		query: &model::ListStoriesQuery,
	) -> Result<model::StoryPage, RouteError> {
		let cache_key = format!("{}|{query:?}", identity.id);

		if let Some(page) = self.list_cache.get(&cache_key) {
			return Ok(page);
		}

		let generation = self.list_cache.generation();

		let mut filter = Filter::new()
			.any_of(ID_FIELD, query.id.iter().map(Uuid::to_string))
			.any_of("title", query.title.iter().cloned())
			.contains_any("tagList", query.tag.iter().cloned());

		if !query.author.is_empty() {
			let authors = self.users.ids_by_username(&query.author).await?;

			if authors.is_empty() {
				return Err(Error::UnknownAuthor(query.author.join(",")).into());
			}

			filter = filter.any_of("author", authors.iter().map(Uuid::to_string));
		}

		let page = Query::new(filter)
			.sort(Sort::NEWEST_FIRST)
			.paginate(query.limit, query.offset);

		let (stories, stories_count) = tokio::try_join!(
			self.stories.find(&page),
			self.stories.count(&page.filter),
		)?;

		let page = model::StoryPage {
			stories: self.populator.stories(stories).await?,
			stories_count,
		};

		self.list_cache.insert(cache_key, page.clone(), generation);

		Ok(page)
	}

	pub async fn update(
		&self,
		identity: &Identity,
		key: &str,
		changes: model::UpdateStory,
	) -> Result<model::StoryView, RouteError> {
		let mut story = self.find(key).await?;

		content::ensure_owner(story.author, identity)?;

		let body_changed = changes.body.is_some();
		changes.apply(&mut story);

		if body_changed {
			story.body = content::sanitize(&story.body);
		}

		story.updated_at = Utc::now();
		story.validate()?;

		let story = self
			.stories
			.update(&story)
			.await?
			.ok_or_else(|| Error::UnknownStory(key.to_owned()))?;

		let view = self.populator.story(story).await?;

		self.events.emit(SERVICE, Change::Updated, view.id);

		Ok(view)
	}

	pub async fn delete(&self, identity: &Identity, key: &str) -> Result<model::StoryView, RouteError> {
		let story = self.find(key).await?;

		content::ensure_owner(story.author, identity)?;

		let story = self
			.stories
			.remove(story.id)
			.await?
			.ok_or_else(|| Error::UnknownStory(key.to_owned()))?;

		let view = self.populator.story(story).await?;

		tracing::info!(story = %view.id, "deleted story");
		self.events.emit(SERVICE, Change::Removed, view.id);

		Ok(view)
	}
}
