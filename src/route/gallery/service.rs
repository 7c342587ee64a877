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
	route::{
		story::{self, StoryService},
		user::{self, UserService},
	},
	store::{Collection, Filter, Query, Sort, ID_FIELD},
};

pub const SERVICE: &str = "galleries";

/// Services whose entities are embedded in gallery responses.
const EMBEDS: &[&str] = &[user::service::SERVICE, story::service::SERVICE];

pub struct GalleryService {
	galleries: Collection<model::Gallery>,
	users: Arc<UserService>,
	stories: Arc<StoryService>,
	populator: Populator,
	events: Arc<EventBus>,
	get_cache: Arc<ActionCache<model::GalleryView>>,
	list_cache: Arc<ActionCache<model::GalleryPage>>,
}

impl GalleryService {
	pub fn new(
		galleries: Collection<model::Gallery>,
		users: Arc<UserService>,
		stories: Arc<StoryService>,
		populator: Populator,
		events: Arc<EventBus>,
		cache_ttl: Duration,
	) -> Self {
		let get_cache = ActionCache::new(SERVICE, EMBEDS, cache_ttl);
		let list_cache = ActionCache::new(SERVICE, EMBEDS, cache_ttl);

		events.subscribe(get_cache.clone());
		events.subscribe(list_cache.clone());

		Self {
			galleries,
			users,
			stories,
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

	async fn find(&self, key: &str) -> Result<model::Gallery, RouteError> {
		Ok(content::resolve(&self.galleries, key)
			.await?
			.ok_or_else(|| Error::UnknownGallery(key.to_owned()))?)
	}

	pub async fn create(
		&self,
		identity: &Identity,
		input: model::CreateGallery,
	) -> Result<model::GalleryView, RouteError> {
		let author = content::author_of(identity)?;
		let slug = content::unique_slug(&self.galleries, &input.title).await?;
		let now = Utc::now();

		let gallery = self
			.galleries
			.insert(&model::Gallery {
				id: Uuid::nil(),
				slug,
				title: input.title,
				subtitle: input.subtitle,
				cover: input.cover,
				tag_list: input.tag_list,
				author,
				stories: input.stories,
				created_at: now,
				updated_at: now,
			})
			.await?;

		let view = self.populator.gallery(gallery).await?;

		tracing::info!(gallery = %view.id, slug = %view.slug, curator = %identity.username, "created gallery");
		self.events.emit(SERVICE, Change::Created, view.id);

		Ok(view)
	}

	pub async fn get(
		&self,
		identity: &Identity,
		key: &str,
	) -> Result<model::GalleryView, RouteError> {
		let cache_key = format!("{}|{key}", identity.id);

		if let Some(view) = self.get_cache.get(&cache_key) {
			return Ok(view);
		}

		let generation = self.get_cache.generation();

		let gallery = self.find(key).await?;
		let view = self.populator.gallery(gallery).await?;

		self.get_cache.insert(cache_key, view.clone(), generation);

		Ok(view)
	}

	pub async fn list(
		&self,
		identity: &Identity,
		query: &model::ListGalleriesQuery,
	) -> Result<model::GalleryPage, RouteError> {
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

		if !query.story.is_empty() {
			let stories = self.stories.ids_by_title(&query.story).await?;

			if stories.is_empty() {
				return Err(Error::UnknownStory(query.story.join(",")).into());
			}

			filter = filter.contains_any("stories", stories.iter().map(Uuid::to_string));
		}

		let page = Query::new(filter)
			.sort(Sort::NEWEST_FIRST)
			.paginate(query.limit, query.offset);

		let (galleries, galleries_count) = tokio::try_join!(
			self.galleries.find(&page),
			self.galleries.count(&page.filter),
		)?;

		let page = model::GalleryPage {
			galleries: self.populator.galleries(galleries).await?,
			galleries_count,
		};

		self.list_cache.insert(cache_key, page.clone(), generation);

		Ok(page)
	}

	pub async fn update(
		&self,
		identity: &Identity,
		key: &str,
		changes: model::UpdateGallery,
	) -> Result<model::GalleryView, RouteError> {
		let mut gallery = self.find(key).await?;

		content::ensure_owner(gallery.author, identity)?;

		changes.apply(&mut gallery);
		gallery.updated_at = Utc::now();
		gallery.validate()?;

		let gallery = self
			.galleries
			.update(&gallery)
			.await?
			.ok_or_else(|| Error::UnknownGallery(key.to_owned()))?;

		let view = self.populator.gallery(gallery).await?;

		self.events.emit(SERVICE, Change::Updated, view.id);

		Ok(view)
	}

	pub async fn delete(
		&self,
		identity: &Identity,
		key: &str,
	) -> Result<model::GalleryView, RouteError> {
		let gallery = self.find(key).await?;

		content::ensure_owner(gallery.author, identity)?;

		let gallery = self
			.galleries
			.remove(gallery.id)
			.await?
			.ok_or_else(|| Error::UnknownGallery(key.to_owned()))?;

		let view = self.populator.gallery(gallery).await?;

		tracing::info!(gallery = %view.id, "deleted gallery");
		self.events.emit(SERVICE, Change::Removed, view.id);

		Ok(view)
	}
}
