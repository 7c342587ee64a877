use std::{marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, Query, StoreError, ID_FIELD};

/// An entity persisted as a document in its own collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
	const COLLECTION: &'static str;

	fn id(&self) -> Uuid;
}

/// Typed view over one collection of a [`DocumentStore`].
pub struct Collection<T> {
	store: Arc<dyn DocumentStore>,
	_entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
	fn clone(&self) -> Self {
		Self {
			store: Arc::clone(&self.store),
			_entity: PhantomData,
		}
	}
}

impl<T: Entity> Collection<T> {
	pub fn new(store: Arc<dyn DocumentStore>) -> Self {
		Self {
			store,
			_entity: PhantomData,
		}
	}

	fn to_document(entity: &T) -> Result<Document, StoreError> {
		match serde_json::to_value(entity)? {
			Value::Object(document) => Ok(document),
			_ => Err(StoreError::NotADocument(T::COLLECTION)),
		}
	}

	fn from_document(document: Document) -> Result<T, StoreError> {
		Ok(serde_json::from_value(Value::Object(document))?)
	}

	pub async fn find(&self, query: &Query) -> Result<Vec<T>, StoreError> {
		self.store
			.find(T::COLLECTION, query)
			.await?
			.into_iter()
			.map(Self::from_document)
			.collect()
	}

	pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
		let query = Query::new(filter).paginate(1, 0);

		Ok(self.find(&query).await?.into_iter().next())
	}

	pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
		self.store
			.find_by_id(T::COLLECTION, id)
			.await?
			.map(Self::from_document)
			.transpose()
	}

	/// Fetches every entity whose id is in `ids`, in no particular order.
	pub async fn find_by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Result<Vec<T>, StoreError> {
		let filter = Filter::new().any_of(ID_FIELD, ids.into_iter().map(|id| id.to_string()));

		if filter.conditions().is_empty() {
			return Ok(Vec::new());
		}

		self.find(&Query::new(filter)).await
	}

	pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
		self.store.count(T::COLLECTION, filter).await
	}

	/// Inserts the entity, returning it with the id assigned by the store.
	pub async fn insert(&self, entity: &T) -> Result<T, StoreError> {
		let document = self
			.store
			.insert(T::COLLECTION, Self::to_document(entity)?)
			.await?;

		Self::from_document(document)
	}

	pub async fn update(&self, entity: &T) -> Result<Option<T>, StoreError> {
		self.store
			.update_by_id(T::COLLECTION, entity.id(), Self::to_document(entity)?)
			.await?
			.map(Self::from_document)
			.transpose()
	}

	pub async fn remove(&self, id: Uuid) -> Result<Option<T>, StoreError> {
		self.store
			.remove_by_id(T::COLLECTION, id)
			.await?
			.map(Self::from_document)
			.transpose()
	}
}
