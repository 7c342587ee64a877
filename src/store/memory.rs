use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::{Document, DocumentStore, Filter, Query, StoreError, ID_FIELD};

/// Keeps every collection in process memory, in insertion order.
///
/// Used by the tests and whenever no database is configured. Nothing survives
/// a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
	collections: RwLock<HashMap<String, Vec<Document>>>,
}

fn has_id(document: &Document, id: &str) -> bool {
	matches!(document.get(ID_FIELD), Some(Value::String(value)) if value == id)
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
		let collections = self.collections.read();
		let Some(documents) = collections.get(collection) else {
			return Ok(Vec::new());
		};

		let mut found = documents
			.iter()
			.filter(|document| query.filter.matches(document))
			.cloned()
			.collect::<Vec<_>>();

		if let Some(sort) = query.sort {
			// Stable, so equal keys keep insertion order
			found.sort_by(|a, b| sort.compare(a, b));
		}

		let offset = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
		let limit = query
			.limit
			.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

		Ok(found.into_iter().skip(offset).take(limit).collect())
	}

	async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
		let collections = self.collections.read();
		let count = collections.get(collection).map_or(0, |documents| {
			documents
				.iter()
				.filter(|document| filter.matches(document))
				.count()
		});

		Ok(count as u64)
	}

	async fn find_by_id(
		&self,
		collection: &str,
		id: Uuid,
	) -> Result<Option<Document>, StoreError> {
		let id = id.to_string();

		Ok(self
			.collections
			.read()
			.get(collection)
			.and_then(|documents| documents.iter().find(|document| has_id(document, &id)))
			.cloned())
	}

	async fn insert(
		&self,
		collection: &str,
		mut document: Document,
	) -> Result<Document, StoreError> {
		document.insert(ID_FIELD.into(), Value::String(Uuid::new_v4().to_string()));

		self.collections
			.write()
			.entry(collection.to_owned())
			.or_default()
			.push(document.clone());

		Ok(document)
	}

	async fn update_by_id(
		&self,
		collection: &str,
		id: Uuid,
		mut document: Document,
	) -> Result<Option<Document>, StoreError> {
		let id = id.to_string();
		let mut collections = self.collections.write();

		let Some(existing) = collections
			.get_mut(collection)
			.and_then(|documents| documents.iter_mut().find(|document| has_id(document, &id)))
		else {
			return Ok(None);
		};

		document.insert(ID_FIELD.into(), Value::String(id));
		existing.clone_from(&document);

		Ok(Some(document))
	}

	async fn remove_by_id(
		&self,
		collection: &str,
		id: Uuid,
	) -> Result<Option<Document>, StoreError> {
		let id = id.to_string();
		let mut collections = self.collections.write();

		let Some(documents) = collections.get_mut(collection) else {
			return Ok(None);
		};

		Ok(documents
			.iter()
			.position(|document| has_id(document, &id))
			.map(|index| documents.remove(index)))
	}
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::*;
	use crate::store::Sort;

	fn document(value: Value) -> Document {
		let Value::Object(map) = value else {
			panic!("not an object");
		};

		map
	}

	async fn seeded() -> MemoryStore {
		let store = MemoryStore::default();

		for (index, tags) in [["a", "b"], ["b", "c"], ["c", "d"]].into_iter().enumerate() {
			store
				.insert(
					"stories",
					document(json!({
						"title": format!("story {index}"),
						"tagList": tags,
						"createdAt": format!("2024-01-0{}T00:00:00Z", index + 1),
					})),
				)
				.await
				.unwrap();
		}

		store
	}

	#[tokio::test]
	async fn test_insert_assigns_id() {
		let store = MemoryStore::default();
		let inserted = store
			.insert("users", document(json!({ "id": "client-id", "username": "ana" })))
			.await
			.unwrap();

		let id = inserted[ID_FIELD].as_str().unwrap();

		assert_ne!(id, "client-id");
		assert!(Uuid::parse_str(id).is_ok());
	}

	#[tokio::test]
	async fn test_find_sorted_and_paginated() {
		let store = seeded().await;
		let query = Query::new(Filter::new())
			.sort(Sort::NEWEST_FIRST)
			.paginate(2, 0);

		let titles = store
			.find("stories", &query)
			.await
			.unwrap()
			.into_iter()
			.map(|document| document["title"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();

		assert_eq!(titles, ["story 2", "story 1"]);

		let page = store
			.find("stories", &query.clone().paginate(2, 2))
			.await
			.unwrap();

		assert_eq!(page.len(), 1);
		assert_eq!(page[0]["title"], "story 0");
	}

	#[tokio::test]
	async fn test_count_ignores_pagination() {
		let store = seeded().await;
		let filter = Filter::new().contains_any("tagList", ["b"]);
		let query = Query::new(filter.clone()).paginate(1, 0);

		assert_eq!(store.find("stories", &query).await.unwrap().len(), 1);
		assert_eq!(store.count("stories", &filter).await.unwrap(), 2);
		assert_eq!(store.count("missing", &filter).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_update_and_remove() {
		let store = seeded().await;
		let first = store
			.find("stories", &Query::default())
			.await
			.unwrap()
			.remove(0);
		let id = Uuid::parse_str(first[ID_FIELD].as_str().unwrap()).unwrap();

		let updated = store
			.update_by_id("stories", id, document(json!({ "title": "renamed" })))
			.await
			.unwrap()
			.unwrap();

		assert_eq!(updated["title"], "renamed");
		assert_eq!(updated[ID_FIELD], id.to_string());

		let removed = store.remove_by_id("stories", id).await.unwrap();

		assert!(removed.is_some());
		assert!(store.find_by_id("stories", id).await.unwrap().is_none());
		assert!(store.remove_by_id("stories", id).await.unwrap().is_none());
		assert!(store
			.update_by_id("stories", id, Document::new())
			.await
			.unwrap()
			.is_none());
	}
}
