//! Persistence port shared by every service.
//!
//! Services never talk to a database directly. They hold a typed
//! [`Collection`], which serializes entities into JSON documents and hands
//! them to whatever [`DocumentStore`] the application was started with.
mod collection;
pub mod memory;
pub mod postgres;

pub use collection::{Collection, Entity};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// A stored document. Every document carries its own `id` key.
pub type Document = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("document serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),
	#[error("expected a json object for collection {0}")]
	NotADocument(&'static str),
}

/// A single constraint on a document field.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
	/// The field equals the value.
	Eq(&'static str, Value),
	/// The field equals any of the values.
	In(&'static str, Vec<Value>),
	/// The field is an array sharing at least one element with the values.
	ContainsAny(&'static str, Vec<Value>),
}

impl Condition {
	pub fn field(&self) -> &'static str {
		match self {
			Self::Eq(field, _) | Self::In(field, _) | Self::ContainsAny(field, _) => *field,
		}
	}

	pub fn matches(&self, document: &Document) -> bool {
		let value = document.get(self.field());

		match (self, value) {
			(Self::Eq(_, expected), Some(value)) => value == expected,
			(Self::In(_, expected), Some(value)) => expected.contains(value),
			(Self::ContainsAny(_, expected), Some(Value::Array(items))) => {
				items.iter().any(|item| expected.contains(item))
			}
			_ => false,
		}
	}
}

/// A conjunction of [`Condition`]s. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
	conditions: Vec<Condition>,
}

impl Filter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn equals(mut self, field: &'static str, value: impl Into<Value>) -> Self {
		self.conditions.push(Condition::Eq(field, value.into()));
		self
	}

	/// Adds an "any of" constraint. An empty set imposes no constraint.
	pub fn any_of<I, V>(mut self, field: &'static str, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let values = values.into_iter().map(Into::into).collect::<Vec<_>>();

		if !values.is_empty() {
			self.conditions.push(Condition::In(field, values));
		}

		self
	}

	/// Adds an "array shares any of" constraint. An empty set imposes no constraint.
	pub fn contains_any<I, V>(mut self, field: &'static str, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let values = values.into_iter().map(Into::into).collect::<Vec<_>>();

		if !values.is_empty() {
			self.conditions.push(Condition::ContainsAny(field, values));
		}

		self
	}

	pub fn conditions(&self) -> &[Condition] {
		&self.conditions
	}

	pub fn matches(&self, document: &Document) -> bool {
		self.conditions
			.iter()
			.all(|condition| condition.matches(document))
	}
}

/// Sort order on a timestamp field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sort {
	pub field: &'static str,
	pub descending: bool,
}

impl Sort {
	pub const NEWEST_FIRST: Self = Self {
		field: "createdAt",
		descending: true,
	};

	/// Orders two documents, comparing RFC 3339 strings as instants.
	pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
		let ordering = compare_values(a.get(self.field), b.get(self.field));

		if self.descending {
			ordering.reverse()
		} else {
			ordering
		}
	}
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::String(a)), Some(Value::String(b))) => {
			match (
				chrono::DateTime::parse_from_rfc3339(a),
				chrono::DateTime::parse_from_rfc3339(b),
			) {
				(Ok(a), Ok(b)) => a.cmp(&b),
				_ => a.cmp(b),
			}
		}
		(Some(Value::Number(a)), Some(Value::Number(b))) => a
			.as_f64()
			.partial_cmp(&b.as_f64())
			.unwrap_or(Ordering::Equal),
		(Some(_), None) => Ordering::Greater,
		(None, Some(_)) => Ordering::Less,
		_ => Ordering::Equal,
	}
}

/// A filtered, sorted and paginated lookup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
	pub filter: Filter,
	pub sort: Option<Sort>,
	pub limit: Option<u64>,
	pub offset: Option<u64>,
}

impl Query {
	pub fn new(filter: Filter) -> Self {
		Self {
			filter,
			..Self::default()
		}
	}

	pub fn sort(mut self, sort: Sort) -> Self {
		self.sort = Some(sort);
		self
	}

	pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
		self.limit = Some(limit);
		self.offset = Some(offset);
		self
	}
}

/// The persistence port. Documents are grouped by collection name; the store
/// assigns ids on insert.
#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

	async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

	async fn find_by_id(&self, collection: &str, id: Uuid)
		-> Result<Option<Document>, StoreError>;

	/// Inserts the document under a fresh id, overwriting any `id` it carried.
	async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError>;

	/// Replaces the document, returning `None` if no document has that id.
	async fn update_by_id(
		&self,
		collection: &str,
		id: Uuid,
		document: Document,
	) -> Result<Option<Document>, StoreError>;

	/// Removes the document, returning it if it existed.
	async fn remove_by_id(&self, collection: &str, id: Uuid)
		-> Result<Option<Document>, StoreError>;
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::*;

	fn document(value: Value) -> Document {
		let Value::Object(map) = value else {
			panic!("not an object");
		};

		map
	}

	#[test]
	fn test_empty_filter_matches_everything() {
		assert!(Filter::new().matches(&document(json!({ "title": "a" }))));
	}

	#[test]
	fn test_empty_sets_impose_no_constraint() {
		let filter = Filter::new()
			.any_of("title", Vec::<String>::new())
			.contains_any("tagList", Vec::<String>::new());

		assert!(filter.conditions().is_empty());
	}

	#[test]
	fn test_contains_any() {
		let filter = Filter::new().contains_any("tagList", ["t1", "t3"]);

		assert!(filter.matches(&document(json!({ "tagList": ["t1", "t2"] }))));
		assert!(!filter.matches(&document(json!({ "tagList": ["t2"] }))));
		assert!(!filter.matches(&document(json!({ "tagList": "t1" }))));
		assert!(!filter.matches(&document(json!({}))));
	}

	#[test]
	fn test_conditions_are_conjunctive() {
		let filter = Filter::new()
			.any_of("title", ["a", "b"])
			.equals("author", "x");

		assert!(filter.matches(&document(json!({ "title": "b", "author": "x" }))));
		assert!(!filter.matches(&document(json!({ "title": "b", "author": "y" }))));
		assert!(!filter.matches(&document(json!({ "title": "c", "author": "x" }))));
	}

	#[test]
	fn test_sort_compares_instants() {
		let older = document(json!({ "createdAt": "2024-01-01T00:00:00.500Z" }));
		let newer = document(json!({ "createdAt": "2024-01-01T00:00:01Z" }));

		assert_eq!(Sort::NEWEST_FIRST.compare(&newer, &older), Ordering::Less);
		assert_eq!(Sort::NEWEST_FIRST.compare(&older, &newer), Ordering::Greater);
	}
}
