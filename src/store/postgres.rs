use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Condition, Document, DocumentStore, Filter, Query, StoreError, ID_FIELD};

/// Stores every collection in a single Postgres table, one JSONB body per row.
#[derive(Clone, Debug)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
		let store = Self { pool };

		store.migrate().await?;
		Ok(store)
	}

	/// Creates the document table if it does not exist yet.
	async fn migrate(&self) -> Result<(), StoreError> {
		sqlx::query(
			r#"
				CREATE TABLE IF NOT EXISTS document (
					collection TEXT NOT NULL,
					id UUID NOT NULL,
					body JSONB NOT NULL,
					PRIMARY KEY (collection, id)
				)
			"#,
		)
		.execute(&self.pool)
		.await?;

		sqlx::query(
			r#"
				CREATE INDEX IF NOT EXISTS document_created_at
				ON document (collection, (body->>'createdAt'))
			"#,
		)
		.execute(&self.pool)
		.await?;

		Ok(())
	}
}

/// Appends `WHERE collection = $1 AND ...` for the filter.
fn push_filter<'q>(builder: &mut QueryBuilder<'q, Postgres>, collection: &str, filter: &'q Filter) {
	builder.push(" WHERE collection = ");
	builder.push_bind(collection.to_owned());

	for condition in filter.conditions() {
		builder.push(" AND ");

		match condition {
			Condition::Eq(field, value) => {
				builder.push("body->");
				builder.push_bind(*field);
				builder.push(" = ");
				builder.push_bind(Json(value));
			}
			Condition::In(field, values) => {
				builder.push("jsonb_build_array(body->");
				builder.push_bind(*field);
				builder.push(") <@ ");
				builder.push_bind(Json(values));
			}
			Condition::ContainsAny(field, values) => {
				builder.push("jsonb_typeof(body->");
				builder.push_bind(*field);
				builder.push(") = 'array' AND EXISTS (SELECT 1 FROM jsonb_array_elements(body->");
				builder.push_bind(*field);
				builder.push(") AS element WHERE jsonb_build_array(element) <@ ");
				builder.push_bind(Json(values));
				builder.push(")");
			}
		}
	}
}

fn into_document(body: Json<Value>) -> Option<Document> {
	match body.0 {
		Value::Object(document) => Some(document),
		_ => None,
	}
}

#[async_trait]
impl DocumentStore for PgStore {
	async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
		let mut builder = QueryBuilder::<Postgres>::new("SELECT body FROM document");
		push_filter(&mut builder, collection, &query.filter);

		if let Some(sort) = query.sort {
			// Sort keys are RFC 3339 timestamps
			builder.push(" ORDER BY (body->>");
			builder.push_bind(sort.field);
			builder.push(")::timestamptz");
			builder.push(if sort.descending { " DESC" } else { " ASC" });
		}

		if let Some(limit) = query.limit {
			builder.push(" LIMIT ");
			builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
		}

		if let Some(offset) = query.offset {
			builder.push(" OFFSET ");
			builder.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
		}

		let bodies = builder
			.build_query_scalar::<Json<Value>>()
			.fetch_all(&self.pool)
			.await?;

		Ok(bodies.into_iter().filter_map(into_document).collect())
	}

	async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
		let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM document");
		push_filter(&mut builder, collection, filter);

		let count = builder
			.build_query_scalar::<i64>()
			.fetch_one(&self.pool)
			.await?;

		Ok(u64::try_from(count).unwrap_or_default())
	}

	async fn find_by_id(
		&self,
		collection: &str,
		id: Uuid,
	) -> Result<Option<Document>, StoreError> {
		let body = sqlx::query_scalar::<_, Json<Value>>(
			"SELECT body FROM document WHERE collection = $1 AND id = $2",
		)
		.bind(collection)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(body.and_then(into_document))
	}

	async fn insert(
		&self,
		collection: &str,
		mut document: Document,
	) -> Result<Document, StoreError> {
		let id = Uuid::new_v4();
		document.insert(ID_FIELD.into(), Value::String(id.to_string()));

		sqlx::query("INSERT INTO document (collection, id, body) VALUES ($1, $2, $3)")
			.bind(collection)
			.bind(id)
			.bind(Json(&document))
			.execute(&self.pool)
			.await?;

		Ok(document)
	}

	async fn update_by_id(
		&self,
		collection: &str,
		id: Uuid,
		mut document: Document,
	) -> Result<Option<Document>, StoreError> {
		document.insert(ID_FIELD.into(), Value::String(id.to_string()));

		let body = sqlx::query_scalar::<_, Json<Value>>(
			r#"
				UPDATE document SET body = $3
				WHERE collection = $1 AND id = $2
				RETURNING body
			"#,
		)
		.bind(collection)
		.bind(id)
		.bind(Json(&document))
		.fetch_optional(&self.pool)
		.await?;

		Ok(body.and_then(into_document))
	}

	async fn remove_by_id(
		&self,
		collection: &str,
		id: Uuid,
	) -> Result<Option<Document>, StoreError> {
		let body = sqlx::query_scalar::<_, Json<Value>>(
			"DELETE FROM document WHERE collection = $1 AND id = $2 RETURNING body",
		)
		.bind(collection)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(body.and_then(into_document))
	}
}
