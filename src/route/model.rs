use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_LIMIT: u64 = 20;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
pub fn default_limit() -> u64 {
	DEFAULT_LIMIT
}

/// Deserializes `a,b,c` into its non-empty, trimmed items.
pub fn comma_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<String>::deserialize(deserializer)?;

	Ok(value
		.as_deref()
		.unwrap_or_default()
		.split(',')
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(str::to_owned)
		.collect())
}

/// Deserializes `a,b,c` into ids, rejecting anything that is not one.
pub fn comma_ids<'de, D>(deserializer: D) -> Result<Vec<Uuid>, D::Error>
where
	D: Deserializer<'de>,
{
	comma_list(deserializer)?
		.iter()
		.map(|item| Uuid::parse_str(item).map_err(serde::de::Error::custom))
		.collect()
}

/// A path parameter holding either a slug or an id.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct KeyInput {
	/// The slug of the entity, or its id.
	#[validate(length(min = 1))]
	pub id: String,
}

#[cfg(test)]
mod test {
	use serde::Deserialize;

	use super::*;

	#[derive(Deserialize)]
	struct Filters {
		#[serde(default, deserialize_with = "comma_list")]
		tag: Vec<String>,
		#[serde(default, deserialize_with = "comma_ids")]
		id: Vec<Uuid>,
	}

	#[test]
	fn test_comma_list() {
		let filters: Filters = serde_json::from_value(serde_json::json!({
			"tag": "travel, food,,",
		}))
		.unwrap();

		assert_eq!(filters.tag, ["travel", "food"]);
		assert!(filters.id.is_empty());
	}

	#[test]
	fn test_comma_ids() {
		let id = Uuid::new_v4();
		let filters: Filters = serde_json::from_value(serde_json::json!({
			"id": format!("{id},{id}"),
		}))
		.unwrap();

		assert_eq!(filters.id, [id, id]);

		let invalid = serde_json::from_value::<Filters>(serde_json::json!({ "id": "nope" }));

		assert!(invalid.is_err());
	}
}
