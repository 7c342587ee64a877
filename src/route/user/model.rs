pub use crate::route::model::{comma_list, default_limit, KeyInput};

use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::store::Entity;

/// A registered account, as stored.
#[model(update)]
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// The unique identifier of the user.
	#[model(skip)]
	pub id: Uuid,
	/// The name displayed to other users.
	#[validate(length(min = 3))]
	pub username: String,
	/// The address used to log in.
	#[validate(email)]
	pub email: String,
	/// Argon2 hash of the password, in PHC string format.
	#[model(skip)]
	pub password_hash: String,
	/// Avatar url.
	#[serde(default)]
	pub image: String,
	#[serde(default)]
	pub bio: Option<String>,
	#[model(skip)]
	pub created_at: DateTime<Utc>,
	#[model(skip)]
	pub updated_at: DateTime<Utc>,
}

impl Entity for User {
	const COLLECTION: &'static str = "users";

	fn id(&self) -> Uuid {
		self.id
	}
}

/// The public view of a user, embedded as the author of content.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
pub struct Profile {
	pub id: Uuid,
	pub username: String,
	pub image: String,
	pub bio: Option<String>,
}

impl From<User> for Profile {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			username: user.username,
			image: user.image,
			bio: user.bio,
		}
	}
}

/// The authenticated user, as seen by themselves.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Me {
	pub id: Uuid,
	pub username: String,
	pub email: String,
	pub image: String,
	pub bio: Option<String>,
	/// A token to send as `Authorization: Token <token>`.
	pub token: String,
}

impl Me {
	pub fn new(user: User, token: String) -> Self {
		Self {
			id: user.id,
			username: user.username,
			email: user.email,
			image: user.image,
			bio: user.bio,
			token,
		}
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MeEnvelope {
	pub user: Me,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ProfileEnvelope {
	pub user: Profile,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePage {
	pub users: Vec<Profile>,
	pub users_count: u64,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct RegisterInput {
	/// The name displayed to other users.
	#[validate(length(min = 3))]
	pub username: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 6, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

/// Profile changes, validated against the merged user.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct UserChanges {
	#[serde(flatten)]
	pub profile: UpdateUser,
	/// A new password.
	#[validate(length(min = 6, max = 128))]
	pub password: Option<String>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UpdateUserInput {
	#[validate(nested)]
	pub user: UserChanges,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ListUsersQuery {
	/// Comma-separated usernames.
	#[serde(default, deserialize_with = "comma_list")]
	#[schemars(with = "Option<String>")]
	pub username: Vec<String>,
	#[serde(default = "default_limit")]
	#[validate(range(min = 1, max = 100))]
	pub limit: u64,
	#[serde(default)]
	pub offset: u64,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	fn register(username: &str) -> RegisterInput {
		RegisterInput {
			username: username.into(),
			email: "ana@x.com".into(),
			password: "secret1".into(),
		}
	}

	#[test]
	fn test_username_rules() {
		assert!(register("ana").validate().is_ok());
		assert!(register("Ana Maria").validate().is_ok());
		assert!(register(&"a".repeat(64)).validate().is_ok());
		assert!(register("an").validate().is_err());
		assert!(register("").validate().is_err());
	}

	#[test]
	fn test_update_applies_present_fields() {
		let now = Utc::now();
		let mut user = User {
			id: Uuid::new_v4(),
			username: "ana".into(),
			email: "ana@x.com".into(),
			password_hash: "hash".into(),
			image: String::new(),
			bio: None,
			created_at: now,
			updated_at: now,
		};

		let changes: UserChanges = serde_json::from_value(serde_json::json!({
			"bio": "traveller",
			"password": "another1",
		}))
		.unwrap();

		changes.profile.apply(&mut user);

		assert_eq!(user.bio.as_deref(), Some("traveller"));
		assert_eq!(user.username, "ana");
		assert_eq!(user.password_hash, "hash");
	}
}
