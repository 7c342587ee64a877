use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Error;
use crate::{cache::TtlCache, config::Config, route::user::model::User, store::Collection};

/// The payload signed into every token.
#[derive(Debug, Deserialize, Serialize)]
struct Claims {
	id: Uuid,
	username: String,
	/// Expiry as a unix timestamp, in seconds.
	exp: i64,
}

/// The user a token resolved to, as currently stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
	pub id: Uuid,
	pub username: String,
}

/// Issues HS256 tokens and resolves them back to users.
///
/// Resolutions are cached per raw token, never past the token's expiry. A
/// cached resolution outlives a change to the user for at most the cache TTL,
/// unless [`TokenService::forget`] is called.
pub struct TokenService {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	lifetime: chrono::Duration,
	users: Collection<User>,
	cache: TtlCache<String, Subject>,
}

impl TokenService {
	pub fn new(
		secret: &[u8],
		lifetime: chrono::Duration,
		cache_ttl: Duration,
		users: Collection<User>,
	) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;

		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
			lifetime,
			users,
			cache: TtlCache::new(cache_ttl),
		}
	}

	pub fn from_config(config: &Config, users: Collection<User>) -> Self {
		Self::new(
			config.jwt_secret.as_bytes(),
			config.token_lifetime,
			config.token_cache_ttl,
			users,
		)
	}

	pub fn issue(&self, id: Uuid, username: &str) -> Result<String, Error> {
		let claims = Claims {
			id,
			username: username.to_owned(),
			exp: (chrono::Utc::now() + self.lifetime).timestamp(),
		};

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
			.map_err(Error::Encode)
	}

	pub async fn resolve(&self, token: &str) -> Result<Subject, Error> {
		if let Some(subject) = self.cache.get(&token.to_owned()) {
			return Ok(subject);
		}

		let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
		let user = self
			.users
			.find_by_id(claims.id)
			.await?
			.ok_or(Error::UnknownSubject(claims.id))?;

		let subject = Subject {
			id: user.id,
			username: user.username,
		};

		let remaining = claims.exp - chrono::Utc::now().timestamp();
		let remaining = Duration::from_secs(u64::try_from(remaining).unwrap_or(0));

		self.cache.insert_for(token.to_owned(), subject.clone(), remaining);

		Ok(subject)
	}

	/// Drops every cached resolution for the user.
	pub fn forget(&self, id: Uuid) {
		self.cache.retain(|_, subject| subject.id != id);
	}

	pub fn retain_fresh(&self) {
		self.cache.retain_fresh();
	}
}
