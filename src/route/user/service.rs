use std::sync::Arc;

use argon2::{
	password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
	Argon2,
};
use chrono::Utc;
use rand::RngCore;
use uuid::Uuid;
use validator::Validate;

use super::{model, Error, RouteError};
use crate::{
	auth::TokenService,
	error::AppError,
	events::{Change, EventBus},
	extract::Identity,
	store::{Collection, Filter, Query, Sort, StoreError},
};

pub const SERVICE: &str = "users";

const SALT_LENGTH: usize = 16;

/// Registration, credentials and profiles.
pub struct UserService {
	users: Collection<model::User>,
	tokens: Arc<TokenService>,
	events: Arc<EventBus>,
	hasher: Argon2<'static>,
}

impl UserService {
	pub fn new(
		users: Collection<model::User>,
		tokens: Arc<TokenService>,
		events: Arc<EventBus>,
	) -> Self {
		Self {
			users,
			tokens,
			events,
			hasher: Argon2::default(),
		}
	}

	/// Hashes a password with Argon2 under a fresh random salt.
	fn hash_password(&self, password: &str) -> Result<String, Error> {
		let mut salt = [0; SALT_LENGTH];
		rand::thread_rng().fill_bytes(&mut salt);

		let salt = SaltString::encode_b64(&salt)?;

		Ok(self
			.hasher
			.hash_password(password.as_bytes(), &salt)?
			.to_string())
	}

	fn verify_password(&self, password: &str, hash: &str) -> bool {
		PasswordHash::new(hash).is_ok_and(|hash| {
			self.hasher
				.verify_password(password.as_bytes(), &hash)
				.is_ok()
		})
	}

	/// Fails if another user already has the username or email.
	async fn ensure_unique(
		&self,
		username: &str,
		email: &str,
		except: Option<Uuid>,
	) -> Result<(), RouteError> {
		let taken = |user: &Option<model::User>| {
			user.as_ref()
				.is_some_and(|user| Some(user.id) != except)
		};

		if taken(&self.users.find_one(Filter::new().equals("username", username)).await?) {
			return Err(Error::UsernameTaken(username.to_owned()).into());
		}

		if taken(&self.users.find_one(Filter::new().equals("email", email)).await?) {
			return Err(Error::EmailTaken(email.to_owned()).into());
		}

		Ok(())
	}

	/// Users are only addressed by id, so anything else names no user.
	fn parse_id(id: &str) -> Result<Uuid, Error> {
		Uuid::parse_str(id).map_err(|_| Error::UnknownUser(id.to_owned()))
	}

	async fn find(&self, id: Uuid) -> Result<model::User, RouteError> {
		Ok(self
			.users
			.find_by_id(id)
			.await?
			.ok_or_else(|| Error::UnknownUser(id.to_string()))?)
	}

	fn ensure_self(identity: &Identity, id: Uuid) -> Result<(), AppError> {
		if identity.id != id {
			return Err(AppError::Forbidden);
		}

		Ok(())
	}

	pub async fn create(&self, input: model::RegisterInput) -> Result<model::Me, RouteError> {
		self.ensure_unique(&input.username, &input.email, None)
			.await?;

		let now = Utc::now();
		let user = self
			.users
			.insert(&model::User {
				id: Uuid::nil(),
				username: input.username,
				email: input.email,
				password_hash: self.hash_password(&input.password)?,
				image: String::new(),
				bio: None,
				created_at: now,
				updated_at: now,
			})
			.await?;

		let token = self
			.tokens
			.issue(user.id, &user.username)
			.map_err(Error::Token)?;

		tracing::info!(user = %user.id, "registered user");
		self.events.emit(SERVICE, Change::Created, user.id);

		Ok(model::Me::new(user, token))
	}

	pub async fn login(&self, input: model::LoginInput) -> Result<model::Me, RouteError> {
		let user = self
			.users
			.find_one(Filter::new().equals("email", input.email))
			.await?;

		let Some(user) = user else {
			return Err(Error::InvalidCredentials.into());
		};

		if !self.verify_password(&input.password, &user.password_hash) {
			return Err(Error::InvalidCredentials.into());
		}

		let token = self
			.tokens
			.issue(user.id, &user.username)
			.map_err(Error::Token)?;

		Ok(model::Me::new(user, token))
	}

	pub async fn me(&self, identity: &Identity) -> Result<model::Me, RouteError> {
		let user = self.find(identity.id).await?;

		Ok(model::Me::new(user, identity.token.clone()))
	}

	pub async fn get(&self, id: &str) -> Result<model::Profile, RouteError> {
		Ok(self.find(Self::parse_id(id)?).await?.into())
	}

	pub async fn list(&self, query: &model::ListUsersQuery) -> Result<model::ProfilePage, RouteError> {
		let filter = Filter::new().any_of("username", query.username.iter().cloned());
		let page = Query::new(filter)
			.sort(Sort::NEWEST_FIRST)
			.paginate(query.limit, query.offset);

		let (users, users_count) = tokio::try_join!(
			self.users.find(&page),
			self.users.count(&page.filter),
		)?;

		Ok(model::ProfilePage {
			users: users.into_iter().map(Into::into).collect(),
			users_count,
		})
	}

	/// Resolves usernames to ids. Unknown usernames are skipped.
	pub async fn ids_by_username(&self, usernames: &[String]) -> Result<Vec<Uuid>, StoreError> {
		let filter = Filter::new().any_of("username", usernames.iter().cloned());
		let users = self.users.find(&Query::new(filter)).await?;

		Ok(users.into_iter().map(|user| user.id).collect())
	}

	pub async fn update(
		&self,
		identity: &Identity,
		id: &str,
		changes: model::UserChanges,
	) -> Result<model::Me, RouteError> {
		let id = Self::parse_id(id)?;

		Self::ensure_self(identity, id)?;

		let mut user = self.find(id).await?;
		let previous_username = user.username.clone();

		changes.profile.apply(&mut user);
		user.validate()?;

		self.ensure_unique(&user.username, &user.email, Some(user.id))
			.await?;

		if let Some(password) = changes.password {
			user.password_hash = self.hash_password(&password)?;
		}

		user.updated_at = Utc::now();

		let user = self
			.users
			.update(&user)
			.await?
			.ok_or_else(|| Error::UnknownUser(id.to_string()))?;

		// Cached token resolutions carry the username
		if user.username != previous_username {
			self.tokens.forget(user.id);
		}

		self.events.emit(SERVICE, Change::Updated, user.id);

		Ok(model::Me::new(user, identity.token.clone()))
	}

	pub async fn delete(&self, identity: &Identity, id: &str) -> Result<model::Profile, RouteError> {
		let id = Self::parse_id(id)?;

		Self::ensure_self(identity, id)?;

		let user = self
			.users
			.remove(id)
			.await?
			.ok_or_else(|| Error::UnknownUser(id.to_string()))?;

		self.tokens.forget(user.id);

		tracing::info!(user = %user.id, "deleted user");
		self.events.emit(SERVICE, Change::Removed, user.id);

		Ok(user.into())
	}
}
