use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{auth, error, AppState};

pub mod model;
pub mod route;
pub mod service;

pub use service::UserService;

/// An error that can occur while managing accounts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("username {0} already taken")]
	UsernameTaken(String),
	#[error("email {0} already taken")]
	EmailTaken(String),
	#[error("invalid email or password")]
	InvalidCredentials,
	#[error("unknown user {0}")]
	UnknownUser(String),
	#[error("password hashing failed: {0}")]
	Hash(#[from] argon2::password_hash::Error),
	#[error("token error: {0}")]
	Token(auth::Error),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			post_with(create_user, create_user_docs).get_with(list_users, list_users_docs),
		)
		.api_route("/login", post_with(login, login_docs))
		.api_route("/me", get_with(get_me, get_me_docs))
		.api_route(
			"/:id",
			get_with(get_user, get_user_docs)
				.patch_with(update_user, update_user_docs)
				.delete_with(delete_user, delete_user_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UsernameTaken(..) | Self::EmailTaken(..) | Self::InvalidCredentials => {
				StatusCode::UNPROCESSABLE_ENTITY
			}
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
			Self::Hash(..) | Self::Token(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_message(self) -> error::Message<'static> {
		match self {
			Self::UsernameTaken(..) => error::Message::new("USERNAME_TAKEN")
				.content("Username is already taken.")
				.detail("username", "is already taken"),
			Self::EmailTaken(..) => error::Message::new("EMAIL_TAKEN")
				.content("Email is already registered.")
				.detail("email", "is already registered"),
			Self::InvalidCredentials => {
				error::Message::new("INVALID_CREDENTIALS").content("Email or password is invalid.")
			}
			Self::UnknownUser(..) => {
				error::Message::new("USER_NOT_FOUND").content("User not found.")
			}
			Self::Hash(..) | Self::Token(..) => {
				error::Message::new("SERVER_ERROR").content("An internal error occurred.")
			}
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use super::model;
	use crate::{config::Config, extract::Identity, store::MemoryStore, test::*, AppState};

	#[tokio::test]
	async fn test_signup_flow() {
		let app = app();

		let response = app
			.post("/users")
			.json(&json!({
				"username": "ana",
				"email": "ana@x.com",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		let user = response.json::<Value>()["user"].clone();

		assert_eq!(user["username"], "ana");
		assert!(user["token"].is_string());
		assert!(user.get("password").is_none());
		assert!(user.get("passwordHash").is_none());

		let response = app
			.post("/users/login")
			.json(&json!({
				"email": "ana@x.com",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let login = response.json::<Value>()["user"].clone();

		assert_eq!(login["id"], user["id"]);

		let response = app
			.get("/users/me")
			.add_header(header::AUTHORIZATION, token_header(login["token"].as_str().unwrap()))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["user"]["email"], "ana@x.com");
	}

	#[tokio::test]
	async fn test_duplicate_username_and_email() {
		let app = app();
		register(&app, "ana").await;

		let response = app
			.post("/users")
			.json(&json!({
				"username": "ana",
				"email": "other@x.com",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

		let body = response.json::<Value>();

		assert_eq!(body["code"], "USERNAME_TAKEN");
		assert_eq!(body["details"][0]["field"], "username");

		let response = app
			.post("/users")
			.json(&json!({
				"username": "other",
				"email": "ana@x.com",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.json::<Value>()["code"], "EMAIL_TAKEN");
	}

	#[tokio::test]
	async fn test_wrong_password() {
		let app = app();
		register(&app, "ana").await;

		let response = app
			.post("/users/login")
			.json(&json!({
				"email": "ana@x.com",
				"password": "wrong-password",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(response.json::<Value>()["code"], "INVALID_CREDENTIALS");
	}

	#[tokio::test]
	async fn test_invalid_input_details() {
		let app = app();

		let response = app
			.post("/users")
			.json(&json!({
				"username": "ab",
				"email": "not-an-email",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

		let body = response.json::<Value>();
		let mut fields = body["details"]
			.as_array()
			.unwrap()
			.iter()
			.map(|detail| detail["field"].as_str().unwrap().to_owned())
			.collect::<Vec<_>>();
		fields.sort_unstable();
		fields.dedup();

		assert_eq!(body["code"], "VALIDATION_ERROR");
		assert_eq!(fields, ["email", "username"]);
	}

	#[tokio::test]
	async fn test_anonymous_and_bad_tokens_are_rejected() {
		let app = app();

		let response = app.get("/users/me").await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(response.json::<Value>()["code"], "NO_RIGHTS");

		let response = app
			.get("/users/me")
			.add_header(header::AUTHORIZATION, token_header("not.a.token"))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

		let user = register(&app, "ana").await;
		let response = app
			.get("/users/me")
			.add_header(
				header::AUTHORIZATION,
				HeaderValue::from_str(&format!("Basic {}", user["token"].as_str().unwrap()))
					.unwrap(),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_update_and_delete_self_only() {
		let app = app();
		let ana = register(&app, "ana").await;
		let bob = register(&app, "bob").await;
		let ana_token = token_header(ana["token"].as_str().unwrap());
		let bob_token = token_header(bob["token"].as_str().unwrap());

		let response = app
			.patch(&format!("/users/{}", ana["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, bob_token.clone())
			.json(&json!({ "user": { "bio": "hijacked" } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

		let response = app
			.patch(&format!("/users/{}", ana["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.json(&json!({ "user": { "username": "bob" } }))
			.await;

		assert_eq!(response.json::<Value>()["code"], "USERNAME_TAKEN");

		let response = app
			.patch(&format!("/users/{}", ana["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.json(&json!({ "user": { "bio": "traveller", "password": "secret2" } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["user"]["bio"], "traveller");

		let response = app
			.post("/users/login")
			.json(&json!({ "email": "ana@x.com", "password": "secret2" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let response = app
			.delete(&format!("/users/{}", ana["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		// The cached resolution of the token is dropped with the user
		let response = app
			.get("/users/me")
			.add_header(header::AUTHORIZATION, ana_token)
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_list_users() {
		let app = app();
		let ana = register(&app, "ana").await;
		register(&app, "bob").await;
		register(&app, "cid").await;

		let response = app
			.get("/users")
			.add_query_param("username", "ana,cid,nobody")
			.add_header(header::AUTHORIZATION, token_header(ana["token"].as_str().unwrap()))
			.await;

		let body = response.json::<Value>();

		assert_eq!(body["usersCount"], 2);
		assert_eq!(body["users"][0]["username"], "cid");
		assert!(body["users"][0].get("email").is_none());
	}

	#[tokio::test]
	async fn test_username_with_space_registers() {
		let app = app();

		let response = app
			.post("/users")
			.json(&json!({
				"username": "Ana Maria",
				"email": "am@x.com",
				"password": "secret1",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);
		assert_eq!(response.json::<Value>()["user"]["username"], "Ana Maria");
	}

	#[tokio::test]
	async fn test_unknown_user_is_not_found() {
		let app = app();
		let ana = register(&app, "ana").await;
		let token = token_header(ana["token"].as_str().unwrap());

		for id in ["not-a-uuid", "00000000-0000-4000-8000-000000000000"] {
			let response = app
				.get(&format!("/users/{id}"))
				.add_header(header::AUTHORIZATION, token.clone())
				.await;

			assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
			assert_eq!(response.json::<Value>()["code"], "USER_NOT_FOUND");
		}
	}

	#[tokio::test]
	async fn test_rename_refreshes_token_subject() {
		let state = AppState::new(Config::default(), Arc::new(MemoryStore::default()));
		let me = state
			.users
			.create(model::RegisterInput {
				username: "ana".into(),
				email: "ana@x.com".into(),
				password: "secret1".into(),
			})
			.await
			.unwrap();

		let subject = state.tokens.resolve(&me.token).await.unwrap();
		let identity = Identity {
			id: me.id,
			username: subject.username,
			token: me.token.clone(),
		};

		let changes: model::UserChanges =
			serde_json::from_value(json!({ "username": "Ana Maria" })).unwrap();

		state
			.users
			.update(&identity, &me.id.to_string(), changes)
			.await
			.unwrap();

		let subject = state.tokens.resolve(&me.token).await.unwrap();

		assert_eq!(subject.username, "Ana Maria");
	}
}
