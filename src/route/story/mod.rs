use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod service;

pub use service::StoryService;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown story {0}")]
	UnknownStory(String),
	#[error("no author named any of {0}")]
	UnknownAuthor(String),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			post_with(create_story, create_story_docs).get_with(list_stories, list_stories_docs),
		)
		.api_route(
			"/:id",
			get_with(get_story, get_story_docs)
				.patch_with(update_story, update_story_docs)
				.delete_with(delete_story, delete_story_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownStory(..) | Self::UnknownAuthor(..) => StatusCode::NOT_FOUND,
		}
	}

	fn into_message(self) -> error::Message<'static> {
		match self {
			Self::UnknownStory(..) => {
				error::Message::new("STORY_NOT_FOUND").content("Story not found.")
			}
			Self::UnknownAuthor(names) => error::Message::new("AUTHOR_NOT_FOUND")
				.content("No author matches the filter.")
				.detail("author", names),
		}
	}
}

#[cfg(test)]
mod test {
	use regex::Regex;

	use crate::test::*;

	async fn create(app: &TestServer, token: &HeaderValue, story: Value) -> Value {
		let response = app
			.post("/stories")
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "story": story }))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		response.json::<Value>()["story"].clone()
	}

	#[tokio::test]
	async fn test_story_lifecycle() {
		let app = app();
		let ana = register(&app, "ana").await;
		let bob = register(&app, "bob").await;
		let ana_token = token_header(ana["token"].as_str().unwrap());
		let bob_token = token_header(bob["token"].as_str().unwrap());

		let story = create(
			&app,
			&ana_token,
			json!({ "title": "My Trip", "author": bob["id"], "slug": "chosen" }),
		)
		.await;
		let slug = story["slug"].as_str().unwrap();

		assert!(Regex::new("^my-trip-[0-9a-z]{6}$").unwrap().is_match(slug));
		assert_eq!(story["author"]["id"], ana["id"]);
		assert_eq!(story["author"]["username"], "ana");

		let response = app
			.patch(&format!("/stories/{slug}"))
			.add_header(header::AUTHORIZATION, bob_token.clone())
			.json(&json!({ "story": { "title": "Stolen" } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
		assert_eq!(response.json::<Value>()["code"], "FORBIDDEN");

		let response = app
			.delete(&format!("/stories/{slug}"))
			.add_header(header::AUTHORIZATION, bob_token.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

		let response = app
			.delete(&format!("/stories/{slug}"))
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["story"]["slug"], slug);

		let response = app
			.get(&format!("/stories/{slug}"))
			.add_header(header::AUTHORIZATION, ana_token)
			.await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(response.json::<Value>()["code"], "STORY_NOT_FOUND");
	}

	#[tokio::test]
	async fn test_get_by_slug_matches_get_by_id() {
		let app = app();
		let ana = register(&app, "ana").await;
		let token = token_header(ana["token"].as_str().unwrap());
		let story = create(&app, &token, json!({ "title": "My Trip" })).await;

		let by_slug = app
			.get(&format!("/stories/{}", story["slug"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token.clone())
			.await
			.json::<Value>();
		let by_id = app
			.get(&format!("/stories/{}", story["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token)
			.await
			.json::<Value>();

		assert_eq!(by_slug, by_id);
		assert_eq!(by_slug["story"], story);
	}

	#[tokio::test]
	async fn test_update_merges_and_sanitizes() {
		let app = app();
		let ana = register(&app, "ana").await;
		let token = token_header(ana["token"].as_str().unwrap());
		let story = create(
			&app,
			&token,
			json!({ "title": "My Trip", "info": "short", "body": "<p onclick=\"x()\">hi</p><script>bad()</script>" }),
		)
		.await;

		assert_eq!(story["body"], "<p>hi</p>");

		// Cached before the update, must not be served after it
		app.get(&format!("/stories/{}", story["slug"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token.clone())
			.await;

		let response = app
			.patch(&format!("/stories/{}", story["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token.clone())
			.json(&json!({ "story": { "body": "<h1 style=\"x\">Day 1</h1>", "tagList": ["travel"] } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let response = app
			.get(&format!("/stories/{}", story["slug"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token.clone())
			.await;
		let updated = response.json::<Value>()["story"].clone();

		assert_eq!(updated["title"], "My Trip");
		assert_eq!(updated["info"], "short");
		assert_eq!(updated["body"], "<h1>Day 1</h1>");
		assert_eq!(updated["tagList"], json!(["travel"]));
		assert_eq!(updated["slug"], story["slug"]);

		let response = app
			.patch(&format!("/stories/{}", story["id"].as_str().unwrap()))
			.add_header(header::AUTHORIZATION, token)
			.json(&json!({ "story": { "title": "no" } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(response.json::<Value>()["details"][0]["field"], "story.title");
	}

	#[tokio::test]
	async fn test_list_filters_and_count() {
		let app = app();
		let ana = register(&app, "ana").await;
		let bob = register(&app, "bob").await;
		let ana_token = token_header(ana["token"].as_str().unwrap());
		let bob_token = token_header(bob["token"].as_str().unwrap());

		create(&app, &ana_token, json!({ "title": "First", "tagList": ["t1", "t2"] })).await;
		create(&app, &ana_token, json!({ "title": "Second", "tagList": ["t2"] })).await;
		create(&app, &bob_token, json!({ "title": "Third", "tagList": ["t1"] })).await;

		let response = app
			.get("/stories")
			.add_query_param("tag", "t1")
			.add_query_param("limit", "1")
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;
		let body = response.json::<Value>();

		assert_eq!(body["storiesCount"], 2);
		assert_eq!(body["stories"].as_array().unwrap().len(), 1);
		assert_eq!(body["stories"][0]["title"], "Third");

		let response = app
			.get("/stories")
			.add_query_param("author", "ana")
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;
		let body = response.json::<Value>();

		assert_eq!(body["storiesCount"], 2);
		assert_eq!(body["stories"][0]["title"], "Second");

		// A story created after the first list must show up in the next one
		create(&app, &ana_token, json!({ "title": "Fourth", "tagList": ["t1"] })).await;

		let response = app
			.get("/stories")
			.add_query_param("tag", "t1")
			.add_query_param("limit", "1")
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;

		assert_eq!(response.json::<Value>()["storiesCount"], 3);

		let response = app
			.get("/stories")
			.add_query_param("author", "nobody")
			.add_header(header::AUTHORIZATION, ana_token.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
		assert_eq!(response.json::<Value>()["code"], "AUTHOR_NOT_FOUND");

		let response = app
			.get("/stories")
			.add_query_param("limit", "0")
			.add_header(header::AUTHORIZATION, ana_token)
			.await;

		assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
	}

	#[tokio::test]
	async fn test_requires_identity() {
		let app = app();

		let response = app
			.post("/stories")
			.json(&json!({ "story": { "title": "My Trip" } }))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(response.json::<Value>()["code"], "NO_RIGHTS");

		let response = app.get("/stories").await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}
}
