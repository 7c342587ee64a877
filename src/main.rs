#![warn(clippy::pedantic)]

mod auth;
mod cache;
mod config;
mod content;
mod error;
mod events;
mod extract;
mod openapi;
mod populate;
mod ratelimit;
mod route;
mod store;
mod trace;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{
	extract::{FromRef, Request},
	middleware, Extension, Router, ServiceExt,
};
use tower::Layer;
use tower_http::{
	compression::CompressionLayer, normalize_path::NormalizePathLayer, trace::TraceLayer,
};

use crate::{
	auth::TokenService,
	config::Config,
	events::EventBus,
	populate::Populator,
	route::{gallery::GalleryService, story::StoryService, user::UserService},
	store::{Collection, DocumentStore, MemoryStore, PgStore},
};

/// How often expired cache entries are swept.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The shared application state.
///
/// Every service is built once at startup and shared behind an [`Arc`].
/// Handlers extract the one they need with `State<Arc<...>>`.
#[derive(Clone, FromRef)]
pub struct AppState {
	pub config: Arc<Config>,
	pub tokens: Arc<TokenService>,
	pub users: Arc<UserService>,
	pub stories: Arc<StoryService>,
	pub galleries: Arc<GalleryService>,
}

impl AppState {
	/// Wires every service over the given store. Services that embed
	/// entities of other services subscribe their caches to a shared
	/// [`EventBus`].
	pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
		let events = Arc::new(EventBus::default());
		let user_collection = Collection::new(Arc::clone(&store));
		let story_collection = Collection::new(Arc::clone(&store));

		let tokens = Arc::new(TokenService::from_config(&config, user_collection.clone()));
		let populator = Populator::new(user_collection.clone(), story_collection.clone());

		let users = Arc::new(UserService::new(
			user_collection,
			Arc::clone(&tokens),
			Arc::clone(&events),
		));
		let stories = Arc::new(StoryService::new(
			story_collection,
			Arc::clone(&users),
			populator.clone(),
			Arc::clone(&events),
			config.response_cache_ttl,
		));
		let galleries = Arc::new(GalleryService::new(
			Collection::new(store),
			Arc::clone(&users),
			Arc::clone(&stories),
			populator,
			events,
			config.response_cache_ttl,
		));

		Self {
			config: Arc::new(config),
			tokens,
			users,
			stories,
			galleries,
		}
	}

	/// Drops expired entries from every cache.
	pub fn retain_fresh(&self) {
		self.tokens.retain_fresh();
		self.stories.retain_fresh();
		self.galleries.retain_fresh();
	}
}

/// Builds the application router, without rate limiting.
pub fn app(state: AppState) -> Router {
	aide::gen::on_error(|error| tracing::warn!(%error, "failed to generate api docs"));
	aide::gen::extract_schemas(true);
	aide::gen::infer_responses(true);

	let mut api = OpenApi::default();

	ApiRouter::new()
		.nest("/users", route::user::routes())
		.nest("/stories", route::story::routes())
		.nest("/galleries", route::gallery::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(middleware::from_fn_with_state(
			Arc::clone(&state.tokens),
			auth::gateway::authenticate,
		))
		.layer(Extension(Arc::new(api)))
		.layer(CompressionLayer::new())
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = Config::from_env().expect("invalid configuration");

	let _guard = match &config.otlp_endpoint {
		Some(endpoint) => Some(
			trace::init_tracing_subscriber(endpoint).expect("failed to initialize telemetry"),
		),
		None => {
			trace::init_fmt();
			None
		}
	};

	if !cfg!(debug_assertions) && config.uses_default_secret() {
		tracing::warn!("JWT_SECRET is not set, tokens are signed with the development secret");
	}

	let store: Arc<dyn DocumentStore> = match &config.database_url {
		Some(url) => Arc::new(
			PgStore::connect(url)
				.await
				.expect("failed to connect to database"),
		),
		None => {
			tracing::warn!("DATABASE_URL is not set, documents are kept in memory");
			Arc::new(MemoryStore::default())
		}
	};

	let address = SocketAddr::from((config.host, config.port));
	let rate_limit = config.rate_limit;
	let state = AppState::new(config, store);

	let sweeper = state.clone();
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);

		loop {
			interval.tick().await;
			sweeper.retain_fresh();
		}
	});

	let mut app = app(state);

	if rate_limit {
		let limits = ratelimit::default();

		ratelimit::cleanup_old_limits(&[&limits]);
		app = app.layer(tower_governor::GovernorLayer { config: limits });
	}

	// Wraps the router so paths are normalized before routing
	let app = NormalizePathLayer::trim_trailing_slash().layer(app);

	let listener = tokio::net::TcpListener::bind(address)
		.await
		.expect("failed to bind to address");

	tracing::info!(%address, "listening");

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await
	.expect("server error");
}
