use std::{
	net::{IpAddr, Ipv4Addr},
	str::FromStr,
	time::Duration,
};

/// Only meant for local development, a warning is logged when it is used in a release build.
pub const DEFAULT_JWT_SECRET: &str = "jwt-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid value {value:?} for {key}")]
	Invalid { key: &'static str, value: String },
}

/// Process-wide settings, loaded once at startup and handed to the services
/// that need them. Nothing reads the environment after this is built.
#[derive(Clone, Debug)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	/// Secret used to sign and verify bearer tokens.
	pub jwt_secret: String,
	/// How long an issued token stays valid.
	pub token_lifetime: chrono::Duration,
	/// How long a resolved token is remembered before hitting the store again.
	pub token_cache_ttl: Duration,
	/// How long a cached `get`/`list` response lives if nothing invalidates it first.
	pub response_cache_ttl: Duration,
	/// Postgres connection string. Without one, documents are kept in memory.
	pub database_url: Option<String>,
	pub rate_limit: bool,
	/// OTLP collector endpoint. Without one, traces are only written to stdout.
	pub otlp_endpoint: Option<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: 3000,
			jwt_secret: DEFAULT_JWT_SECRET.into(),
			token_lifetime: chrono::Duration::days(60),
			token_cache_ttl: Duration::from_secs(60 * 60),
			response_cache_ttl: Duration::from_secs(10 * 60),
			database_url: None,
			rate_limit: true,
			otlp_endpoint: None,
		}
	}
}

impl Config {
	/// Builds the configuration from environment variables, falling back to
	/// [`Config::default`] for anything unset.
	pub fn from_env() -> Result<Self, ConfigError> {
		let defaults = Self::default();

		let token_lifetime_days = parse("TOKEN_LIFETIME_DAYS", defaults.token_lifetime.num_days())?;
		let token_cache_ttl = parse("TOKEN_CACHE_TTL_SECS", defaults.token_cache_ttl.as_secs())?;
		let response_cache_ttl =
			parse("RESPONSE_CACHE_TTL_SECS", defaults.response_cache_ttl.as_secs())?;

		Ok(Self {
			host: parse("HOST", defaults.host)?,
			port: parse("PORT", defaults.port)?,
			jwt_secret: var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
			token_lifetime: chrono::Duration::days(token_lifetime_days),
			token_cache_ttl: Duration::from_secs(token_cache_ttl),
			response_cache_ttl: Duration::from_secs(response_cache_ttl),
			database_url: var("DATABASE_URL"),
			rate_limit: parse("RATE_LIMIT", defaults.rate_limit)?,
			otlp_endpoint: var("OTLP_ENDPOINT"),
		})
	}

	pub fn uses_default_secret(&self) -> bool {
		self.jwt_secret == DEFAULT_JWT_SECRET
	}
}

/// Reads a variable, treating an empty value the same as an unset one.
fn var(key: &'static str) -> Option<String> {
	std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
	let Some(value) = var(key) else {
		return Ok(default);
	};

	value
		.parse()
		.map_err(|_| ConfigError::Invalid { key, value })
}
