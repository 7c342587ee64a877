use std::sync::Arc;

use axum::extract::State;
use macros::route;

use crate::{
	extract::{Created, Identity, Json, Path, Query},
	openapi::tag,
};

use super::{model, RouteError, UserService};

/// Register
/// Creates an account, returning it with a fresh token.
#[route(tag = tag::USER)]
pub async fn create_user(
	State(users): State<Arc<UserService>>,
	Json(input): Json<model::RegisterInput>,
) -> Result<Created<model::MeEnvelope>, RouteError> {
	let user = users.create(input).await?;

	Ok(Created(model::MeEnvelope { user }))
}

/// Log in
/// Exchanges an email and password for a fresh token.
#[route(tag = tag::USER)]
pub async fn login(
	State(users): State<Arc<UserService>>,
	Json(input): Json<model::LoginInput>,
) -> Result<Json<model::MeEnvelope>, RouteError> {
	let user = users.login(input).await?;

	Ok(Json(model::MeEnvelope { user }))
}

/// Get own account
/// Returns the authenticated user, including the token used for the request.
#[route(tag = tag::USER)]
pub async fn get_me(
	State(users): State<Arc<UserService>>,
	identity: Identity,
) -> Result<Json<model::MeEnvelope>, RouteError> {
	let user = users.me(&identity).await?;

	Ok(Json(model::MeEnvelope { user }))
}

/// Get user
/// Returns the public profile of a user.
#[route(tag = tag::USER)]
pub async fn get_user(
	State(users): State<Arc<UserService>>,
	_identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::ProfileEnvelope>, RouteError> {
	let user = users.get(&path.id).await?;

	Ok(Json(model::ProfileEnvelope { user }))
}

/// List users
/// Returns a page of public profiles, newest first.
#[route(tag = tag::USER)]
pub async fn list_users(
	State(users): State<Arc<UserService>>,
	_identity: Identity,
	Query(query): Query<model::ListUsersQuery>,
) -> Result<Json<model::ProfilePage>, RouteError> {
	Ok(Json(users.list(&query).await?))
}

/// Update user
/// Updates the authenticated user. Only your own account can be updated.
#[route(tag = tag::USER)]
pub async fn update_user(
	State(users): State<Arc<UserService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
	Json(input): Json<model::UpdateUserInput>,
) -> Result<Json<model::MeEnvelope>, RouteError> {
	let user = users.update(&identity, &path.id, input.user).await?;

	Ok(Json(model::MeEnvelope { user }))
}

/// Delete user
/// Deletes the authenticated user. Their content is kept and shows a missing author.
#[route(tag = tag::USER)]
pub async fn delete_user(
	State(users): State<Arc<UserService>>,
	identity: Identity,
	Path(path): Path<model::KeyInput>,
) -> Result<Json<model::ProfileEnvelope>, RouteError> {
	let user = users.delete(&identity, &path.id).await?;

	Ok(Json(model::ProfileEnvelope { user }))
}
