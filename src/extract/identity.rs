use aide::{gen::GenContext, openapi::Operation, OperationInput};
use axum::{extract::FromRequestParts, http::request};
use uuid::Uuid;

use crate::{error::AppError, openapi::SECURITY_SCHEME_TOKEN};

/// The caller attached to a request by the authentication middleware.
///
/// Declaring it in a handler makes the route require authentication:
/// anonymous requests are rejected with `401 NO_RIGHTS` before the
/// handler runs.
///
/// ```rust
/// async fn route(identity: Identity) {
///   println!("{}", identity.username);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Identity {
	pub id: Uuid,
	pub username: String,
	/// The raw token the request was authenticated with.
	pub token: String,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		_state: &S,
	) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<Self>()
			.cloned()
			.ok_or(AppError::Unauthorized)
	}
}

impl OperationInput for Identity {
	/// Adds a token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut GenContext, operation: &mut Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_TOKEN.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}
