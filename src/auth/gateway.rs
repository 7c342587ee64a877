use std::sync::Arc;

use axum::{
	extract::{Request, State},
	http::{header, HeaderMap},
	middleware::Next,
	response::Response,
};

use super::TokenService;
use crate::extract::Identity;

/// Schemes accepted in the `Authorization` header, matched case-sensitively.
const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Returns the token of an `Authorization: <scheme> <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;

	(SCHEMES.contains(&scheme) && !token.is_empty()).then_some(token)
}

/// Attaches an [`Identity`] to requests carrying a token that resolves.
///
/// Requests without a usable token continue anonymously. Routes that need
/// a caller reject them through the [`Identity`] extractor.
pub async fn authenticate(
	State(tokens): State<Arc<TokenService>>,
	mut request: Request,
	next: Next,
) -> Response {
	if let Some(token) = bearer_token(request.headers()).map(str::to_owned) {
		match tokens.resolve(&token).await {
			Ok(subject) => {
				request.extensions_mut().insert(Identity {
					id: subject.id,
					username: subject.username,
					token,
				});
			}
			Err(error) => tracing::debug!(%error, "continuing without identity"),
		}
	}

	next.run(request).await
}

#[cfg(test)]
mod test {
	use axum::http::HeaderValue;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("Token abc.def.ghi", Some("abc.def.ghi"))]
	#[case("Bearer abc.def.ghi", Some("abc.def.ghi"))]
	#[case("bearer abc.def.ghi", None)]
	#[case("Basic abc.def.ghi", None)]
	#[case("Token ", None)]
	#[case("Token", None)]
	#[case("abc.def.ghi", None)]
	fn test_bearer_token(#[case] value: &str, #[case] expected: Option<&str>) {
		let mut headers = HeaderMap::new();
		headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());

		assert_eq!(bearer_token(&headers), expected);
	}

	#[test]
	fn test_missing_header() {
		assert_eq!(bearer_token(&HeaderMap::new()), None);
	}
}
