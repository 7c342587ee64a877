use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::store::StoreError;

/// A single field-level problem.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Detail<'a> {
	pub field: Cow<'a, str>,
	pub message: Cow<'a, str>,
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A stable, machine-readable error code.
	pub code: Cow<'a, str>,
	/// A human-readable description of the error.
	pub message: Cow<'a, str>,
	/// Field-level details, if the error concerns specific fields.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub details: Vec<Detail<'a>>,
}

impl<'a> Message<'a> {
	pub fn new(code: impl Into<Cow<'a, str>>) -> Self {
		let code = code.into();

		Self {
			message: code.clone(),
			code,
			details: Vec::new(),
		}
	}

	pub fn content(mut self, message: impl Into<Cow<'a, str>>) -> Self {
		self.message = message.into();
		self
	}

	pub fn detail(
		mut self,
		field: impl Into<Cow<'a, str>>,
		message: impl Into<Cow<'a, str>>,
	) -> Self {
		self.details.push(Detail {
			field: field.into(),
			message: message.into(),
		});
		self
	}
}

/// An error specific to one group of routes.
///
/// The message is presented to the client, so it should not contain
/// sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn into_message(self) -> Message<'static>;
}

/// Error type for failures shared by every route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("no identity attached to a request that requires one")]
	Unauthorized,
	#[error("caller does not own the entity")]
	Forbidden,
	#[error("rate limited")]
	RateLimit(GovernorError),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("internal error: {0}")]
	Internal(Cow<'static, str>),
}

/// Flattens nested validation errors into `field.nested` style details.
fn collect_details(errors: &ValidationErrors, prefix: Option<&str>, out: &mut Vec<Detail<'static>>) {
	for (field, kind) in errors.errors() {
		let path = match prefix {
			Some(prefix) => format!("{prefix}.{field}"),
			None => (*field).to_owned(),
		};

		match kind {
			ValidationErrorsKind::Field(errors) => {
				out.extend(errors.iter().map(|error| Detail {
					field: path.clone().into(),
					message: error
						.message
						.clone()
						.unwrap_or_else(|| error.code.clone()),
				}));
			}
			ValidationErrorsKind::Struct(errors) => collect_details(errors, Some(&path), out),
			ValidationErrorsKind::List(errors) => {
				for (index, errors) in errors {
					collect_details(errors, Some(&format!("{path}[{index}]")), out);
				}
			}
		}
	}
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) => {
				StatusCode::UNPROCESSABLE_ENTITY
			}
			Self::Unauthorized => StatusCode::UNAUTHORIZED,
			Self::Forbidden => StatusCode::FORBIDDEN,
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(..) | Self::Store(..) | Self::Internal(..) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	fn into_message(self) -> Message<'static> {
		match self {
			Self::Validation(errors) => {
				let mut message =
					Message::new("VALIDATION_ERROR").content("The request failed validation.");
				collect_details(&errors, None, &mut message.details);
				message
			}
			Self::Json(rejection) => Message::new("INVALID_BODY").content(rejection.body_text()),
			Self::Query(rejection) => Message::new("INVALID_QUERY").content(rejection.body_text()),
			Self::Path(rejection) => Message::new("INVALID_PATH").content(rejection.body_text()),
			Self::Unauthorized => {
				Message::new("NO_RIGHTS").content("This action requires authentication.")
			}
			Self::Forbidden => {
				Message::new("FORBIDDEN").content("You are not the owner of this entity.")
			}
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => {
				Message::new("TOO_MANY_REQUESTS").content("Too many requests, slow down.")
			}
			Self::RateLimit(..) | Self::Store(..) | Self::Internal(..) => {
				Message::new("SERVER_ERROR").content("An internal error occurred.")
			}
		}
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		}

		(status, Json(self.into_message())).into_response()
	}
}

impl OperationOutput for AppError {
	type Inner = Message<'static>;
}

/// Either a route-specific error or one shared by every route.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E> {
	#[error(transparent)]
	Route(E),
	#[error(transparent)]
	App(AppError),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> From<StoreError> for RouteError<E> {
	fn from(error: StoreError) -> Self {
		Self::App(error.into())
	}
}

impl<E> From<ValidationErrors> for RouteError<E> {
	fn from(error: ValidationErrors) -> Self {
		Self::App(error.into())
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(error = %error, "request failed");
				}

				(status, Json(error.into_message())).into_response()
			}
			Self::App(error) => error.into_response(),
		}
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = Message<'static>;
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	#[derive(Validate)]
	struct Inner {
		#[validate(length(min = 3))]
		title: String,
	}

	#[derive(Validate)]
	struct Outer {
		#[validate(nested)]
		story: Inner,
		#[validate(email)]
		email: String,
	}

	#[test]
	fn test_validation_details_are_flattened() {
		let errors = Outer {
			story: Inner { title: "a".into() },
			email: "nope".into(),
		}
		.validate()
		.unwrap_err();

		let message = AppError::Validation(errors).into_message();
		let mut fields = message
			.details
			.iter()
			.map(|detail| detail.field.as_ref())
			.collect::<Vec<_>>();
		fields.sort_unstable();

		assert_eq!(message.code, "VALIDATION_ERROR");
		assert_eq!(fields, ["email", "story.title"]);
	}

	#[test]
	fn test_status_codes() {
		assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
		assert_eq!(
			AppError::Internal("missing caller".into()).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}
}
