use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json};

/// Name of the bearer token scheme required by every authenticated operation.
pub const SECURITY_SCHEME_TOKEN: &str = "Token";

pub mod tag {
	pub const USER: &str = "User";
	pub const STORY: &str = "Story";
	pub const GALLERY: &str = "Gallery";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Storyhub Open API")
		.summary("Stories and galleries, written and curated by users")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::USER.into(),
			description: Some("Registration, login and profiles".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::STORY.into(),
			description: Some("Story management".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::GALLERY.into(),
			description: Some("Gallery management".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_TOKEN,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Header,
				name: "Authorization".into(),
				description: Some("A signed token, sent as `Token <jwt>` or `Bearer <jwt>`".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::Message>, _>(|res| {
			res.example(
				error::Message::new("VALIDATION_ERROR")
					.content("Validation failed.")
					.detail("story.title", "must be at least 3 characters long"),
			)
		})
}
