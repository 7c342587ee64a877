mod model;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the summary, the rest the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates the client input structs for a stored entity `X`: `CreateX` and `UpdateX`.
///
/// Fields marked `#[model(skip)]` are managed by the server and left out of both.
/// All other fields are copied verbatim (including attributes), wrapped in `Option`
/// for the update struct, which also gets an `apply` method merging it into an `X`.
///
/// Use `#[model(create)]` or `#[model(update)]` to generate only one of them.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
	model::from_input(args, input)
}
