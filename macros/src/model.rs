use darling::{ast, FromDeriveInput, FromField, FromMeta};
use quote::{format_ident, quote};
use syn::Meta;

/// Which input structs to generate. With no arguments, both are generated.
#[derive(Debug, Default, FromMeta)]
struct ModelArgs {
	#[darling(default)]
	create: bool,
	#[darling(default)]
	update: bool,
}

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

fn is_model_attr(attr: &syn::Attribute) -> bool {
	attr.path().is_ident("model")
}

/// Returns true for `#[model(skip)]`, the marker for server-managed fields.
fn is_skipped(attrs: &[syn::Attribute]) -> bool {
	attrs.iter().filter(|attr| is_model_attr(attr)).any(|attr| {
		let Meta::List(ref list) = attr.meta else {
			return false;
		};

		list.parse_args::<syn::Ident>()
			.map(|ident| ident == "skip")
			.unwrap_or(false)
	})
}

pub fn from_input(
	args: proc_macro::TokenStream,
	input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
	let args = match ast::NestedMeta::parse_meta_list(args.into()) {
		Ok(x) => x,
		Err(e) => return e.into_compile_error().into(),
	};

	let args = match ModelArgs::from_list(&args) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let (create, update) = if args.create || args.update {
		(args.create, args.update)
	} else {
		(true, true)
	};

	let mut input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	// The `#[model(..)]` field markers only mean something to this macro.
	if let syn::Data::Struct(ref mut data) = input.data {
		for field in data.fields.iter_mut() {
			field.attrs.retain(|attr| !is_model_attr(attr));
		}
	}

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}", ident);
	let update_ident = format_ident!("Update{}", ident);

	let attrs = &receiver.attrs;

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(&input.ident, "#[model] only supports structs")
			.to_compile_error()
			.into();
	};

	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			if is_skipped(&field.attrs) {
				return None;
			}

			let attrs = field
				.attrs
				.iter()
				.filter(|attr| !is_model_attr(attr))
				.collect::<Vec<_>>();

			Some((attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_struct = create.then(|| {
		let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
			quote! {
				#(#attrs)*
				#vis #ident: #ty,
			}
		});

		quote! {
			#(#attrs)*
			#vis struct #create_ident #generics {
				#(
					#create_fields
				)*
			}
		}
	});

	let update_struct = update.then(|| {
		let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
			quote! {
				#(#attrs)*
				#vis #ident: Option<#ty>,
			}
		});

		let merges = fields.iter().map(|(_, ident, _, _)| {
			quote! {
				if let Some(value) = self.#ident {
					target.#ident = value;
				}
			}
		});

		let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

		quote! {
			#(#attrs)*
			#vis struct #update_ident #generics {
				#(
					#update_fields
				)*
			}

			impl #impl_generics #update_ident #ty_generics #where_clause {
				/// Overwrites every field of `target` that is present in this update.
				#vis fn apply(self, target: &mut #ident #ty_generics) {
					#(
						#merges
					)*
				}
			}
		}
	});

	quote! {
		#input

		#create_struct

		#update_struct
	}
	.into()
}
