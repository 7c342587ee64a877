//! Helpers shared by the story and gallery services.
use once_cell::sync::Lazy;
use rand::Rng;
use regex::{Captures, Regex};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

use crate::{
	error::AppError,
	extract::Identity,
	store::{Collection, Entity, Filter, StoreError},
};

/// Tags kept by [`sanitize`]. Everything else is unwrapped.
const ALLOWED_TAGS: [&str; 8] = ["b", "i", "strong", "h1", "h2", "h3", "p", "br"];

/// Tags removed together with everything inside them.
const DROPPED_TAGS: [&str; 5] = ["script", "style", "textarea", "option", "noscript"];

const SLUG_SUFFIX_LENGTH: u32 = 6;

/// Fresh slugs tried before giving up on a title.
const SLUG_ATTEMPTS: usize = 8;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?(-->|$)").expect("valid regex"));

static DROPPED: Lazy<Vec<Regex>> = Lazy::new(|| {
	DROPPED_TAGS
		.iter()
		.map(|tag| {
			Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?(</{tag}\s*>|$)")).expect("valid regex")
		})
		.collect()
});

static TAG: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"<\s*(/?)\s*([A-Za-z][A-Za-z0-9]*)\b[^<>]*>").expect("valid regex")
});

/// Lowercases `title` and joins its ASCII letters and digits with dashes.
///
/// Accents are stripped first, so `Café Olé` becomes `cafe-ole`.
pub fn slugify(title: &str) -> String {
	let mut slug = String::with_capacity(title.len());

	for c in title.nfkd().filter(|c| !is_combining_mark(*c)) {
		if c.is_ascii_alphanumeric() {
			slug.push(c.to_ascii_lowercase());
		} else if !slug.is_empty() && !slug.ends_with('-') {
			slug.push('-');
		}
	}

	if slug.ends_with('-') {
		slug.pop();
	}

	slug
}

/// Six base36 characters, zero-padded.
fn slug_suffix() -> String {
	let mut value = rand::thread_rng().gen_range(0..36u32.pow(SLUG_SUFFIX_LENGTH));
	let mut suffix = vec!['0'; SLUG_SUFFIX_LENGTH as usize];

	for slot in suffix.iter_mut().rev() {
		*slot = char::from_digit(value % 36, 36).unwrap_or('0');
		value /= 36;
	}

	suffix.into_iter().collect()
}

/// Derives a fresh slug for an entity titled `title`.
pub fn slug(title: &str) -> String {
	let base = slugify(title);
	let suffix = slug_suffix();

	if base.is_empty() {
		suffix
	} else {
		format!("{base}-{suffix}")
	}
}

/// Derives a slug for `title` that no entity in `collection` carries yet.
pub async fn unique_slug<T: Entity>(
	collection: &Collection<T>,
	title: &str,
) -> Result<String, AppError> {
	first_free_slug(collection, std::iter::repeat_with(|| slug(title))).await
}

async fn first_free_slug<T: Entity>(
	collection: &Collection<T>,
	candidates: impl IntoIterator<Item = String>,
) -> Result<String, AppError> {
	for candidate in candidates.into_iter().take(SLUG_ATTEMPTS) {
		let taken = collection
			.find_one(Filter::new().equals("slug", candidate.as_str()))
			.await?;

		if taken.is_none() {
			return Ok(candidate);
		}

		tracing::debug!(slug = %candidate, collection = T::COLLECTION, "slug taken");
	}

	Err(AppError::Internal(
		format!("no free slug after {SLUG_ATTEMPTS} attempts").into(),
	))
}

fn escape_text(text: &str, out: &mut String) {
	for c in text.chars() {
		match c {
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			c => out.push(c),
		}
	}
}

fn rewrite_tag(tag: &Captures<'_>) -> Option<String> {
	let name = tag[2].to_ascii_lowercase();

	if !ALLOWED_TAGS.contains(&name.as_str()) {
		return None;
	}

	Some(match (&tag[1], name.as_str()) {
		(_, "br") => "<br />".to_owned(),
		("/", name) => format!("</{name}>"),
		(_, name) => format!("<{name}>"),
	})
}

/// Reduces rich text to the allowed tag subset.
///
/// Allowed tags lose their attributes, other tags are unwrapped, comments and
/// dropped tags vanish along with their contents, and any stray angle bracket
/// left in the text is escaped.
pub fn sanitize(body: &str) -> String {
	let mut body = COMMENT.replace_all(body, "").into_owned();

	for dropped in DROPPED.iter() {
		body = dropped.replace_all(&body, "").into_owned();
	}

	let mut clean = String::with_capacity(body.len());
	let mut last = 0;

	for tag in TAG.captures_iter(&body) {
		let Some(whole) = tag.get(0) else {
			continue;
		};

		escape_text(&body[last..whole.start()], &mut clean);

		if let Some(tag) = rewrite_tag(&tag) {
			clean.push_str(&tag);
		}

		last = whole.end();
	}

	escape_text(&body[last..], &mut clean);
	clean
}

/// Looks an entity up by slug, falling back to its id.
pub async fn resolve<T: Entity>(
	collection: &Collection<T>,
	key: &str,
) -> Result<Option<T>, StoreError> {
	if let Some(entity) = collection.find_one(Filter::new().equals("slug", key)).await? {
		return Ok(Some(entity));
	}

	match Uuid::parse_str(key) {
		Ok(id) => collection.find_by_id(id).await,
		Err(..) => Ok(None),
	}
}

/// The id to record as the author of new content.
pub fn author_of(identity: &Identity) -> Result<Uuid, AppError> {
	if identity.id.is_nil() {
		return Err(AppError::Internal("authenticated caller has a nil id".into()));
	}

	Ok(identity.id)
}

/// Fails with [`AppError::Forbidden`] unless the caller wrote the content.
pub fn ensure_owner(author: Uuid, identity: &Identity) -> Result<(), AppError> {
	if author_of(identity)? != author {
		return Err(AppError::Forbidden);
	}

	Ok(())
}
