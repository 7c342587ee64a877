//! Bearer token issuance and request authentication.
pub mod gateway;
pub mod token;

pub use token::{Subject, TokenService};

use uuid::Uuid;

use crate::store::StoreError;

/// Why a token could not be issued or resolved.
///
/// Resolution failures never reach the client: the request simply continues
/// without an identity.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("token expired")]
	Expired,
	#[error("invalid token signature")]
	InvalidSignature,
	#[error("malformed token: {0}")]
	Malformed(jsonwebtoken::errors::Error),
	#[error("token subject {0} no longer exists")]
	UnknownSubject(Uuid),
	#[error("could not sign token: {0}")]
	Encode(jsonwebtoken::errors::Error),
	#[error(transparent)]
	Store(#[from] StoreError),
}

impl From<jsonwebtoken::errors::Error> for Error {
	fn from(error: jsonwebtoken::errors::Error) -> Self {
		use jsonwebtoken::errors::ErrorKind;

		match error.kind() {
			ErrorKind::ExpiredSignature => Self::Expired,
			ErrorKind::InvalidSignature => Self::InvalidSignature,
			_ => Self::Malformed(error),
		}
	}
}
