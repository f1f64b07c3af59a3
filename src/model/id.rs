//! Strongly typed identifiers enforced across the adapter domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use uuid::Uuid;
// self
use crate::_prelude::*;

macro_rules! def_code {
	($name:ident, $doc:literal, $kind:literal) => {
		def_code! { $name, $doc, $kind, validate_view }
	};
	($name:ident, $doc:literal, $kind:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

macro_rules! def_row_id {
	($name:ident, $doc:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub u64);
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				Display::fmt(&self.0, f)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} cannot be empty.")]
	Empty {
		/// Kind of identifier (tenant code, API code, correlation id).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (tenant code, API code, correlation id).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (tenant code, API code, correlation id).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_code! { TenantCode, "Code a message uses to name its tenant.", "tenantCode" }
def_code! { ApiCode, "Code naming one API definition inside a tenant.", "apiCode" }
def_code! {
	CorrelationId,
	"Cross-system identifier of one logical delivery.\n\nOpaque to the adapter: any non-empty string is accepted.",
	"correlationId",
	validate_non_empty
}

def_row_id! { TenantId, "Storage identifier of a tenant record." }
def_row_id! { ApiDefinitionId, "Storage identifier of an API definition." }

impl CorrelationId {
	/// Generates a random correlation id (32 lowercase hex characters).
	pub fn generate() -> Self {
		Self(Uuid::new_v4().simple().to_string())
	}

	/// Derives a stable correlation id from a broker delivery identity.
	///
	/// Redeliveries of the same record map to the same id, which keeps the cross-delivery
	/// retry counter meaningful for messages that arrive without a correlation id.
	pub fn derive(delivery_id: &str) -> Self {
		Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, delivery_id.as_bytes()).simple().to_string())
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

fn validate_non_empty(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}

	Ok(())
}
