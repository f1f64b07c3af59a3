//! Adapter-level error types and the failure taxonomy that drives acknowledgment.

// self
use crate::{_prelude::*, model::IdentifierError};

/// Adapter-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Coarse failure classes that decide how a delivery is acknowledged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
	/// Deterministic configuration or business rejection; acknowledge, never redeliver.
	Business,
	/// Malformed or invalid inbound message; acknowledge, never redeliver.
	Validation,
	/// Environmental failure that may succeed on redelivery.
	Retryable,
	/// Programmer or configuration bug; acknowledge with full error logging.
	Fatal,
}
impl FailureClass {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FailureClass::Business => "business",
			FailureClass::Validation => "validation",
			FailureClass::Retryable => "retryable",
			FailureClass::Fatal => "fatal",
		}
	}
}
impl Display for FailureClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Canonical adapter error surfaced while processing one message.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Configuration collaborator rejected or failed the lookup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Execution engine refused to build the outbound request.
	#[error(transparent)]
	Execution(#[from] ExecutionError),

	/// Inbound envelope could not be decoded.
	#[error("Inbound envelope is malformed at `{path}`: {message}.")]
	MalformedEnvelope {
		/// JSON path of the offending field.
		path: String,
		/// Decoder message.
		message: String,
	},
	/// Envelope decoded but failed message-level validation.
	#[error("Inbound message is invalid: {reason}.")]
	InvalidMessage {
		/// Human-readable validation failure.
		reason: String,
	},
	/// A required parameter mapping resolved to an empty value.
	#[error("Required parameter `{key}` resolved to an empty value.")]
	MissingRequiredParameter {
		/// Mapping key that was required.
		key: String,
	},
	/// The fixed-window quota for the tenant/API key is exhausted.
	#[error("Rate limit exceeded: {limit} requests per {window_secs} seconds.")]
	RateLimitExceeded {
		/// Active request limit.
		limit: u64,
		/// Active window length in seconds.
		window_secs: u64,
	},
	/// API definition names an HTTP method the engine does not support.
	#[error("Unsupported HTTP method `{method}`.")]
	UnsupportedMethod {
		/// Raw method value from the API definition.
		method: String,
	},
}
impl Error {
	/// Classifies the error for the acknowledgment controller.
	pub fn class(&self) -> FailureClass {
		match self {
			Error::Config(ConfigError::Backend { .. }) => FailureClass::Retryable,
			Error::Config(_) | Error::MissingRequiredParameter { .. } | Error::RateLimitExceeded { .. } =>
				FailureClass::Business,
			Error::MalformedEnvelope { .. } | Error::InvalidMessage { .. } => FailureClass::Validation,
			Error::Execution(_) | Error::UnsupportedMethod { .. } => FailureClass::Fatal,
		}
	}
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		let reason = e.to_string();

		Self::InvalidMessage { reason: reason.trim_end_matches('.').to_owned() }
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::MalformedEnvelope { path: e.path().to_string(), message: e.inner().to_string() }
	}
}

/// Failures reported by the configuration collaborator.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// No tenant is registered under the code.
	#[error("Tenant `{code}` does not exist.")]
	TenantNotFound {
		/// Tenant code from the message.
		code: String,
	},
	/// Tenant exists but is disabled.
	#[error("Tenant `{code}` is disabled.")]
	TenantDisabled {
		/// Tenant code from the message.
		code: String,
	},
	/// No API definition is registered for the tenant/API pair.
	#[error("API `{api}` is not configured for tenant `{tenant}`.")]
	ApiNotFound {
		/// Tenant code from the message.
		tenant: String,
		/// API code from the message.
		api: String,
	},
	/// API definition exists but is disabled.
	#[error("API `{api}` is disabled for tenant `{tenant}`.")]
	ApiDisabled {
		/// Tenant code from the message.
		tenant: String,
		/// API code from the message.
		api: String,
	},
	/// The configuration backend could not be reached or read.
	#[error("Configuration backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Errors the execution engine raises instead of reporting an attempt outcome.
///
/// Ordinary HTTP-layer failures never surface here; they are captured on the
/// [`AttemptOutcome`](crate::model::AttemptOutcome).
#[derive(Debug, ThisError)]
pub enum ExecutionError {
	/// The compiled URL cannot be parsed.
	#[error("Compiled URL `{url}` is invalid.")]
	InvalidUrl {
		/// URL after path substitution.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header name or value cannot be sent on the wire.
	#[error("Header `{name}` cannot be encoded.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// The HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	ClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ExecutionError {
	/// Wraps a transport's builder failure inside [`ExecutionError`].
	pub fn client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::ClientBuild { source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn config_errors_split_between_business_and_retryable() {
		let missing: Error = ConfigError::TenantNotFound { code: "acme".into() }.into();
		let backend: Error = ConfigError::Backend { message: "connection refused".into() }.into();

		assert_eq!(missing.class(), FailureClass::Business);
		assert_eq!(backend.class(), FailureClass::Retryable);
		assert!(backend.to_string().contains("connection refused"));
	}

	#[test]
	fn unsupported_method_is_fatal() {
		let err = Error::UnsupportedMethod { method: "TRACE".into() };

		assert_eq!(err.class(), FailureClass::Fatal);
		assert_eq!(err.class().as_str(), "fatal");
	}

	#[test]
	fn envelope_errors_keep_the_json_path() {
		let payload = br#"{"tenantCode":"acme","userInfo":{"extra":{"k":1}}}"#;
		let de = &mut serde_json::Deserializer::from_slice(payload);
		let err = serde_path_to_error::deserialize::<_, crate::model::InboundEnvelope>(de)
			.expect_err("Numeric extra attributes should be rejected.");
		let err = Error::from(err);

		assert_eq!(err.class(), FailureClass::Validation);
		assert!(err.to_string().contains("userInfo.extra.k"), "{err}");
	}

	#[test]
	fn identifier_errors_render_a_single_period() {
		let err = Error::from(IdentifierError::ContainsWhitespace { kind: "tenantCode" });

		assert_eq!(err.to_string(), "Inbound message is invalid: tenantCode contains whitespace.");
	}
}
