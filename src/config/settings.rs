//! Process-wide adapter settings with serde defaults.

// std
use std::{fs, path::Path};
// self
use crate::_prelude::*;

/// Settings document failed to load.
#[derive(Debug, ThisError)]
pub enum SettingsError {
	/// The document could not be read.
	#[error("Failed to read settings from {path}.")]
	Io {
		/// Document path.
		path: String,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// The document is not a valid settings object.
	#[error("Settings are invalid at `{path}`: {message}.")]
	Invalid {
		/// JSON path of the offending field.
		path: String,
		/// Decoder message.
		message: String,
	},
}

/// Top-level adapter settings; every field has a default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterSettings {
	/// Rate limiter defaults.
	pub rate_limit: RateLimitSettings,
	/// Cross-delivery escalation.
	pub dead_letter: DeadLetterSettings,
	/// Local retry backoff.
	pub retry: RetrySettings,
	/// HTTP client tuning.
	pub http: HttpSettings,
}
impl AdapterSettings {
	/// Parses settings from a JSON document.
	pub fn from_json(bytes: &[u8]) -> Result<Self, SettingsError> {
		let de = &mut serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(de).map_err(|e| SettingsError::Invalid {
			path: e.path().to_string(),
			message: e.inner().to_string(),
		})
	}

	/// Loads settings from a JSON file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| SettingsError::Io { path: path.display().to_string(), source })?;

		Self::from_json(&bytes)
	}
}

/// Rate limiter defaults applied when no enabled row matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimitSettings {
	/// `false` admits every request without touching the counter store.
	pub enabled: bool,
	/// Fallback requests per window.
	pub default_limit: u64,
	/// Fallback window length in seconds.
	pub default_window_secs: u64,
}
impl Default for RateLimitSettings {
	fn default() -> Self {
		Self { enabled: true, default_limit: 100, default_window_secs: 1 }
	}
}

/// Cross-delivery retry counter and escalation threshold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeadLetterSettings {
	/// Retryable failures tolerated across redeliveries before dead-lettering.
	pub max_redeliveries: u64,
	/// Lifetime of a retry counter in seconds.
	pub counter_ttl_secs: u64,
	/// Key prefix prepended to the correlation id.
	pub counter_prefix: String,
}
impl DeadLetterSettings {
	/// Counter lifetime as a [`Duration`].
	pub fn counter_ttl(&self) -> Duration {
		Duration::seconds(i64::try_from(self.counter_ttl_secs).unwrap_or(i64::MAX))
	}
}
impl Default for DeadLetterSettings {
	fn default() -> Self {
		Self {
			max_redeliveries: 3,
			counter_ttl_secs: 24 * 60 * 60,
			counter_prefix: "adapter:retry:".into(),
		}
	}
}

/// Exponential backoff bounds for local retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrySettings {
	/// Pause before the first retry.
	pub base_backoff_ms: u64,
	/// Upper bound of any pause.
	pub max_backoff_ms: u64,
}
impl Default for RetrySettings {
	fn default() -> Self {
		Self { base_backoff_ms: 1_000, max_backoff_ms: 30_000 }
	}
}

/// HTTP client tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpSettings {
	/// TCP connect timeout.
	pub connect_timeout_ms: u64,
	/// Read timeout used when an API definition sets none.
	pub default_timeout_ms: u64,
	/// Idle pooled connections are closed after this many seconds.
	pub pool_idle_timeout_secs: u64,
	/// Idle connections kept per host.
	pub pool_max_idle_per_host: usize,
}
impl Default for HttpSettings {
	fn default() -> Self {
		Self {
			connect_timeout_ms: 5_000,
			default_timeout_ms: 30_000,
			pool_idle_timeout_secs: 300,
			pool_max_idle_per_host: 100,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let settings = AdapterSettings::from_json(b"{}").expect("Empty settings should parse.");

		assert_eq!(settings, AdapterSettings::default());
		assert_eq!(settings.rate_limit.default_limit, 100);
		assert_eq!(settings.dead_letter.max_redeliveries, 3);
		assert_eq!(settings.dead_letter.counter_ttl(), Duration::hours(24));
		assert_eq!(settings.retry.max_backoff_ms, 30_000);
	}

	#[test]
	fn partial_sections_keep_remaining_defaults() {
		let settings = AdapterSettings::from_json(
			br#"{"rateLimit":{"defaultWindowSecs":10},"deadLetter":{"maxRedeliveries":5}}"#,
		)
		.expect("Partial settings should parse.");

		assert_eq!(settings.rate_limit.default_window_secs, 10);
		assert_eq!(settings.rate_limit.default_limit, 100);
		assert!(settings.rate_limit.enabled);
		assert_eq!(settings.dead_letter.max_redeliveries, 5);
		assert_eq!(settings.dead_letter.counter_prefix, "adapter:retry:");
	}

	#[test]
	fn invalid_fields_report_their_path() {
		let err = AdapterSettings::from_json(br#"{"retry":{"baseBackoffMs":"soon"}}"#)
			.expect_err("String backoff should be rejected.");

		assert!(matches!(err, SettingsError::Invalid { ref path, .. } if path == "retry.baseBackoffMs"));
	}
}
