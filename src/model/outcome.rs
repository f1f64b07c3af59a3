//! Result of a single HTTP attempt.

// self
use crate::_prelude::*;

/// Outcome of one HTTP attempt; HTTP-layer failures are data, not errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
	/// `true` when a response was received, whatever its status.
	pub succeeded: bool,
	/// HTTP status code; absent when the transport failed.
	pub status: Option<u16>,
	/// Wall-clock latency of the attempt in milliseconds.
	pub latency_ms: u64,
	/// Transport failure detail; absent on success.
	pub error_detail: Option<String>,
	/// Response body text, when one was read.
	pub body: Option<String>,
}
impl AttemptOutcome {
	/// Outcome for a received response.
	pub fn response(status: u16, body: Option<String>, latency_ms: u64) -> Self {
		Self { succeeded: true, status: Some(status), latency_ms, error_detail: None, body }
	}

	/// Outcome for a transport-level failure (timeout, connection error).
	pub fn transport_failure(detail: impl Into<String>, latency_ms: u64) -> Self {
		Self {
			succeeded: false,
			status: None,
			latency_ms,
			error_detail: Some(detail.into()),
			body: None,
		}
	}

	/// Returns `true` for a received 2xx response.
	pub fn is_success(&self) -> bool {
		self.succeeded && matches!(self.status, Some(200..=299))
	}

	/// Human-readable failure description used in logs and dead letters.
	pub fn describe_failure(&self) -> String {
		match (&self.error_detail, self.status) {
			(Some(detail), _) => format!("HTTP request failed: {detail}"),
			(None, Some(status)) if status >= 500 =>
				format!("HTTP request returned server error: {status}"),
			(None, Some(status)) => format!("HTTP request returned status {status}"),
			(None, None) => "HTTP request failed without a response".into(),
		}
	}
}
