//! Observability helpers for the per-message pipeline.
//!
//! # Feature Flags
//!
//! - Spans named `http_adapter.message` carry the `correlation_id`, `tenant`, and `api`
//!   fields of the message being processed; every event emitted while handling the
//!   message inherits them.
//! - Enable `metrics` to increment `http_adapter_messages_total{disposition}` once per
//!   delivery and `http_adapter_attempts_total{result}` once per HTTP attempt.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::{_prelude::*, model::AttemptOutcome};

/// Result labels recorded for each HTTP attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttemptResult {
	/// 2xx response.
	Success,
	/// 429 response.
	Throttled,
	/// Any other 4xx (or unexpected) response.
	ClientError,
	/// 5xx response.
	ServerError,
	/// No response was received.
	TransportFailure,
}
impl AttemptResult {
	/// Classifies an attempt outcome.
	pub fn of(outcome: &AttemptOutcome) -> Self {
		match outcome.status {
			_ if !outcome.succeeded => AttemptResult::TransportFailure,
			Some(200..=299) => AttemptResult::Success,
			Some(429) => AttemptResult::Throttled,
			Some(500..) => AttemptResult::ServerError,
			_ => AttemptResult::ClientError,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AttemptResult::Success => "success",
			AttemptResult::Throttled => "throttled",
			AttemptResult::ClientError => "client_error",
			AttemptResult::ServerError => "server_error",
			AttemptResult::TransportFailure => "transport_failure",
		}
	}
}
impl Display for AttemptResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
