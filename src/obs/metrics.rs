// self
use crate::{ack::Disposition, obs::AttemptResult};

/// Records the final disposition of one delivery (when metrics are enabled).
pub fn record_disposition(disposition: Disposition) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("http_adapter_messages_total", "disposition" => disposition.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = disposition;
	}
}

/// Records the result of one HTTP attempt (when metrics are enabled).
pub fn record_attempt(result: AttemptResult) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("http_adapter_attempts_total", "result" => result.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = result;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_a_noop() {
		record_disposition(Disposition::WithheldRetry);
		record_attempt(AttemptResult::ServerError);
	}
}
