// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::{_prelude::*, model::InboundMessage};

/// Span covering the processing of one message.
#[derive(Clone, Debug)]
pub struct MessageSpan {
	span: Span,
}
impl MessageSpan {
	/// Creates a span tagged with the message's correlation id, tenant, and API.
	pub fn new(message: &InboundMessage) -> Self {
		let span = tracing::info_span!(
			"http_adapter.message",
			correlation_id = %message.correlation_id,
			tenant = %message.tenant_code,
			api = %message.api_code,
		);

		Self { span }
	}

	/// Creates a span for a payload that failed to decode into a message.
	pub fn undecoded(correlation_id: Option<&str>) -> Self {
		let span = tracing::info_span!(
			"http_adapter.message",
			correlation_id = correlation_id.unwrap_or("-"),
			tenant = tracing::field::Empty,
			api = tracing::field::Empty,
		);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn wrap<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}

	/// Underlying span.
	pub fn span(&self) -> &Span {
		&self.span
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[tokio::test]
	async fn wrap_runs_the_future_inside_the_span() {
		let message = InboundMessage::decode(
			json!({ "tenantCode": "acme", "apiCode": "ping" }).to_string().as_bytes(),
			None,
		)
		.expect("Message fixture should decode.");
		let span = MessageSpan::new(&message);
		let value = span.wrap(async { 42 }).await;

		assert_eq!(value, 42);
		assert!(MessageSpan::undecoded(None).span().metadata().is_none_or(|m| m.name() == "http_adapter.message"));
	}
}
