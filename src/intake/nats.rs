//! NATS JetStream binding: a durable pull consumer as [`MessageSource`] and a JetStream
//! publisher as [`DeadLetterSink`].

// crates.io
use async_nats::jetstream::{
	self, AckKind, Context,
	consumer::{AckPolicy, PullConsumer, pull},
};
use futures_util::StreamExt;
// self
use crate::{
	_prelude::*,
	dead_letter::{DeadLetterSink, SinkError, SinkFuture},
	intake::{Acknowledger, Delivery, MessageSource, SourceError, SourceFuture},
	model::DeadLetterRecord,
};

/// Default dead-letter subject.
pub const DEAD_LETTER_SUBJECT: &str = "http-adapter-request-dlq";

/// Durable JetStream pull consumer with explicit acknowledgment.
///
/// Deliveries are identified as `<stream>:<stream sequence>`, which stays stable across
/// redeliveries. Withheld deliveries are negatively acknowledged so the server redelivers
/// them without waiting for the ack timeout.
pub struct NatsSource {
	messages: tokio::sync::Mutex<Pin<Box<pull::Stream>>>,
}
impl NatsSource {
	/// Binds (creating if needed) the durable consumer `durable` on `stream`.
	pub async fn bind(
		context: &Context,
		stream: &str,
		durable: &str,
		filter_subject: &str,
	) -> Result<Self, SourceError> {
		let stream = context.get_stream(stream).await.map_err(receive)?;
		let consumer: PullConsumer = stream
			.get_or_create_consumer(durable, pull::Config {
				durable_name: Some(durable.to_owned()),
				ack_policy: AckPolicy::Explicit,
				filter_subject: filter_subject.to_owned(),
				..Default::default()
			})
			.await
			.map_err(receive)?;

		tracing::info!(durable, filter_subject, "jetstream consumer bound");

		Self::from_consumer(consumer).await
	}

	/// Streams from an existing pull consumer.
	pub async fn from_consumer(consumer: PullConsumer) -> Result<Self, SourceError> {
		let messages = consumer.messages().await.map_err(receive)?;

		Ok(Self { messages: tokio::sync::Mutex::new(Box::pin(messages)) })
	}
}
impl MessageSource for NatsSource {
	fn next(&self) -> SourceFuture<'_, Option<Delivery>> {
		Box::pin(async move {
			let mut messages = self.messages.lock().await;
			let Some(message) = messages.next().await else {
				return Ok(None);
			};
			let message = message.map_err(receive)?;
			let delivery_id = message
				.info()
				.map(|info| format!("{}:{}", info.stream, info.stream_sequence))
				.ok();
			let payload = message.payload.to_vec();

			Ok(Some(Delivery::new(payload, delivery_id, NatsAcker(message))))
		})
	}
}
impl Debug for NatsSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NatsSource").finish_non_exhaustive()
	}
}

struct NatsAcker(jetstream::Message);
impl Acknowledger for NatsAcker {
	fn ack(&self) -> SourceFuture<'_, ()> {
		Box::pin(async move { self.0.ack().await.map_err(acknowledge) })
	}

	fn withhold(&self) -> SourceFuture<'_, ()> {
		Box::pin(async move { self.0.ack_with(AckKind::Nak(None)).await.map_err(acknowledge) })
	}
}

/// Publishes dead-letter records to a JetStream subject and waits for the server ack.
///
/// The correlation id travels in the `Correlation-Id` header.
#[derive(Clone, Debug)]
pub struct NatsDeadLetterSink {
	context: Context,
	subject: String,
}
impl NatsDeadLetterSink {
	/// Publishes to [`DEAD_LETTER_SUBJECT`].
	pub fn new(context: Context) -> Self {
		Self { context, subject: DEAD_LETTER_SUBJECT.into() }
	}

	/// Overrides the subject.
	pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
		self.subject = subject.into();

		self
	}
}
impl DeadLetterSink for NatsDeadLetterSink {
	fn publish<'a>(&'a self, record: &'a DeadLetterRecord) -> SinkFuture<'a> {
		Box::pin(async move {
			let payload = record
				.to_json()
				.map_err(|e| SinkError::Serialization { message: e.to_string() })?;
			let mut headers = async_nats::HeaderMap::new();

			headers.insert("Correlation-Id", &*record.correlation_id);

			let ack = self
				.context
				.publish_with_headers(self.subject.clone(), headers, payload.into())
				.await
				.map_err(publish)?;

			ack.await.map_err(publish)?;

			Ok(())
		})
	}
}

fn receive(e: impl Display) -> SourceError {
	SourceError::Receive { message: e.to_string() }
}

fn acknowledge(e: impl Display) -> SourceError {
	SourceError::Acknowledge { message: e.to_string() }
}

fn publish(e: impl Display) -> SinkError {
	SinkError::Publish { message: e.to_string() }
}
