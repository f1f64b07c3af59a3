//! Cross-delivery retry counting and dead-letter escalation.
//!
//! Each retryable failure of a delivery increments a shared counter keyed by the
//! correlation id. Below the threshold the delivery is withheld so the broker redelivers
//! it; at the threshold a [`DeadLetterRecord`] is published, the counter is deleted, and
//! the delivery is acknowledged. Counter and publish failures are logged and degraded,
//! never raised, so escalation cannot recurse into another retry.

// self
use crate::{
	_prelude::*,
	config::DeadLetterSettings,
	model::{CorrelationId, DeadLetterRecord},
	store::CounterStore,
};

/// Boxed future returned by [`DeadLetterSink::publish`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + 'a + Send>>;

/// Dead-letter channel the escalator publishes to.
pub trait DeadLetterSink
where
	Self: Send + Sync,
{
	/// Publishes `record`, keyed by its correlation id.
	fn publish<'a>(&'a self, record: &'a DeadLetterRecord) -> SinkFuture<'a>;
}
impl<T> DeadLetterSink for Arc<T>
where
	T: ?Sized + DeadLetterSink,
{
	fn publish<'a>(&'a self, record: &'a DeadLetterRecord) -> SinkFuture<'a> {
		(**self).publish(record)
	}
}

/// Errors raised by [`DeadLetterSink`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SinkError {
	/// The record could not be encoded.
	#[error("Failed to encode dead-letter record: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// The channel rejected or failed the publish.
	#[error("Failed to publish dead-letter record: {message}.")]
	Publish {
		/// Human-readable error payload.
		message: String,
	},
}

/// Keeps published records in memory for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryDeadLetterSink(Arc<Mutex<Vec<DeadLetterRecord>>>);
impl MemoryDeadLetterSink {
	/// Returns a copy of every record published so far.
	pub fn records(&self) -> Vec<DeadLetterRecord> {
		self.0.lock().clone()
	}
}
impl DeadLetterSink for MemoryDeadLetterSink {
	fn publish<'a>(&'a self, record: &'a DeadLetterRecord) -> SinkFuture<'a> {
		Box::pin(async move {
			self.0.lock().push(record.clone());

			Ok(())
		})
	}
}

/// Decision for one retryable failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escalation {
	/// Below the threshold; leave the delivery unacknowledged.
	Withhold {
		/// Cumulative retryable failures so far.
		attempt_count: u64,
	},
	/// Threshold reached; the record was handed to the sink and the counter deleted.
	DeadLettered {
		/// Cumulative retryable failures, including this one.
		attempt_count: u64,
	},
}
impl Escalation {
	/// Returns `true` when the delivery must stay unacknowledged.
	pub fn should_withhold(&self) -> bool {
		matches!(self, Escalation::Withhold { .. })
	}
}

/// Shared-counter escalator.
#[derive(Clone)]
pub struct DeadLetterEscalator {
	store: Arc<dyn CounterStore>,
	sink: Arc<dyn DeadLetterSink>,
	settings: DeadLetterSettings,
}
impl DeadLetterEscalator {
	/// Creates an escalator counting in `store` and publishing to `sink`.
	pub fn new(
		store: Arc<dyn CounterStore>,
		sink: Arc<dyn DeadLetterSink>,
		settings: DeadLetterSettings,
	) -> Self {
		Self { store, sink, settings }
	}

	/// Counter key for a correlation id.
	pub fn key(&self, correlation_id: &CorrelationId) -> String {
		format!("{}{correlation_id}", self.settings.counter_prefix)
	}

	/// Records one retryable failure and decides between withholding and dead-lettering.
	///
	/// An unreachable counter store counts the failure as the first one.
	pub async fn escalate_if_needed(
		&self,
		payload: &[u8],
		correlation_id: &CorrelationId,
		error_detail: &str,
	) -> Escalation {
		let key = self.key(correlation_id);
		let attempt_count = match self.store.increment(&key, self.settings.counter_ttl()).await {
			Ok(count) => count,
			Err(e) => {
				tracing::error!(%key, error = %e, "failed to increment retry counter; assuming first failure");

				1
			},
		};

		if attempt_count < self.settings.max_redeliveries {
			tracing::warn!(
				attempt_count,
				max_redeliveries = self.settings.max_redeliveries,
				detail = error_detail,
				"retryable failure; withholding acknowledgment for redelivery"
			);

			return Escalation::Withhold { attempt_count };
		}

		let record =
			DeadLetterRecord::new(payload, correlation_id.clone(), error_detail, attempt_count);

		match self.sink.publish(&record).await {
			Ok(()) => tracing::warn!(attempt_count, detail = error_detail, "message sent to dead-letter channel"),
			Err(e) => tracing::error!(attempt_count, error = %e, "failed to publish dead-letter record"),
		}

		self.delete(&key).await;

		Escalation::DeadLettered { attempt_count }
	}

	/// Deletes the counter after a successful delivery; missing counters are fine.
	pub async fn clear(&self, correlation_id: &CorrelationId) {
		self.delete(&self.key(correlation_id)).await;
	}

	async fn delete(&self, key: &str) {
		if let Err(e) = self.store.delete(key).await {
			tracing::warn!(%key, error = %e, "failed to delete retry counter");
		}
	}
}
impl Debug for DeadLetterEscalator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeadLetterEscalator").field("settings", &self.settings).finish()
	}
}
