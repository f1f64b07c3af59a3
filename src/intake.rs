//! Broker seam and the consume loop.
//!
//! A [`MessageSource`] yields [`Delivery`] values one at a time; each delivery owns an
//! [`Acknowledger`] through which the loop applies the [`Disposition`] the adapter
//! decided. The loop is strictly sequential: the next delivery is pulled only after the
//! previous one was settled, which keeps acknowledgments in delivery order and lets a
//! slow downstream throttle consumption.

pub mod memory;
#[cfg(feature = "nats")] pub mod nats;

pub use memory::*;
#[cfg(feature = "nats")] pub use nats::*;

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, ack::Disposition, adapter::Adapter, retry::ShutdownSignal};

/// Boxed future returned by broker seam operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + 'a + Send>>;

/// Supplies deliveries in broker order.
pub trait MessageSource
where
	Self: Send + Sync,
{
	/// Waits for the next delivery; `None` means the source is exhausted or closed.
	fn next(&self) -> SourceFuture<'_, Option<Delivery>>;
}
impl<T> MessageSource for Arc<T>
where
	T: ?Sized + MessageSource,
{
	fn next(&self) -> SourceFuture<'_, Option<Delivery>> {
		(**self).next()
	}
}

/// Settles one delivery with the broker.
pub trait Acknowledger
where
	Self: Send + Sync,
{
	/// Confirms the delivery so the broker never redelivers it.
	fn ack(&self) -> SourceFuture<'_, ()>;

	/// Leaves the delivery unconfirmed so the broker redelivers it.
	fn withhold(&self) -> SourceFuture<'_, ()>;
}

/// Errors raised by broker bindings.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SourceError {
	/// Receiving from the broker failed.
	#[error("Failed to receive from the broker: {message}.")]
	Receive {
		/// Human-readable error payload.
		message: String,
	},
	/// The broker rejected an acknowledgment.
	#[error("Failed to settle the delivery: {message}.")]
	Acknowledge {
		/// Human-readable error payload.
		message: String,
	},
}

/// One record handed out by a [`MessageSource`].
pub struct Delivery {
	/// Raw record payload.
	pub payload: Vec<u8>,
	/// Broker identity of the record, stable across redeliveries when the broker has one.
	pub delivery_id: Option<String>,
	acker: Box<dyn Acknowledger>,
}
impl Delivery {
	/// Wraps a payload with the acknowledger that settles it.
	pub fn new(
		payload: impl Into<Vec<u8>>,
		delivery_id: Option<String>,
		acker: impl 'static + Acknowledger,
	) -> Self {
		Self { payload: payload.into(), delivery_id, acker: Box::new(acker) }
	}

	/// Applies `disposition` to the broker.
	pub async fn settle(self, disposition: Disposition) -> Result<(), SourceError> {
		if disposition.acknowledges() { self.acker.ack().await } else { self.acker.withhold().await }
	}
}
impl Debug for Delivery {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Delivery")
			.field("delivery_id", &self.delivery_id)
			.field("payload_len", &self.payload.len())
			.finish()
	}
}

/// Counters accumulated by [`Intake::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntakeStats {
	/// Deliveries pulled from the source.
	pub received: u64,
	/// Deliveries acknowledged after a successful exchange.
	pub acked_success: u64,
	/// Deliveries acknowledged after a non-retryable failure.
	pub acked_terminal: u64,
	/// Deliveries left for redelivery.
	pub withheld: u64,
	/// Deliveries acknowledged after dead-lettering.
	pub dead_lettered: u64,
	/// Receive errors reported by the source.
	pub source_errors: u64,
	/// Acknowledgments the broker rejected.
	pub ack_failures: u64,
}
impl IntakeStats {
	fn record(&mut self, disposition: Disposition) {
		match disposition {
			Disposition::AckedSuccess => self.acked_success += 1,
			Disposition::AckedTerminal => self.acked_terminal += 1,
			Disposition::WithheldRetry => self.withheld += 1,
			Disposition::AckedDeadLettered => self.dead_lettered += 1,
		}
	}
}

/// Consume loop feeding an [`Adapter`] from a [`MessageSource`].
pub struct Intake {
	source: Arc<dyn MessageSource>,
	adapter: Adapter,
	shutdown: ShutdownSignal,
	error_backoff: StdDuration,
}
impl Intake {
	/// Creates a loop that runs until the source is exhausted.
	pub fn new(source: Arc<dyn MessageSource>, adapter: Adapter) -> Self {
		Self {
			source,
			adapter,
			shutdown: ShutdownSignal::never(),
			error_backoff: StdDuration::from_secs(1),
		}
	}

	/// Stops pulling once `shutdown` triggers and lets it cut the adapter's backoff short.
	pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
		self.adapter = self.adapter.with_shutdown(shutdown.clone());
		self.shutdown = shutdown;

		self
	}

	/// Pause after a receive error before pulling again.
	pub fn with_error_backoff(mut self, backoff: StdDuration) -> Self {
		self.error_backoff = backoff;

		self
	}

	/// Pulls, processes, and settles one delivery.
	///
	/// Returns `Ok(None)` when the source is exhausted.
	pub async fn poll_once(&self) -> Result<Option<Disposition>, SourceError> {
		let Some(delivery) = self.source.next().await? else {
			return Ok(None);
		};

		Ok(Some(self.dispatch(delivery).await))
	}

	/// Consumes until the source is exhausted or shutdown triggers.
	///
	/// Shutdown is checked between deliveries only; a delivery already pulled is always
	/// processed and settled.
	pub async fn run(&self) -> IntakeStats {
		let mut stats = IntakeStats::default();
		let mut shutdown = self.shutdown.clone();

		tracing::info!("intake started");

		loop {
			if shutdown.is_triggered() {
				break;
			}

			let next = tokio::select! {
				next = self.source.next() => next,
				_ = shutdown.triggered() => break,
			};

			match next {
				Ok(Some(delivery)) => {
					stats.received += 1;

					let disposition = self.dispatch_counting(delivery, &mut stats).await;

					stats.record(disposition);
				},
				Ok(None) => break,
				Err(e) => {
					stats.source_errors += 1;

					tracing::error!(error = %e, "failed to receive delivery");

					tokio::select! {
						_ = tokio::time::sleep(self.error_backoff) => {},
						_ = shutdown.triggered() => break,
					}
				},
			}
		}

		tracing::info!(?stats, "intake stopped");

		stats
	}

	async fn dispatch(&self, delivery: Delivery) -> Disposition {
		let mut ignored = IntakeStats::default();

		self.dispatch_counting(delivery, &mut ignored).await
	}

	async fn dispatch_counting(&self, delivery: Delivery, stats: &mut IntakeStats) -> Disposition {
		let disposition = self.adapter.handle(&delivery.payload, delivery.delivery_id.as_deref()).await;
		let delivery_id = delivery.delivery_id.clone();

		if let Err(e) = delivery.settle(disposition).await {
			stats.ack_failures += 1;

			tracing::error!(?delivery_id, %disposition, error = %e, "failed to settle delivery");
		}

		disposition
	}
}
impl Debug for Intake {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Intake")
			.field("adapter", &self.adapter)
			.field("error_backoff", &self.error_backoff)
			.finish()
	}
}
