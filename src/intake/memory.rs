//! In-process broker with redelivery semantics, for tests, demos, and embedding.

// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	intake::{Acknowledger, Delivery, MessageSource, SourceFuture},
};

#[derive(Clone, Debug)]
struct Record {
	id: String,
	payload: Vec<u8>,
	deliveries: u32,
}

#[derive(Debug, Default)]
struct Queue {
	pending: VecDeque<Record>,
	acked: Vec<Record>,
	next_id: u64,
}

/// FIFO broker; a withheld delivery goes back to the head of the queue so it is the next
/// one redelivered, mirroring a partition that rewinds to the unacknowledged offset.
///
/// [`MessageSource::next`] returns `None` as soon as the queue is empty.
#[derive(Clone, Debug, Default)]
pub struct MemoryBroker(Arc<Mutex<Queue>>);
impl MemoryBroker {
	/// Enqueues a record and returns its delivery id.
	pub fn publish(&self, payload: impl Into<Vec<u8>>) -> String {
		let mut queue = self.0.lock();

		queue.next_id += 1;

		let id = format!("memory:{}", queue.next_id);

		queue.pending.push_back(Record { id: id.clone(), payload: payload.into(), deliveries: 0 });

		id
	}

	/// Records waiting for (re)delivery.
	pub fn pending(&self) -> usize {
		self.0.lock().pending.len()
	}

	/// Payloads acknowledged so far, in acknowledgment order.
	pub fn acked(&self) -> Vec<Vec<u8>> {
		self.0.lock().acked.iter().map(|r| r.payload.clone()).collect()
	}

	/// Number of times the record was handed out, if the broker still knows it.
	pub fn deliveries(&self, id: &str) -> Option<u32> {
		let queue = self.0.lock();

		queue.pending.iter().chain(queue.acked.iter()).find(|r| r.id == id).map(|r| r.deliveries)
	}
}
impl MessageSource for MemoryBroker {
	fn next(&self) -> SourceFuture<'_, Option<Delivery>> {
		Box::pin(async move {
			let mut queue = self.0.lock();
			let Some(mut record) = queue.pending.pop_front() else {
				return Ok(None);
			};

			record.deliveries += 1;

			let delivery = Delivery::new(
				record.payload.clone(),
				Some(record.id.clone()),
				MemoryAcker { queue: self.0.clone(), record: Mutex::new(Some(record)) },
			);

			Ok(Some(delivery))
		})
	}
}

struct MemoryAcker {
	queue: Arc<Mutex<Queue>>,
	record: Mutex<Option<Record>>,
}
impl Acknowledger for MemoryAcker {
	fn ack(&self) -> SourceFuture<'_, ()> {
		Box::pin(async move {
			if let Some(record) = self.record.lock().take() {
				self.queue.lock().acked.push(record);
			}

			Ok(())
		})
	}

	fn withhold(&self) -> SourceFuture<'_, ()> {
		Box::pin(async move {
			if let Some(record) = self.record.lock().take() {
				self.queue.lock().pending.push_front(record);
			}

			Ok(())
		})
	}
}
