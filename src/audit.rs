//! Fire-and-forget audit trail of HTTP attempts.
//!
//! Sinks are synchronous and infallible from the pipeline's point of view: a sink that
//! cannot keep up drops records (with a warning) instead of slowing or failing the
//! delivery. Audit output never influences acknowledgment.

// crates.io
use tokio::sync::mpsc::{self, error::TrySendError};
// self
use crate::{
	_prelude::*,
	model::{ApiCode, AttemptOutcome, CorrelationId, HttpMethod, RequestDescription, TenantCode},
};

/// One HTTP attempt as recorded for operators.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
	/// Correlation id of the delivery.
	pub correlation_id: CorrelationId,
	/// Tenant code of the delivery.
	pub tenant_code: TenantCode,
	/// API code of the delivery.
	pub api_code: ApiCode,
	/// Request URL without query parameters.
	pub url: String,
	/// Request method.
	pub method: HttpMethod,
	/// Request headers.
	pub headers: BTreeMap<String, String>,
	/// Request query parameters.
	pub query_params: BTreeMap<String, String>,
	/// Encoded request body; absent when the request carried none.
	pub request_body: Option<String>,
	/// Response status; absent on transport failure.
	pub status: Option<u16>,
	/// Response body text.
	pub response_body: Option<String>,
	/// Attempt latency in milliseconds.
	pub latency_ms: u64,
	/// Transport failure detail.
	pub error_detail: Option<String>,
	/// Zero-based attempt index within the local retry loop.
	pub attempt: u32,
	/// Instant the record was built.
	#[serde(with = "time::serde::rfc3339")]
	pub recorded_at: OffsetDateTime,
}
impl AuditRecord {
	/// Builds a record for one attempt of `request`.
	pub fn new(request: &RequestDescription, outcome: &AttemptOutcome, attempt: u32) -> Self {
		Self {
			correlation_id: request.correlation_id.clone(),
			tenant_code: request.tenant_code.clone(),
			api_code: request.api_code.clone(),
			url: request.url.clone(),
			method: request.method,
			headers: request.headers.clone(),
			query_params: request.query_params.clone(),
			request_body: request.carries_body().then(|| request.encoded_body()),
			status: outcome.status,
			response_body: outcome.body.clone(),
			latency_ms: outcome.latency_ms,
			error_detail: outcome.error_detail.clone(),
			attempt,
			recorded_at: OffsetDateTime::now_utc(),
		}
	}
}

/// Receives audit records; implementations must not block.
pub trait AuditSink
where
	Self: Send + Sync,
{
	/// Records one attempt.
	fn record(&self, record: AuditRecord);
}
impl<T> AuditSink for Arc<T>
where
	T: ?Sized + AuditSink,
{
	fn record(&self, record: AuditRecord) {
		(**self).record(record)
	}
}

/// Emits each record as an `info` event on the `http_adapter::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;
impl AuditSink for TracingAuditSink {
	fn record(&self, record: AuditRecord) {
		tracing::info!(
			target: "http_adapter::audit",
			correlation_id = %record.correlation_id,
			tenant = %record.tenant_code,
			api = %record.api_code,
			method = %record.method,
			url = %record.url,
			attempt = record.attempt,
			status = ?record.status,
			latency_ms = record.latency_ms,
			error = record.error_detail.as_deref(),
			"http attempt"
		);
	}
}

/// Hands records to an asynchronous writer through a bounded channel.
#[derive(Clone, Debug)]
pub struct ChannelAuditSink {
	tx: mpsc::Sender<AuditRecord>,
}
impl ChannelAuditSink {
	/// Creates a sink and the receiver the writer drains.
	pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditRecord>) {
		let (tx, rx) = mpsc::channel(capacity.max(1));

		(Self { tx }, rx)
	}
}
impl AuditSink for ChannelAuditSink {
	fn record(&self, record: AuditRecord) {
		match self.tx.try_send(record) {
			Ok(()) => {},
			Err(TrySendError::Full(record)) => {
				tracing::warn!(correlation_id = %record.correlation_id, "audit channel full; dropping record");
			},
			Err(TrySendError::Closed(record)) => {
				tracing::debug!(correlation_id = %record.correlation_id, "audit channel closed; dropping record");
			},
		}
	}
}

/// Keeps records in memory for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuditSink(Arc<Mutex<Vec<AuditRecord>>>);
impl MemoryAuditSink {
	/// Returns a copy of every record so far.
	pub fn records(&self) -> Vec<AuditRecord> {
		self.0.lock().clone()
	}
}
impl AuditSink for MemoryAuditSink {
	fn record(&self, record: AuditRecord) {
		self.0.lock().push(record);
	}
}
