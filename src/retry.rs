//! Local retry loop with exponential backoff, plus the shutdown signal that can cut a
//! backoff pause short.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	audit::{AuditRecord, AuditSink},
	config::RetrySettings,
	error::ExecutionError,
	http::HttpExecutor,
	model::{AttemptOutcome, RequestDescription},
	obs::{self, AttemptResult},
};

/// Backoff and eligibility rules for local retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Pause before the first retry.
	pub base: StdDuration,
	/// Upper bound of any pause.
	pub max: StdDuration,
}
impl RetryPolicy {
	/// Pause before retry number `retry` (1-based): `min(base * 2^(retry-1), max)`.
	///
	/// Retry `0` is the initial attempt and never pauses.
	pub fn backoff(&self, retry: u32) -> StdDuration {
		if retry == 0 {
			return StdDuration::ZERO;
		}

		let factor = 1_u32.checked_shl(retry - 1).unwrap_or(u32::MAX);

		self.base.saturating_mul(factor).min(self.max)
	}

	/// Returns `true` when another attempt may succeed: a transport failure, a 5xx, or a 429.
	pub fn is_retry_eligible(&self, outcome: &AttemptOutcome) -> bool {
		!outcome.succeeded || matches!(outcome.status, Some(429 | 500..))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::from(&RetrySettings::default())
	}
}
impl From<&RetrySettings> for RetryPolicy {
	fn from(settings: &RetrySettings) -> Self {
		Self {
			base: StdDuration::from_millis(settings.base_backoff_ms),
			max: StdDuration::from_millis(settings.max_backoff_ms),
		}
	}
}

/// Owner side of the process shutdown signal.
#[derive(Debug)]
pub struct Shutdown {
	tx: watch::Sender<bool>,
}
impl Shutdown {
	/// Creates an untriggered signal.
	pub fn new() -> Self {
		Self { tx: watch::Sender::new(false) }
	}

	/// Returns a listener.
	pub fn signal(&self) -> ShutdownSignal {
		ShutdownSignal { rx: self.tx.subscribe() }
	}

	/// Triggers shutdown; idempotent.
	pub fn trigger(&self) {
		self.tx.send_replace(true);
	}
}
impl Default for Shutdown {
	fn default() -> Self {
		Self::new()
	}
}

/// Listener side of [`Shutdown`]; cheap to clone.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
	rx: watch::Receiver<bool>,
}
impl ShutdownSignal {
	/// A signal that never triggers.
	pub fn never() -> Self {
		Shutdown::new().signal()
	}

	/// Returns `true` once shutdown was triggered.
	pub fn is_triggered(&self) -> bool {
		*self.rx.borrow()
	}

	/// Resolves once shutdown is triggered; pends forever if the owner is dropped first.
	pub async fn triggered(&mut self) {
		if self.rx.wait_for(|triggered| *triggered).await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}

/// Result of one run of the local retry loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryReport {
	/// Outcome of the last attempt.
	pub outcome: AttemptOutcome,
	/// Attempts performed, at least one.
	pub attempts: u32,
	/// `true` when shutdown cut a backoff pause short.
	pub interrupted: bool,
}

/// Drives an [`HttpExecutor`] through at most `max_retries + 1` attempts.
#[derive(Clone)]
pub struct RetryOrchestrator {
	executor: Arc<dyn HttpExecutor>,
	audit: Arc<dyn AuditSink>,
	policy: RetryPolicy,
	shutdown: ShutdownSignal,
}
impl RetryOrchestrator {
	/// Creates an orchestrator with the default policy and no shutdown signal.
	pub fn new(executor: Arc<dyn HttpExecutor>, audit: Arc<dyn AuditSink>) -> Self {
		Self { executor, audit, policy: RetryPolicy::default(), shutdown: ShutdownSignal::never() }
	}

	/// Overrides the backoff policy.
	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the audit sink.
	pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.audit = audit;

		self
	}

	/// Lets `shutdown` cut backoff pauses short.
	pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
		self.shutdown = shutdown;

		self
	}

	/// Active policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Runs the loop and returns the last attempt's outcome.
	///
	/// Stops at the first 2xx, at the first outcome that is not retry-eligible, or when
	/// the budget is spent. In-flight attempts are never aborted; only pauses are.
	pub async fn execute(
		&self,
		request: &RequestDescription,
		max_retries: u32,
	) -> Result<RetryReport, ExecutionError> {
		let mut attempt = 0;

		loop {
			let outcome = self.executor.send(request).await?;

			obs::record_attempt(AttemptResult::of(&outcome));
			self.audit.record(AuditRecord::new(request, &outcome, attempt));

			let attempts = attempt + 1;

			if outcome.is_success()
				|| !self.policy.is_retry_eligible(&outcome)
				|| attempt >= max_retries
			{
				return Ok(RetryReport { outcome, attempts, interrupted: false });
			}

			attempt += 1;

			let pause = self.policy.backoff(attempt);

			tracing::warn!(
				retry = attempt,
				max_retries,
				backoff_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
				detail = %outcome.describe_failure(),
				"http attempt failed; retrying"
			);

			if !self.pause(pause).await {
				tracing::info!(attempts, "shutdown requested; abandoning local retries");

				return Ok(RetryReport { outcome, attempts, interrupted: true });
			}
		}
	}

	async fn pause(&self, duration: StdDuration) -> bool {
		let mut shutdown = self.shutdown.clone();

		if shutdown.is_triggered() {
			return false;
		}

		tokio::select! {
			_ = tokio::time::sleep(duration) => true,
			_ = shutdown.triggered() => false,
		}
	}
}
impl Debug for RetryOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryOrchestrator").field("policy", &self.policy).finish()
	}
}
