//! Per-delivery pipeline facade.

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestExecutor;
use crate::{
	_prelude::*,
	ack::{AckController, Disposition, ProcessOutcome},
	audit::{AuditSink, TracingAuditSink},
	compile,
	config::{AdapterSettings, ConfigSource},
	dead_letter::{DeadLetterEscalator, DeadLetterSink},
	error::ExecutionError,
	http::HttpExecutor,
	model::InboundMessage,
	obs::MessageSpan,
	ratelimit::RateLimiter,
	retry::{RetryOrchestrator, RetryPolicy, ShutdownSignal},
	store::CounterStore,
};

/// Turns one broker delivery into at most `maxRetries + 1` HTTP attempts and a
/// [`Disposition`].
///
/// The adapter is cheap to clone; every collaborator sits behind an [`Arc`], so one
/// instance can serve any number of concurrent deliveries.
#[derive(Clone)]
pub struct Adapter {
	config: Arc<dyn ConfigSource>,
	limiter: RateLimiter,
	orchestrator: RetryOrchestrator,
	acks: AckController,
}
impl Adapter {
	/// Assembles an adapter around a caller-provided HTTP executor.
	///
	/// The counter store backs both the rate limiter and the cross-delivery retry
	/// counters. Attempts are audited through [`TracingAuditSink`] until
	/// [`Adapter::with_audit`] replaces it.
	pub fn with_executor(
		config: Arc<dyn ConfigSource>,
		counters: Arc<dyn CounterStore>,
		dead_letters: Arc<dyn DeadLetterSink>,
		executor: Arc<dyn HttpExecutor>,
		settings: &AdapterSettings,
	) -> Self {
		let limiter =
			RateLimiter::new(config.clone(), counters.clone(), settings.rate_limit.clone());
		let orchestrator = RetryOrchestrator::new(executor, Arc::new(TracingAuditSink))
			.with_policy(RetryPolicy::from(&settings.retry));
		let acks = AckController::new(DeadLetterEscalator::new(
			counters,
			dead_letters,
			settings.dead_letter.clone(),
		));

		Self { config, limiter, orchestrator, acks }
	}

	/// Replaces the audit sink.
	pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
		self.orchestrator = self.orchestrator.with_audit(audit);

		self
	}

	/// Overrides the local backoff policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.orchestrator = self.orchestrator.with_policy(policy);

		self
	}

	/// Lets `shutdown` cut local backoff pauses short.
	pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
		self.orchestrator = self.orchestrator.with_shutdown(shutdown);

		self
	}

	/// Decodes, processes, and settles one delivery.
	///
	/// Never fails: every outcome, including an undecodable payload, maps onto a
	/// [`Disposition`] the intake loop applies to the broker.
	pub async fn handle(&self, payload: &[u8], delivery_id: Option<&str>) -> Disposition {
		let disposition = match InboundMessage::decode(payload, delivery_id) {
			Ok(message) =>
				MessageSpan::new(&message)
					.wrap(async {
						let outcome = self.process(&message).await;

						self.acks.settle(&outcome, payload, Some(&message.correlation_id)).await
					})
					.await,
			Err(e) => {
				let correlation_id = InboundMessage::peek_correlation_id(payload);
				let outcome = ProcessOutcome::Rejected(e);

				MessageSpan::undecoded(correlation_id.as_deref())
					.wrap(self.acks.settle(&outcome, payload, None))
					.await
			},
		};

		tracing::debug!(%disposition, "delivery settled");

		disposition
	}

	/// Runs the pipeline for a decoded message without settling it.
	///
	/// Stages run in order: tenant lookup, API lookup, rate limiting, mapping lookup,
	/// compilation, then the local retry loop. The first failing stage ends processing.
	pub async fn process(&self, message: &InboundMessage) -> ProcessOutcome {
		match self.run(message).await {
			Ok(outcome) => outcome,
			Err(e) => ProcessOutcome::Rejected(e),
		}
	}

	async fn run(&self, message: &InboundMessage) -> Result<ProcessOutcome> {
		let tenant = self.config.active_tenant(&message.tenant_code).await?;
		let api =
			self.config.active_api_definition(&message.tenant_code, &message.api_code).await?;

		self.limiter.admit(tenant.id, &message.api_code).await?;

		let mappings = self.config.parameter_mappings(api.id).await?;
		let request = compile::compile(&api, &mappings, message)?;

		tracing::debug!(method = %request.method, url = %request.url, "request compiled");

		let report = self.orchestrator.execute(&request, api.max_retries).await?;
		let retry_eligible = self.orchestrator.policy().is_retry_eligible(&report.outcome);

		Ok(ProcessOutcome::from_report(report, retry_eligible))
	}
}
#[cfg(feature = "reqwest")]
impl Adapter {
	/// Assembles an adapter with a pooled reqwest executor built from `settings.http`.
	pub fn new(
		config: Arc<dyn ConfigSource>,
		counters: Arc<dyn CounterStore>,
		dead_letters: Arc<dyn DeadLetterSink>,
		settings: &AdapterSettings,
	) -> Result<Self, ExecutionError> {
		let executor = ReqwestExecutor::new(&settings.http)?;

		Ok(Self::with_executor(config, counters, dead_letters, Arc::new(executor), settings))
	}
}
impl Debug for Adapter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Adapter")
			.field("orchestrator", &self.orchestrator)
			.field("acks", &self.acks)
			.finish()
	}
}
