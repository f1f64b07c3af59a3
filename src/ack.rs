//! Failure classification and the acknowledgment decision for one delivery.
//!
//! Processing ends in a [`ProcessOutcome`]. [`Verdict::of`] maps it onto the failure
//! taxonomy, and [`AckController::settle`] turns the verdict into a [`Disposition`]:
//!
//! | Verdict | Disposition |
//! | --- | --- |
//! | success, or a final non-retryable response | [`Disposition::AckedSuccess`] |
//! | business, validation, or fatal failure | [`Disposition::AckedTerminal`] |
//! | retryable failure below the redelivery threshold | [`Disposition::WithheldRetry`] |
//! | retryable failure at the threshold | [`Disposition::AckedDeadLettered`] |
//! | local retries abandoned for shutdown | [`Disposition::WithheldRetry`] |

// self
use crate::{
	_prelude::*,
	dead_letter::{DeadLetterEscalator, Escalation},
	error::FailureClass,
	model::CorrelationId,
	obs,
	retry::RetryReport,
};

/// How processing of one delivery ended.
#[derive(Debug)]
pub enum ProcessOutcome {
	/// The retry loop ended on a 2xx or on a final non-retryable response.
	Completed(RetryReport),
	/// The retry loop spent its budget on retry-eligible outcomes.
	Exhausted(RetryReport),
	/// Shutdown cut the retry loop short.
	Interrupted(RetryReport),
	/// Processing failed before or outside the retry loop.
	Rejected(Error),
}
impl ProcessOutcome {
	/// Classifies a finished retry loop.
	pub fn from_report(report: RetryReport, retry_eligible: bool) -> Self {
		if report.interrupted {
			ProcessOutcome::Interrupted(report)
		} else if report.outcome.is_success() || !retry_eligible {
			ProcessOutcome::Completed(report)
		} else {
			ProcessOutcome::Exhausted(report)
		}
	}

	/// Failure detail carried into logs and dead-letter records.
	pub fn failure_detail(&self) -> Option<String> {
		match self {
			ProcessOutcome::Completed(report) if report.outcome.is_success() => None,
			ProcessOutcome::Completed(report)
			| ProcessOutcome::Exhausted(report)
			| ProcessOutcome::Interrupted(report) => Some(report.outcome.describe_failure()),
			ProcessOutcome::Rejected(e) => Some(e.to_string()),
		}
	}
}

/// Classification of a [`ProcessOutcome`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
	/// Acknowledge and clear the retry counter.
	Success,
	/// Acknowledge without retrying; the class picks the log level.
	Terminal(FailureClass),
	/// Count the failure and escalate.
	Retryable,
	/// Leave unacknowledged without counting.
	Interrupted,
}
impl Verdict {
	/// Maps an outcome onto the failure taxonomy.
	pub fn of(outcome: &ProcessOutcome) -> Self {
		match outcome {
			ProcessOutcome::Completed(_) => Verdict::Success,
			ProcessOutcome::Exhausted(_) => Verdict::Retryable,
			ProcessOutcome::Interrupted(_) => Verdict::Interrupted,
			ProcessOutcome::Rejected(e) => match e.class() {
				FailureClass::Retryable => Verdict::Retryable,
				class => Verdict::Terminal(class),
			},
		}
	}
}

/// Terminal state of one delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
	/// Acknowledged after a successful (or final) HTTP exchange.
	AckedSuccess,
	/// Acknowledged after a non-retryable failure.
	AckedTerminal,
	/// Left unacknowledged so the broker redelivers it.
	WithheldRetry,
	/// Acknowledged after publishing a dead-letter record.
	AckedDeadLettered,
}
impl Disposition {
	/// Returns `true` when the delivery must be acknowledged.
	pub const fn acknowledges(self) -> bool {
		!matches!(self, Disposition::WithheldRetry)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Disposition::AckedSuccess => "acked_success",
			Disposition::AckedTerminal => "acked_terminal",
			Disposition::WithheldRetry => "withheld_retry",
			Disposition::AckedDeadLettered => "acked_dead_lettered",
		}
	}
}
impl Display for Disposition {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Turns verdicts into dispositions, consulting the escalator for retryable failures.
#[derive(Clone, Debug)]
pub struct AckController {
	escalator: DeadLetterEscalator,
}
impl AckController {
	/// Creates a controller over `escalator`.
	pub fn new(escalator: DeadLetterEscalator) -> Self {
		Self { escalator }
	}

	/// Settles one delivery.
	///
	/// `correlation_id` is absent only when the payload never decoded, which is always a
	/// terminal validation failure.
	pub async fn settle(
		&self,
		outcome: &ProcessOutcome,
		payload: &[u8],
		correlation_id: Option<&CorrelationId>,
	) -> Disposition {
		let disposition = match (Verdict::of(outcome), correlation_id) {
			(Verdict::Success, cid) => {
				if let ProcessOutcome::Completed(report) = outcome {
					if report.outcome.is_success() {
						tracing::info!(status = ?report.outcome.status, attempts = report.attempts, "http request succeeded");
					} else {
						tracing::warn!(
							status = ?report.outcome.status,
							attempts = report.attempts,
							"http request returned a final non-retryable response"
						);
					}
				}
				if let Some(cid) = cid {
					self.escalator.clear(cid).await;
				}

				Disposition::AckedSuccess
			},
			(Verdict::Terminal(class), _) => {
				let detail = outcome.failure_detail().unwrap_or_default();

				match class {
					FailureClass::Fatal =>
						tracing::error!(class = %class, detail, "unexpected failure; acknowledging"),
					_ => tracing::warn!(class = %class, detail, "non-retryable failure; acknowledging"),
				}

				Disposition::AckedTerminal
			},
			(Verdict::Retryable, Some(cid)) => {
				let detail = outcome.failure_detail().unwrap_or_default();

				match self.escalator.escalate_if_needed(payload, cid, &detail).await {
					Escalation::Withhold { .. } => Disposition::WithheldRetry,
					Escalation::DeadLettered { .. } => Disposition::AckedDeadLettered,
				}
			},
			(Verdict::Retryable, None) => {
				tracing::error!("retryable failure without a correlation id; acknowledging");

				Disposition::AckedTerminal
			},
			(Verdict::Interrupted, _) => {
				tracing::info!("shutdown interrupted local retries; withholding acknowledgment");

				Disposition::WithheldRetry
			},
		};

		obs::record_disposition(disposition);

		disposition
	}
}
