//! HTTP execution engine.
//!
//! [`HttpExecutor`] is the pipeline's only dependency on an HTTP stack. One call to
//! [`HttpExecutor::send`] performs exactly one network attempt and reports it as an
//! [`AttemptOutcome`]: timeouts, connection failures, and non-2xx responses are all data,
//! never errors. Only requests that cannot be put on the wire at all (an unparsable URL,
//! an unencodable header) surface as [`ExecutionError`].

// std
#[cfg(feature = "reqwest")] use std::time::Instant;
// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Method,
	header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
#[cfg(feature = "reqwest")] use crate::{config::HttpSettings, model::HttpMethod};
use crate::{
	_prelude::*,
	error::ExecutionError,
	model::{AttemptOutcome, RequestDescription},
};

/// Boxed future returned by [`HttpExecutor::send`].
pub type AttemptFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AttemptOutcome, ExecutionError>> + 'a + Send>>;

/// Issues one HTTP attempt for a compiled request.
///
/// Implementations must measure wall-clock latency whatever the outcome and must honor
/// [`RequestDescription::timeout_ms`] when it is non-zero.
pub trait HttpExecutor
where
	Self: Send + Sync,
{
	/// Performs one attempt.
	fn send<'a>(&'a self, request: &'a RequestDescription) -> AttemptFuture<'a>;
}
impl<T> HttpExecutor for Arc<T>
where
	T: ?Sized + HttpExecutor,
{
	fn send<'a>(&'a self, request: &'a RequestDescription) -> AttemptFuture<'a> {
		(**self).send(request)
	}
}

/// Reqwest-backed executor sharing one pooled client across all tenants.
///
/// Redirects follow reqwest's default policy. The client-level timeout is left unset;
/// every request carries its own timeout (the API definition's, else the configured
/// default).
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestExecutor {
	client: ReqwestClient,
	default_timeout: std::time::Duration,
}
#[cfg(feature = "reqwest")]
impl ReqwestExecutor {
	/// Builds a pooled client from `settings`.
	pub fn new(settings: &HttpSettings) -> Result<Self, ExecutionError> {
		let client = ReqwestClient::builder()
			.connect_timeout(std::time::Duration::from_millis(settings.connect_timeout_ms))
			.pool_idle_timeout(std::time::Duration::from_secs(settings.pool_idle_timeout_secs))
			.pool_max_idle_per_host(settings.pool_max_idle_per_host)
			.build()
			.map_err(ExecutionError::client_build)?;

		Ok(Self::with_client(client, settings.default_timeout_ms))
	}

	/// Wraps an existing client.
	pub fn with_client(client: ReqwestClient, default_timeout_ms: u64) -> Self {
		Self { client, default_timeout: std::time::Duration::from_millis(default_timeout_ms) }
	}

	fn timeout(&self, request: &RequestDescription) -> std::time::Duration {
		match request.timeout_ms {
			0 => self.default_timeout,
			ms => std::time::Duration::from_millis(ms),
		}
	}

	fn build(&self, request: &RequestDescription) -> Result<reqwest::Request, ExecutionError> {
		let mut url = Url::parse(&request.url)
			.map_err(|source| ExecutionError::InvalidUrl { url: request.url.clone(), source })?;

		if !request.query_params.is_empty() {
			url.query_pairs_mut().extend_pairs(&request.query_params);
		}

		let headers = header_map(request)?;
		let mut builder = self
			.client
			.request(method(request.method), url)
			.headers(headers)
			.timeout(self.timeout(request));

		if request.carries_body() {
			builder = builder.body(request.encoded_body());
		}

		builder.build().map_err(ExecutionError::client_build)
	}

	async fn attempt(&self, request: &RequestDescription) -> Result<AttemptOutcome, ExecutionError> {
		let prepared = self.build(request)?;
		let started = Instant::now();
		let outcome = match self.client.execute(prepared).await {
			Ok(response) => {
				let status = response.status().as_u16();
				let body = match response.text().await {
					Ok(text) => Some(text),
					Err(e) => {
						tracing::debug!(error = %e, "failed to read response body");

						None
					},
				};

				AttemptOutcome::response(status, body, elapsed_ms(started))
			},
			Err(e) => AttemptOutcome::transport_failure(describe(&e), elapsed_ms(started)),
		};

		tracing::debug!(
			method = %request.method,
			url = %request.url,
			status = ?outcome.status,
			latency_ms = outcome.latency_ms,
			"http attempt finished"
		);

		Ok(outcome)
	}
}
#[cfg(feature = "reqwest")]
impl HttpExecutor for ReqwestExecutor {
	fn send<'a>(&'a self, request: &'a RequestDescription) -> AttemptFuture<'a> {
		Box::pin(self.attempt(request))
	}
}

#[cfg(feature = "reqwest")]
fn method(method: HttpMethod) -> Method {
	match method {
		HttpMethod::Get => Method::GET,
		HttpMethod::Post => Method::POST,
		HttpMethod::Put => Method::PUT,
		HttpMethod::Patch => Method::PATCH,
		HttpMethod::Delete => Method::DELETE,
	}
}

// Keys differing only in case are sent as separate header lines.
#[cfg(feature = "reqwest")]
fn header_map(request: &RequestDescription) -> Result<HeaderMap, ExecutionError> {
	let mut headers = HeaderMap::with_capacity(request.headers.len() + 1);

	for (name, value) in &request.headers {
		let invalid = || ExecutionError::InvalidHeader { name: name.clone() };
		let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
		let value = HeaderValue::from_str(value).map_err(|_| invalid())?;

		headers.append(name, value);
	}

	if request.carries_body() && !headers.contains_key(CONTENT_TYPE) {
		let value = HeaderValue::from_str(&request.content_type)
			.map_err(|_| ExecutionError::InvalidHeader { name: CONTENT_TYPE.to_string() })?;

		headers.insert(CONTENT_TYPE, value);
	}

	Ok(headers)
}

#[cfg(feature = "reqwest")]
fn describe(e: &ReqwestError) -> String {
	if e.is_timeout() {
		return "request timed out".into();
	}

	let mut detail = e.to_string();
	let mut source = e.source();

	while let Some(cause) = source {
		detail.push_str(": ");
		detail.push_str(&cause.to_string());

		source = cause.source();
	}

	detail
}

#[cfg(feature = "reqwest")]
fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
