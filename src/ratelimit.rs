//! Fixed-window admission gate keyed by tenant + API.
//!
//! The active limit is resolved per call: an enabled API-specific row, else an enabled
//! tenant-wide row, else the configured default. Admission and increment happen in one
//! atomic [`CounterStore::check_and_increment`] call, so concurrent adapters sharing the
//! store never admit more than `limit` requests per window. When the store is unreachable
//! the limiter fails open.

// self
use crate::{
	_prelude::*,
	config::{ConfigSource, RateLimitSettings},
	model::{ApiCode, TenantId},
	store::CounterStore,
};

const KEY_PREFIX: &str = "adapter:ratelimit:";

/// Limit in force for one admission decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveLimit {
	/// Admitted requests per window.
	pub limit: u64,
	/// Window length in seconds.
	pub window_secs: u64,
}
impl ActiveLimit {
	fn window(self) -> Duration {
		Duration::seconds(i64::try_from(self.window_secs.max(1)).unwrap_or(i64::MAX))
	}
}

/// Rate limiter over a shared [`CounterStore`].
#[derive(Clone)]
pub struct RateLimiter {
	config: Arc<dyn ConfigSource>,
	store: Arc<dyn CounterStore>,
	settings: RateLimitSettings,
}
impl RateLimiter {
	/// Creates a limiter reading rows from `config` and counting in `store`.
	pub fn new(
		config: Arc<dyn ConfigSource>,
		store: Arc<dyn CounterStore>,
		settings: RateLimitSettings,
	) -> Self {
		Self { config, store, settings }
	}

	/// Counter key for the tenant/API pair.
	pub fn key(tenant: TenantId, api: &ApiCode) -> String {
		format!("{KEY_PREFIX}{tenant}:{api}")
	}

	/// Admits one request or fails with [`Error::RateLimitExceeded`].
	pub async fn admit(&self, tenant: TenantId, api: &ApiCode) -> Result<()> {
		if !self.settings.enabled {
			return Ok(());
		}

		let active = self.resolve(tenant, api).await;
		let key = Self::key(tenant, api);

		match self.store.check_and_increment(&key, active.limit, active.window()).await {
			Ok(true) => Ok(()),
			Ok(false) => {
				tracing::warn!(
					%tenant,
					%api,
					limit = active.limit,
					window_secs = active.window_secs,
					"rate limit exceeded"
				);

				Err(Error::RateLimitExceeded { limit: active.limit, window_secs: active.window_secs })
			},
			Err(e) => {
				tracing::error!(%key, error = %e, "rate limit check failed; admitting request");

				Ok(())
			},
		}
	}

	/// Resolves the limit in force for the tenant/API pair.
	///
	/// Configuration lookup failures fall through to the next candidate.
	pub async fn resolve(&self, tenant: TenantId, api: &ApiCode) -> ActiveLimit {
		for scope in [Some(api), None] {
			match self.config.rate_limit_config(tenant, scope).await {
				Ok(Some(row)) if row.enabled =>
					return ActiveLimit { limit: row.limit, window_secs: row.window_secs },
				Ok(_) => {},
				Err(e) => {
					tracing::warn!(%tenant, %api, error = %e, "failed to read rate limit configuration");
				},
			}
		}

		ActiveLimit {
			limit: self.settings.default_limit,
			window_secs: self.settings.default_window_secs,
		}
	}
}
impl Debug for RateLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimiter").field("settings", &self.settings).finish()
	}
}
