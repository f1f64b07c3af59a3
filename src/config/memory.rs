//! Mutable in-process [`ConfigSource`] for tests, demos, and embedded deployments.

// self
use crate::{
	_prelude::*,
	config::{ConfigFuture, ConfigSnapshot, ConfigSource},
	model::{
		ApiCode, ApiDefinition, ApiDefinitionId, ParameterMapping, RateLimitConfig, TenantCode,
		TenantId, TenantRecord,
	},
};

/// Thread-safe configuration registry; writes are visible to the next lookup.
#[derive(Clone, Debug, Default)]
pub struct MemoryConfig(Arc<RwLock<ConfigSnapshot>>);
impl MemoryConfig {
	/// Wraps an existing snapshot.
	pub fn new(snapshot: ConfigSnapshot) -> Self {
		Self(Arc::new(RwLock::new(snapshot)))
	}

	/// Inserts or replaces a tenant (matched by id).
	pub fn upsert_tenant(&self, tenant: TenantRecord) {
		let mut guard = self.0.write();

		guard.tenants.retain(|t| t.id != tenant.id);
		guard.tenants.push(tenant);
	}

	/// Inserts or replaces an API definition (matched by id).
	pub fn upsert_api_definition(&self, api: ApiDefinition) {
		let mut guard = self.0.write();

		guard.api_definitions.retain(|d| d.id != api.id);
		guard.api_definitions.push(api);
	}

	/// Replaces every mapping of `api`.
	pub fn set_parameter_mappings(&self, api: ApiDefinitionId, mappings: Vec<ParameterMapping>) {
		let mut guard = self.0.write();

		guard.parameter_mappings.retain(|m| m.api_definition_id != api);
		guard.parameter_mappings.extend(mappings.into_iter().map(|mut m| {
			m.api_definition_id = api;

			m
		}));
	}

	/// Inserts or replaces a rate-limit row (matched by tenant and API scope).
	pub fn upsert_rate_limit(&self, row: RateLimitConfig) {
		let mut guard = self.0.write();

		guard.rate_limits.retain(|r| !(r.tenant_id == row.tenant_id && r.api_code == row.api_code));
		guard.rate_limits.push(row);
	}

	/// Returns a copy of the current configuration.
	pub fn snapshot(&self) -> ConfigSnapshot {
		self.0.read().clone()
	}
}
impl ConfigSource for MemoryConfig {
	fn active_tenant<'a>(&'a self, code: &'a TenantCode) -> ConfigFuture<'a, TenantRecord> {
		Box::pin(async move { self.0.read().active_tenant(code) })
	}

	fn active_api_definition<'a>(
		&'a self,
		tenant: &'a TenantCode,
		api: &'a ApiCode,
	) -> ConfigFuture<'a, ApiDefinition> {
		Box::pin(async move { self.0.read().active_api_definition(tenant, api) })
	}

	fn parameter_mappings(&self, api: ApiDefinitionId) -> ConfigFuture<'_, Vec<ParameterMapping>> {
		Box::pin(async move { Ok(self.0.read().parameter_mappings(api)) })
	}

	fn rate_limit_config<'a>(
		&'a self,
		tenant: TenantId,
		api: Option<&'a ApiCode>,
	) -> ConfigFuture<'a, Option<RateLimitConfig>> {
		Box::pin(async move { Ok(self.0.read().rate_limit_config(tenant, api)) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{error::ConfigError, model::MappingTarget};

	fn tenant(enabled: bool) -> TenantRecord {
		TenantRecord {
			id: TenantId(1),
			code: TenantCode::new("acme").expect("Tenant code fixture is valid."),
			name: "Acme".into(),
			enabled,
		}
	}

	#[tokio::test]
	async fn changes_are_visible_on_next_lookup() {
		let config = MemoryConfig::default();
		let code = TenantCode::new("acme").expect("Tenant code fixture is valid.");

		config.upsert_tenant(tenant(true));

		assert!(config.active_tenant(&code).await.is_ok());

		config.upsert_tenant(tenant(false));

		assert!(matches!(
			config.active_tenant(&code).await,
			Err(ConfigError::TenantDisabled { .. })
		));
		assert_eq!(config.snapshot().tenants.len(), 1);
	}

	#[tokio::test]
	async fn rate_limit_rows_match_scope_exactly() {
		let config = MemoryConfig::default();
		let orders = ApiCode::new("orders").expect("API code fixture is valid.");
		let row = |api_code: Option<ApiCode>, limit| RateLimitConfig {
			tenant_id: TenantId(1),
			api_code,
			limit,
			window_secs: 1,
			enabled: true,
		};

		config.upsert_rate_limit(row(None, 100));
		config.upsert_rate_limit(row(Some(orders.clone()), 5));
		config.upsert_rate_limit(row(Some(orders.clone()), 7));

		let scoped = config
			.rate_limit_config(TenantId(1), Some(&orders))
			.await
			.expect("Lookup should succeed.")
			.expect("API row should exist.");
		let wide = config
			.rate_limit_config(TenantId(1), None)
			.await
			.expect("Lookup should succeed.")
			.expect("Tenant-wide row should exist.");

		assert_eq!(scoped.limit, 7);
		assert_eq!(wide.limit, 100);
	}

	#[tokio::test]
	async fn mappings_are_rebound_to_their_definition() {
		let config = MemoryConfig::default();

		config.set_parameter_mappings(
			ApiDefinitionId(3),
			vec![
				ParameterMapping::new(ApiDefinitionId(0), MappingTarget::Query, "late").with_order(9),
				ParameterMapping::new(ApiDefinitionId(0), MappingTarget::Query, "early"),
			],
		);

		let mappings =
			config.parameter_mappings(ApiDefinitionId(3)).await.expect("Lookup should succeed.");

		assert_eq!(mappings[0].key, "early");
		assert!(mappings.iter().all(|m| m.api_definition_id == ApiDefinitionId(3)));
	}
}
