//! Configuration collaborator contract and built-in configuration sources.
//!
//! The adapter never caches configuration: every message performs fresh lookups, so any
//! change made through a [`ConfigSource`] is observed on the next delivery.

pub mod file;
pub mod memory;
pub mod settings;

pub use file::FileConfig;
pub use memory::MemoryConfig;
pub use settings::*;

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	model::{
		ApiCode, ApiDefinition, ApiDefinitionId, ParameterMapping, RateLimitConfig, TenantCode,
		TenantId, TenantRecord,
	},
};

/// Boxed future returned by [`ConfigSource`] lookups.
pub type ConfigFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ConfigError>> + 'a + Send>>;

/// Read-only lookups the pipeline performs for every message.
pub trait ConfigSource
where
	Self: Send + Sync,
{
	/// Resolves an enabled tenant by code.
	fn active_tenant<'a>(&'a self, code: &'a TenantCode) -> ConfigFuture<'a, TenantRecord>;

	/// Resolves an enabled API definition for the tenant/API pair.
	fn active_api_definition<'a>(
		&'a self,
		tenant: &'a TenantCode,
		api: &'a ApiCode,
	) -> ConfigFuture<'a, ApiDefinition>;

	/// Returns the mappings of an API definition, sorted ascending by `order`.
	fn parameter_mappings(&self, api: ApiDefinitionId) -> ConfigFuture<'_, Vec<ParameterMapping>>;

	/// Returns the rate-limit row for the tenant and API; `None` selects the tenant-wide row.
	///
	/// Rows are returned whether or not they are enabled.
	fn rate_limit_config<'a>(
		&'a self,
		tenant: TenantId,
		api: Option<&'a ApiCode>,
	) -> ConfigFuture<'a, Option<RateLimitConfig>>;
}
impl<T> ConfigSource for Arc<T>
where
	T: ?Sized + ConfigSource,
{
	fn active_tenant<'a>(&'a self, code: &'a TenantCode) -> ConfigFuture<'a, TenantRecord> {
		(**self).active_tenant(code)
	}

	fn active_api_definition<'a>(
		&'a self,
		tenant: &'a TenantCode,
		api: &'a ApiCode,
	) -> ConfigFuture<'a, ApiDefinition> {
		(**self).active_api_definition(tenant, api)
	}

	fn parameter_mappings(&self, api: ApiDefinitionId) -> ConfigFuture<'_, Vec<ParameterMapping>> {
		(**self).parameter_mappings(api)
	}

	fn rate_limit_config<'a>(
		&'a self,
		tenant: TenantId,
		api: Option<&'a ApiCode>,
	) -> ConfigFuture<'a, Option<RateLimitConfig>> {
		(**self).rate_limit_config(tenant, api)
	}
}

/// Complete configuration document shared by the built-in sources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
	/// Registered tenants.
	#[serde(default)]
	pub tenants: Vec<TenantRecord>,
	/// Registered API definitions.
	#[serde(default)]
	pub api_definitions: Vec<ApiDefinition>,
	/// Parameter mappings of every API definition.
	#[serde(default)]
	pub parameter_mappings: Vec<ParameterMapping>,
	/// Rate-limit rows.
	#[serde(default)]
	pub rate_limits: Vec<RateLimitConfig>,
}
impl ConfigSnapshot {
	/// Resolves an enabled tenant by code.
	pub fn active_tenant(&self, code: &TenantCode) -> Result<TenantRecord, ConfigError> {
		let tenant = self
			.tenants
			.iter()
			.find(|t| &t.code == code)
			.ok_or_else(|| ConfigError::TenantNotFound { code: code.to_string() })?;

		if !tenant.enabled {
			return Err(ConfigError::TenantDisabled { code: code.to_string() });
		}

		Ok(tenant.clone())
	}

	/// Resolves an enabled API definition for the tenant/API pair.
	///
	/// The tenant itself is not required to be enabled here; callers check it first.
	pub fn active_api_definition(
		&self,
		tenant: &TenantCode,
		api: &ApiCode,
	) -> Result<ApiDefinition, ConfigError> {
		let not_found = || ConfigError::ApiNotFound { tenant: tenant.to_string(), api: api.to_string() };
		let tenant_id = self.tenants.iter().find(|t| &t.code == tenant).map(|t| t.id).ok_or_else(not_found)?;
		let definition = self
			.api_definitions
			.iter()
			.find(|d| d.tenant_id == tenant_id && &d.api_code == api)
			.ok_or_else(not_found)?;

		if !definition.enabled {
			return Err(ConfigError::ApiDisabled { tenant: tenant.to_string(), api: api.to_string() });
		}

		Ok(definition.clone())
	}

	/// Returns the mappings of `api` sorted ascending by `order`, stable for ties.
	pub fn parameter_mappings(&self, api: ApiDefinitionId) -> Vec<ParameterMapping> {
		let mut mappings = self
			.parameter_mappings
			.iter()
			.filter(|m| m.api_definition_id == api)
			.cloned()
			.collect::<Vec<_>>();

		mappings.sort_by_key(|m| m.order);

		mappings
	}

	/// Returns the row whose API scope matches `api` exactly.
	pub fn rate_limit_config(
		&self,
		tenant: TenantId,
		api: Option<&ApiCode>,
	) -> Option<RateLimitConfig> {
		self.rate_limits
			.iter()
			.find(|row| row.tenant_id == tenant && row.api_code.as_ref() == api)
			.cloned()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::model::MappingTarget;

	fn snapshot() -> ConfigSnapshot {
		let tenant = |id, code: &str, enabled| TenantRecord {
			id: TenantId(id),
			code: TenantCode::new(code).expect("Tenant code fixture is valid."),
			name: code.to_uppercase(),
			enabled,
		};
		let api = |id, tenant_id, code: &str, enabled| ApiDefinition {
			id: ApiDefinitionId(id),
			tenant_id: TenantId(tenant_id),
			api_code: ApiCode::new(code).expect("API code fixture is valid."),
			url: "https://example.com".into(),
			method: "GET".into(),
			content_type: "application/json".into(),
			timeout_ms: 0,
			max_retries: 0,
			enabled,
		};

		ConfigSnapshot {
			tenants: vec![tenant(1, "acme", true), tenant(2, "dormant", false)],
			api_definitions: vec![api(10, 1, "orders", true), api(11, 1, "legacy", false)],
			parameter_mappings: vec![
				ParameterMapping::new(ApiDefinitionId(10), MappingTarget::Header, "b").with_order(2),
				ParameterMapping::new(ApiDefinitionId(11), MappingTarget::Header, "x"),
				ParameterMapping::new(ApiDefinitionId(10), MappingTarget::Header, "a").with_order(1),
			],
			rate_limits: Vec::new(),
		}
	}

	fn code(raw: &str) -> TenantCode {
		TenantCode::new(raw).expect("Tenant code fixture is valid.")
	}

	fn api_code(raw: &str) -> ApiCode {
		ApiCode::new(raw).expect("API code fixture is valid.")
	}

	#[test]
	fn tenant_lookup_distinguishes_missing_and_disabled() {
		let snapshot = snapshot();

		assert_eq!(snapshot.active_tenant(&code("acme")).expect("Tenant should resolve.").id, TenantId(1));
		assert!(matches!(
			snapshot.active_tenant(&code("ghost")),
			Err(ConfigError::TenantNotFound { .. })
		));
		assert!(matches!(
			snapshot.active_tenant(&code("dormant")),
			Err(ConfigError::TenantDisabled { .. })
		));
	}

	#[test]
	fn api_lookup_distinguishes_missing_and_disabled() {
		let snapshot = snapshot();

		assert_eq!(
			snapshot
				.active_api_definition(&code("acme"), &api_code("orders"))
				.expect("API should resolve.")
				.id,
			ApiDefinitionId(10)
		);
		assert!(matches!(
			snapshot.active_api_definition(&code("acme"), &api_code("refunds")),
			Err(ConfigError::ApiNotFound { .. })
		));
		assert!(matches!(
			snapshot.active_api_definition(&code("acme"), &api_code("legacy")),
			Err(ConfigError::ApiDisabled { .. })
		));
	}

	#[test]
	fn mappings_are_filtered_and_sorted() {
		let keys = snapshot()
			.parameter_mappings(ApiDefinitionId(10))
			.into_iter()
			.map(|m| m.key)
			.collect::<Vec<_>>();

		assert_eq!(keys, ["a", "b"]);
	}
}
