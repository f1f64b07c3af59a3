#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use httpmock::MockServer;
use serde_json::{Value, json};
// self
use http_adapter::{
	adapter::Adapter,
	audit::MemoryAuditSink,
	config::{AdapterSettings, MemoryConfig},
	dead_letter::MemoryDeadLetterSink,
	intake::{Intake, MemoryBroker},
	model::{
		ApiCode, ApiDefinition, ApiDefinitionId, ParameterMapping, TenantCode, TenantId,
		TenantRecord,
	},
	retry::RetryPolicy,
	store::MemoryCounterStore,
};

pub const TENANT_ID: TenantId = TenantId(1);
pub const API_ID: ApiDefinitionId = ApiDefinitionId(10);
pub const TENANT: &str = "acme";
pub const API: &str = "create-order";

/// In-memory collaborators around one tenant and one API definition.
pub struct TestBed {
	pub config: MemoryConfig,
	pub counters: MemoryCounterStore,
	pub dead_letters: MemoryDeadLetterSink,
	pub audit: MemoryAuditSink,
	pub broker: MemoryBroker,
	pub settings: AdapterSettings,
}
impl TestBed {
	pub fn new(server: &MockServer, method: &str, path: &str, max_retries: u32) -> Self {
		let config = MemoryConfig::default();

		config.upsert_tenant(TenantRecord {
			id: TENANT_ID,
			code: TenantCode::new(TENANT).expect("Tenant code fixture should be valid."),
			name: "Acme".into(),
			enabled: true,
		});
		config.upsert_api_definition(api_definition(server, method, path, max_retries));

		Self {
			config,
			counters: MemoryCounterStore::default(),
			dead_letters: MemoryDeadLetterSink::default(),
			audit: MemoryAuditSink::default(),
			broker: MemoryBroker::default(),
			settings: AdapterSettings::default(),
		}
	}

	pub fn with_mappings(self, mappings: Vec<ParameterMapping>) -> Self {
		self.config.set_parameter_mappings(API_ID, mappings);

		self
	}

	pub fn adapter(&self) -> Adapter {
		Adapter::new(
			Arc::new(self.config.clone()),
			Arc::new(self.counters.clone()),
			Arc::new(self.dead_letters.clone()),
			&self.settings,
		)
		.expect("Reqwest adapter should build.")
		.with_audit(Arc::new(self.audit.clone()))
		.with_retry_policy(fast_policy())
	}

	pub fn intake(&self) -> Intake {
		Intake::new(Arc::new(self.broker.clone()), self.adapter())
	}

	pub fn retry_counter(&self, correlation_id: &str) -> Option<u64> {
		self.counters.get(&format!("{}{correlation_id}", self.settings.dead_letter.counter_prefix))
	}
}

pub fn api_definition(
	server: &MockServer,
	method: &str,
	path: &str,
	max_retries: u32,
) -> ApiDefinition {
	ApiDefinition {
		id: API_ID,
		tenant_id: TENANT_ID,
		api_code: api_code(),
		url: server.url(path),
		method: method.into(),
		content_type: "application/json".into(),
		timeout_ms: 2_000,
		max_retries,
		enabled: true,
	}
}

pub fn api_code() -> ApiCode {
	ApiCode::new(API).expect("API code fixture should be valid.")
}

pub fn fast_policy() -> RetryPolicy {
	RetryPolicy { base: Duration::from_millis(1), max: Duration::from_millis(5) }
}

pub fn envelope(correlation_id: &str, body: Value) -> Vec<u8> {
	json!({
		"tenantCode": TENANT,
		"apiCode": API,
		"correlationId": correlation_id,
		"messageBody": body,
		"userInfo": { "userId": "u-9", "userName": "Ada", "extra": { "region": "eu" } }
	})
	.to_string()
	.into_bytes()
}
