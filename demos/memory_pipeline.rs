//! Runs the full pipeline against a mocked downstream with in-memory collaborators.
//!
//! The first message succeeds. The second keeps hitting a failing endpoint and is
//! dead-lettered on its third delivery. The third arrives after the rate limit window is
//! spent and is rejected.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use http_adapter::{
	adapter::Adapter,
	audit::MemoryAuditSink,
	config::{AdapterSettings, MemoryConfig},
	dead_letter::MemoryDeadLetterSink,
	intake::{Intake, MemoryBroker},
	model::{
		ApiCode, ApiDefinition, ApiDefinitionId, MappingTarget, ParameterMapping,
		RateLimitConfig, TenantCode, TenantId, TenantRecord,
	},
	retry::RetryPolicy,
	store::MemoryCounterStore,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let orders = server
		.mock_async(|when, then| {
			when.method(POST).path("/orders").header("x-correlation-id", "demo-ok");
			then.status(201).body("{\"status\":\"created\"}");
		})
		.await;
	let failing = server
		.mock_async(|when, then| {
			when.method(POST).path("/orders").header("x-correlation-id", "demo-fail");
			then.status(503);
		})
		.await;
	let config = MemoryConfig::default();
	let api_code = ApiCode::new("create-order")?;

	config.upsert_tenant(TenantRecord {
		id: TenantId(1),
		code: TenantCode::new("acme")?,
		name: "Acme".into(),
		enabled: true,
	});
	config.upsert_api_definition(ApiDefinition {
		id: ApiDefinitionId(1),
		tenant_id: TenantId(1),
		api_code: api_code.clone(),
		url: server.url("/orders"),
		method: "POST".into(),
		content_type: "application/json".into(),
		timeout_ms: 2_000,
		max_retries: 1,
		enabled: true,
	});
	config.set_parameter_mappings(ApiDefinitionId(1), vec![
		ParameterMapping::new(ApiDefinitionId(1), MappingTarget::Header, "X-Correlation-Id")
			.from_context("correlationId"),
		ParameterMapping::new(ApiDefinitionId(1), MappingTarget::Body, "orderId")
			.from_message("$.order.id")
			.required(),
		ParameterMapping::new(ApiDefinitionId(1), MappingTarget::Body, "total")
			.from_message("$.order.total"),
	]);
	config.upsert_rate_limit(RateLimitConfig {
		tenant_id: TenantId(1),
		api_code: Some(api_code),
		limit: 4,
		window_secs: 60,
		enabled: true,
	});

	let dead_letters = MemoryDeadLetterSink::default();
	let audit = MemoryAuditSink::default();
	let broker = MemoryBroker::default();
	let adapter = Adapter::new(
		Arc::new(config),
		Arc::new(MemoryCounterStore::default()),
		Arc::new(dead_letters.clone()),
		&AdapterSettings::default(),
	)?
	.with_audit(Arc::new(audit.clone()))
	.with_retry_policy(RetryPolicy {
		base: Duration::from_millis(10),
		max: Duration::from_millis(50),
	});

	for (correlation_id, order) in [("demo-ok", "A1"), ("demo-fail", "A2"), ("demo-limited", "A3")] {
		broker.publish(
			json!({
				"tenantCode": "acme",
				"apiCode": "create-order",
				"correlationId": correlation_id,
				"messageBody": { "order": { "id": order, "total": 42.5 } }
			})
			.to_string(),
		);
	}

	let stats = Intake::new(Arc::new(broker), adapter).run().await;

	println!("Intake finished: {stats:?}.");
	println!("Audited attempts: {}.", audit.records().len());

	for record in dead_letters.records() {
		println!("Dead letter: {}.", String::from_utf8_lossy(&record.to_json()?));
	}

	orders.assert_async().await;
	failing.assert_calls_async(6).await;

	Ok(())
}
