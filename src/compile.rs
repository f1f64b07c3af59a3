//! Request compiler: API definition + ordered parameter mappings + message → request.
//!
//! Compilation is pure. Mappings are applied in ascending `order` (stable for equal
//! orders), so a later mapping overwrites an earlier one at the same target + key.
//! Values that resolve to nothing are skipped instead of being written as null, and
//! unknown targets or sources are logged and skipped.

pub mod path;

pub use path::{JsonPath, PathError};

// self
use crate::{
	_prelude::*,
	model::{
		ApiDefinition, BodyValue, HttpMethod, InboundMessage, MappingTarget, ParameterMapping,
		RequestDescription, SourceKind,
	},
};

/// Builds the outbound request for `message`.
///
/// Fails with [`Error::MissingRequiredParameter`] when a required mapping resolves to an
/// empty value and with [`Error::UnsupportedMethod`] when the definition's method is not
/// one the execution engine can issue.
pub fn compile(
	api: &ApiDefinition,
	mappings: &[ParameterMapping],
	message: &InboundMessage,
) -> Result<RequestDescription> {
	let method = api.method.parse::<HttpMethod>()?;
	let mut request = RequestDescription {
		url: api.url.clone(),
		method,
		content_type: api.content_type.clone(),
		headers: BTreeMap::new(),
		query_params: BTreeMap::new(),
		body_fields: BTreeMap::new(),
		timeout_ms: api.timeout_ms,
		correlation_id: message.correlation_id.clone(),
		tenant_code: message.tenant_code.clone(),
		api_code: message.api_code.clone(),
	};
	let mut ordered = mappings.iter().collect::<Vec<_>>();

	ordered.sort_by_key(|mapping| mapping.order);

	for mapping in ordered {
		if let MappingTarget::Unknown(raw) = &mapping.target {
			tracing::warn!(
				correlation_id = %message.correlation_id,
				key = %mapping.key,
				target = %raw,
				"skipping mapping with unknown target"
			);

			continue;
		}

		let value = match &mapping.source {
			SourceKind::Fixed => mapping.value.clone(),
			SourceKind::Message => mapping
				.expression
				.as_deref()
				.and_then(|expression| resolve_message(expression, message)),
			SourceKind::Context => mapping
				.expression
				.as_deref()
				.and_then(|expression| resolve_context(expression, message)),
			SourceKind::Unknown(raw) => {
				tracing::warn!(
					correlation_id = %message.correlation_id,
					key = %mapping.key,
					source = %raw,
					"skipping mapping with unknown source"
				);

				continue;
			},
		};

		if mapping.required && value.as_deref().is_none_or(|v| v.trim().is_empty()) {
			return Err(Error::MissingRequiredParameter { key: mapping.key.clone() });
		}

		let Some(value) = value else {
			continue;
		};

		apply(&mut request, mapping, value);
	}

	Ok(request)
}

fn apply(request: &mut RequestDescription, mapping: &ParameterMapping, value: String) {
	match &mapping.target {
		MappingTarget::Header => {
			request.headers.insert(mapping.key.clone(), value);
		},
		MappingTarget::Query => {
			request.query_params.insert(mapping.key.clone(), value);
		},
		MappingTarget::Body => {
			request.body_fields.insert(mapping.key.clone(), BodyValue::coerce(&value));
		},
		MappingTarget::Path => {
			request.url = request.url.replace(&format!("{{{}}}", mapping.key), &value);
		},
		MappingTarget::Unknown(_) => {},
	}
}

/// Evaluates a JSONPath expression against the message body.
///
/// Missing paths and evaluation errors both resolve to `None`; only the latter is logged
/// at warn level. Strings are returned verbatim, other scalars and containers as JSON text,
/// and `null` as `None`.
pub fn resolve_message(expression: &str, message: &InboundMessage) -> Option<String> {
	if message.body.is_null() {
		return None;
	}

	let path = match JsonPath::parse(expression) {
		Ok(path) => path,
		Err(e) => {
			tracing::warn!(
				correlation_id = %message.correlation_id,
				expression,
				error = %e,
				"failed to evaluate message expression"
			);

			return None;
		},
	};

	match path.find(&message.body).as_deref() {
		None => {
			tracing::debug!(correlation_id = %message.correlation_id, expression, "path not found in message");

			None
		},
		Some(JsonValue::Null) => None,
		Some(JsonValue::String(text)) => Some(text.clone()),
		Some(other) => Some(other.to_string()),
	}
}

/// Resolves a context expression against message metadata.
///
/// Vocabulary: `correlationId` (`traceId`), `tenantCode`, `apiCode`, `principalId`
/// (`userId`), `principalName` (`userName`), and `extra.<key>` (`userInfo.extra.<key>`).
/// Anything else resolves to `None`.
pub fn resolve_context(expression: &str, message: &InboundMessage) -> Option<String> {
	let principal = message.principal.as_ref();

	match expression.trim() {
		"correlationId" | "traceId" => Some(message.correlation_id.to_string()),
		"tenantCode" => Some(message.tenant_code.to_string()),
		"apiCode" => Some(message.api_code.to_string()),
		"principalId" | "userId" => principal.and_then(|p| p.id.clone()),
		"principalName" | "userName" => principal.and_then(|p| p.name.clone()),
		other => {
			let key = other.strip_prefix("userInfo.extra.").or_else(|| other.strip_prefix("extra."))?;

			principal.and_then(|p| p.extra.get(key).cloned())
		},
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::model::{ApiCode, ApiDefinitionId, InboundEnvelope, TenantId, UserInfo};

	const API_ID: ApiDefinitionId = ApiDefinitionId(1);

	fn api(url: &str, method: &str) -> ApiDefinition {
		ApiDefinition {
			id: API_ID,
			tenant_id: TenantId(1),
			api_code: ApiCode::new("orders").expect("API code fixture is valid."),
			url: url.into(),
			method: method.into(),
			content_type: "application/json".into(),
			timeout_ms: 2_000,
			max_retries: 2,
			enabled: true,
		}
	}

	fn message(body: JsonValue) -> InboundMessage {
		InboundMessage::from_envelope(
			InboundEnvelope {
				tenant_code: Some("acme".into()),
				api_code: Some("orders".into()),
				correlation_id: Some("c-1".into()),
				message_body: Some(body),
				user_info: Some(UserInfo {
					user_id: Some("u-9".into()),
					user_name: Some("Ada".into()),
					extra: HashMap::from_iter([("region".to_string(), "eu".to_string())]),
				}),
			},
			None,
		)
		.expect("Message fixture should validate.")
	}

	fn mapping(target: MappingTarget, key: &str) -> ParameterMapping {
		ParameterMapping::new(API_ID, target, key)
	}

	#[test]
	fn path_placeholder_is_substituted_from_message() {
		let request = compile(
			&api("https://api.example.com/orders/{orderId}", "GET"),
			&[mapping(MappingTarget::Path, "orderId").from_message("$.order.id")],
			&message(json!({ "order": { "id": "A1" } })),
		)
		.expect("Compilation should succeed.");

		assert_eq!(request.url, "https://api.example.com/orders/A1");
		assert_eq!(request.method, HttpMethod::Get);
		assert_eq!(request.timeout_ms, 2_000);
	}

	#[test]
	fn fixed_body_values_are_type_coerced() {
		let request = compile(
			&api("https://api.example.com/orders", "post"),
			&[
				mapping(MappingTarget::Body, "flag").fixed("true"),
				mapping(MappingTarget::Body, "ratio").fixed("3.5"),
				mapping(MappingTarget::Body, "count").fixed("42"),
				mapping(MappingTarget::Body, "name").fixed("abc"),
			],
			&message(json!({})),
		)
		.expect("Compilation should succeed.");

		assert_eq!(request.body_fields["flag"], BodyValue::Bool(true));
		assert_eq!(request.body_fields["ratio"], BodyValue::Float(3.5));
		assert_eq!(request.body_fields["count"], BodyValue::Integer(42));
		assert_eq!(request.body_fields["name"], BodyValue::Text("abc".into()));
	}

	#[test]
	fn later_order_wins_regardless_of_list_position() {
		let mappings = [
			mapping(MappingTarget::Header, "X-Source").fixed("late").with_order(2),
			mapping(MappingTarget::Header, "X-Source").fixed("early").with_order(1),
			mapping(MappingTarget::Query, "page").fixed("1").with_order(0),
		];
		let request = compile(&api("https://api.example.com", "GET"), &mappings, &message(json!({})))
			.expect("Compilation should succeed.");

		assert_eq!(request.headers["X-Source"], "late");
		assert_eq!(request.query_params["page"], "1");

		let mut swapped = mappings.clone();

		swapped.swap(0, 2);

		let again = compile(&api("https://api.example.com", "GET"), &swapped, &message(json!({})))
			.expect("Compilation should succeed.");

		assert_eq!(request, again);
	}

	#[test]
	fn required_empty_values_fail_compilation() {
		let err = compile(
			&api("https://api.example.com", "POST"),
			&[mapping(MappingTarget::Body, "customer").from_message("$.customer.id").required()],
			&message(json!({ "order": {} })),
		)
		.expect_err("Missing required value should fail.");

		assert!(matches!(err, Error::MissingRequiredParameter { ref key } if key == "customer"));

		let err = compile(
			&api("https://api.example.com", "POST"),
			&[mapping(MappingTarget::Header, "X-Blank").fixed("  ").required()],
			&message(json!({})),
		)
		.expect_err("Whitespace-only required value should fail.");

		assert!(matches!(err, Error::MissingRequiredParameter { .. }));
	}

	#[test]
	fn absent_optional_values_are_skipped() {
		let request = compile(
			&api("https://api.example.com", "POST"),
			&[
				mapping(MappingTarget::Body, "missing").from_message("$.nope"),
				mapping(MappingTarget::Body, "nulled").from_message("$.nothing"),
				mapping(MappingTarget::Header, "X-Bad").from_message("$[broken"),
			],
			&message(json!({ "nothing": null })),
		)
		.expect("Compilation should succeed.");

		assert!(request.body_fields.is_empty());
		assert!(request.headers.is_empty());
	}

	#[test]
	fn context_vocabulary_resolves_metadata() {
		let msg = message(json!({}));

		assert_eq!(resolve_context("correlationId", &msg).as_deref(), Some("c-1"));
		assert_eq!(resolve_context("traceId", &msg).as_deref(), Some("c-1"));
		assert_eq!(resolve_context("tenantCode", &msg).as_deref(), Some("acme"));
		assert_eq!(resolve_context("apiCode", &msg).as_deref(), Some("orders"));
		assert_eq!(resolve_context("principalId", &msg).as_deref(), Some("u-9"));
		assert_eq!(resolve_context("userName", &msg).as_deref(), Some("Ada"));
		assert_eq!(resolve_context("extra.region", &msg).as_deref(), Some("eu"));
		assert_eq!(resolve_context("userInfo.extra.region", &msg).as_deref(), Some("eu"));
		assert_eq!(resolve_context("extra.missing", &msg), None);
		assert_eq!(resolve_context("hostname", &msg), None);
	}

	#[test]
	fn non_string_message_values_render_as_json() {
		let msg = message(json!({ "qty": 3, "tags": ["a", "b"], "paid": false }));

		assert_eq!(resolve_message("$.qty", &msg).as_deref(), Some("3"));
		assert_eq!(resolve_message("$.tags", &msg).as_deref(), Some(r#"["a","b"]"#));
		assert_eq!(resolve_message("$.paid", &msg).as_deref(), Some("false"));
	}

	#[test]
	fn multi_match_paths_render_as_json_arrays() {
		let msg = message(json!({
			"customer": { "id": 9 },
			"items": [{ "id": 1, "sku": "a" }, { "id": 2, "sku": "b" }]
		}));
		let request = compile(
			&api("https://api.example.com", "POST"),
			&[mapping(MappingTarget::Body, "skus").from_message("$.items[*].sku").required()],
			&msg,
		)
		.expect("Wildcard matches should satisfy a required mapping.");

		assert_eq!(request.body_fields["skus"], BodyValue::Text(r#"["a","b"]"#.into()));
		assert_eq!(resolve_message("$..id", &msg).as_deref(), Some("[9,1,2]"));
		assert_eq!(resolve_message("$.items[*].price", &msg), None);
	}

	#[test]
	fn unknown_targets_and_sources_are_skipped() {
		let mut unknown_source = mapping(MappingTarget::Header, "X-Secret").required();

		unknown_source.source = SourceKind::Unknown("vault".into());

		let request = compile(
			&api("https://api.example.com", "POST"),
			&[
				mapping(MappingTarget::Unknown("cookie".into()), "session").fixed("s"),
				unknown_source,
				mapping(MappingTarget::Header, "X-Ok").fixed("yes"),
			],
			&message(json!({})),
		)
		.expect("Unknown mappings should never be fatal.");

		assert_eq!(request.headers.len(), 1);
		assert_eq!(request.headers["X-Ok"], "yes");
	}

	#[test]
	fn unsupported_method_is_rejected() {
		let err = compile(&api("https://api.example.com", "TRACE"), &[], &message(json!({})))
			.expect_err("TRACE should be rejected.");

		assert!(matches!(err, Error::UnsupportedMethod { .. }));
	}
}
