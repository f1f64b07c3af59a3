//! Inbound envelope wire format and the validated message handed to the pipeline.

// self
use crate::{
	_prelude::*,
	model::{ApiCode, CorrelationId, TenantCode},
};

/// Wire shape of an inbound broker record.
///
/// Every field is optional at the decoding layer so validation can report which
/// required field is missing instead of failing with a generic decode error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
	/// Tenant code (required).
	#[serde(default)]
	pub tenant_code: Option<String>,
	/// API code (required).
	#[serde(default)]
	pub api_code: Option<String>,
	/// Correlation id; generated when blank.
	#[serde(default, alias = "traceId")]
	pub correlation_id: Option<String>,
	/// Arbitrary structured message body.
	#[serde(default)]
	pub message_body: Option<JsonValue>,
	/// Optional originating user.
	#[serde(default)]
	pub user_info: Option<UserInfo>,
}

/// Wire shape of the originating user attached to an envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
	/// User identifier.
	#[serde(default)]
	pub user_id: Option<String>,
	/// User display name.
	#[serde(default)]
	pub user_name: Option<String>,
	/// Free-form string attributes.
	#[serde(default)]
	pub extra: HashMap<String, String>,
}

/// Principal on whose behalf the message was produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Principal {
	/// Principal identifier.
	pub id: Option<String>,
	/// Principal display name.
	pub name: Option<String>,
	/// Extra attributes addressable as `extra.<key>` in context mappings.
	pub extra: HashMap<String, String>,
}
impl From<UserInfo> for Principal {
	fn from(info: UserInfo) -> Self {
		Self { id: info.user_id, name: info.user_name, extra: info.extra }
	}
}

/// Validated, immutable message for one delivered record.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
	/// Tenant the message belongs to.
	pub tenant_code: TenantCode,
	/// API definition the message targets.
	pub api_code: ApiCode,
	/// Correlation id propagated through logs, retries, and dead letters.
	pub correlation_id: CorrelationId,
	/// Structured message body (`null` when absent).
	pub body: JsonValue,
	/// Optional originating principal.
	pub principal: Option<Principal>,
}
impl InboundMessage {
	/// Decodes and validates a raw broker payload.
	///
	/// `delivery_id` is a broker identity that stays stable across redeliveries (for
	/// example a stream sequence); when the envelope carries no correlation id one is
	/// derived from it, or generated at random when the broker offers none.
	pub fn decode(payload: &[u8], delivery_id: Option<&str>) -> Result<Self> {
		let de = &mut serde_json::Deserializer::from_slice(payload);
		let envelope: InboundEnvelope = serde_path_to_error::deserialize(de)?;

		Self::from_envelope(envelope, delivery_id)
	}

	/// Validates an already decoded envelope.
	pub fn from_envelope(envelope: InboundEnvelope, delivery_id: Option<&str>) -> Result<Self> {
		let correlation_id = match non_blank(envelope.correlation_id.as_deref()) {
			Some(raw) => CorrelationId::new(raw)?,
			None => match delivery_id {
				Some(id) => CorrelationId::derive(id),
				None => CorrelationId::generate(),
			},
		};
		let tenant_code = non_blank(envelope.tenant_code.as_deref())
			.ok_or_else(|| Error::InvalidMessage { reason: "tenantCode is required".into() })?;
		let api_code = non_blank(envelope.api_code.as_deref())
			.ok_or_else(|| Error::InvalidMessage { reason: "apiCode is required".into() })?;

		Ok(Self {
			tenant_code: TenantCode::new(tenant_code)?,
			api_code: ApiCode::new(api_code)?,
			correlation_id,
			body: envelope.message_body.unwrap_or(JsonValue::Null),
			principal: envelope.user_info.map(Principal::from),
		})
	}

	/// Best-effort correlation id lookup for payloads that fail full decoding.
	pub fn peek_correlation_id(payload: &[u8]) -> Option<String> {
		let value: JsonValue = serde_json::from_slice(payload).ok()?;
		let raw = value.get("correlationId").or_else(|| value.get("traceId"))?.as_str()?;

		non_blank(Some(raw)).map(str::to_owned)
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::error::FailureClass;

	#[test]
	fn decode_reads_every_envelope_field() {
		let payload = json!({
			"tenantCode": "acme",
			"apiCode": "create-order",
			"correlationId": "c-1",
			"messageBody": { "order": { "id": "A1" } },
			"userInfo": { "userId": "u-9", "userName": "Ada", "extra": { "region": "eu" } }
		});
		let message = InboundMessage::decode(payload.to_string().as_bytes(), None)
			.expect("Envelope fixture should decode.");

		assert_eq!(message.tenant_code.as_ref(), "acme");
		assert_eq!(message.api_code.as_ref(), "create-order");
		assert_eq!(message.correlation_id.as_ref(), "c-1");
		assert_eq!(message.body["order"]["id"], "A1");

		let principal = message.principal.expect("Principal should be populated.");

		assert_eq!(principal.id.as_deref(), Some("u-9"));
		assert_eq!(principal.extra.get("region").map(String::as_str), Some("eu"));
	}

	#[test]
	fn blank_correlation_id_is_generated_or_derived() {
		let payload = br#"{"tenantCode":"acme","apiCode":"ping","correlationId":"  "}"#;
		let generated =
			InboundMessage::decode(payload, None).expect("Blank correlation id should be replaced.");
		let derived_a = InboundMessage::decode(payload, Some("stream:7"))
			.expect("Blank correlation id should be derived.");
		let derived_b = InboundMessage::decode(payload, Some("stream:7"))
			.expect("Blank correlation id should be derived.");

		assert_eq!(generated.correlation_id.len(), 32);
		assert_eq!(derived_a.correlation_id, derived_b.correlation_id);
	}

	#[test]
	fn correlation_ids_with_spaces_are_kept_verbatim() {
		let payload = br#"{"tenantCode":"acme","apiCode":"ping","correlationId":"order 42"}"#;
		let message = InboundMessage::decode(payload, None)
			.expect("Correlation ids are not restricted to identifier characters.");

		assert_eq!(message.correlation_id.as_ref(), "order 42");
	}

	#[test]
	fn trace_id_alias_is_accepted() {
		let payload = br#"{"tenantCode":"acme","apiCode":"ping","traceId":"legacy-1"}"#;
		let message = InboundMessage::decode(payload, None).expect("Alias should decode.");

		assert_eq!(message.correlation_id.as_ref(), "legacy-1");
		assert_eq!(InboundMessage::peek_correlation_id(payload).as_deref(), Some("legacy-1"));
	}

	#[test]
	fn missing_codes_are_validation_failures() {
		let err = InboundMessage::decode(br#"{"apiCode":"ping"}"#, None)
			.expect_err("Missing tenant code should be rejected.");

		assert_eq!(err.class(), FailureClass::Validation);
		assert!(err.to_string().contains("tenantCode"));

		let err = InboundMessage::decode(b"not json", None)
			.expect_err("Garbage payloads should be rejected.");

		assert!(matches!(err, Error::MalformedEnvelope { .. }));
	}
}
