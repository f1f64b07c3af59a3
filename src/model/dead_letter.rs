//! Dead-letter record emitted once per exhausted delivery.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{_prelude::*, model::CorrelationId};

/// Immutable failure record published to the dead-letter channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterRecord {
	/// Original envelope text; base64 when the payload was not UTF-8.
	pub original_payload: String,
	/// Correlation id of the failed delivery (also the publish key).
	pub correlation_id: CorrelationId,
	/// Last failure detail.
	pub error_detail: String,
	/// Cumulative retryable failures across redeliveries.
	pub attempt_count: u64,
	/// Instant the record was built.
	#[serde(with = "time::serde::rfc3339")]
	pub failed_at: OffsetDateTime,
}
impl DeadLetterRecord {
	/// Builds a record stamped with the current UTC time.
	pub fn new(
		payload: &[u8],
		correlation_id: CorrelationId,
		error_detail: impl Into<String>,
		attempt_count: u64,
	) -> Self {
		Self {
			original_payload: encode_payload(payload),
			correlation_id,
			error_detail: error_detail.into(),
			attempt_count,
			failed_at: OffsetDateTime::now_utc(),
		}
	}

	/// Serializes the record to its JSON wire form.
	pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}
}

fn encode_payload(payload: &[u8]) -> String {
	match std::str::from_utf8(payload) {
		Ok(text) => text.to_owned(),
		Err(_) => STANDARD.encode(payload),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn wire_format_is_camel_case_with_rfc3339_timestamp() {
		let record = DeadLetterRecord::new(
			br#"{"tenantCode":"acme"}"#,
			CorrelationId::new("c-1").expect("Correlation id fixture is valid."),
			"HTTP request returned server error: 503",
			3,
		);
		let json: JsonValue = serde_json::from_slice(
			&record.to_json().expect("Dead-letter record should serialize."),
		)
		.expect("Serialized record should be valid JSON.");

		assert_eq!(json["originalPayload"], r#"{"tenantCode":"acme"}"#);
		assert_eq!(json["correlationId"], "c-1");
		assert_eq!(json["attemptCount"], 3);
		assert!(json["failedAt"].as_str().is_some_and(|ts| ts.contains('T')));
	}

	#[test]
	fn binary_payloads_are_base64_encoded() {
		let record = DeadLetterRecord::new(
			&[0xff, 0xfe, 0x00],
			CorrelationId::new("c-2").expect("Correlation id fixture is valid."),
			"boom",
			1,
		);

		assert_eq!(record.original_payload, "//4A");
	}
}
