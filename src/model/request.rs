//! Fully resolved outbound request produced by the compiler.

// self
use crate::{
	_prelude::*,
	model::{ApiCode, CorrelationId, HttpMethod, TenantCode},
};

/// Typed scalar written to the request body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyValue {
	/// `true`/`false`.
	Bool(bool),
	/// Whole number.
	Integer(i64),
	/// Number with a decimal point.
	Float(f64),
	/// Anything else.
	Text(String),
}
impl BodyValue {
	/// Coerces a resolved string into the narrowest scalar type.
	///
	/// Order: case-insensitive boolean, then integer, then float (the text must contain a
	/// decimal point), otherwise the string itself.
	pub fn coerce(raw: &str) -> Self {
		if raw.eq_ignore_ascii_case("true") {
			return BodyValue::Bool(true);
		}
		if raw.eq_ignore_ascii_case("false") {
			return BodyValue::Bool(false);
		}
		if let Ok(int) = raw.parse::<i64>() {
			return BodyValue::Integer(int);
		}
		if raw.contains('.') {
			if let Ok(float) = raw.parse::<f64>() {
				if float.is_finite() {
					return BodyValue::Float(float);
				}
			}
		}

		BodyValue::Text(raw.to_owned())
	}
}
impl Display for BodyValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			BodyValue::Bool(v) => Display::fmt(v, f),
			BodyValue::Integer(v) => Display::fmt(v, f),
			BodyValue::Float(v) => Display::fmt(v, f),
			BodyValue::Text(v) => f.write_str(v),
		}
	}
}

/// Outbound HTTP request description; built fresh for every message.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescription {
	/// URL after path placeholder substitution, without query parameters.
	pub url: String,
	/// HTTP method.
	pub method: HttpMethod,
	/// Body content type.
	pub content_type: String,
	/// Headers; keys are case-sensitive and the last write wins.
	pub headers: BTreeMap<String, String>,
	/// Query parameters; the last write wins.
	pub query_params: BTreeMap<String, String>,
	/// Typed body fields; the last write wins.
	pub body_fields: BTreeMap<String, BodyValue>,
	/// Per-attempt timeout in milliseconds; `0` keeps the client default.
	pub timeout_ms: u64,
	/// Correlation id of the originating message.
	pub correlation_id: CorrelationId,
	/// Tenant code of the originating message.
	pub tenant_code: TenantCode,
	/// API code of the originating message.
	pub api_code: ApiCode,
}
impl RequestDescription {
	/// Returns `true` when the request should carry a body.
	pub fn carries_body(&self) -> bool {
		match self.method {
			HttpMethod::Get => false,
			HttpMethod::Delete => !self.body_fields.is_empty(),
			HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => true,
		}
	}

	/// Returns `true` when the content type asks for form encoding.
	pub fn is_form_encoded(&self) -> bool {
		self.content_type
			.split(';')
			.next()
			.is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
	}

	/// Serializes the body fields as a JSON object, falling back to `{}`.
	pub fn json_body(&self) -> String {
		if self.body_fields.is_empty() {
			return "{}".into();
		}

		match serde_json::to_string(&self.body_fields) {
			Ok(body) => body,
			Err(e) => {
				tracing::warn!(correlation_id = %self.correlation_id, error = %e, "failed to serialize request body");

				"{}".into()
			},
		}
	}

	/// Serializes the body fields as `application/x-www-form-urlencoded`.
	pub fn form_body(&self) -> String {
		let mut serializer = url::form_urlencoded::Serializer::new(String::new());

		for (key, value) in &self.body_fields {
			serializer.append_pair(key, &value.to_string());
		}

		serializer.finish()
	}

	/// Encodes the body according to the content type.
	pub fn encoded_body(&self) -> String {
		if self.is_form_encoded() { self.form_body() } else { self.json_body() }
	}
}
