//! Declarative configuration rows read from the configuration collaborator.

// self
use crate::{
	_prelude::*,
	model::{ApiCode, ApiDefinitionId, TenantCode, TenantId},
};

/// Tenant registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
	/// Storage identifier.
	pub id: TenantId,
	/// Code messages use to address the tenant.
	pub code: TenantCode,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Disabled tenants reject every message.
	#[serde(default = "enabled")]
	pub enabled: bool,
}

/// Declarative description of one outbound HTTP call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDefinition {
	/// Storage identifier.
	pub id: ApiDefinitionId,
	/// Owning tenant.
	pub tenant_id: TenantId,
	/// Code messages use to address the definition.
	pub api_code: ApiCode,
	/// Target URL; may contain `{name}` path placeholders.
	pub url: String,
	/// Raw HTTP method; validated when the request is compiled.
	pub method: String,
	/// Content type of the request body.
	#[serde(default = "default_content_type")]
	pub content_type: String,
	/// Per-attempt timeout in milliseconds; `0` keeps the client default.
	#[serde(default)]
	pub timeout_ms: u64,
	/// Local retries after the first attempt.
	#[serde(default)]
	pub max_retries: u32,
	/// Disabled definitions reject every message.
	#[serde(default = "enabled")]
	pub enabled: bool,
}

/// HTTP methods the execution engine can issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
	/// `GET`, never carries a body.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`, carries a body only when body fields exist.
	Delete,
}
impl HttpMethod {
	/// Returns the canonical upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			HttpMethod::Get => "GET",
			HttpMethod::Post => "POST",
			HttpMethod::Put => "PUT",
			HttpMethod::Patch => "PATCH",
			HttpMethod::Delete => "DELETE",
		}
	}
}
impl Display for HttpMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for HttpMethod {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_uppercase().as_str() {
			"GET" => Ok(HttpMethod::Get),
			"POST" => Ok(HttpMethod::Post),
			"PUT" => Ok(HttpMethod::Put),
			"PATCH" => Ok(HttpMethod::Patch),
			"DELETE" => Ok(HttpMethod::Delete),
			_ => Err(Error::UnsupportedMethod { method: s.to_owned() }),
		}
	}
}

/// Request location a mapping writes to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingTarget {
	/// Request header.
	Header,
	/// URL query parameter.
	Query,
	/// Typed body field.
	Body,
	/// `{key}` placeholder in the URL.
	Path,
	/// Unrecognized target; logged and skipped.
	Unknown(String),
}
impl From<String> for MappingTarget {
	fn from(value: String) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"header" => MappingTarget::Header,
			"query" => MappingTarget::Query,
			"body" => MappingTarget::Body,
			"path" => MappingTarget::Path,
			_ => MappingTarget::Unknown(value),
		}
	}
}
impl From<MappingTarget> for String {
	fn from(value: MappingTarget) -> Self {
		match value {
			MappingTarget::Header => "header".into(),
			MappingTarget::Query => "query".into(),
			MappingTarget::Body => "body".into(),
			MappingTarget::Path => "path".into(),
			MappingTarget::Unknown(raw) => raw,
		}
	}
}

/// Where a mapping takes its value from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
	/// Constant configured on the mapping.
	Fixed,
	/// JSONPath expression evaluated against the message body.
	Message,
	/// Message metadata such as the correlation id or principal.
	Context,
	/// Unrecognized source; logged and skipped.
	Unknown(String),
}
impl From<String> for SourceKind {
	fn from(value: String) -> Self {
		match value.trim().to_ascii_lowercase().as_str() {
			"" | "fixed" => SourceKind::Fixed,
			"message" => SourceKind::Message,
			"context" => SourceKind::Context,
			_ => SourceKind::Unknown(value),
		}
	}
}
impl From<SourceKind> for String {
	fn from(value: SourceKind) -> Self {
		match value {
			SourceKind::Fixed => "fixed".into(),
			SourceKind::Message => "message".into(),
			SourceKind::Context => "context".into(),
			SourceKind::Unknown(raw) => raw,
		}
	}
}

/// One rule translating a message/context value into one request field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMapping {
	/// API definition the mapping belongs to.
	pub api_definition_id: ApiDefinitionId,
	/// Request location to write.
	pub target: MappingTarget,
	/// Header name, query key, body field, or path placeholder name.
	pub key: String,
	/// Value source.
	#[serde(default = "default_source")]
	pub source: SourceKind,
	/// Constant used by [`SourceKind::Fixed`].
	#[serde(default)]
	pub value: Option<String>,
	/// JSONPath or context expression used by the other sources.
	#[serde(default)]
	pub expression: Option<String>,
	/// Empty resolutions fail the message when set.
	#[serde(default)]
	pub required: bool,
	/// Application order, ascending.
	#[serde(default)]
	pub order: i32,
}
impl ParameterMapping {
	/// Creates a mapping with the fixed source and order `0`.
	pub fn new(
		api_definition_id: ApiDefinitionId,
		target: MappingTarget,
		key: impl Into<String>,
	) -> Self {
		Self {
			api_definition_id,
			target,
			key: key.into(),
			source: SourceKind::Fixed,
			value: None,
			expression: None,
			required: false,
			order: 0,
		}
	}

	/// Uses a constant value.
	pub fn fixed(mut self, value: impl Into<String>) -> Self {
		self.source = SourceKind::Fixed;
		self.value = Some(value.into());

		self
	}

	/// Uses a JSONPath expression against the message body.
	pub fn from_message(mut self, expression: impl Into<String>) -> Self {
		self.source = SourceKind::Message;
		self.expression = Some(expression.into());

		self
	}

	/// Uses a context expression.
	pub fn from_context(mut self, expression: impl Into<String>) -> Self {
		self.source = SourceKind::Context;
		self.expression = Some(expression.into());

		self
	}

	/// Marks the mapping as required.
	pub fn required(mut self) -> Self {
		self.required = true;

		self
	}

	/// Sets the application order.
	pub fn with_order(mut self, order: i32) -> Self {
		self.order = order;

		self
	}
}

/// Fixed-window rate limit for a tenant, optionally narrowed to one API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
	/// Tenant the limit applies to.
	pub tenant_id: TenantId,
	/// API the limit applies to; `None` makes it tenant-wide.
	#[serde(default)]
	pub api_code: Option<ApiCode>,
	/// Admitted requests per window.
	pub limit: u64,
	/// Window length in seconds.
	pub window_secs: u64,
	/// Disabled rows are ignored during resolution.
	#[serde(default = "enabled")]
	pub enabled: bool,
}

fn enabled() -> bool {
	true
}

fn default_content_type() -> String {
	"application/json".into()
}

fn default_source() -> SourceKind {
	SourceKind::Fixed
}
