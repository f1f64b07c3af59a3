//! Minimal JSONPath evaluator covering member, index, wildcard, and deep-scan steps.
//!
//! Supported grammar: `$`, `.name`, `['name']`/`["name"]`, `[n]` where a negative `n`
//! counts from the end, `.*`/`[*]`, and `..` followed by any of those selectors.
//! Expressions without a leading `$` are treated as relative to the root (`order.id` is
//! `$.order.id`).
//!
//! A path containing a wildcard or a deep scan is indefinite: it yields every match, in
//! document order, collected into a JSON array.

// std
use std::borrow::Cow;
// self
use crate::_prelude::*;

/// Syntax errors raised while parsing a path expression.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PathError {
	/// The expression is empty.
	#[error("Path expression is empty.")]
	Empty,
	/// The expression is malformed at the given byte offset.
	#[error("Path expression is malformed at offset {offset}: {reason}.")]
	Syntax {
		/// Byte offset of the failure.
		offset: usize,
		/// What the parser expected.
		reason: &'static str,
	},
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Selector {
	Member(String),
	Index(i64),
	Wildcard,
}
impl Selector {
	fn select<'a>(&self, node: &'a JsonValue, out: &mut Vec<&'a JsonValue>) {
		match (self, node) {
			(Self::Member(name), JsonValue::Object(map)) => out.extend(map.get(name)),
			(Self::Index(index), JsonValue::Array(items)) => {
				let resolved = if *index < 0 {
					usize::try_from(index.unsigned_abs()).ok().and_then(|n| items.len().checked_sub(n))
				} else {
					usize::try_from(*index).ok()
				};

				out.extend(resolved.and_then(|i| items.get(i)));
			},
			(Self::Wildcard, JsonValue::Object(map)) => out.extend(map.values()),
			(Self::Wildcard, JsonValue::Array(items)) => out.extend(items),
			_ => {},
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
	Child(Selector),
	Scan(Selector),
}

/// Parsed path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPath {
	steps: Vec<Step>,
}
impl JsonPath {
	/// Parses an expression.
	pub fn parse(expression: &str) -> Result<Self, PathError> {
		let trimmed = expression.trim();

		if trimmed.is_empty() {
			return Err(PathError::Empty);
		}

		let source = if trimmed.starts_with('$') {
			trimmed.to_owned()
		} else if trimmed.starts_with('[') {
			format!("${trimmed}")
		} else {
			format!("$.{trimmed}")
		};

		Parser { bytes: source.as_bytes(), pos: 1 }.steps().map(|steps| Self { steps })
	}

	/// Whether the path can match at most one node.
	pub fn is_definite(&self) -> bool {
		self.steps.iter().all(|step| matches!(step, Step::Child(Selector::Member(_) | Selector::Index(_))))
	}

	/// Evaluates the path; `None` means nothing in `root` matches.
	///
	/// Definite paths borrow the single match. Indefinite paths return an owned array of
	/// every match.
	pub fn find<'a>(&self, root: &'a JsonValue) -> Option<Cow<'a, JsonValue>> {
		let mut nodes = vec![root];

		for step in &self.steps {
			let mut next = Vec::new();

			match step {
				Step::Child(selector) =>
					for node in nodes {
						selector.select(node, &mut next);
					},
				Step::Scan(selector) =>
					for node in nodes {
						scan(node, selector, &mut next);
					},
			}

			if next.is_empty() {
				return None;
			}

			nodes = next;
		}

		if self.is_definite() {
			nodes.first().map(|node| Cow::Borrowed(*node))
		} else {
			Some(Cow::Owned(JsonValue::Array(nodes.into_iter().cloned().collect())))
		}
	}
}

fn scan<'a>(node: &'a JsonValue, selector: &Selector, out: &mut Vec<&'a JsonValue>) {
	selector.select(node, out);

	match node {
		JsonValue::Object(map) => map.values().for_each(|child| scan(child, selector, out)),
		JsonValue::Array(items) => items.iter().for_each(|child| scan(child, selector, out)),
		_ => {},
	}
}

struct Parser<'a> {
	bytes: &'a [u8],
	pos: usize,
}
impl Parser<'_> {
	fn steps(mut self) -> Result<Vec<Step>, PathError> {
		let mut steps = Vec::new();

		while let Some(&byte) = self.bytes.get(self.pos) {
			match byte {
				b'.' if self.bytes.get(self.pos + 1) == Some(&b'.') => {
					self.pos += 2;

					let selector = if self.bytes.get(self.pos) == Some(&b'[') {
						self.pos += 1;
						self.bracket()?
					} else {
						self.dotted()?
					};

					steps.push(Step::Scan(selector));
				},
				b'.' => {
					self.pos += 1;
					steps.push(Step::Child(self.dotted()?));
				},
				b'[' => {
					self.pos += 1;
					steps.push(Step::Child(self.bracket()?));
				},
				_ => return Err(self.syntax("expected `.` or `[`")),
			}
		}

		Ok(steps)
	}

	fn dotted(&mut self) -> Result<Selector, PathError> {
		let start = self.pos;

		while let Some(&byte) = self.bytes.get(self.pos) {
			if byte == b'.' || byte == b'[' {
				break;
			}

			self.pos += 1;
		}

		if start == self.pos {
			return Err(self.syntax("expected a member name"));
		}

		let name = self.text(start, self.pos)?;

		Ok(if name == "*" { Selector::Wildcard } else { Selector::Member(name) })
	}

	fn bracket(&mut self) -> Result<Selector, PathError> {
		let selector = match self.bytes.get(self.pos) {
			Some(&quote @ (b'\'' | b'"')) => {
				self.pos += 1;

				let start = self.pos;

				while self.bytes.get(self.pos).is_some_and(|&b| b != quote) {
					self.pos += 1;
				}

				if self.bytes.get(self.pos).is_none() {
					return Err(self.syntax("unterminated quoted member"));
				}

				let name = self.text(start, self.pos)?;

				self.pos += 1;

				Selector::Member(name)
			},
			Some(b'*') => {
				self.pos += 1;

				Selector::Wildcard
			},
			Some(_) => {
				let start = self.pos;

				while self.bytes.get(self.pos).is_some_and(|&b| b == b'-' || b.is_ascii_digit()) {
					self.pos += 1;
				}

				let index = self
					.text(start, self.pos)?
					.parse::<i64>()
					.map_err(|_| self.syntax("expected an array index"))?;

				Selector::Index(index)
			},
			None => return Err(self.syntax("unterminated bracket")),
		};

		if self.bytes.get(self.pos) != Some(&b']') {
			return Err(self.syntax("expected `]`"));
		}

		self.pos += 1;

		Ok(selector)
	}

	fn text(&self, start: usize, end: usize) -> Result<String, PathError> {
		std::str::from_utf8(&self.bytes[start..end])
			.map(str::to_owned)
			.map_err(|_| self.syntax("invalid UTF-8"))
	}

	fn syntax(&self, reason: &'static str) -> PathError {
		PathError::Syntax { offset: self.pos, reason }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn find(expression: &str, root: &JsonValue) -> Option<JsonValue> {
		JsonPath::parse(expression)
			.expect("Path fixture should parse.")
			.find(root)
			.map(|value| value.into_owned())
	}

	#[test]
	fn member_and_index_steps() {
		let root = json!({ "order": { "id": "A1", "lines": [{ "sku": "x" }, { "sku": "y" }] } });

		assert_eq!(find("$.order.id", &root), Some(json!("A1")));
		assert_eq!(find("$['order']['lines'][1].sku", &root), Some(json!("y")));
		assert_eq!(find("$.order.lines[-1].sku", &root), Some(json!("y")));
		assert_eq!(find("order.id", &root), Some(json!("A1")));
		assert_eq!(find("$", &root), Some(root.clone()));
	}

	#[test]
	fn missing_paths_resolve_to_none() {
		let root = json!({ "order": { "id": "A1", "lines": [] } });

		assert_eq!(find("$.order.total", &root), None);
		assert_eq!(find("$.order.id.deeper", &root), None);
		assert_eq!(find("$.order.lines[0]", &root), None);
		assert_eq!(find("$.order.lines[-1]", &root), None);
	}

	#[test]
	fn wildcards_collect_every_child_in_order() {
		let root = json!({ "items": [{ "sku": "a" }, { "sku": "b" }, { "qty": 1 }] });
		let path = JsonPath::parse("$.items[*].sku").expect("Wildcard path should parse.");

		assert!(!path.is_definite());
		assert_eq!(find("$.items[*].sku", &root), Some(json!(["a", "b"])));
		assert_eq!(find("$.items.*.qty", &root), Some(json!([1])));
		assert_eq!(find("$.items[*].missing", &root), None);
	}

	#[test]
	fn deep_scan_searches_every_level() {
		let root = json!({
			"id": 1,
			"order": { "id": 2, "lines": [{ "id": 3 }, { "sku": "x", "meta": { "id": 4 } }] }
		});

		assert_eq!(find("$..id", &root), Some(json!([1, 2, 3, 4])));
		assert_eq!(find("$.order..sku", &root), Some(json!(["x"])));
		assert_eq!(find("$..lines[0].id", &root), Some(json!([3])));
		assert_eq!(find("$..['sku']", &root), Some(json!(["x"])));
		assert_eq!(find("$..absent", &root), None);
	}

	#[test]
	fn definite_paths_borrow_the_match() {
		let root = json!({ "order": { "id": "A1" } });
		let path = JsonPath::parse("$.order.id").expect("Definite path should parse.");

		assert!(path.is_definite());
		assert!(matches!(path.find(&root), Some(Cow::Borrowed(value)) if value == "A1"));
	}

	#[test]
	fn malformed_expressions_are_rejected() {
		assert_eq!(JsonPath::parse("  "), Err(PathError::Empty));
		assert!(matches!(JsonPath::parse("$.order..."), Err(PathError::Syntax { .. })));
		assert!(matches!(JsonPath::parse("$.order.."), Err(PathError::Syntax { .. })));
		assert!(matches!(JsonPath::parse("$['order"), Err(PathError::Syntax { .. })));
		assert!(matches!(JsonPath::parse("$[abc]"), Err(PathError::Syntax { .. })));
		assert!(matches!(JsonPath::parse("$x"), Err(PathError::Syntax { .. })));
	}
}
