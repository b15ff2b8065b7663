//! Inspect-reply section parsing.
//!
//! IPython formats `inspect_request` answers as `text/plain` with section
//! keys wrapped in red ANSI (`ESC[31mKey:ESC[39m`). Those parse into
//! named sections with their kernel-provided order preserved. Everything
//! else (non-Python kernels, plain reprs, HTML help) falls back to a raw
//! passthrough carrying the best mime and an ANSI-stripped clean copy so
//! a frontend without terminal colorization still has something to show.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

static ANSI_ESCAPE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static pattern"));
static SECTION_KEY: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\x1b\[31m([\w\s]+):\x1b\[39m").expect("static pattern"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("static pattern"));

/// Parsed inspection sections.
///
/// Field names (and the underscore-prefixed presentation hints) match the
/// bridge wire format, so bridge-parsed and client-parsed sections are
/// interchangeable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectSections {
	/// Primary value/repr section.
	pub string_form: Option<String>,
	/// Object docstring.
	pub docstring: Option<String>,
	/// Signature.
	pub definition: Option<String>,
	/// Constructor signature.
	pub init_definition: Option<String>,
	/// Call signature.
	pub call_def: Option<String>,
	/// Type name.
	pub type_name: Option<String>,
	/// Defining namespace.
	pub namespace: Option<String>,
	/// Length, for sized objects.
	pub length: Option<String>,
	/// Defining file.
	pub file: Option<String>,
	/// Known subclasses.
	pub subclasses: Option<String>,
	/// Class docstring.
	pub class_docstring: Option<String>,
	/// Constructor docstring.
	pub init_docstring: Option<String>,
	/// Call docstring.
	pub call_docstring: Option<String>,
	/// Kernel-provided section order.
	#[serde(rename = "_order", skip_serializing_if = "Vec::is_empty")]
	pub order: Vec<String>,
	/// Raw terminal output: frontends should colorize rather than lay out.
	#[serde(rename = "_raw", skip_serializing_if = "std::ops::Not::not")]
	pub raw: bool,
	/// Mime type the content was taken from.
	#[serde(rename = "_mime", skip_serializing_if = "Option::is_none")]
	pub mime: Option<String>,
	/// ANSI-stripped fallback for frontends without colorization.
	#[serde(rename = "_clean", skip_serializing_if = "Option::is_none")]
	pub clean: Option<String>,
}

impl InspectSections {
	/// Whether any displayable section was recovered.
	pub fn is_empty(&self) -> bool {
		self.string_form.is_none() && self.order.is_empty()
	}

	fn set(&mut self, field: &'static str, value: String) {
		let slot = match field {
			"string_form" => &mut self.string_form,
			"docstring" => &mut self.docstring,
			"definition" => &mut self.definition,
			"init_definition" => &mut self.init_definition,
			"call_def" => &mut self.call_def,
			"type_name" => &mut self.type_name,
			"namespace" => &mut self.namespace,
			"length" => &mut self.length,
			"file" => &mut self.file,
			"subclasses" => &mut self.subclasses,
			"class_docstring" => &mut self.class_docstring,
			"init_docstring" => &mut self.init_docstring,
			"call_docstring" => &mut self.call_docstring,
			_ => return,
		};
		*slot = Some(value);
		self.order.push(field.to_string());
	}
}

/// Parse sections out of a mime-keyed inspect payload.
///
/// Python kernels get the IPython section parser; everything else is
/// passed through raw.
pub fn parse_sections(language: Option<&str>, data: &Value) -> InspectSections {
	let language = language.map(|l| l.trim().to_ascii_lowercase());
	match language.as_deref() {
		Some("python") => parse_python(data),
		_ => parse_raw(data),
	}
}

/// IPython-style parsing with raw fallbacks.
pub fn parse_python(data: &Value) -> InspectSections {
	let text_plain = data.get("text/plain").and_then(Value::as_str);
	let text_md = data.get("text/markdown").and_then(Value::as_str);
	let text_html = data.get("text/html").and_then(Value::as_str);

	if let Some(plain) = text_plain {
		if SECTION_KEY.is_match(plain) {
			if let Some(mut sections) = parse_ipython_sections(plain) {
				sections.mime = Some("text/plain".into());
				return sections;
			}
		}
	}
	if let Some(md) = text_md {
		if !md.trim().is_empty() {
			return InspectSections {
				string_form: Some(md.to_string()),
				mime: Some("text/markdown".into()),
				..InspectSections::default()
			};
		}
	}
	if let Some(plain) = text_plain {
		if !plain.trim().is_empty() {
			return InspectSections {
				string_form: Some(plain.to_string()),
				raw: true,
				mime: Some("text/plain".into()),
				..InspectSections::default()
			};
		}
	}
	if let Some(html) = text_html {
		if !html.trim().is_empty() {
			return InspectSections {
				string_form: Some(strip_html(html)),
				raw: true,
				mime: Some("text/html".into()),
				..InspectSections::default()
			};
		}
	}
	InspectSections::default()
}

/// Raw passthrough for kernels without a dedicated parser: best mime
/// wins, plus an ANSI-stripped clean copy.
pub fn parse_raw(data: &Value) -> InspectSections {
	let candidates = [
		("text/plain", false),
		("text/markdown", false),
		("text/html", true),
	];
	for (mime, is_html) in candidates {
		if let Some(text) = data.get(mime).and_then(Value::as_str) {
			if text.trim().is_empty() {
				continue;
			}
			let content = if is_html { strip_html(text) } else { text.to_string() };
			return InspectSections {
				clean: Some(strip_ansi(&content)),
				string_form: Some(content),
				raw: true,
				mime: Some(mime.into()),
				..InspectSections::default()
			};
		}
	}
	InspectSections::default()
}

/// Split ANSI-keyed IPython output into sections, preserving order.
/// `None` when no recognizable section carries a value.
fn parse_ipython_sections(text: &str) -> Option<InspectSections> {
	let keys: Vec<(usize, usize, &str)> = SECTION_KEY
		.captures_iter(text)
		.filter_map(|captures| {
			let whole = captures.get(0)?;
			let key = captures.get(1)?;
			Some((whole.start(), whole.end(), key.as_str()))
		})
		.collect();
	if keys.is_empty() {
		return None;
	}

	let mut sections = InspectSections::default();
	for (index, &(_, value_start, key)) in keys.iter().enumerate() {
		let Some(field) = section_field(key) else {
			continue;
		};
		let value_end = keys
			.get(index + 1)
			.map(|&(next_start, _, _)| next_start)
			.unwrap_or(text.len());
		let value = strip_ansi(&text[value_start..value_end]);
		let value = value.trim();
		if !value.is_empty() {
			sections.set(field, value.to_string());
		}
	}

	if sections.order.is_empty() {
		return None;
	}
	Some(sections)
}

/// IPython section header → wire field name.
fn section_field(key: &str) -> Option<&'static str> {
	Some(match key {
		"Type" => "type_name",
		"String form" | "Repr" => "string_form",
		"Length" => "length",
		"File" => "file",
		"Docstring" => "docstring",
		"Init docstring" => "init_docstring",
		"Class docstring" => "class_docstring",
		"Call docstring" => "call_docstring",
		"Signature" => "definition",
		"Init signature" => "init_definition",
		"Call signature" => "call_def",
		"Namespace" => "namespace",
		"Subclasses" => "subclasses",
		_ => return None,
	})
}

/// Remove ANSI color sequences.
pub fn strip_ansi(text: &str) -> String {
	ANSI_ESCAPE.replace_all(text, "").into_owned()
}

fn strip_html(text: &str) -> String {
	let stripped = HTML_TAG.replace_all(text, "");
	unescape_entities(&stripped).trim().to_string()
}

fn unescape_entities(text: &str) -> String {
	text.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&#x27;", "'")
		.replace("&nbsp;", " ")
		.replace("&amp;", "&")
}
