//! Recursive identity and position rewriting over raw protocol values.
//!
//! Backend payloads are treated as untyped [`serde_json::Value`] trees:
//! the walker rewrites the shapes it recognizes (`uri`/`targetUri`
//! fields, uri-keyed maps like a workspace edit's `changes`) and leaves
//! everything else exactly as it arrived. Failing open here is load-
//! bearing: a malformed or future-protocol response must degrade to "not
//! rewritten", never to "dropped".

use serde_json::Value;

/// Identity strings and the line offset for one rewrite pass.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
	/// The human view's identity.
	pub human: &'a str,
	/// The shadow view's identity (what the backend believes in).
	pub shadow: &'a str,
	/// The virtual preview identity used by indirect rewriting.
	pub preview: &'a str,
	/// Overlay-local → absolute line offset for request positions.
	pub line_offset: u32,
}

/// Replace every occurrence of the identity `from` with `to`, walking
/// arbitrarily nested arrays and objects.
pub fn rewrite_uris(value: &mut Value, from: &str, to: &str) {
	match value {
		Value::Object(map) => {
			// Uri-keyed maps (e.g. a workspace edit's `changes`).
			if map.contains_key(from) {
				if let Some(inner) = map.remove(from) {
					map.insert(to.to_string(), inner);
				}
			}
			for (key, item) in map.iter_mut() {
				if key == "uri" || key == "targetUri" {
					if let Value::String(identity) = item {
						if identity == from {
							*identity = to.to_string();
						}
					}
				}
				rewrite_uris(item, from, to);
			}
		}
		Value::Array(items) => {
			for item in items {
				rewrite_uris(item, from, to);
			}
		}
		_ => {}
	}
}

/// Rewrite an outgoing request in place: point its `textDocument` at the
/// shadow identity and translate overlay-local position lines to absolute
/// document lines.
///
/// Only the fields that exist are touched; a request without a position
/// (or without a `textDocument` at all) passes through.
pub fn remap_request(ctx: &RewriteContext<'_>, params: &mut Value) {
	if let Some(text_document) = params.get_mut("textDocument") {
		if let Some(Value::String(identity)) = text_document.get_mut("uri") {
			*identity = ctx.shadow.to_string();
		}
	}
	if ctx.line_offset > 0 {
		if let Some(position) = params.get_mut("position") {
			offset_line(position, ctx.line_offset);
		}
		if let Some(range) = params.get_mut("range") {
			if let Some(start) = range.pointer_mut("/start") {
				offset_line(start, ctx.line_offset);
			}
			if let Some(end) = range.pointer_mut("/end") {
				offset_line(end, ctx.line_offset);
			}
		}
	}
}

fn offset_line(position: &mut Value, offset: u32) {
	if let Some(Value::Number(line)) = position.get("line") {
		if let Some(line) = line.as_u64() {
			position["line"] = Value::from(line + u64::from(offset));
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	const HUMAN: &str = "file:///nb/report.ipynb";
	const SHADOW: &str = "weft-shadow:///nb/report.ipynb.py";
	const PREVIEW: &str = "weft-preview:///nb/report.ipynb";

	fn ctx(line_offset: u32) -> RewriteContext<'static> {
		RewriteContext {
			human: HUMAN,
			shadow: SHADOW,
			preview: PREVIEW,
			line_offset,
		}
	}

	#[test]
	fn single_location_rewrites() {
		let mut value = json!({ "uri": SHADOW, "range": { "start": { "line": 4, "character": 0 }, "end": { "line": 4, "character": 5 } } });
		rewrite_uris(&mut value, SHADOW, HUMAN);
		assert_eq!(value["uri"], json!(HUMAN));
		// Line numbers untouched: the 1:1 mapping makes them valid as-is.
		assert_eq!(value["range"]["start"]["line"], json!(4));
	}

	#[test]
	fn location_links_and_nested_lists_rewrite() {
		let mut value = json!([
			{ "targetUri": SHADOW, "targetRange": { "start": { "line": 1, "character": 0 }, "end": { "line": 1, "character": 1 } } },
			{ "nested": [ { "uri": SHADOW } ] },
		]);
		rewrite_uris(&mut value, SHADOW, PREVIEW);
		assert_eq!(value[0]["targetUri"], json!(PREVIEW));
		assert_eq!(value[1]["nested"][0]["uri"], json!(PREVIEW));
	}

	#[test]
	fn uri_keyed_maps_rewrite_their_keys() {
		let mut value = json!({ "changes": { SHADOW: [ { "range": {}, "newText": "x" } ] } });
		rewrite_uris(&mut value, SHADOW, HUMAN);
		assert!(value["changes"].get(SHADOW).is_none());
		assert_eq!(value["changes"][HUMAN][0]["newText"], json!("x"));
	}

	#[test]
	fn unrecognized_shapes_pass_through_unchanged() {
		let original = json!({ "weird": [1, 2, { "uri": 42 }], "uri": { "not": "a string" } });
		let mut value = original.clone();
		rewrite_uris(&mut value, SHADOW, HUMAN);
		assert_eq!(value, original);
	}

	#[test]
	fn request_remap_swaps_identity_and_keeps_line() {
		let mut params = json!({
			"textDocument": { "uri": HUMAN },
			"position": { "line": 6, "character": 2 },
		});
		remap_request(&ctx(0), &mut params);
		assert_eq!(params["textDocument"]["uri"], json!(SHADOW));
		assert_eq!(params["position"]["line"], json!(6));
		assert_eq!(params["position"]["character"], json!(2));
	}

	#[test]
	fn overlay_origin_offsets_lines_only() {
		let mut params = json!({
			"textDocument": { "uri": "weft-overlay:///nb/report.ipynb" },
			"position": { "line": 1, "character": 7 },
		});
		remap_request(&ctx(4), &mut params);
		assert_eq!(params["position"]["line"], json!(5));
		assert_eq!(params["position"]["character"], json!(7));
	}
}
