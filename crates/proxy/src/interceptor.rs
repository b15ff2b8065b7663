//! Method dispatch table.
//!
//! Backend methods differ only in how their results must be rewritten,
//! so the dispatcher stays generic: each method name maps to a typed
//! interceptor carrying a request rewriter, a response rewriter, and the
//! class used for last-request-wins supersession. Unknown methods get a
//! passthrough interceptor rather than an error.

use std::collections::HashMap;

use serde_json::Value;

use crate::rewrite::{RewriteContext, remap_request, rewrite_uris};

/// Supersession class: issuing a new request of a class logically cancels
/// in-flight ones of the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
	/// Cursor-jump navigation (definition and friends).
	Navigation,
	/// List-producing lookups presented through a picker.
	References,
	/// Completion requests.
	Completion,
	/// Hover/signature style inspection.
	Inspection,
	/// Whole-cell or range formatting.
	Formatting,
	/// Symbol rename.
	Rename,
	/// Anything not otherwise classified.
	Other,
}

/// Rewriter applied to a request's params or a response's result.
pub type RewriteFn = fn(&RewriteContext<'_>, &mut Value);

/// One method's rewrite behavior.
#[derive(Debug, Clone, Copy)]
pub struct MethodInterceptor {
	/// Supersession class.
	pub class: RequestClass,
	/// Applied to outgoing params before dispatch.
	pub rewrite_request: RewriteFn,
	/// Applied to the raw result before it surfaces.
	pub rewrite_response: RewriteFn,
}

/// Request rewriter used by every standard method: shadow identity, same
/// line numbers, overlay offset when applicable.
pub fn request_to_shadow(ctx: &RewriteContext<'_>, params: &mut Value) {
	remap_request(ctx, params);
}

/// Direct strategy: results jump the cursor immediately, so shadow
/// references become the human view's own identity.
pub fn respond_direct(ctx: &RewriteContext<'_>, result: &mut Value) {
	rewrite_uris(result, ctx.shadow, ctx.human);
}

/// Indirect strategy: list results go through a picker, so shadow
/// references become the virtual preview identity that renders the human
/// content without touching the live view.
pub fn respond_indirect(ctx: &RewriteContext<'_>, result: &mut Value) {
	rewrite_uris(result, ctx.shadow, ctx.preview);
}

/// No response rewriting (results carry no document identities).
pub fn respond_passthrough(_ctx: &RewriteContext<'_>, _result: &mut Value) {}

const PASSTHROUGH: MethodInterceptor = MethodInterceptor {
	class: RequestClass::Other,
	rewrite_request: request_to_shadow,
	rewrite_response: respond_passthrough,
};

/// Method-name → interceptor registry.
#[derive(Debug)]
pub struct InterceptorTable {
	by_method: HashMap<String, MethodInterceptor>,
}

impl InterceptorTable {
	/// Empty table; every method falls back to passthrough.
	pub fn new() -> Self {
		Self {
			by_method: HashMap::new(),
		}
	}

	/// Table preloaded with the standard method set.
	pub fn with_defaults() -> Self {
		let mut table = Self::new();
		for method in [
			"textDocument/definition",
			"textDocument/declaration",
			"textDocument/implementation",
			"textDocument/typeDefinition",
		] {
			table.register(method, RequestClass::Navigation, respond_direct);
		}
		table.register("textDocument/references", RequestClass::References, respond_indirect);
		table.register("textDocument/completion", RequestClass::Completion, respond_passthrough);
		table.register("textDocument/hover", RequestClass::Inspection, respond_passthrough);
		table.register(
			"textDocument/signatureHelp",
			RequestClass::Inspection,
			respond_passthrough,
		);
		table.register(
			"textDocument/documentHighlight",
			RequestClass::Inspection,
			respond_passthrough,
		);
		table.register("textDocument/formatting", RequestClass::Formatting, respond_passthrough);
		table.register(
			"textDocument/rangeFormatting",
			RequestClass::Formatting,
			respond_passthrough,
		);
		table.register("textDocument/rename", RequestClass::Rename, respond_passthrough);
		table
	}

	/// Register (or replace) a method's interceptor with the standard
	/// request rewriter.
	pub fn register(
		&mut self,
		method: impl Into<String>,
		class: RequestClass,
		rewrite_response: RewriteFn,
	) {
		self.by_method.insert(
			method.into(),
			MethodInterceptor {
				class,
				rewrite_request: request_to_shadow,
				rewrite_response,
			},
		);
	}

	/// Register a fully custom interceptor.
	pub fn register_interceptor(&mut self, method: impl Into<String>, interceptor: MethodInterceptor) {
		self.by_method.insert(method.into(), interceptor);
	}

	/// Interceptor for a method; passthrough when unregistered.
	pub fn get(&self, method: &str) -> MethodInterceptor {
		self.by_method.get(method).copied().unwrap_or(PASSTHROUGH)
	}
}

impl Default for InterceptorTable {
	fn default() -> Self {
		Self::with_defaults()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	const CTX: RewriteContext<'static> = RewriteContext {
		human: "file:///nb/report.ipynb",
		shadow: "weft-shadow:///nb/report.ipynb.py",
		preview: "weft-preview:///nb/report.ipynb",
		line_offset: 0,
	};

	fn rewritten(method: &str) -> Value {
		let table = InterceptorTable::with_defaults();
		let mut result = json!([{ "uri": CTX.shadow, "range": {} }]);
		(table.get(method).rewrite_response)(&CTX, &mut result);
		result[0]["uri"].clone()
	}

	#[test]
	fn definition_family_rewrites_to_the_human_identity() {
		for method in [
			"textDocument/definition",
			"textDocument/declaration",
			"textDocument/implementation",
			"textDocument/typeDefinition",
		] {
			assert_eq!(rewritten(method), json!(CTX.human));
			assert_eq!(
				InterceptorTable::with_defaults().get(method).class,
				RequestClass::Navigation
			);
		}
	}

	#[test]
	fn references_rewrite_to_the_preview_identity() {
		assert_eq!(rewritten("textDocument/references"), json!(CTX.preview));
		assert_eq!(
			InterceptorTable::with_defaults()
				.get("textDocument/references")
				.class,
			RequestClass::References
		);
	}

	#[test]
	fn unknown_methods_fall_back_to_passthrough() {
		let table = InterceptorTable::with_defaults();
		let interceptor = table.get("workspace/executeCommand");
		assert_eq!(interceptor.class, RequestClass::Other);
		assert_eq!(rewritten("workspace/executeCommand"), json!(CTX.shadow));
	}
}
