//! Per-document proxy session.
//!
//! One session owns one notebook's proxied surface: the synchronizer, the
//! identity set (human, shadow, overlay, preview), the in-flight request
//! table, and the optional backend attachment. The process-wide
//! [`ProxyRegistry`](crate::ProxyRegistry) resolves incoming traffic to a
//! session by origin identity; everything stateful happens in here.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use lsp_types::{OneOf, Position, PublishDiagnosticsParams, TextEdit, Uri, WorkspaceEdit};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tracing::{debug, warn};
use weft_notebook::{CellId, CellKind, Document};
use weft_sync::ViewSynchronizer;

use crate::backend::{AnalysisBackend, BackendRequest};
use crate::edits;
use crate::interceptor::{InterceptorTable, RequestClass};
use crate::pending::{PendingRequests, RequestId};
use crate::rewrite::RewriteContext;
use crate::{Error, Result};

/// What a reply turned into after correlation and rewriting.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseAction {
	/// Surface this rewritten result to the consuming UI.
	Deliver(Value),
	/// The result was consumed internally (edits pushed through the
	/// synchronizer); nothing to surface.
	Applied,
	/// Stale or superseded; no view state may change.
	Discarded,
}

struct Identities {
	human: String,
	shadow: String,
	overlay: String,
	preview: String,
}

impl Identities {
	fn derive(human: &str, language: &str) -> Result<Self> {
		let rest = human.split_once(':').map_or(human, |(_, rest)| rest);
		let identities = Self {
			human: human.to_string(),
			shadow: format!("weft-shadow:{rest}.{}", language_extension(language)),
			overlay: format!("weft-overlay:{rest}"),
			preview: format!("weft-preview:{rest}"),
		};
		for identity in [
			&identities.human,
			&identities.shadow,
			&identities.overlay,
			&identities.preview,
		] {
			identity
				.parse::<Uri>()
				.map_err(|_| Error::InvalidIdentity(identity.clone()))?;
		}
		Ok(identities)
	}
}

/// File-extension tag the backend sees for an analysis language.
fn language_extension(language: &str) -> &str {
	match language {
		"python" => "py",
		"julia" => "jl",
		"rust" => "rs",
		"javascript" => "js",
		"typescript" => "ts",
		"r" | "R" => "r",
		other if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric()) => other,
		_ => "txt",
	}
}

/// One proxied notebook document.
pub struct DocumentSession {
	human_uri: Uri,
	identities: RwLock<Identities>,
	sync: Mutex<ViewSynchronizer>,
	pending: Mutex<PendingRequests>,
	interceptors: InterceptorTable,
	backend: RwLock<Option<Arc<dyn AnalysisBackend>>>,
	/// Shadow document version for backend sync, monotonically increasing.
	version: AtomicI32,
}

impl DocumentSession {
	/// Build a session for a document reachable at `human` (the identity
	/// the editor addresses it by).
	pub fn new(human: impl Into<String>, document: Document) -> Result<Arc<Self>> {
		let human = human.into();
		let human_uri: Uri = human
			.parse()
			.map_err(|_| Error::InvalidIdentity(human.clone()))?;
		let identities = Identities::derive(&human, document.language())?;
		Ok(Arc::new(Self {
			human_uri,
			identities: RwLock::new(identities),
			sync: Mutex::new(ViewSynchronizer::new(document)),
			pending: Mutex::new(PendingRequests::new()),
			interceptors: InterceptorTable::with_defaults(),
			backend: RwLock::new(None),
			version: AtomicI32::new(0),
		}))
	}

	/// Every identity this session answers for.
	pub fn identities(&self) -> Vec<String> {
		let identities = self.identities.read();
		vec![
			identities.human.clone(),
			identities.shadow.clone(),
			identities.overlay.clone(),
			identities.preview.clone(),
		]
	}

	/// The human view's identity.
	pub fn human_identity(&self) -> String {
		self.identities.read().human.clone()
	}

	/// The shadow view's identity (what the backend believes in).
	pub fn shadow_identity(&self) -> String {
		self.identities.read().shadow.clone()
	}

	/// The overlay's identity.
	pub fn overlay_identity(&self) -> String {
		self.identities.read().overlay.clone()
	}

	/// The virtual preview identity used by indirect rewriting.
	pub fn preview_identity(&self) -> String {
		self.identities.read().preview.clone()
	}

	/// Run a closure against the synchronizer. This is the embedder's
	/// mutation surface; the session takes the same lock for its own
	/// operations, so per-document state stays serialized.
	pub fn with_sync<R>(&self, f: impl FnOnce(&mut ViewSynchronizer) -> R) -> R {
		f(&mut self.sync.lock())
	}

	/// Content a preview identity renders: the human view's text.
	pub fn preview_content(&self) -> String {
		self.sync.lock().human().lines().join("\n")
	}

	// --- Backend attachment ----------------------------------------------

	/// Attach a backend and announce the shadow document to it.
	pub fn attach_backend(&self, backend: Arc<dyn AnalysisBackend>) {
		let (shadow, language, text) = {
			let sync = self.sync.lock();
			(
				self.shadow_identity(),
				sync.document().language().to_string(),
				sync.shadow().lines().join("\n"),
			)
		};
		backend.notify(
			"textDocument/didOpen",
			json!({
				"textDocument": {
					"uri": shadow,
					"languageId": language,
					"version": self.version.load(Ordering::Relaxed),
					"text": text,
				}
			}),
		);
		*self.backend.write() = Some(backend);
		debug!(identity = %shadow, "backend attached");
	}

	/// Detach the backend; all proxy operations become no-ops.
	pub fn detach_backend(&self) {
		let backend = self.backend.write().take();
		if let Some(backend) = backend {
			backend.notify(
				"textDocument/didClose",
				json!({ "textDocument": { "uri": self.shadow_identity() } }),
			);
			debug!("backend detached");
		}
	}

	/// Whether a backend is attached.
	pub fn has_backend(&self) -> bool {
		self.backend.read().is_some()
	}

	/// Push the current shadow text to the backend (full-sync style).
	pub fn flush_to_backend(&self) {
		let Some(backend) = self.backend.read().clone() else {
			return;
		};
		let text = self.sync.lock().shadow().lines().join("\n");
		let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
		backend.notify(
			"textDocument/didChange",
			json!({
				"textDocument": { "uri": self.shadow_identity(), "version": version },
				"contentChanges": [ { "text": text } ],
			}),
		);
	}

	/// Change the analysis language: regenerate the shadow, re-derive the
	/// shadow identity, re-register with the registry, and re-attach the
	/// backend to the new virtual document.
	pub fn set_language(
		self: &Arc<Self>,
		registry: &crate::ProxyRegistry,
		language: &str,
	) -> Result<()> {
		let backend = self.backend.read().clone();
		if backend.is_some() {
			self.detach_backend();
		}
		self.sync.lock().set_language(language);
		let human = self.human_identity();
		*self.identities.write() = Identities::derive(&human, language)?;
		registry.rebind(self);
		if let Some(backend) = backend {
			self.attach_backend(backend);
		}
		Ok(())
	}

	// --- Requests --------------------------------------------------------

	/// Rewrite and dispatch a request originating from `origin` (human
	/// view or overlay). Returns the correlation id, or `None` when no
	/// backend is attached or the origin is no longer applicable.
	pub fn request(&self, origin: &str, method: &str, params: Value) -> Option<RequestId> {
		let backend = self.backend.read().clone()?;
		let interceptor = self.interceptors.get(method);

		let (line_offset, overlay_generation) = if origin == self.overlay_identity() {
			let sync = self.sync.lock();
			match sync.overlay() {
				Some(overlay) => (overlay.region_start() as u32, Some(overlay.generation())),
				None => return None,
			}
		} else {
			(0, None)
		};

		let mut params = params;
		{
			let identities = self.identities.read();
			let ctx = RewriteContext {
				human: &identities.human,
				shadow: &identities.shadow,
				preview: &identities.preview,
				line_offset,
			};
			(interceptor.rewrite_request)(&ctx, &mut params);
		}

		let id = self
			.pending
			.lock()
			.issue(method, interceptor.class, overlay_generation);
		debug!(%id, method, line_offset, "dispatching rewritten request");
		backend.dispatch(BackendRequest {
			id,
			method: method.to_string(),
			params,
		});
		Some(id)
	}

	/// Request formatting for one cell, scoped to its content range in
	/// shadow coordinates.
	pub fn format_cell(&self, cell: CellId) -> Option<RequestId> {
		let (start, end) = self.sync.lock().content_range_of(cell)?;
		let params = json!({
			"textDocument": { "uri": self.shadow_identity() },
			"range": {
				"start": { "line": start, "character": 0 },
				"end": { "line": end, "character": 0 },
			},
			"options": { "tabSize": 4, "insertSpaces": true },
		});
		self.request(&self.shadow_identity(), "textDocument/rangeFormatting", params)
	}

	// --- Responses -------------------------------------------------------

	/// Correlate a reply and rewrite or apply it.
	///
	/// Unknown and superseded ids, and replies stamped with a closed
	/// overlay generation, are discarded without touching any view state.
	/// Formatting and rename results are applied through the synchronizer
	/// and consumed; everything else is rewritten per its method's
	/// strategy and delivered.
	pub fn accept_response(&self, id: RequestId, result: Value) -> ResponseAction {
		let Some(pending) = self.pending.lock().complete(id) else {
			debug!(%id, "discarding unknown or superseded reply");
			return ResponseAction::Discarded;
		};
		if let Some(generation) = pending.overlay_generation {
			if !self.sync.lock().is_current_overlay(generation) {
				debug!(%id, generation, "discarding reply for a closed overlay");
				return ResponseAction::Discarded;
			}
		}

		match pending.class {
			RequestClass::Formatting => self.apply_format_response(result),
			RequestClass::Rename => self.apply_rename_response(result),
			_ => {
				let identities = self.identities.read();
				let ctx = RewriteContext {
					human: &identities.human,
					shadow: &identities.shadow,
					preview: &identities.preview,
					line_offset: 0,
				};
				let mut result = result;
				(self.interceptors.get(&pending.method).rewrite_response)(&ctx, &mut result);
				ResponseAction::Deliver(result)
			}
		}
	}

	fn apply_format_response(&self, result: Value) -> ResponseAction {
		match serde_json::from_value::<Option<Vec<TextEdit>>>(result.clone()) {
			Ok(Some(edits)) if !edits.is_empty() => self.apply_shadow_edits(edits),
			Ok(_) => ResponseAction::Applied,
			Err(err) => {
				// Fail open: an unparseable result surfaces as-is instead
				// of vanishing.
				warn!(%err, "unexpected formatting result shape; passing through");
				ResponseAction::Deliver(result)
			}
		}
	}

	fn apply_rename_response(&self, result: Value) -> ResponseAction {
		let workspace_edit = match serde_json::from_value::<Option<WorkspaceEdit>>(result.clone()) {
			Ok(Some(edit)) => edit,
			Ok(None) => return ResponseAction::Applied,
			Err(err) => {
				warn!(%err, "unexpected rename result shape; passing through");
				return ResponseAction::Deliver(result);
			}
		};
		let shadow = self.shadow_identity();
		let mut edits: Vec<TextEdit> = Vec::new();
		if let Some(changes) = workspace_edit.changes {
			for (uri, uri_edits) in changes {
				if uri.as_str() == shadow {
					edits.extend(uri_edits);
				}
			}
		}
		if let Some(lsp_types::DocumentChanges::Edits(document_edits)) =
			workspace_edit.document_changes
		{
			for document_edit in document_edits {
				if document_edit.text_document.uri.as_str() != shadow {
					continue;
				}
				for edit in document_edit.edits {
					match edit {
						OneOf::Left(edit) => edits.push(edit),
						OneOf::Right(annotated) => edits.push(annotated.text_edit),
					}
				}
			}
		}
		if edits.is_empty() {
			return ResponseAction::Applied;
		}
		self.apply_shadow_edits(edits)
	}

	/// Apply backend edits (shadow coordinates) cell by cell, bottom-up.
	///
	/// Edits are grouped by owning cell, localized to the cell's content
	/// range, applied to an in-memory copy, and pushed through the
	/// synchronizer. Descending order guarantees that applying one cell
	/// never shifts the line numbers of cells still to be processed above
	/// it. Edits touching marker lines, non-code cells, or crossing a cell
	/// boundary are dropped: cross-cell refactors are out of contract.
	fn apply_shadow_edits(&self, edits: Vec<TextEdit>) -> ResponseAction {
		let mut sync = self.sync.lock();
		let mut per_cell: HashMap<CellId, (usize, Vec<TextEdit>)> = HashMap::new();

		for edit in edits {
			let start_line = edit.range.start.line as usize;
			let end_line = edit.range.end.line as usize;
			let Some(cell) = sync.cell_at(start_line) else {
				debug!(start_line, "dropping edit outside any cell");
				continue;
			};
			let is_code = sync
				.document()
				.cell(cell)
				.is_some_and(|cell| cell.kind() == CellKind::Code);
			let Some((content_start, content_end)) = sync.content_range_of(cell) else {
				continue;
			};
			let crosses = start_line < content_start
				|| end_line > content_end
				|| (end_line == content_end && edit.range.end.character > 0);
			if !is_code || crosses {
				debug!(start_line, end_line, "dropping marker-line or cross-cell edit");
				continue;
			}
			let mut local = edit;
			local.range.start.line -= content_start as u32;
			local.range.end.line -= content_start as u32;
			per_cell.entry(cell).or_insert((content_start, Vec::new())).1.push(local);
		}

		// Bottom of the document first.
		let mut ordered: Vec<(CellId, (usize, Vec<TextEdit>))> = per_cell.into_iter().collect();
		ordered.sort_by(|a, b| b.1.0.cmp(&a.1.0));

		for (cell, (_, cell_edits)) in ordered {
			let Some((start, end)) = sync.content_range_of(cell) else {
				continue;
			};
			let mut lines = sync.human().slice(start, end).to_vec();
			edits::apply_text_edits(&mut lines, &cell_edits);
			if let Err(err) = sync.apply_cell_content(cell, lines) {
				warn!(%cell, %err, "skipping edit for stale cell");
			}
		}
		ResponseAction::Applied
	}

	// --- Diagnostics and focus -------------------------------------------

	/// Filter shadow diagnostics and republish them against the human
	/// identity. `None` when the parameters are not for this session's
	/// shadow document (not an error: the registry may fan out).
	pub fn publish_diagnostics(
		&self,
		params: PublishDiagnosticsParams,
	) -> Option<PublishDiagnosticsParams> {
		if params.uri.as_str() != self.shadow_identity() {
			return None;
		}
		let sync = self.sync.lock();
		let diagnostics = params
			.diagnostics
			.into_iter()
			.filter(|diagnostic| {
				let line = diagnostic.range.start.line as usize;
				sync.cell_at(line)
					.and_then(|cell| sync.document().cell(cell))
					.is_some_and(|cell| cell.kind() == CellKind::Code)
			})
			.collect();
		Some(PublishDiagnosticsParams {
			uri: self.human_uri.clone(),
			diagnostics,
			version: params.version,
		})
	}

	/// Redirect a focus/cursor move aimed at the shadow document to the
	/// human view, closing the overlay so the jump lands on a visible
	/// surface. `None` when the target is not the shadow document.
	pub fn redirect_focus(&self, target: &str, position: Position) -> Option<(String, Position)> {
		if target != self.shadow_identity() {
			return None;
		}
		let mut sync = self.sync.lock();
		if sync.overlay().is_some() {
			if let Err(err) = sync.close_overlay() {
				warn!(%err, "closing overlay during focus redirect failed");
			}
		}
		Some((self.human_identity(), position))
	}
}
