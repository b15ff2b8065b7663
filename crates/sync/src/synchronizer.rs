//! The view synchronizer.
//!
//! One synchronizer owns one document's entire mutable surface: the
//! document model, the anchor tracker, both line views, the undo history
//! and the (at most one) edit overlay. Every mutation funnels through it
//! so the three surfaces can never drift apart for longer than one call.
//!
//! # Session state machine
//!
//! - **Closed**: no overlay; the human view is authoritative.
//! - **Open**: an overlay is bound to one cell; every overlay mutation
//!   fans out to a shadow region replace, a human region replace, an
//!   overlay geometry resize, and an anchor shift when the line count
//!   changed.
//!
//! Undo/redo always act on the human view's history (the overlay has no
//! history of its own) and finish by reconciling the document from the
//! human lines and refreshing the shadow and overlay from the result.

use tracing::{debug, warn};
use weft_notebook::{AnchorTracker, Cell, CellId, CellKind, Document, MoveDirection, shadow};

use crate::history::{EditRecord, History};
use crate::overlay::{EditOverlay, OverlayCache};
use crate::queue::{DeferredQueue, DirtyRange, DirtyReceiver};
use crate::view::{LineView, ViewChange};
use crate::{Error, Result};

/// Coordinates the human view, the shadow view, and the edit overlay.
pub struct ViewSynchronizer {
	document: Document,
	anchors: AnchorTracker,
	human: LineView,
	shadow: LineView,
	history: History,
	overlay: Option<EditOverlay>,
	cache: OverlayCache,
	queue: DeferredQueue,
	next_generation: u64,
}

impl ViewSynchronizer {
	/// Build the synchronized surfaces for a document.
	pub fn new(document: Document) -> Self {
		let human = LineView::from_lines(document.render_lines());
		let shadow_view = LineView::from_lines(shadow::project(&document));
		let mut anchors = AnchorTracker::new();
		anchors.place(&document);
		Self {
			document,
			anchors,
			human,
			shadow: shadow_view,
			history: History::new(),
			overlay: None,
			cache: OverlayCache::default(),
			queue: DeferredQueue::new(),
			next_generation: 0,
		}
	}

	/// The document model.
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Mutable document access, for collaborators storing opaque outputs.
	pub fn document_mut(&mut self) -> &mut Document {
		&mut self.document
	}

	/// The human view.
	pub fn human(&self) -> &LineView {
		&self.human
	}

	/// The shadow view.
	pub fn shadow(&self) -> &LineView {
		&self.shadow
	}

	/// The undo history.
	pub fn history(&self) -> &History {
		&self.history
	}

	/// The open overlay, if any.
	pub fn overlay(&self) -> Option<&EditOverlay> {
		self.overlay.as_ref()
	}

	/// Whether `generation` identifies the currently open overlay.
	///
	/// Protocol replies stamp the overlay generation they were issued
	/// under; once the overlay closes (or reopens), stale stamps stop
	/// matching and the replies are discarded on arrival.
	pub fn is_current_overlay(&self, generation: u64) -> bool {
		self.overlay
			.as_ref()
			.is_some_and(|overlay| overlay.generation() == generation)
	}

	// --- UI surface ------------------------------------------------------

	/// Cell containing a human-view line.
	pub fn cell_at(&self, line: usize) -> Option<CellId> {
		self.anchors.cell_at(line)
	}

	/// Full line range of a cell, header included.
	pub fn range_of(&self, cell: CellId) -> Option<(usize, usize)> {
		self.anchors.range_of(cell)
	}

	/// Line range of a cell's editable content.
	pub fn content_range_of(&self, cell: CellId) -> Option<(usize, usize)> {
		self.anchors.content_range_of(cell)
	}

	/// Subscribe to coalesced dirty-range batches.
	pub fn subscribe_changes(&mut self) -> DirtyReceiver {
		self.queue.subscribe()
	}

	/// Drain deferred notifications; called once per processing cycle.
	pub fn flush_notifications(&mut self) -> Vec<DirtyRange> {
		self.queue.drain()
	}

	// --- Overlay session -------------------------------------------------

	/// Enter edit mode for a cell.
	///
	/// The overlay buffer is copied from the cell's content range; a
	/// cached buffer from an earlier session on the same cell is reused
	/// when its content still matches.
	pub fn open_overlay(&mut self, cell: CellId) -> Result<&EditOverlay> {
		if self.overlay.is_some() {
			return Err(Error::OverlayOpen);
		}
		let (start, end) = self
			.anchors
			.content_range_of(cell)
			.ok_or(Error::StaleCell(cell))?;
		let current = self.human.slice(start, end).to_vec();
		let buffer = match self.cache.take(cell) {
			Some(cached) if cached == current => cached,
			_ => current,
		};
		self.next_generation += 1;
		debug!(%cell, start, end, generation = self.next_generation, "opened edit overlay");
		let overlay = EditOverlay::new(cell, start, end, buffer, self.next_generation);
		Ok(self.overlay.insert(overlay))
	}

	/// Leave edit mode: flush the overlay into the cell's source, destroy
	/// the overlay, and cache its buffer for reuse. A no-op when closed.
	pub fn close_overlay(&mut self) -> Result<()> {
		let Some(overlay) = self.overlay.take() else {
			return Ok(());
		};
		self.history.end_session();
		let (cell, buffer) = overlay.into_parts();
		match self.document.set_cell_source(cell, buffer.clone()) {
			Ok(()) => {}
			Err(weft_notebook::Error::UnknownCell(_)) => {
				debug!(%cell, "overlay cell already gone at close; nothing to flush");
			}
			Err(err) => return Err(err.into()),
		}
		self.cache.store(cell, buffer);
		debug!(%cell, "closed edit overlay");
		Ok(())
	}

	/// Enter a continuous insertion session (undo coalescing on).
	pub fn begin_insertion(&mut self) {
		self.history.begin_session();
	}

	/// Leave the insertion session (undo coalescing off).
	pub fn end_insertion(&mut self) {
		self.history.end_session();
	}

	/// Apply an overlay mutation: replace `[local_start, local_end)` of
	/// the overlay buffer and fan the change out to both views.
	pub fn edit_overlay(
		&mut self,
		local_start: usize,
		local_end: usize,
		replacement: Vec<String>,
	) -> Result<ViewChange> {
		let (cell, abs_start, abs_end) = {
			let overlay = self.overlay.as_ref().ok_or(Error::NoOverlay)?;
			let local_start = local_start.min(overlay.len());
			let local_end = local_end.clamp(local_start, overlay.len());
			(
				overlay.cell(),
				overlay.to_absolute_line(local_start),
				overlay.to_absolute_line(local_end),
			)
		};
		if let Some(overlay) = self.overlay.as_mut() {
			let start = abs_start - overlay.region_start();
			let end = abs_end - overlay.region_start();
			overlay.splice(start, end, replacement.clone());
		}
		self.propagate(cell, abs_start, abs_end, replacement, false)
	}

	/// Replace the overlay's entire content.
	pub fn set_overlay_content(&mut self, lines: Vec<String>) -> Result<ViewChange> {
		let len = self.overlay.as_ref().ok_or(Error::NoOverlay)?.len();
		self.edit_overlay(0, len, lines)
	}

	// --- Whole-cell replacement (backend edits, pastes) ------------------

	/// Replace one cell's content with already-computed lines, as one
	/// discrete undo step.
	///
	/// This is the entry point for backend-produced edits (formatting,
	/// rename): the caller applies protocol edits to an in-memory copy
	/// first, then pushes the finished lines through here so shadow,
	/// human, and overlay move together.
	pub fn apply_cell_content(&mut self, cell: CellId, lines: Vec<String>) -> Result<ViewChange> {
		self.history.end_session();
		let overlay_owns = self
			.overlay
			.as_ref()
			.is_some_and(|overlay| overlay.cell() == cell);
		let (start, end) = if overlay_owns {
			let overlay = self.overlay.as_ref().ok_or(Error::NoOverlay)?;
			(overlay.region_start(), overlay.region_end())
		} else {
			self.anchors
				.content_range_of(cell)
				.ok_or(Error::StaleCell(cell))?
		};
		if overlay_owns {
			if let Some(overlay) = self.overlay.as_mut() {
				let len = overlay.len();
				overlay.splice(0, len, lines.clone());
			}
		} else {
			self.document.set_cell_source(cell, lines.clone())?;
		}
		self.propagate(cell, start, end, lines, true)
	}

	/// Record and absorb a bulk edit made directly to the human view by
	/// the host (large paste, external tool): one discrete undo step, then
	/// a full resync.
	pub fn apply_external_edit(&mut self, lines: Vec<String>) {
		let removed = self.human.lines().to_vec();
		self.history.record_discrete(EditRecord {
			start: 0,
			removed,
			inserted: lines.clone(),
		});
		let change = self.human.replace_all(lines);
		self.queue.push(change);
		self.resync_from_human();
	}

	// --- Undo ------------------------------------------------------------

	/// Undo one step of the human view's history.
	///
	/// Works identically whether triggered from the human view or from
	/// within the overlay: the human text rolls back, the document
	/// reconciles from it, and the shadow and overlay refresh.
	pub fn undo(&mut self) -> bool {
		match self.history.undo(&mut self.human) {
			Some(changes) => {
				for change in changes {
					self.queue.push(change);
				}
				self.resync_from_human();
				true
			}
			None => false,
		}
	}

	/// Redo one step of the human view's history.
	pub fn redo(&mut self) -> bool {
		match self.history.redo(&mut self.human) {
			Some(changes) => {
				for change in changes {
					self.queue.push(change);
				}
				self.resync_from_human();
				true
			}
			None => false,
		}
	}

	// --- Structural operations -------------------------------------------

	/// Insert a cell; its own undo step. Closes any open overlay first.
	pub fn insert_cell(
		&mut self,
		index: usize,
		kind: CellKind,
		source: Vec<String>,
	) -> Result<CellId> {
		self.close_overlay()?;
		let id = self.document.insert_cell(index, kind, source);
		self.commit_structural();
		Ok(id)
	}

	/// Delete a cell; its own undo step. Closes any open overlay first.
	pub fn delete_cell(&mut self, cell: CellId) -> Result<Cell> {
		self.close_overlay()?;
		let removed = self.document.delete_cell(cell)?;
		self.anchors.invalidate(cell);
		self.cache.forget(cell);
		self.commit_structural();
		Ok(removed)
	}

	/// Move a cell up or down; `Ok(None)` when inapplicable.
	pub fn move_cell(&mut self, cell: CellId, direction: MoveDirection) -> Result<Option<usize>> {
		self.close_overlay()?;
		match self.document.move_cell(cell, direction) {
			Some(new_index) => {
				self.commit_structural();
				Ok(Some(new_index))
			}
			None => Ok(None),
		}
	}

	/// Change a cell's kind; its own undo step.
	pub fn set_cell_kind(&mut self, cell: CellId, kind: CellKind) -> Result<()> {
		self.close_overlay()?;
		self.document.set_cell_kind(cell, kind)?;
		self.commit_structural();
		Ok(())
	}

	/// Change the declared analysis language and regenerate the shadow
	/// wholesale. The caller owning a backend attachment re-attaches.
	pub fn set_language(&mut self, language: impl Into<String>) {
		self.document.set_language(language);
		let change = self.shadow.replace_all(shadow::project(&self.document));
		self.queue.push(change);
		debug!(
			language = self.document.language(),
			"analysis language changed; shadow regenerated"
		);
	}

	// --- Recovery --------------------------------------------------------

	/// Full resync with the human view as the authority: reconcile the
	/// document from the human lines, normalize the rendering if markers
	/// were mangled, regenerate the shadow, re-place anchors, and refresh
	/// (or drop) the overlay.
	pub fn resync_from_human(&mut self) {
		let lines = self.human.lines().to_vec();
		self.document.reconcile(&lines);
		let canonical = self.document.render_lines();
		if canonical != lines {
			// The undone/pasted text had mangled markers; the redo base no
			// longer exists once we normalize.
			self.history.clear_redo();
			let change = self.human.replace_all(canonical);
			self.queue.push(change);
		}
		self.shadow.replace_all(shadow::project(&self.document));
		self.anchors.place(&self.document);
		self.refresh_overlay();
	}

	fn refresh_overlay(&mut self) {
		let Some(cell) = self.overlay.as_ref().map(EditOverlay::cell) else {
			return;
		};
		match self.anchors.content_range_of(cell) {
			Some((start, end)) => {
				let content = self.human.slice(start, end).to_vec();
				if let Some(overlay) = self.overlay.as_mut() {
					overlay.reload(start, content);
				}
			}
			None => {
				debug!(%cell, "overlay cell vanished during resync; dropping overlay");
				self.overlay = None;
				self.cache.forget(cell);
			}
		}
	}

	fn commit_structural(&mut self) {
		let removed = self.human.lines().to_vec();
		let rendered = self.document.render_lines();
		self.history.record_discrete(EditRecord {
			start: 0,
			removed,
			inserted: rendered.clone(),
		});
		let change = self.human.replace_all(rendered);
		self.shadow.replace_all(shadow::project(&self.document));
		self.anchors.place(&self.document);
		self.queue.push(change);
	}

	/// Fan one content-region replacement out to both views, the history,
	/// and the anchors.
	fn propagate(
		&mut self,
		cell: CellId,
		abs_start: usize,
		abs_end: usize,
		replacement: Vec<String>,
		discrete: bool,
	) -> Result<ViewChange> {
		let kind = self
			.document
			.cell(cell)
			.ok_or(Error::StaleCell(cell))?
			.kind();
		let shadow_replacement = shadow::project_region(kind, &replacement);
		let (change, removed) = self.human.replace_region(abs_start, abs_end, replacement.clone());
		let record = EditRecord {
			start: change.start,
			removed,
			inserted: replacement,
		};
		if discrete {
			self.history.record_discrete(record);
		} else {
			self.history.record(record);
		}
		self.shadow.replace_region(abs_start, abs_end, shadow_replacement);
		if change.delta() != 0 {
			if let Some((cell_start, _)) = self.anchors.range_of(cell) {
				self.anchors.shift(cell_start, change.delta());
			}
			if let Some(overlay) = self.overlay.as_mut() {
				if overlay.cell() != cell && overlay.region_start() >= abs_end {
					overlay.shift(change.delta());
				}
			}
		}
		self.queue.push(change);
		self.ensure_parity();
		Ok(change)
	}

	fn ensure_parity(&mut self) {
		if self.human.len() != self.shadow.len() {
			warn!(
				human = self.human.len(),
				shadow = self.shadow.len(),
				"view line counts diverged; regenerating from the human view"
			);
			self.resync_from_human();
		}
	}
}
