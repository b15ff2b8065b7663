//! The transient per-cell edit overlay.
//!
//! At most one overlay exists per document. While open, its buffer is the
//! authoritative source for its cell; on close the content flushes back
//! into the cell and the buffer is cached so re-opening the same cell
//! reuses it.

use std::collections::HashMap;

use weft_notebook::CellId;

/// An open editing surface bound to exactly one cell.
#[derive(Debug)]
pub struct EditOverlay {
	cell: CellId,
	region_start: usize,
	region_end: usize,
	buffer: Vec<String>,
	generation: u64,
}

impl EditOverlay {
	pub(crate) fn new(
		cell: CellId,
		region_start: usize,
		region_end: usize,
		buffer: Vec<String>,
		generation: u64,
	) -> Self {
		Self {
			cell,
			region_start,
			region_end,
			buffer,
			generation,
		}
	}

	/// The cell this overlay edits.
	pub fn cell(&self) -> CellId {
		self.cell
	}

	/// First human-view line of the overlaid content region.
	pub fn region_start(&self) -> usize {
		self.region_start
	}

	/// End (exclusive) of the overlaid content region.
	pub fn region_end(&self) -> usize {
		self.region_end
	}

	/// Monotonic id distinguishing this overlay session from earlier and
	/// later ones; protocol replies stamped with another generation are
	/// stale.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// The overlay's buffered lines.
	pub fn lines(&self) -> &[String] {
		&self.buffer
	}

	/// Buffered line count.
	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	/// Whether the buffer is empty (legal for an empty cell).
	pub fn is_empty(&self) -> bool {
		self.buffer.is_empty()
	}

	/// Translate an overlay-local line to an absolute human-view line.
	pub fn to_absolute_line(&self, local: usize) -> usize {
		self.region_start + local
	}

	/// Replace `[local_start, local_end)` of the buffer and resize the
	/// region geometry to match.
	pub(crate) fn splice(&mut self, local_start: usize, local_end: usize, replacement: Vec<String>) {
		let local_start = local_start.min(self.buffer.len());
		let local_end = local_end.clamp(local_start, self.buffer.len());
		self.buffer.splice(local_start..local_end, replacement);
		self.region_end = self.region_start + self.buffer.len();
	}

	/// Move the whole region by `delta` lines (an earlier cell grew or
	/// shrank).
	pub(crate) fn shift(&mut self, delta: isize) {
		self.region_start = self.region_start.saturating_add_signed(delta);
		self.region_end = self.region_end.saturating_add_signed(delta);
	}

	pub(crate) fn reload(&mut self, region_start: usize, lines: Vec<String>) {
		self.region_start = region_start;
		self.region_end = region_start + lines.len();
		self.buffer = lines;
	}

	pub(crate) fn into_parts(self) -> (CellId, Vec<String>) {
		(self.cell, self.buffer)
	}
}

/// Closed-overlay buffers kept per cell for reuse on re-open.
#[derive(Debug, Default)]
pub(crate) struct OverlayCache {
	buffers: HashMap<CellId, Vec<String>>,
}

impl OverlayCache {
	pub(crate) fn take(&mut self, cell: CellId) -> Option<Vec<String>> {
		self.buffers.remove(&cell)
	}

	pub(crate) fn store(&mut self, cell: CellId, buffer: Vec<String>) {
		self.buffers.insert(cell, buffer);
	}

	pub(crate) fn forget(&mut self, cell: CellId) {
		self.buffers.remove(&cell);
	}
}
