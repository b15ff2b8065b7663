//! Gravity-aware position anchors over the human view.
//!
//! One left-sticky anchor tracks each cell's start (header) line. A
//! cell's end is the next cell's start minus one, or the document end for
//! the last cell, so the tracker never stores end positions that could
//! drift. Anchors are *invalidated*, never deleted, when their cell goes
//! away: a stale id keeps answering "not valid" in O(1) instead of
//! reporting coordinates that no longer mean anything.
//!
//! The tracker is an ordered index (sorted `(line, cell)` array over a
//! slab of anchor records) rather than a host editor marker primitive, so
//! lookups are O(log n) and shifts are explicit.

use std::collections::HashMap;

use slab::Slab;

use crate::cell::CellId;
use crate::document::Document;

/// Which way an anchor leans when text is inserted exactly at its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
	/// Stays before lines inserted at its position.
	Left,
	/// Stays after lines inserted at its position.
	Right,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
	line: usize,
	gravity: Gravity,
	valid: bool,
}

/// Maps document positions to cell boundaries, surviving edits.
#[derive(Debug, Default)]
pub struct AnchorTracker {
	anchors: Slab<Anchor>,
	by_cell: HashMap<CellId, usize>,
	/// Valid anchors sorted by line. Shifts are monotonic, so order is
	/// maintained in place; only `place`/`track`/`invalidate` rebuild it.
	ordered: Vec<(usize, CellId)>,
	total_lines: usize,
}

impl AnchorTracker {
	/// Create an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Rebuild anchors from the document's current geometry.
	///
	/// Cells keep their anchor record across re-placement; anchors whose
	/// cell is gone flip to invalid and stay that way.
	pub fn place(&mut self, document: &Document) {
		for (_, anchor) in self.anchors.iter_mut() {
			anchor.valid = false;
		}
		self.ordered.clear();

		let mut line = 0usize;
		for cell in document.cells() {
			self.track(cell.id(), line, Gravity::Left);
			line += 1 + cell.line_count();
		}
		// The footer marker.
		self.total_lines = line + 1;
	}

	/// Insert or update the anchor for one cell.
	pub fn track(&mut self, cell: CellId, line: usize, gravity: Gravity) {
		self.ordered.retain(|&(_, c)| c != cell);
		match self.by_cell.get(&cell) {
			Some(&key) => {
				let anchor = &mut self.anchors[key];
				anchor.line = line;
				anchor.gravity = gravity;
				anchor.valid = true;
			}
			None => {
				let key = self.anchors.insert(Anchor {
					line,
					gravity,
					valid: true,
				});
				self.by_cell.insert(cell, key);
			}
		}
		let at = self.ordered.partition_point(|&(l, _)| l < line);
		self.ordered.insert(at, (line, cell));
	}

	/// Mark a cell's anchor invalid (the cell was removed).
	pub fn invalidate(&mut self, cell: CellId) {
		if let Some(&key) = self.by_cell.get(&cell) {
			self.anchors[key].valid = false;
			self.ordered.retain(|&(_, c)| c != cell);
		}
	}

	/// Whether a cell's anchor is still valid. O(1).
	pub fn is_valid(&self, cell: CellId) -> bool {
		self.by_cell
			.get(&cell)
			.is_some_and(|&key| self.anchors[key].valid)
	}

	/// Total tracked line count (human view and shadow view alike).
	pub fn total_lines(&self) -> usize {
		self.total_lines
	}

	/// The cell whose range contains `line`: nearest start anchor at or
	/// before it. `None` when no cell starts at or before the line, or the
	/// line is outside the document.
	pub fn cell_at(&self, line: usize) -> Option<CellId> {
		if line >= self.total_lines {
			return None;
		}
		let idx = self.ordered.partition_point(|&(l, _)| l <= line);
		idx.checked_sub(1).map(|i| self.ordered[i].1)
	}

	/// Half-open line range `[start, end)` of a cell, header included.
	///
	/// `None` once the anchor has been invalidated: callers must treat
	/// that as "operation no longer applicable", never retry blindly.
	pub fn range_of(&self, cell: CellId) -> Option<(usize, usize)> {
		let &key = self.by_cell.get(&cell)?;
		let anchor = self.anchors[key];
		if !anchor.valid {
			return None;
		}
		let idx = self.ordered.partition_point(|&(l, _)| l <= anchor.line);
		let end = match self.ordered.get(idx) {
			Some(&(next_start, _)) => next_start,
			None => self.total_lines,
		};
		Some((anchor.line, end))
	}

	/// Like [`AnchorTracker::range_of`] but excluding structural marker
	/// lines: the cell's header, and the trailing footer for the last cell.
	pub fn content_range_of(&self, cell: CellId) -> Option<(usize, usize)> {
		let (start, end) = self.range_of(cell)?;
		let is_last = end == self.total_lines;
		let end = if is_last { end - 1 } else { end };
		Some((start + 1, end.max(start + 1)))
	}

	/// Shift anchors for an in-place line-count change.
	///
	/// `delta > 0` inserts that many lines at `at_line` (left-sticky
	/// anchors exactly at `at_line` stay put, right-sticky ones move);
	/// `delta < 0` deletes the region `[at_line, at_line - delta)`,
	/// clamping anchors inside it to `at_line`.
	pub fn shift(&mut self, at_line: usize, delta: isize) {
		if delta == 0 {
			return;
		}
		for entry in &mut self.ordered {
			let key = self.by_cell[&entry.1];
			let new_line = shifted(entry.0, self.anchors[key].gravity, at_line, delta);
			entry.0 = new_line;
			self.anchors[key].line = new_line;
		}
		if delta > 0 {
			self.total_lines += delta as usize;
		} else {
			self.total_lines = self.total_lines.saturating_sub((-delta) as usize);
		}
	}
}

fn shifted(line: usize, gravity: Gravity, at_line: usize, delta: isize) -> usize {
	if delta > 0 {
		let moves = match gravity {
			Gravity::Left => line > at_line,
			Gravity::Right => line >= at_line,
		};
		if moves { line + delta as usize } else { line }
	} else {
		let removed = (-delta) as usize;
		if line >= at_line + removed {
			line - removed
		} else if line > at_line {
			at_line
		} else {
			line
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cell::CellKind;

	fn lines(source: &[&str]) -> Vec<String> {
		source.iter().map(|s| s.to_string()).collect()
	}

	fn tracked() -> (Document, AnchorTracker) {
		let mut doc = Document::new("python");
		doc.insert_cell(0, CellKind::Code, lines(&["a", "b"]));
		doc.insert_cell(1, CellKind::Markdown, lines(&["prose"]));
		doc.insert_cell(2, CellKind::Code, lines(&["c"]));
		let mut tracker = AnchorTracker::new();
		tracker.place(&doc);
		(doc, tracker)
	}

	#[test]
	fn ranges_partition_the_rendering() {
		let (doc, tracker) = tracked();
		// 0: header, 1: a, 2: b, 3: header, 4: prose, 5: header, 6: c, 7: footer
		assert_eq!(tracker.total_lines(), doc.line_count());
		let ids: Vec<_> = doc.cells().iter().map(|c| c.id()).collect();
		assert_eq!(tracker.range_of(ids[0]), Some((0, 3)));
		assert_eq!(tracker.range_of(ids[1]), Some((3, 5)));
		assert_eq!(tracker.range_of(ids[2]), Some((5, 8)));
		assert_eq!(tracker.content_range_of(ids[0]), Some((1, 3)));
		assert_eq!(tracker.content_range_of(ids[2]), Some((6, 7)));
	}

	#[test]
	fn cell_at_resolves_every_line() {
		let (doc, tracker) = tracked();
		let ids: Vec<_> = doc.cells().iter().map(|c| c.id()).collect();
		for line in 0..3 {
			assert_eq!(tracker.cell_at(line), Some(ids[0]));
		}
		assert_eq!(tracker.cell_at(4), Some(ids[1]));
		// Footer line belongs to the last cell's range.
		assert_eq!(tracker.cell_at(7), Some(ids[2]));
		assert_eq!(tracker.cell_at(8), None);
	}

	#[test]
	fn insert_inside_a_cell_leaves_other_starts_alone() {
		let (doc, mut tracker) = tracked();
		let ids: Vec<_> = doc.cells().iter().map(|c| c.id()).collect();
		let before: Vec<_> = ids.iter().map(|&id| tracker.range_of(id).unwrap().0).collect();
		// Two lines typed inside the first cell's content range.
		tracker.shift(2, 2);
		assert_eq!(tracker.range_of(ids[0]).unwrap().0, before[0]);
		assert_eq!(tracker.range_of(ids[1]).unwrap().0, before[1] + 2);
		assert_eq!(tracker.range_of(ids[2]).unwrap().0, before[2] + 2);
		assert_eq!(tracker.total_lines(), 10);
	}

	#[test]
	fn left_sticky_anchor_stays_on_insert_at_its_line() {
		let (doc, mut tracker) = tracked();
		let second = doc.cells()[1].id();
		let (start, _) = tracker.range_of(second).unwrap();
		tracker.shift(start, 1);
		assert_eq!(tracker.range_of(second).unwrap().0, start);
	}

	#[test]
	fn right_sticky_anchor_moves_on_insert_at_its_line() {
		let mut tracker = AnchorTracker::new();
		let cell = CellId::new();
		tracker.track(cell, 4, Gravity::Right);
		tracker.shift(4, 3);
		let idx = tracker.ordered[0].0;
		assert_eq!(idx, 7);
	}

	#[test]
	fn deletion_clamps_anchors_in_the_removed_region() {
		let (doc, mut tracker) = tracked();
		let ids: Vec<_> = doc.cells().iter().map(|c| c.id()).collect();
		// Delete lines 2..5, swallowing the markdown cell's start.
		tracker.shift(2, -3);
		assert_eq!(tracker.range_of(ids[0]).unwrap().0, 0);
		assert_eq!(tracker.range_of(ids[1]).unwrap().0, 2);
		assert_eq!(tracker.range_of(ids[2]).unwrap().0, 2);
	}

	#[test]
	fn invalidated_anchor_answers_none_not_stale_coordinates() {
		let (doc, mut tracker) = tracked();
		let id = doc.cells()[1].id();
		tracker.invalidate(id);
		assert!(!tracker.is_valid(id));
		assert_eq!(tracker.range_of(id), None);
		assert_eq!(tracker.content_range_of(id), None);
		// The neighbours absorb the lookup instead.
		assert_eq!(tracker.cell_at(4), Some(doc.cells()[0].id()));
	}

	#[test]
	fn replacement_keeps_ids_answering_after_structural_change() {
		let (mut doc, mut tracker) = tracked();
		let id = doc.cells()[2].id();
		doc.delete_cell(doc.cells()[0].id()).unwrap();
		tracker.place(&doc);
		assert_eq!(tracker.range_of(id).map(|r| r.0), Some(2));
	}
}
