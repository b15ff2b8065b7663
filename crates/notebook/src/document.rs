//! The cell sequence and its structural operations.

use serde_json::Value;
use tracing::debug;

use crate::cell::{Cell, CellId, CellKind};
use crate::{Error, Result, marker};

/// Direction for [`Document::move_cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
	/// Swap with the preceding cell.
	Up,
	/// Swap with the following cell.
	Down,
}

/// An ordered sequence of cells plus document-level metadata.
///
/// The document owns every cell. All structural mutation goes through the
/// operations here, each of which keeps cell ids unique and never silently
/// drops one; position bookkeeping is the
/// [`AnchorTracker`](crate::AnchorTracker)'s job and is re-derived by the
/// synchronizer after structural changes.
#[derive(Debug, Clone)]
pub struct Document {
	cells: Vec<Cell>,
	language: String,
	/// Document-level metadata, passed through untouched.
	pub metadata: Value,
}

impl Document {
	/// Create an empty document declaring the given analysis language.
	pub fn new(language: impl Into<String>) -> Self {
		Self {
			cells: Vec::new(),
			language: language.into(),
			metadata: Value::Null,
		}
	}

	/// Create a document from cells produced by the serialization collaborator.
	pub fn from_cells(cells: Vec<Cell>, language: impl Into<String>) -> Self {
		Self {
			cells,
			language: language.into(),
			metadata: Value::Null,
		}
	}

	/// The declared analysis language (e.g. `"python"`).
	pub fn language(&self) -> &str {
		&self.language
	}

	/// Change the declared analysis language.
	///
	/// Callers owning a backend attachment must treat this as a full
	/// invalidation: re-attach and regenerate the shadow view wholesale.
	pub fn set_language(&mut self, language: impl Into<String>) {
		self.language = language.into();
	}

	/// All cells in order.
	pub fn cells(&self) -> &[Cell] {
		&self.cells
	}

	/// Number of cells.
	pub fn cell_count(&self) -> usize {
		self.cells.len()
	}

	/// Look up a cell by id.
	pub fn cell(&self, id: CellId) -> Option<&Cell> {
		self.cells.iter().find(|cell| cell.id() == id)
	}

	/// Mutable lookup, for collaborators storing opaque outputs.
	pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
		self.cells.iter_mut().find(|cell| cell.id() == id)
	}

	/// Position of a cell in the sequence.
	pub fn index_of(&self, id: CellId) -> Option<usize> {
		self.cells.iter().position(|cell| cell.id() == id)
	}

	/// Insert a new cell at `index` (clamped to the sequence length).
	pub fn insert_cell(&mut self, index: usize, kind: CellKind, source: Vec<String>) -> CellId {
		let cell = Cell::new(kind, source);
		let id = cell.id();
		let index = index.min(self.cells.len());
		self.cells.insert(index, cell);
		id
	}

	/// Remove a cell, returning it (outputs and metadata intact).
	pub fn delete_cell(&mut self, id: CellId) -> Result<Cell> {
		let index = self.index_of(id).ok_or(Error::UnknownCell(id))?;
		Ok(self.cells.remove(index))
	}

	/// Swap a cell with its neighbour; returns the new index.
	///
	/// Returns `None` when the cell is already at the edge it would move
	/// past, or when the id is no longer part of the document; callers
	/// treat both as "operation no longer applicable".
	pub fn move_cell(&mut self, id: CellId, direction: MoveDirection) -> Option<usize> {
		let index = self.index_of(id)?;
		let target = match direction {
			MoveDirection::Up => index.checked_sub(1)?,
			MoveDirection::Down => {
				if index + 1 >= self.cells.len() {
					return None;
				}
				index + 1
			}
		};
		self.cells.swap(index, target);
		Some(target)
	}

	/// Change a cell's kind in place.
	pub fn set_cell_kind(&mut self, id: CellId, kind: CellKind) -> Result<()> {
		let cell = self.cell_mut(id).ok_or(Error::UnknownCell(id))?;
		cell.set_kind(kind);
		Ok(())
	}

	/// Replace a cell's source lines in place.
	pub fn set_cell_source(&mut self, id: CellId, source: Vec<String>) -> Result<()> {
		let cell = self.cell_mut(id).ok_or(Error::UnknownCell(id))?;
		cell.set_source(source);
		Ok(())
	}

	/// Render the human view: one header marker per cell, its source lines
	/// verbatim, and the closing footer marker.
	pub fn render_lines(&self) -> Vec<String> {
		let mut lines = Vec::with_capacity(self.line_count());
		for cell in &self.cells {
			lines.push(marker::header(cell.kind()));
			lines.extend(cell.source().iter().cloned());
		}
		lines.push(marker::FOOTER.to_string());
		lines
	}

	/// Total line count of the human rendering (and, by the structural
	/// invariant, of the shadow view).
	pub fn line_count(&self) -> usize {
		self.cells.iter().map(|cell| 1 + cell.line_count()).sum::<usize>() + 1
	}

	/// Re-derive the cell list from raw human-view lines.
	///
	/// This is the recovery path after a bulk edit the per-edit hooks never
	/// saw (undo/redo, a large paste). Identity is recovered in two passes:
	///
	/// 1. exact source equality against a not-yet-consumed existing cell
	///    keeps that cell's id, outputs, and metadata;
	/// 2. remaining blocks fall back to order-preserving kind matching
	///    (then any not-yet-consumed cell), keeping id and payloads but
	///    adopting the new content.
	///
	/// Only a block with no plausible predecessor mints a new id. Existing
	/// cells with no surviving block are dropped with their ids retired.
	pub fn reconcile(&mut self, lines: &[String]) {
		let blocks = parse_blocks(lines);

		let mut previous: Vec<Option<Cell>> = self.cells.drain(..).map(Some).collect();
		let mut claimed: Vec<Option<Cell>> = vec![None; blocks.len()];

		// Pass 1: exact content equality.
		for (block_idx, block) in blocks.iter().enumerate() {
			let found = previous.iter_mut().find(|slot| {
				slot.as_ref()
					.is_some_and(|cell| cell.source() == block.source.as_slice())
			});
			if let Some(slot) = found {
				claimed[block_idx] = slot.take();
			}
		}

		// Pass 2: positional fallback, same kind first.
		let mut minted = 0usize;
		for (block_idx, block) in blocks.iter().enumerate() {
			if claimed[block_idx].is_some() {
				continue;
			}
			let same_kind = previous
				.iter()
				.position(|slot| slot.as_ref().is_some_and(|cell| cell.kind() == block.kind));
			let fallback = match same_kind {
				Some(index) => Some(index),
				None => previous.iter().position(|slot| slot.is_some()),
			};
			match fallback {
				Some(index) => claimed[block_idx] = previous[index].take(),
				None => minted += 1,
			}
		}

		let dropped = previous.iter().filter(|slot| slot.is_some()).count();

		self.cells = blocks
			.into_iter()
			.zip(claimed)
			.map(|(block, claim)| match claim {
				Some(mut cell) => {
					cell.set_kind(block.kind);
					cell.set_source(block.source);
					cell
				}
				None => Cell::new(block.kind, block.source),
			})
			.collect();

		debug!(
			cells = self.cells.len(),
			minted, dropped, "reconciled cell list from raw lines"
		);
	}
}

struct Block {
	kind: CellKind,
	source: Vec<String>,
}

/// Split raw lines into `(kind, source)` blocks at header markers.
///
/// Footer markers are structural noise wherever they appear and never
/// become content. Lines before the first header (possible after a
/// marker-destroying edit) become a code block so no content is lost.
fn parse_blocks(lines: &[String]) -> Vec<Block> {
	let mut blocks = Vec::new();
	let mut current: Option<Block> = None;
	for line in lines {
		if let Some(kind) = marker::parse_header(line) {
			if let Some(block) = current.take() {
				blocks.push(block);
			}
			current = Some(Block {
				kind,
				source: Vec::new(),
			});
		} else if marker::is_footer(line) {
			continue;
		} else {
			match &mut current {
				Some(block) => block.source.push(line.clone()),
				None => {
					current = Some(Block {
						kind: CellKind::Code,
						source: vec![line.clone()],
					});
				}
			}
		}
	}
	if let Some(block) = current.take() {
		blocks.push(block);
	}
	blocks
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn lines(source: &[&str]) -> Vec<String> {
		source.iter().map(|s| s.to_string()).collect()
	}

	fn sample() -> Document {
		let mut doc = Document::new("python");
		doc.insert_cell(0, CellKind::Code, lines(&["x = 1", "y = 2"]));
		doc.insert_cell(1, CellKind::Markdown, lines(&["Some prose."]));
		doc.insert_cell(2, CellKind::Code, lines(&["print(x + y)"]));
		doc
	}

	#[test]
	fn render_has_marker_per_cell_plus_footer() {
		let doc = sample();
		let rendered = doc.render_lines();
		assert_eq!(
			rendered,
			lines(&[
				"# <<cell:code>>",
				"x = 1",
				"y = 2",
				"# <<cell:markdown>>",
				"Some prose.",
				"# <<cell:code>>",
				"print(x + y)",
				"# <</notebook>>",
			])
		);
		assert_eq!(rendered.len(), doc.line_count());
	}

	#[test]
	fn reconcile_round_trip_preserves_every_id() {
		let mut doc = sample();
		let ids: Vec<_> = doc.cells().iter().map(Cell::id).collect();
		let rendered = doc.render_lines();
		doc.reconcile(&rendered);
		let after: Vec<_> = doc.cells().iter().map(Cell::id).collect();
		assert_eq!(ids, after);
		assert_eq!(doc.render_lines(), rendered);
	}

	#[test]
	fn reconcile_matches_changed_cell_positionally() {
		let mut doc = sample();
		let ids: Vec<_> = doc.cells().iter().map(Cell::id).collect();
		let mut rendered = doc.render_lines();
		rendered[1] = "x = 99".to_string();
		doc.reconcile(&rendered);
		assert_eq!(doc.cells()[0].id(), ids[0]);
		assert_eq!(doc.cells()[0].source(), &["x = 99".to_string(), "y = 2".to_string()]);
		assert_eq!(doc.cells()[1].id(), ids[1]);
		assert_eq!(doc.cells()[2].id(), ids[2]);
	}

	#[test]
	fn reconcile_mints_only_for_new_blocks() {
		let mut doc = sample();
		let ids: Vec<_> = doc.cells().iter().map(Cell::id).collect();
		let mut rendered = doc.render_lines();
		// A brand-new cell pasted between the first and second cell.
		rendered.splice(3..3, lines(&["# <<cell:code>>", "z = 3"]));
		doc.reconcile(&rendered);
		assert_eq!(doc.cell_count(), 4);
		assert_eq!(doc.cells()[0].id(), ids[0]);
		assert!(!ids.contains(&doc.cells()[1].id()));
		assert_eq!(doc.cells()[2].id(), ids[1]);
		assert_eq!(doc.cells()[3].id(), ids[2]);
	}

	#[test]
	fn reconcile_adopts_kind_from_edited_marker() {
		let mut doc = sample();
		let id = doc.cells()[1].id();
		let mut rendered = doc.render_lines();
		rendered[3] = "# <<cell:raw>>".to_string();
		doc.reconcile(&rendered);
		assert_eq!(doc.cells()[1].id(), id);
		assert_eq!(doc.cells()[1].kind(), CellKind::Raw);
	}

	#[test]
	fn reconcile_rescues_leading_unmarked_lines_as_code() {
		let mut doc = sample();
		let mut rendered = doc.render_lines();
		rendered.remove(0);
		doc.reconcile(&rendered);
		assert_eq!(doc.cell_count(), 3);
		assert_eq!(doc.cells()[0].kind(), CellKind::Code);
		assert_eq!(doc.cells()[0].source(), &["x = 1".to_string(), "y = 2".to_string()]);
	}

	#[test]
	fn reconcile_never_duplicates_an_id() {
		let mut doc = Document::new("python");
		doc.insert_cell(0, CellKind::Code, lines(&["same"]));
		doc.insert_cell(1, CellKind::Code, lines(&["same"]));
		let rendered = doc.render_lines();
		let mut doc2 = doc.clone();
		doc2.reconcile(&rendered);
		let mut ids: Vec<_> = doc2.cells().iter().map(Cell::id).collect();
		ids.dedup();
		assert_eq!(ids.len(), 2);
	}

	#[test]
	fn move_cell_at_edges_is_inapplicable() {
		let mut doc = sample();
		let first = doc.cells()[0].id();
		let last = doc.cells()[2].id();
		assert_eq!(doc.move_cell(first, MoveDirection::Up), None);
		assert_eq!(doc.move_cell(last, MoveDirection::Down), None);
		assert_eq!(doc.move_cell(first, MoveDirection::Down), Some(1));
		assert_eq!(doc.cells()[1].id(), first);
	}

	#[test]
	fn delete_unknown_cell_errors() {
		let mut doc = sample();
		let id = doc.cells()[0].id();
		doc.delete_cell(id).unwrap();
		assert!(matches!(doc.delete_cell(id), Err(Error::UnknownCell(_))));
	}
}
