//! Undo history for the human view.
//!
//! There is exactly one history per document and it belongs to the human
//! view; the overlay has none of its own. The granularity contract:
//! every mutation inside one continuous insertion session coalesces into
//! a single undo step, while discrete commands (structural operations,
//! pastes) get a step each.

use crate::view::{LineView, ViewChange};

/// One invertible region replacement.
#[derive(Debug, Clone)]
pub struct EditRecord {
	/// First line of the replaced region.
	pub start: usize,
	/// Lines the edit removed.
	pub removed: Vec<String>,
	/// Lines the edit inserted.
	pub inserted: Vec<String>,
}

/// One undo step: edits applied in order, undone in reverse.
#[derive(Debug, Clone, Default)]
struct Transaction {
	edits: Vec<EditRecord>,
}

/// Undo/redo stacks with insertion-session coalescing.
#[derive(Debug, Default)]
pub struct History {
	undo: Vec<Transaction>,
	redo: Vec<Transaction>,
	session_active: bool,
	session_has_step: bool,
}

impl History {
	/// Create an empty history.
	pub fn new() -> Self {
		Self::default()
	}

	/// Enter a continuous insertion session: subsequent [`History::record`]
	/// calls merge into one undo step until [`History::end_session`].
	pub fn begin_session(&mut self) {
		self.session_active = true;
		self.session_has_step = false;
	}

	/// Leave the insertion session.
	pub fn end_session(&mut self) {
		self.session_active = false;
		self.session_has_step = false;
	}

	/// Record an edit, coalescing into the current session step if one is
	/// open.
	pub fn record(&mut self, edit: EditRecord) {
		self.redo.clear();
		if self.session_active && self.session_has_step {
			if let Some(top) = self.undo.last_mut() {
				top.edits.push(edit);
				return;
			}
		}
		self.undo.push(Transaction { edits: vec![edit] });
		if self.session_active {
			self.session_has_step = true;
		}
	}

	/// Record an edit as its own undo step, ending any open session.
	pub fn record_discrete(&mut self, edit: EditRecord) {
		self.end_session();
		self.redo.clear();
		self.undo.push(Transaction { edits: vec![edit] });
	}

	/// Undo one step against the view. Returns the applied changes, newest
	/// region first, or `None` when the stack is empty.
	pub fn undo(&mut self, view: &mut LineView) -> Option<Vec<ViewChange>> {
		self.end_session();
		let transaction = self.undo.pop()?;
		let mut changes = Vec::with_capacity(transaction.edits.len());
		for edit in transaction.edits.iter().rev() {
			let (change, _) =
				view.replace_region(edit.start, edit.start + edit.inserted.len(), edit.removed.clone());
			changes.push(change);
		}
		self.redo.push(transaction);
		Some(changes)
	}

	/// Redo one step against the view.
	pub fn redo(&mut self, view: &mut LineView) -> Option<Vec<ViewChange>> {
		self.end_session();
		let transaction = self.redo.pop()?;
		let mut changes = Vec::with_capacity(transaction.edits.len());
		for edit in &transaction.edits {
			let (change, _) =
				view.replace_region(edit.start, edit.start + edit.removed.len(), edit.inserted.clone());
			changes.push(change);
		}
		self.undo.push(transaction);
		Some(changes)
	}

	/// Drop redo state whose base text no longer exists (post-resync
	/// normalization).
	pub fn clear_redo(&mut self) {
		self.redo.clear();
	}

	/// Number of undoable steps.
	pub fn undo_depth(&self) -> usize {
		self.undo.len()
	}

	/// Number of redoable steps.
	pub fn redo_depth(&self) -> usize {
		self.redo.len()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn lines(source: &[&str]) -> Vec<String> {
		source.iter().map(|s| s.to_string()).collect()
	}

	fn apply(view: &mut LineView, history: &mut History, start: usize, end: usize, new: &[&str]) {
		let (_, removed) = view.replace_region(start, end, lines(new));
		history.record(EditRecord {
			start,
			removed,
			inserted: lines(new),
		});
	}

	#[test]
	fn session_edits_collapse_to_one_step() {
		let mut view = LineView::from_lines(lines(&["a"]));
		let mut history = History::new();
		history.begin_session();
		apply(&mut view, &mut history, 1, 1, &["b"]);
		apply(&mut view, &mut history, 2, 2, &["c"]);
		apply(&mut view, &mut history, 3, 3, &["d"]);
		history.end_session();
		assert_eq!(history.undo_depth(), 1);

		history.undo(&mut view);
		assert_eq!(view.lines(), lines(&["a"]).as_slice());
	}

	#[test]
	fn discrete_edits_each_get_a_step() {
		let mut view = LineView::from_lines(lines(&["a"]));
		let mut history = History::new();
		history.begin_session();
		apply(&mut view, &mut history, 1, 1, &["b"]);
		history.record_discrete(EditRecord {
			start: 0,
			removed: lines(&["a"]),
			inserted: lines(&["A"]),
		});
		view.replace_region(0, 1, lines(&["A"]));
		history.begin_session();
		apply(&mut view, &mut history, 2, 2, &["c"]);
		assert!(history.undo_depth() >= 2);
	}

	#[test]
	fn undo_then_redo_round_trips() {
		let mut view = LineView::from_lines(lines(&["a", "b"]));
		let mut history = History::new();
		apply(&mut view, &mut history, 1, 2, &["B", "B2"]);
		let edited = view.lines().to_vec();

		history.undo(&mut view);
		assert_eq!(view.lines(), lines(&["a", "b"]).as_slice());
		history.redo(&mut view);
		assert_eq!(view.lines(), edited.as_slice());
	}

	#[test]
	fn recording_clears_redo() {
		let mut view = LineView::from_lines(lines(&["a"]));
		let mut history = History::new();
		apply(&mut view, &mut history, 0, 1, &["b"]);
		history.undo(&mut view);
		assert_eq!(history.redo_depth(), 1);
		apply(&mut view, &mut history, 0, 1, &["c"]);
		assert_eq!(history.redo_depth(), 0);
	}
}
