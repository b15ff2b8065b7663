//! Whole-line view surfaces.
//!
//! Both projections of the document are line buffers mutated exclusively
//! through region replacement. Columns never enter the synchronization
//! model: the 1:1 line mapping between the views is the contract, and
//! in-line positions are valid in both views by construction.

/// One region replacement, in the coordinates of the view it hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewChange {
	/// First affected line.
	pub start: usize,
	/// End (exclusive) of the replaced region before the edit.
	pub old_end: usize,
	/// End (exclusive) of the replacement region after the edit.
	pub new_end: usize,
}

impl ViewChange {
	/// Line-count delta introduced by the change.
	pub fn delta(&self) -> isize {
		self.new_end as isize - self.old_end as isize
	}

	/// End of the region a consumer must redraw.
	pub fn span_end(&self) -> usize {
		self.old_end.max(self.new_end)
	}
}

/// A growable buffer of lines (no embedded newlines).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineView {
	lines: Vec<String>,
}

impl LineView {
	/// Create an empty view.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a view over existing lines.
	pub fn from_lines(lines: Vec<String>) -> Self {
		Self { lines }
	}

	/// All lines.
	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	/// Line count.
	pub fn len(&self) -> usize {
		self.lines.len()
	}

	/// Whether the view holds no lines.
	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	/// A single line, if in bounds.
	pub fn line(&self, index: usize) -> Option<&str> {
		self.lines.get(index).map(String::as_str)
	}

	/// The lines of `[start, end)`, clamped to the buffer.
	pub fn slice(&self, start: usize, end: usize) -> &[String] {
		let start = start.min(self.lines.len());
		let end = end.clamp(start, self.lines.len());
		&self.lines[start..end]
	}

	/// Replace `[start, end)` (clamped) with `replacement`, returning the
	/// removed lines and the change description.
	pub fn replace_region(
		&mut self,
		start: usize,
		end: usize,
		replacement: Vec<String>,
	) -> (ViewChange, Vec<String>) {
		let start = start.min(self.lines.len());
		let end = end.clamp(start, self.lines.len());
		let new_end = start + replacement.len();
		let removed: Vec<String> = self.lines.splice(start..end, replacement).collect();
		(
			ViewChange {
				start,
				old_end: end,
				new_end,
			},
			removed,
		)
	}

	/// Replace the whole buffer.
	pub fn replace_all(&mut self, lines: Vec<String>) -> ViewChange {
		let old_end = self.lines.len();
		let new_end = lines.len();
		self.lines = lines;
		ViewChange {
			start: 0,
			old_end,
			new_end,
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn lines(source: &[&str]) -> Vec<String> {
		source.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn replace_region_reports_removed_and_geometry() {
		let mut view = LineView::from_lines(lines(&["a", "b", "c", "d"]));
		let (change, removed) = view.replace_region(1, 3, lines(&["x"]));
		assert_eq!(removed, lines(&["b", "c"]));
		assert_eq!(change, ViewChange { start: 1, old_end: 3, new_end: 2 });
		assert_eq!(change.delta(), -1);
		assert_eq!(view.lines(), lines(&["a", "x", "d"]).as_slice());
	}

	#[test]
	fn out_of_bounds_regions_clamp() {
		let mut view = LineView::from_lines(lines(&["a"]));
		let (change, removed) = view.replace_region(5, 9, lines(&["b"]));
		assert_eq!(removed, Vec::<String>::new());
		assert_eq!(change.start, 1);
		assert_eq!(view.lines(), lines(&["a", "b"]).as_slice());
	}

	#[test]
	fn pure_insertion_removes_nothing() {
		let mut view = LineView::from_lines(lines(&["a", "b"]));
		let (change, removed) = view.replace_region(1, 1, lines(&["between"]));
		assert!(removed.is_empty());
		assert_eq!(change.delta(), 1);
		assert_eq!(view.lines(), lines(&["a", "between", "b"]).as_slice());
	}
}
