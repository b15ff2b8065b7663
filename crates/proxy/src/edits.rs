//! Backend text-edit application over line buffers.
//!
//! Edits come back in shadow coordinates. They are applied to an
//! in-memory copy of the affected lines, never directly to a live view,
//! and always in descending position order, so applying one edit can
//! never shift the line numbers of edits still waiting above it. Columns
//! are byte offsets clamped to character boundaries; the whole-line
//! synchronization model never moves text across a line that an edit does
//! not itself touch.

use lsp_types::TextEdit;

/// Sort edits bottom of document first.
pub fn sort_descending(edits: &mut [TextEdit]) {
	edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
}

/// Apply edits to a line buffer copy, bottom-up.
pub fn apply_text_edits(lines: &mut Vec<String>, edits: &[TextEdit]) {
	let mut ordered: Vec<TextEdit> = edits.to_vec();
	sort_descending(&mut ordered);
	for edit in &ordered {
		apply_one(lines, edit);
	}
}

fn apply_one(lines: &mut Vec<String>, edit: &TextEdit) {
	let start_line = edit.range.start.line as usize;
	let end_line = edit.range.end.line as usize;
	let past_end = end_line >= lines.len();

	// A range running past the last line means "through the final
	// newline"; the trailing newline of the replacement is that newline,
	// not an extra empty line.
	let new_text = if past_end {
		edit.new_text.strip_suffix('\n').unwrap_or(&edit.new_text)
	} else {
		&edit.new_text
	};

	if start_line >= lines.len() {
		lines.extend(new_text.split('\n').map(str::to_string));
		return;
	}
	let end_line = end_line.min(lines.len() - 1);

	let start_col = clamp_col(&lines[start_line], edit.range.start.character as usize);
	let end_col = if past_end {
		lines[end_line].len()
	} else {
		clamp_col(&lines[end_line], edit.range.end.character as usize)
	};

	let prefix = &lines[start_line][..start_col];
	let suffix = &lines[end_line][end_col..];
	let merged = format!("{prefix}{new_text}{suffix}");
	let replacement: Vec<String> = merged.split('\n').map(str::to_string).collect();
	lines.splice(start_line..=end_line, replacement);
}

/// Clamp a column to the line length on a character boundary.
fn clamp_col(line: &str, col: usize) -> usize {
	if col >= line.len() {
		return line.len();
	}
	if line.is_char_boundary(col) {
		return col;
	}
	let mut col = col;
	while col > 0 && !line.is_char_boundary(col) {
		col -= 1;
	}
	col
}

#[cfg(test)]
mod tests {
	use lsp_types::{Position, Range};
	use pretty_assertions::assert_eq;

	use super::*;

	fn lines(source: &[&str]) -> Vec<String> {
		source.iter().map(|s| s.to_string()).collect()
	}

	fn edit(start: (u32, u32), end: (u32, u32), new_text: &str) -> TextEdit {
		TextEdit {
			range: Range {
				start: Position::new(start.0, start.1),
				end: Position::new(end.0, end.1),
			},
			new_text: new_text.to_string(),
		}
	}

	#[test]
	fn single_line_replacement() {
		let mut buffer = lines(&["let x=1;", "let y=2;"]);
		apply_text_edits(&mut buffer, &[edit((0, 5), (0, 6), " = ")]);
		assert_eq!(buffer, lines(&["let x = 1;", "let y=2;"]));
	}

	#[test]
	fn multi_line_replacement_collapses_and_splits() {
		let mut buffer = lines(&["fn f(", "    a: u8,", ") {}"]);
		apply_text_edits(&mut buffer, &[edit((0, 5), (2, 1), "a: u8)")]);
		assert_eq!(buffer, lines(&["fn f(a: u8) {}"]));
	}

	#[test]
	fn insertion_with_newline_grows_the_buffer() {
		let mut buffer = lines(&["a", "b"]);
		apply_text_edits(&mut buffer, &[edit((1, 0), (1, 0), "between\n")]);
		assert_eq!(buffer, lines(&["a", "between", "b"]));
	}

	#[test]
	fn edits_apply_bottom_up_regardless_of_submission_order() {
		let base: Vec<String> = (0..25).map(|i| format!("line {i}")).collect();

		// Lines 5-6 and 20-21, submitted top-first.
		let top_first = vec![
			edit((5, 0), (7, 0), "FIVE\nSIX\n"),
			edit((20, 0), (22, 0), "TWENTY\nTWENTY-ONE\n"),
		];
		// Same edits, submitted bottom-first.
		let bottom_first = vec![top_first[1].clone(), top_first[0].clone()];

		let mut a = base.clone();
		apply_text_edits(&mut a, &top_first);
		let mut b = base.clone();
		apply_text_edits(&mut b, &bottom_first);

		// Hand application, bottom to top.
		let mut expected = base.clone();
		expected.splice(20..22, lines(&["TWENTY", "TWENTY-ONE"]));
		expected.splice(5..7, lines(&["FIVE", "SIX"]));

		assert_eq!(a, expected);
		assert_eq!(b, expected);
	}

	#[test]
	fn columns_clamp_to_character_boundaries() {
		let mut buffer = lines(&["héllo"]);
		// Column 2 falls inside the two-byte 'é'.
		apply_text_edits(&mut buffer, &[edit((0, 2), (0, 3), "e")]);
		assert_eq!(buffer, lines(&["hello"]));
	}
}
