//! The backend-facing code-only projection.
//!
//! The shadow view has exactly the same line count as the human view and
//! line *N* corresponds to line *N*: the single invariant that makes
//! every in-cell position valid in both views without translation. Code
//! lines appear verbatim; marker lines and non-code cells become blank
//! lines that the analysis backend parses as trivia.
//!
//! Projection never needs cross-cell context beyond line counts, so the
//! incremental [`project_region`] works from one cell in isolation and a
//! single-cell resync is O(edited cell size), not O(document size).

use crate::cell::CellKind;
use crate::document::Document;

/// Project the whole document into shadow lines.
///
/// For a code cell: one blank placeholder line standing in for the header
/// marker, then the source verbatim. For markdown/raw cells: the same
/// number of lines, all blank. One blank line stands in for the footer.
pub fn project(document: &Document) -> Vec<String> {
	let mut lines = Vec::with_capacity(document.line_count());
	for cell in document.cells() {
		lines.push(String::new());
		lines.extend(project_region(cell.kind(), cell.source()));
	}
	lines.push(String::new());
	lines
}

/// Project one cell's content range, given its (possibly not yet
/// committed) source lines.
pub fn project_region(kind: CellKind, source: &[String]) -> Vec<String> {
	match kind {
		CellKind::Code => source.to_vec(),
		CellKind::Markdown | CellKind::Raw => vec![String::new(); source.len()],
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
	fn projection_matches_human_line_for_line() {
		let mut doc = Document::new("python");
		doc.insert_cell(0, CellKind::Code, lines(&["import os", "", "print(os.sep)"]));
		doc.insert_cell(1, CellKind::Markdown, lines(&["# Title", "prose"]));
		doc.insert_cell(2, CellKind::Raw, lines(&["<raw>"]));

		let shadow = project(&doc);
		assert_eq!(shadow.len(), doc.render_lines().len());
		assert_eq!(
			shadow,
			lines(&["", "import os", "", "print(os.sep)", "", "", "", "", "", ""])
		);
	}

	#[test]
	fn non_code_regions_blank_regardless_of_content() {
		let source = lines(&["anything", "at all"]);
		assert_eq!(project_region(CellKind::Markdown, &source), lines(&["", ""]));
		assert_eq!(project_region(CellKind::Raw, &source), lines(&["", ""]));
		assert_eq!(project_region(CellKind::Code, &source), source);
	}

	#[test]
	fn empty_document_projects_to_the_footer_line() {
		let doc = Document::new("python");
		assert_eq!(project(&doc), lines(&[""]));
	}
}
