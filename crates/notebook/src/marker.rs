//! Structural marker lines of the human-view rendering.
//!
//! Every cell is introduced by a header comment marker carrying its kind,
//! and the whole rendering is closed by a single footer marker:
//!
//! ```text
//! # <<cell:code>>
//! x = 1
//! # <<cell:markdown>>
//! Prose about x.
//! # <</notebook>>
//! ```
//!
//! Markers carry the cell kind but never the cell id: identity is
//! recovered by reconciliation, so undoing straight through a structural
//! edit can never resurrect a stale id from visible text.

use crate::CellKind;

const HEADER_PREFIX: &str = "# <<cell:";
const HEADER_SUFFIX: &str = ">>";

/// The end-of-notebook footer marker line.
pub const FOOTER: &str = "# <</notebook>>";

/// Render the header marker line for a cell kind.
pub fn header(kind: CellKind) -> String {
	format!("{HEADER_PREFIX}{}{HEADER_SUFFIX}", kind.as_str())
}

/// Parse a header marker line, tolerating trailing whitespace.
pub fn parse_header(line: &str) -> Option<CellKind> {
	let line = line.trim_end();
	let name = line.strip_prefix(HEADER_PREFIX)?.strip_suffix(HEADER_SUFFIX)?;
	CellKind::parse(name)
}

/// Whether a line is the footer marker, tolerating trailing whitespace.
pub fn is_footer(line: &str) -> bool {
	line.trim_end() == FOOTER
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn header_round_trips_every_kind() {
		for kind in [CellKind::Code, CellKind::Markdown, CellKind::Raw] {
			assert_eq!(parse_header(&header(kind)), Some(kind));
		}
	}

	#[test]
	fn near_misses_are_content() {
		assert_eq!(parse_header("# <<cell:code>> trailing"), None);
		assert_eq!(parse_header("## <<cell:code>>"), None);
		assert_eq!(parse_header("# <<cell:pascal>>"), None);
		assert!(!is_footer("# <</notebook>> x"));
	}

	#[test]
	fn trailing_whitespace_is_tolerated() {
		assert_eq!(parse_header("# <<cell:raw>>  "), Some(CellKind::Raw));
		assert!(is_footer("# <</notebook>>\t"));
	}
}
