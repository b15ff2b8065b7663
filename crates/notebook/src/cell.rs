//! Cells and cell identity.

use std::fmt;

use serde_json::Value;
use uuid::Uuid;

/// Opaque, globally unique cell identity.
///
/// Stable for the lifetime of the cell: moves, neighbouring inserts and
/// deletes, and undo/redo all preserve it. Reconciliation after a bulk
/// edit goes out of its way to recover existing ids (see
/// [`Document::reconcile`](crate::Document::reconcile)); a fresh id is
/// minted only for genuinely new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(Uuid);

impl CellId {
	/// Mint a new unique id.
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for CellId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for CellId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.simple())
	}
}

/// The three cell flavours of the notebook format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
	/// Executable source in the document's declared analysis language.
	Code,
	/// Prose; blanked out of the shadow projection.
	Markdown,
	/// Uninterpreted text; blanked out of the shadow projection.
	Raw,
}

impl CellKind {
	/// Marker-syntax name of this kind.
	pub fn as_str(self) -> &'static str {
		match self {
			CellKind::Code => "code",
			CellKind::Markdown => "markdown",
			CellKind::Raw => "raw",
		}
	}

	/// Inverse of [`CellKind::as_str`].
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"code" => Some(CellKind::Code),
			"markdown" => Some(CellKind::Markdown),
			"raw" => Some(CellKind::Raw),
			_ => None,
		}
	}
}

impl fmt::Display for CellKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One editable unit of the notebook.
///
/// `source` holds lines without trailing newlines. `outputs` and
/// `metadata` are opaque payloads owned by the serialization and kernel
/// collaborators; the core stores and moves them but never interprets
/// them.
#[derive(Debug, Clone)]
pub struct Cell {
	id: CellId,
	kind: CellKind,
	source: Vec<String>,
	/// Execution outputs, passed through untouched.
	pub outputs: Value,
	/// Format-level metadata, passed through untouched.
	pub metadata: Value,
}

impl Cell {
	/// Create a cell with a fresh id and empty opaque payloads.
	pub fn new(kind: CellKind, source: Vec<String>) -> Self {
		Self {
			id: CellId::new(),
			kind,
			source,
			outputs: Value::Null,
			metadata: Value::Null,
		}
	}

	/// The cell's immutable identity.
	pub fn id(&self) -> CellId {
		self.id
	}

	/// The cell's kind.
	pub fn kind(&self) -> CellKind {
		self.kind
	}

	/// The source lines.
	pub fn source(&self) -> &[String] {
		&self.source
	}

	/// Number of source lines.
	pub fn line_count(&self) -> usize {
		self.source.len()
	}

	pub(crate) fn set_kind(&mut self, kind: CellKind) {
		self.kind = kind;
	}

	pub(crate) fn set_source(&mut self, source: Vec<String>) {
		self.source = source;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique_and_stable() {
		let a = Cell::new(CellKind::Code, vec!["x = 1".into()]);
		let b = Cell::new(CellKind::Code, vec!["x = 1".into()]);
		assert_ne!(a.id(), b.id());

		let mut moved = a.clone();
		moved.set_kind(CellKind::Raw);
		moved.set_source(Vec::new());
		assert_eq!(moved.id(), a.id());
	}

	#[test]
	fn kind_names_round_trip() {
		for kind in [CellKind::Code, CellKind::Markdown, CellKind::Raw] {
			assert_eq!(CellKind::parse(kind.as_str()), Some(kind));
		}
		assert_eq!(CellKind::parse("quantum"), None);
	}
}
