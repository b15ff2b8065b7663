//! Notebook document model.
//!
//! A notebook is an ordered sequence of typed cells (code, markdown, raw)
//! that is edited through two line-for-line synchronized projections:
//!
//! - the *human view*: every cell rendered with a structural header marker
//!   line, closed by a single end-of-notebook footer marker;
//! - the *shadow view*: the same line geometry with everything that is not
//!   code blanked out, fed to a line/column-oriented analysis backend.
//!
//! ```text
//! ┌───────────┐  render_lines   ┌────────────┐
//! │ Document  │────────────────▶│ human view │
//! │ (cells)   │◀────────────────│  (marked)  │
//! └───────────┘   reconcile     └────────────┘
//!       │                             │ same line count
//!       │ shadow::project             ▼
//!       └────────────────────▶ ┌────────────┐
//!                              │ shadow view│
//!                              └────────────┘
//! ```
//!
//! This crate owns the cell sequence and identity ([`Document`]), the
//! gravity-aware position anchors that survive edits ([`AnchorTracker`]),
//! and the code-only projection ([`shadow`]). View synchronization and
//! protocol proxying live in their own crates on top of this one.

pub mod anchor;
pub mod cell;
pub mod document;
pub mod io;
pub mod marker;
pub mod shadow;

pub use anchor::{AnchorTracker, Gravity};
pub use cell::{Cell, CellId, CellKind};
pub use document::{Document, MoveDirection};
pub use io::NotebookIo;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A structural operation referenced a cell id the document does not own.
	#[error("unknown cell {0}")]
	UnknownCell(CellId),
	/// The external serializer collaborator failed to produce or consume bytes.
	#[error("serialization failed: {0}")]
	Serialize(String),
}
