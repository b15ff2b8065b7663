//! View synchronization between the human view, the shadow view, and the
//! transient per-cell edit overlay.
//!
//! This crate owns the propagation fabric of the dual-view model:
//!
//! ```text
//! ┌─────────────┐  mutation   ┌──────────────────┐  region replace  ┌─────────────┐
//! │ EditOverlay │────────────▶│ ViewSynchronizer │─────────────────▶│ human view  │
//! │ (one cell)  │             │                  │─────────────────▶│ shadow view │
//! └─────────────┘             └──────────────────┘                  └─────────────┘
//!                                      │
//!                                      ▼
//!                          history (undo coalescing),
//!                          anchor re-placement,
//!                          deferred change notifications
//! ```
//!
//! The human view is always authoritative. Whenever the two projections
//! disagree on line count the synchronizer reconciles the document from
//! the human lines and regenerates the shadow wholesale; nothing here is
//! allowed to fail harder than a forced full resync.

pub mod history;
pub mod overlay;
pub mod queue;
pub mod synchronizer;
pub mod view;

pub use history::{EditRecord, History};
pub use overlay::EditOverlay;
pub use queue::{DeferredQueue, DirtyRange, DirtyReceiver};
pub use synchronizer::ViewSynchronizer;
pub use view::{LineView, ViewChange};

use weft_notebook::CellId;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// An overlay is already open; at most one exists per document.
	#[error("an edit overlay is already open")]
	OverlayOpen,
	/// The operation needs an open overlay and none exists.
	#[error("no edit overlay is open")]
	NoOverlay,
	/// The referenced cell is gone or its anchor was invalidated between
	/// calls. Expected race with concurrent edits; never retried blindly.
	#[error("cell {0} is no longer addressable")]
	StaleCell(CellId),
	/// Error bubbled up from the document model.
	#[error(transparent)]
	Notebook(#[from] weft_notebook::Error),
}
