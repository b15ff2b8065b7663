//! Seam for the on-disk notebook format collaborator.
//!
//! Parsing and serializing the container format is not this crate's
//! problem; the core only needs somewhere to hand cells to and get cells
//! from. Embedders implement [`NotebookIo`] over their format of choice
//! and keep `outputs`/`metadata` opaque in both directions.

use crate::cell::Cell;
use crate::{Error, Result};

/// Converts between container-format bytes and the cell list.
pub trait NotebookIo: Send + Sync {
	/// Parse container bytes into cells.
	fn parse(&self, bytes: &[u8]) -> Result<Vec<Cell>>;
	/// Serialize cells back into container bytes.
	fn serialize(&self, cells: &[Cell]) -> Result<Vec<u8>>;
}

/// Helper for implementors: wrap a format-level failure message.
pub fn format_error(message: impl Into<String>) -> Error {
	Error::Serialize(message.into())
}
