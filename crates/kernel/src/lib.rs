//! Client for the kernel bridge sidecar.
//!
//! Execution runs out of process: a bridge sidecar owns the kernel
//! connection and speaks a line-delimited JSON protocol over its
//! stdin/stdout. This crate spawns the sidecar, ships commands at it,
//! routes its replies (execution outputs, status changes, completion and
//! inspection results) back to a handler, and keeps the `cell_idx` wire
//! field mapped to real cell ids. Outputs stay opaque end to end; the
//! document model stores whatever the kernel produced.
//!
//! ```text
//! ┌───────────┐ Command (JSON line) ┌──────────────┐ zmq/etc ┌────────┐
//! │ weft      │────────────────────▶│ bridge       │────────▶│ kernel │
//! │ (editor)  │◀────────────────────│ sidecar      │◀────────│        │
//! └───────────┘  Reply (JSON line)  └──────────────┘         └────────┘
//! ```

pub mod bridge;
pub mod inspect;
pub mod messages;

pub use bridge::{BridgeConfig, KernelBridge, KernelEventHandler, NoOpEventHandler};
pub use inspect::InspectSections;
pub use messages::{Command, Reply};

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The bridge process is gone (never started, crashed, or shut down).
	#[error("kernel bridge is not running")]
	BridgeUnavailable,
	/// Input/output errors from the bridge's channels.
	#[error("{0}")]
	Io(#[from] std::io::Error),
	/// The wire format could not be produced.
	#[error("encoding failed: {0}")]
	Encode(#[from] serde_json::Error),
}
