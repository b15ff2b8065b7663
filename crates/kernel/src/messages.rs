//! The bridge wire format.
//!
//! One JSON object per line in each direction. Commands carry an
//! `action` tag, replies a `type` tag; unknown fields are ignored and
//! output payloads are opaque [`Value`]s passed through to the document
//! model untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command sent to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
	/// Start a fresh kernel by kernelspec name.
	Start {
		/// Kernelspec name (e.g. `python3`).
		kernel_name: String,
	},
	/// Connect to an already-running kernel.
	Connect {
		/// Path to the kernel's connection file.
		connection_file: String,
	},
	/// Execute code on behalf of a cell.
	Execute {
		/// Source to run.
		code: String,
		/// Wire index of the issuing cell (see the execution table).
		cell_idx: usize,
		/// Expressions evaluated in the kernel namespace after the cell.
		#[serde(skip_serializing_if = "Option::is_none")]
		user_expressions: Option<HashMap<String, String>>,
	},
	/// Interrupt the running kernel.
	Interrupt,
	/// Restart the kernel, clearing execution state.
	Restart,
	/// Shut the kernel and the bridge down.
	Shutdown,
	/// Ask for kernel information.
	Info,
	/// Liveness probe for the kernel process.
	IsAlive,
	/// Request code completion.
	Complete {
		/// Source to complete in.
		code: String,
		/// Byte cursor into `code`.
		cursor_pos: usize,
	},
	/// Request object inspection.
	Inspect {
		/// Source to inspect in.
		code: String,
		/// Byte cursor into `code`.
		cursor_pos: usize,
		/// Kernel detail level (0 or 1).
		detail_level: u8,
		/// Correlation id echoed by the reply.
		#[serde(skip_serializing_if = "Option::is_none")]
		request_id: Option<String>,
	},
	/// Liveness probe for the bridge process itself.
	Ping,
}

/// A reply read from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
	/// The bridge process is up and listening.
	Ready,
	/// A kernel was started.
	KernelStarted {
		/// Kernelspec name.
		kernel_name: String,
		/// Bridge-assigned kernel id.
		kernel_id: String,
		/// Language from the kernelspec, when known.
		language: Option<String>,
	},
	/// Connected to an existing kernel.
	KernelConnected {
		/// The connection file used.
		connection_file: String,
	},
	/// Kernel execution state changed.
	Status {
		/// `idle`, `busy`, `starting`, ...
		state: String,
		/// Cell the state change belongs to, when attributable.
		cell_idx: Option<usize>,
	},
	/// An output arrived for a cell. The payload is a notebook output
	/// object and stays opaque.
	Output {
		/// Cell the output belongs to.
		cell_idx: Option<usize>,
		/// Opaque output payload.
		output: Value,
	},
	/// Execution of a cell's code began.
	ExecuteInput {
		/// Cell that started executing.
		cell_idx: Option<usize>,
		/// Kernel-side execution counter.
		execution_count: Option<i64>,
	},
	/// The bridge accepted an execute command.
	ExecuteRequest {
		/// Cell the execution belongs to.
		cell_idx: usize,
		/// Kernel message id for the execution.
		msg_id: String,
	},
	/// Namespace snapshot captured after a cell ran.
	Namespace {
		/// Cell the snapshot belongs to.
		cell_idx: Option<usize>,
		/// Kernel-side repr of the namespace.
		namespace_repr: String,
	},
	/// Completion results.
	CompleteReply {
		/// Candidate completions.
		matches: Vec<String>,
		/// Replacement range start.
		cursor_start: usize,
		/// Replacement range end.
		cursor_end: usize,
		/// Kernel-specific extras.
		#[serde(default)]
		metadata: Value,
	},
	/// Inspection results.
	InspectReply {
		/// Correlation id from the command.
		request_id: Option<String>,
		/// Whether the kernel found the object.
		found: bool,
		/// Pre-parsed sections, when the bridge provides them.
		#[serde(default)]
		sections: Value,
		/// Raw mime-keyed inspect payload.
		#[serde(default)]
		data: Value,
		/// Kernel-specific extras.
		#[serde(default)]
		metadata: Value,
	},
	/// The kernel was interrupted.
	Interrupted,
	/// The kernel was restarted.
	Restarted,
	/// The bridge is shutting down.
	Shutdown,
	/// Kernel information.
	KernelInfo {
		/// Raw kernel info, `null` when no kernel is connected.
		#[serde(default)]
		info: Value,
		/// Present (false) when no kernel is connected.
		connected: Option<bool>,
	},
	/// Kernel liveness answer.
	IsAlive {
		/// Whether the kernel process is alive.
		alive: bool,
	},
	/// Bridge liveness answer.
	Pong,
	/// Something failed bridge-side.
	Error {
		/// Human-readable description.
		error: String,
		/// Cell the failure belongs to, when attributable.
		cell_idx: Option<usize>,
	},
}
