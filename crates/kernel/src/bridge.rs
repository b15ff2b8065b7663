//! The bridge process client.
//!
//! Spawns the sidecar, owns its stdio from a single IO task (one
//! `select!` over outbound commands and inbound lines, so writes stay
//! totally ordered), and routes replies to a [`KernelEventHandler`].
//! The wire attributes work to cells by `cell_idx`; the execution table
//! maps those indices back to real [`CellId`]s, so a reply for a cell
//! that was re-executed or removed simply fails to resolve and is
//! dropped instead of landing on the wrong cell.

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as ProcessCommand};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use weft_notebook::CellId;

use crate::inspect::{self, InspectSections};
use crate::messages::{Command, Reply};
use crate::{Error, Result};

/// How to launch the bridge sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
	/// Interpreter or executable to run.
	pub command: String,
	/// Arguments (typically the bridge script path).
	#[serde(default)]
	pub args: Vec<String>,
	/// Environment variables to set.
	#[serde(default)]
	pub env: HashMap<String, String>,
	/// Kernelspec started by default.
	#[serde(default = "default_kernel_name")]
	pub kernel_name: String,
}

fn default_kernel_name() -> String {
	"python3".to_string()
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			command: "python3".to_string(),
			args: Vec::new(),
			env: HashMap::new(),
			kernel_name: default_kernel_name(),
		}
	}
}

/// Receiver side of bridge traffic. All methods have empty defaults;
/// implement what the frontend cares about.
pub trait KernelEventHandler: Send + Sync {
	/// The bridge process is up and listening.
	fn on_ready(&self) {}
	/// A kernel started; `language` comes from the kernelspec.
	fn on_kernel_started(&self, _kernel_name: &str, _language: Option<&str>) {}
	/// Connected to an existing kernel.
	fn on_kernel_connected(&self, _connection_file: &str) {}
	/// Kernel execution state changed.
	fn on_status(&self, _cell: Option<CellId>, _state: &str) {}
	/// An opaque output arrived for a cell.
	fn on_output(&self, _cell: CellId, _output: Value) {}
	/// A cell's code began executing.
	fn on_execution_started(&self, _cell: CellId, _execution_count: Option<i64>) {}
	/// Namespace snapshot captured after a cell ran.
	fn on_namespace(&self, _cell: CellId, _namespace_repr: &str) {}
	/// Completion results.
	fn on_complete(&self, _matches: Vec<String>, _cursor_start: usize, _cursor_end: usize) {}
	/// Inspection results (already section-parsed).
	fn on_inspect(&self, _found: bool, _sections: InspectSections) {}
	/// Raw kernel information.
	fn on_kernel_info(&self, _info: Value) {}
	/// Kernel liveness answer.
	fn on_alive(&self, _alive: bool) {}
	/// The kernel was interrupted.
	fn on_interrupted(&self) {}
	/// The kernel was restarted; execution state was cleared.
	fn on_restarted(&self) {}
	/// A bridge-side failure, attributed to a cell when possible.
	fn on_error(&self, _cell: Option<CellId>, _message: &str) {}
	/// The bridge process is gone.
	fn on_exit(&self) {}
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventHandler;

impl KernelEventHandler for NoOpEventHandler {}

#[derive(Debug, Default)]
struct ExecutionTable {
	next_idx: usize,
	by_idx: HashMap<usize, CellId>,
}

impl ExecutionTable {
	fn register(&mut self, cell: CellId) -> usize {
		let idx = self.next_idx;
		self.next_idx += 1;
		self.by_idx.insert(idx, cell);
		idx
	}

	fn cell_for(&self, idx: Option<usize>) -> Option<CellId> {
		self.by_idx.get(&idx?).copied()
	}

	fn clear(&mut self) {
		self.by_idx.clear();
	}
}

#[derive(Debug, Default)]
struct BridgeState {
	executions: ExecutionTable,
	latest_inspect: Option<String>,
	language: Option<String>,
}

/// Handle to a running bridge process.
pub struct KernelBridge {
	outbound: mpsc::UnboundedSender<Command>,
	state: Arc<Mutex<BridgeState>>,
}

impl KernelBridge {
	/// Spawn the sidecar and its IO task. Requires a tokio runtime.
	pub fn spawn(config: &BridgeConfig, handler: Arc<dyn KernelEventHandler>) -> Result<Self> {
		let mut process = ProcessCommand::new(&config.command);
		process
			.args(&config.args)
			.envs(&config.env)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.kill_on_drop(true);
		let mut child = process.spawn()?;
		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| Error::Io(io::Error::other("bridge stdin unavailable")))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::Io(io::Error::other("bridge stdout unavailable")))?;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let state = Arc::new(Mutex::new(BridgeState::default()));
		tokio::spawn(run_bridge_io(
			child,
			stdin,
			stdout,
			outbound_rx,
			Arc::clone(&state),
			handler,
		));
		info!(command = %config.command, "kernel bridge spawned");
		Ok(Self {
			outbound: outbound_tx,
			state,
		})
	}

	/// Whether the IO task still accepts commands.
	pub fn is_running(&self) -> bool {
		!self.outbound.is_closed()
	}

	/// Enqueue a raw command.
	pub fn send(&self, command: Command) -> Result<()> {
		self.outbound
			.send(command)
			.map_err(|_| Error::BridgeUnavailable)
	}

	/// Start a kernel by kernelspec name.
	pub fn start_kernel(&self, kernel_name: impl Into<String>) -> Result<()> {
		self.send(Command::Start {
			kernel_name: kernel_name.into(),
		})
	}

	/// Connect to an existing kernel's connection file.
	pub fn connect(&self, connection_file: impl Into<String>) -> Result<()> {
		self.send(Command::Connect {
			connection_file: connection_file.into(),
		})
	}

	/// Execute a cell's source; replies route back to `cell` through the
	/// execution table. Returns the wire index used.
	pub fn execute(&self, cell: CellId, code: impl Into<String>) -> Result<usize> {
		self.execute_with_expressions(cell, code, None)
	}

	/// Execute with `user_expressions` evaluated after the cell body.
	pub fn execute_with_expressions(
		&self,
		cell: CellId,
		code: impl Into<String>,
		user_expressions: Option<HashMap<String, String>>,
	) -> Result<usize> {
		let cell_idx = self.state.lock().executions.register(cell);
		self.send(Command::Execute {
			code: code.into(),
			cell_idx,
			user_expressions,
		})?;
		Ok(cell_idx)
	}

	/// Request completion at a byte cursor.
	pub fn complete(&self, code: impl Into<String>, cursor_pos: usize) -> Result<()> {
		self.send(Command::Complete {
			code: code.into(),
			cursor_pos,
		})
	}

	/// Request inspection at a byte cursor. Last request wins: an earlier
	/// inspect still in flight becomes discard-on-arrival. Returns the
	/// correlation id.
	pub fn inspect(
		&self,
		code: impl Into<String>,
		cursor_pos: usize,
		detail_level: u8,
	) -> Result<String> {
		let request_id = Uuid::new_v4().simple().to_string();
		self.state.lock().latest_inspect = Some(request_id.clone());
		self.send(Command::Inspect {
			code: code.into(),
			cursor_pos,
			detail_level,
			request_id: Some(request_id.clone()),
		})?;
		Ok(request_id)
	}

	/// Interrupt the kernel.
	pub fn interrupt(&self) -> Result<()> {
		self.send(Command::Interrupt)
	}

	/// Restart the kernel.
	pub fn restart(&self) -> Result<()> {
		self.send(Command::Restart)
	}

	/// Ask the bridge to shut everything down.
	pub fn shutdown(&self) -> Result<()> {
		self.send(Command::Shutdown)
	}

	/// Ask for kernel information.
	pub fn info(&self) -> Result<()> {
		self.send(Command::Info)
	}

	/// Probe kernel liveness.
	pub fn is_alive(&self) -> Result<()> {
		self.send(Command::IsAlive)
	}

	/// Probe bridge liveness.
	pub fn ping(&self) -> Result<()> {
		self.send(Command::Ping)
	}
}

async fn run_bridge_io(
	mut child: Child,
	mut stdin: ChildStdin,
	stdout: ChildStdout,
	mut outbound: mpsc::UnboundedReceiver<Command>,
	state: Arc<Mutex<BridgeState>>,
	handler: Arc<dyn KernelEventHandler>,
) {
	let mut lines = BufReader::new(stdout).lines();
	loop {
		tokio::select! {
			command = outbound.recv() => {
				let Some(command) = command else {
					// Handle dropped; stop driving the process.
					break;
				};
				let line = match serde_json::to_string(&command) {
					Ok(line) => line,
					Err(err) => {
						warn!(%err, "unencodable command skipped");
						continue;
					}
				};
				let write = async {
					stdin.write_all(line.as_bytes()).await?;
					stdin.write_all(b"\n").await?;
					stdin.flush().await
				};
				if let Err(err) = write.await {
					warn!(%err, "bridge stdin closed; terminating IO loop");
					break;
				}
			}
			line = lines.next_line() => {
				match line {
					Ok(Some(line)) => {
						let line = line.trim();
						if line.is_empty() {
							continue;
						}
						match serde_json::from_str::<Reply>(line) {
							Ok(reply) => route_reply(&state, handler.as_ref(), reply),
							Err(err) => debug!(%err, "skipping malformed bridge line"),
						}
					}
					Ok(None) => {
						info!("bridge closed its stdout");
						break;
					}
					Err(err) => {
						warn!(%err, "error reading from bridge");
						break;
					}
				}
			}
		}
	}
	let _ = child.start_kill();
	handler.on_exit();
}

/// Route one parsed reply to the handler, resolving cell attribution and
/// dropping stale inspect answers.
fn route_reply(state: &Mutex<BridgeState>, handler: &dyn KernelEventHandler, reply: Reply) {
	match reply {
		Reply::Ready => handler.on_ready(),
		Reply::KernelStarted {
			kernel_name,
			kernel_id,
			language,
		} => {
			debug!(%kernel_name, %kernel_id, "kernel started");
			state.lock().language = language.clone();
			handler.on_kernel_started(&kernel_name, language.as_deref());
		}
		Reply::KernelConnected { connection_file } => {
			handler.on_kernel_connected(&connection_file);
		}
		Reply::Status { state: kernel_state, cell_idx } => {
			let cell = state.lock().executions.cell_for(cell_idx);
			handler.on_status(cell, &kernel_state);
		}
		Reply::Output { cell_idx, output } => {
			match state.lock().executions.cell_for(cell_idx) {
				Some(cell) => handler.on_output(cell, output),
				None => debug!(?cell_idx, "dropping output with no owning cell"),
			}
		}
		Reply::ExecuteInput {
			cell_idx,
			execution_count,
		} => {
			if let Some(cell) = state.lock().executions.cell_for(cell_idx) {
				handler.on_execution_started(cell, execution_count);
			}
		}
		Reply::ExecuteRequest { cell_idx, msg_id } => {
			debug!(cell_idx, %msg_id, "execution accepted");
		}
		Reply::Namespace {
			cell_idx,
			namespace_repr,
		} => {
			if let Some(cell) = state.lock().executions.cell_for(cell_idx) {
				handler.on_namespace(cell, &namespace_repr);
			}
		}
		Reply::CompleteReply {
			matches,
			cursor_start,
			cursor_end,
			..
		} => handler.on_complete(matches, cursor_start, cursor_end),
		Reply::InspectReply {
			request_id,
			found,
			sections,
			data,
			..
		} => {
			let (latest, language) = {
				let state = state.lock();
				(state.latest_inspect.clone(), state.language.clone())
			};
			if latest.as_deref() != request_id.as_deref() {
				debug!(?request_id, "dropping superseded inspect reply");
				return;
			}
			let parsed = match serde_json::from_value::<InspectSections>(sections.clone()) {
				Ok(parsed) if !parsed.is_empty() => parsed,
				_ => inspect::parse_sections(language.as_deref(), &data),
			};
			handler.on_inspect(found, parsed);
		}
		Reply::Interrupted => handler.on_interrupted(),
		Reply::Restarted => {
			state.lock().executions.clear();
			handler.on_restarted();
		}
		Reply::Shutdown => debug!("bridge announced shutdown"),
		Reply::KernelInfo { info, .. } => handler.on_kernel_info(info),
		Reply::IsAlive { alive } => handler.on_alive(alive),
		Reply::Pong => debug!("bridge answered ping"),
		Reply::Error { error, cell_idx } => {
			let cell = state.lock().executions.cell_for(cell_idx);
			warn!(%error, "bridge reported an error");
			handler.on_error(cell, &error);
		}
	}
}
