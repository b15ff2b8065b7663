//! Backend launch configuration.
//!
//! The proxy never spawns processes itself; embedders resolve one of
//! these per analysis language and start the transport they prefer.
//! Loading from disk is their problem too; this is only the typed shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for one analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
	/// Command to run the backend server.
	pub command: String,
	/// Arguments to pass to the command.
	#[serde(default)]
	pub args: Vec<String>,
	/// Environment variables to set.
	#[serde(default)]
	pub env: HashMap<String, String>,
	/// Files/directories that mark the project root.
	#[serde(default)]
	pub root_markers: Vec<String>,
	/// Request timeout in seconds.
	#[serde(default = "default_timeout")]
	pub timeout_secs: u64,
	/// Server-specific initialization options.
	#[serde(default)]
	pub settings: Option<Value>,
}

/// Returns the default request timeout in seconds.
fn default_timeout() -> u64 {
	30
}

impl Default for BackendConfig {
	fn default() -> Self {
		Self {
			command: String::new(),
			args: Vec::new(),
			env: HashMap::new(),
			root_markers: Vec::new(),
			timeout_secs: default_timeout(),
			settings: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn minimal_config_fills_defaults() {
		let config: BackendConfig =
			serde_json::from_str(r#"{ "command": "pyright-langserver" }"#).unwrap();
		assert_eq!(config.command, "pyright-langserver");
		assert!(config.args.is_empty());
		assert_eq!(config.timeout_secs, 30);
		assert!(config.settings.is_none());
	}
}
