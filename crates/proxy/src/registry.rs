//! Process-wide proxy registry.
//!
//! Maps every view identity (human, shadow, overlay, preview) to the
//! document session that owns it. The registry itself is stateless per
//! call, resolving ownership and nothing else; all per-document state
//! lives inside the session, so any number of documents can be proxied
//! without cross-document locking.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::config::BackendConfig;
use crate::session::DocumentSession;

/// Identity → owning session, plus per-language backend configurations.
#[derive(Default)]
pub struct ProxyRegistry {
	configs: RwLock<HashMap<String, BackendConfig>>,
	sessions: RwLock<HashMap<String, Arc<DocumentSession>>>,
}

impl ProxyRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// The process-wide instance.
	pub fn global() -> &'static ProxyRegistry {
		static GLOBAL: OnceLock<ProxyRegistry> = OnceLock::new();
		GLOBAL.get_or_init(ProxyRegistry::new)
	}

	/// Register a backend configuration for an analysis language.
	pub fn register_config(&self, language: impl Into<String>, config: BackendConfig) {
		self.configs.write().insert(language.into(), config);
	}

	/// Configuration for a language, if any.
	pub fn config_for(&self, language: &str) -> Option<BackendConfig> {
		self.configs.read().get(language).cloned()
	}

	/// Register a session under every identity it answers for.
	pub fn insert(&self, session: &Arc<DocumentSession>) {
		let mut sessions = self.sessions.write();
		for identity in session.identities() {
			sessions.insert(identity, Arc::clone(session));
		}
	}

	/// Drop every identity owned by this session.
	pub fn remove(&self, session: &Arc<DocumentSession>) {
		self.sessions
			.write()
			.retain(|_, owner| !Arc::ptr_eq(owner, session));
	}

	/// Re-register a session whose identity set changed (language change
	/// re-derives the shadow identity).
	pub fn rebind(&self, session: &Arc<DocumentSession>) {
		let mut sessions = self.sessions.write();
		sessions.retain(|_, owner| !Arc::ptr_eq(owner, session));
		for identity in session.identities() {
			sessions.insert(identity, Arc::clone(session));
		}
		debug!("rebound session identities");
	}

	/// Session owning an identity; the per-call lookup every proxy
	/// operation starts from.
	pub fn resolve(&self, identity: &str) -> Option<Arc<DocumentSession>> {
		self.sessions.read().get(identity).cloned()
	}

	/// Number of registered sessions (not identities).
	pub fn session_count(&self) -> usize {
		let sessions = self.sessions.read();
		let mut seen: Vec<*const DocumentSession> = sessions
			.values()
			.map(|session| Arc::as_ptr(session))
			.collect();
		seen.sort();
		seen.dedup();
		seen.len()
	}
}
