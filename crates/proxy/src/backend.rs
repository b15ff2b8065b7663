//! Seam to the analysis backend transport.
//!
//! The proxy does not own a connection; the embedder hands it something
//! that can ship already-rewritten traffic. Dispatch is fire-and-forget:
//! replies come back asynchronously through
//! [`DocumentSession::accept_response`](crate::DocumentSession::accept_response),
//! correlated by id. With no backend attached every proxy operation is a
//! no-op, surfaced to the user only as an absence of results.

use serde_json::Value;

use crate::pending::RequestId;

/// One rewritten request ready for the wire.
#[derive(Debug, Clone)]
pub struct BackendRequest {
	/// Correlation id; the reply must echo it.
	pub id: RequestId,
	/// Protocol method name.
	pub method: String,
	/// Rewritten params.
	pub params: Value,
}

/// Transport for rewritten protocol traffic.
pub trait AnalysisBackend: Send + Sync {
	/// Ship a request. Must not block; the reply arrives later.
	fn dispatch(&self, request: BackendRequest);

	/// Ship a notification (document lifecycle, saves).
	fn notify(&self, method: &str, params: Value);
}
