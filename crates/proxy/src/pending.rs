//! In-flight request correlation.
//!
//! Replies are matched to requests by id, never by ambient "current"
//! state. A reply is discarded when its request is unknown, when a newer
//! request of the same class has been issued since (last request wins for
//! interactive operations), or (checked by the session) when the overlay
//! generation it was stamped with has passed.

use std::collections::HashMap;
use std::fmt;

use crate::interceptor::RequestClass;

/// Correlation id for one outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
	/// Raw wire value.
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Everything remembered about one in-flight request.
#[derive(Debug, Clone)]
pub struct Pending {
	/// Protocol method name.
	pub method: String,
	/// Class used for last-request-wins supersession.
	pub class: RequestClass,
	/// Overlay generation at issue time, when the request originated from
	/// the overlay.
	pub overlay_generation: Option<u64>,
}

/// Table of in-flight requests.
#[derive(Debug, Default)]
pub struct PendingRequests {
	next_id: u64,
	inflight: HashMap<RequestId, Pending>,
	latest: HashMap<RequestClass, RequestId>,
}

impl PendingRequests {
	/// Create an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new request, superseding earlier ones of the same class.
	pub fn issue(
		&mut self,
		method: impl Into<String>,
		class: RequestClass,
		overlay_generation: Option<u64>,
	) -> RequestId {
		self.next_id += 1;
		let id = RequestId(self.next_id);
		self.inflight.insert(
			id,
			Pending {
				method: method.into(),
				class,
				overlay_generation,
			},
		);
		self.latest.insert(class, id);
		id
	}

	/// Resolve a reply. Returns the request's record only when the id is
	/// known *and* still the latest of its class; superseded and unknown
	/// ids come back as `None` and their state is dropped either way.
	pub fn complete(&mut self, id: RequestId) -> Option<Pending> {
		let pending = self.inflight.remove(&id)?;
		if self.latest.get(&pending.class) != Some(&id) {
			return None;
		}
		self.latest.remove(&pending.class);
		Some(pending)
	}

	/// Number of requests awaiting replies.
	pub fn inflight_count(&self) -> usize {
		self.inflight.len()
	}
}
