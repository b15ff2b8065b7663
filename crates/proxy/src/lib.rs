//! Protocol proxy between the notebook views and an analysis backend.
//!
//! The backend is an ordinary line/column-oriented language server. It is
//! never told that cells exist: it sees exactly one plain-text document
//! (the shadow view) per notebook. This crate intercepts traffic in both
//! directions:
//!
//! ```text
//!           requests (human/overlay identity, human coordinates)
//! ┌────────┐──────────────▶┌──────────────────┐──────────────▶┌─────────┐
//! │ UI /   │               │ DocumentSession  │               │ backend │
//! │ editor │◀──────────────│  (rewrite layer) │◀──────────────│  (LSP)  │
//! └────────┘  responses,   └──────────────────┘  shadow-said  └─────────┘
//!             human identity        │             locations
//!                                   ▼
//!                     pending table (correlation ids,
//!                     stale discard, last-request-wins)
//! ```
//!
//! Requests keep their line numbers (the 1:1 line mapping between the
//! views makes them valid on both sides) and only identities (and, for
//! overlay origins, a start-line offset) are rewritten. Responses are
//! walked recursively; shapes the walker does not recognize pass through
//! unrewritten so partial backend functionality degrades instead of
//! disappearing.

pub mod backend;
pub mod config;
pub mod edits;
pub mod interceptor;
pub mod pending;
pub mod registry;
pub mod rewrite;
pub mod session;

pub use backend::{AnalysisBackend, BackendRequest};
pub use config::BackendConfig;
pub use interceptor::{InterceptorTable, MethodInterceptor, RequestClass};
pub use pending::{PendingRequests, RequestId};
pub use registry::ProxyRegistry;
pub use session::{DocumentSession, ResponseAction};

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A derived view identity failed to parse as a URI.
	#[error("invalid view identity: {0}")]
	InvalidIdentity(String),
	/// Error bubbled up from the synchronizer while applying edits.
	#[error(transparent)]
	Sync(#[from] weft_sync::Error),
}
