//! Deferred view-change notifications.
//!
//! Rendering collaborators do not get a callback per mutation; changes
//! accumulate here and are coalesced into disjoint dirty ranges, handed
//! out once per drain cycle ("next tick" batching, made explicit).

use tokio::sync::mpsc;

use crate::view::ViewChange;

/// A line range a consumer must redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
	/// First dirty line.
	pub start: usize,
	/// End (exclusive) of the dirty region.
	pub end: usize,
}

/// Receiver half of the dirty-range stream.
pub type DirtyReceiver = mpsc::UnboundedReceiver<Vec<DirtyRange>>;

/// Accumulates view changes between drain cycles.
#[derive(Debug, Default)]
pub struct DeferredQueue {
	pending: Vec<ViewChange>,
	subscribers: Vec<mpsc::UnboundedSender<Vec<DirtyRange>>>,
}

impl DeferredQueue {
	/// Create an empty queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribe to drained dirty-range batches.
	pub fn subscribe(&mut self) -> DirtyReceiver {
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.push(tx);
		rx
	}

	/// Defer a change until the next drain.
	pub fn push(&mut self, change: ViewChange) {
		self.pending.push(change);
	}

	/// Whether a drain would deliver anything.
	pub fn is_idle(&self) -> bool {
		self.pending.is_empty()
	}

	/// Coalesce pending changes into disjoint ranges, deliver them to all
	/// live subscribers, and return them.
	pub fn drain(&mut self) -> Vec<DirtyRange> {
		if self.pending.is_empty() {
			return Vec::new();
		}
		let mut spans: Vec<DirtyRange> = self
			.pending
			.drain(..)
			.map(|change| DirtyRange {
				start: change.start,
				end: change.span_end().max(change.start + 1),
			})
			.collect();
		spans.sort_by_key(|range| range.start);

		let mut coalesced: Vec<DirtyRange> = Vec::with_capacity(spans.len());
		for span in spans {
			match coalesced.last_mut() {
				Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
				_ => coalesced.push(span),
			}
		}

		self.subscribers
			.retain(|tx| tx.send(coalesced.clone()).is_ok());
		coalesced
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn change(start: usize, old_end: usize, new_end: usize) -> ViewChange {
		ViewChange {
			start,
			old_end,
			new_end,
		}
	}

	#[test]
	fn overlapping_changes_coalesce() {
		let mut queue = DeferredQueue::new();
		queue.push(change(10, 12, 12));
		queue.push(change(11, 13, 15));
		queue.push(change(2, 3, 3));
		let ranges = queue.drain();
		assert_eq!(
			ranges,
			vec![DirtyRange { start: 2, end: 3 }, DirtyRange { start: 10, end: 15 }]
		);
		assert!(queue.is_idle());
	}

	#[test]
	fn subscribers_receive_each_batch() {
		let mut queue = DeferredQueue::new();
		let mut rx = queue.subscribe();
		queue.push(change(0, 1, 2));
		queue.drain();
		let batch = rx.try_recv().expect("batch delivered");
		assert_eq!(batch, vec![DirtyRange { start: 0, end: 2 }]);
		assert!(rx.try_recv().is_err());
	}

	#[test]
	fn closed_subscribers_are_pruned() {
		let mut queue = DeferredQueue::new();
		let rx = queue.subscribe();
		drop(rx);
		queue.push(change(0, 1, 1));
		queue.drain();
		assert!(queue.subscribers.is_empty());
	}
}
