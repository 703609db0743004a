//! Removal with deferred teardown.
//!
//! Teardown callbacks run children first. If any of them returns pending work, the node stays in place,
//! marked as removing, until all of that work has settled. Rejections don't block the detachment.
//! Descendants that were already removing hold up their ancestor's detachment in the same way.

use super::{Renderer, Settled};
use crate::{view::Settling, NodeId};
use futures_util::future::{join_all, FutureExt};
use tracing::{trace, trace_span};

impl Renderer {
	/// Removes the slot starting at `node`.
	pub(super) fn remove(&mut self, node: NodeId) {
		if !self.document.contains(node) || self.tables.removing.contains_key(&node) {
			return;
		}
		let span = trace_span!("Removing", ?node);
		let _enter = span.enter();

		if let Some(&len) = self.tables.array_bounds.get(&node) {
			let mut current = self.skip_removing(self.document.next_sibling(node));
			for _ in 0..len {
				let slot = match current {
					Some(slot) => slot,
					None => break,
				};
				current = self.next_slot(slot);
				self.remove(slot);
			}
			return self.free_node(node);
		}

		if !self.document.is_element(node) {
			return self.free_node(node);
		}

		let mut settling = Vec::new();
		self.teardown(node, &mut settling);
		if settling.is_empty() {
			return self.free_node(node);
		}

		trace!("Deferring detachment until {} teardown(s) settle.", settling.len());
		let completion = join_all(settling)
			.map(|outcomes| {
				for rejection in outcomes.into_iter().filter_map(Result::err) {
					trace!("Ignoring teardown rejection: {}", rejection);
				}
			})
			.boxed_local()
			.shared();
		self.tables.removing.insert(node, completion.clone());
		self.spawn(completion.map(move |()| Settled::Detach(node)).boxed_local());
	}

	/// Runs the teardown callbacks of `node`'s subtree, children first.
	///
	/// Descendants that are already removing contribute their pending completion instead.
	fn teardown(&mut self, node: NodeId, settling: &mut Vec<Settling>) {
		for child in self.document.children(node) {
			if let Some(completion) = self.tables.removing.get(&child) {
				trace!("Waiting for {:?}, which is already removing.", child);
				settling.push(completion.clone().map(Ok).boxed_local());
			} else if self.document.is_element(child) {
				self.teardown(child, settling);
			}
		}
		if let Some(teardowns) = self.tables.teardowns.remove(&node) {
			for teardown in teardowns {
				settling.extend(teardown(&mut self.document, node));
			}
		}
	}

	/// Detaches and frees `node` with its subtree, dropping all of their bookkeeping.
	pub(super) fn free_node(&mut self, node: NodeId) {
		for freed in self.document.subtree(node) {
			for name in self.document.listeners(freed) {
				self.release_listener(&name);
			}
			self.tables.forget(freed);
		}
		self.document.free(node);
	}
}
