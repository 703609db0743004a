//! Child lists.
//!
//! A list occupies a run of consecutive siblings in its parent. Each entry is one slot: a single node,
//! or a boundary marker followed by its own nested slots. Nodes waiting for deferred teardown
//! are skipped wherever slots are walked.

use super::{tables::Keyed, Renderer, Scope};
use crate::{
	view::{Child, Key},
	NodeId,
};
use hashbrown::HashSet;
use tracing::{trace, trace_span, warn};

impl Renderer {
	pub(super) fn skip_removing(&self, mut node: Option<NodeId>) -> Option<NodeId> {
		while let Some(current) = node {
			if !self.tables.removing.contains_key(&current) {
				break;
			}
			node = self.document.next_sibling(current);
		}
		node
	}

	/// The last node of the slot starting at `slot`.
	pub(super) fn last_of(&self, slot: NodeId) -> NodeId {
		let len = match self.tables.array_bounds.get(&slot) {
			Some(&len) => len,
			None => return slot,
		};
		let mut last = slot;
		for _ in 0..len {
			match self.skip_removing(self.document.next_sibling(last)) {
				Some(next) => last = self.last_of(next),
				None => break,
			}
		}
		last
	}

	/// The head of the slot after `slot`, if any.
	pub(super) fn next_slot(&self, slot: NodeId) -> Option<NodeId> {
		self.skip_removing(self.document.next_sibling(self.last_of(slot)))
	}

	/// The node after `len` slots starting at `first`, or [`None`] for the end of the parent.
	pub(super) fn run_end(&self, first: Option<NodeId>, len: Option<usize>) -> Option<NodeId> {
		let len = len?;
		let mut current = first;
		for _ in 0..len {
			current = self.next_slot(current?);
		}
		current
	}

	/// Moves the slot starting at `slot`, with all its nodes, before `before`.
	pub(super) fn move_slot(&mut self, parent: NodeId, slot: NodeId, before: Option<NodeId>) {
		let last = self.last_of(slot);
		if self.document.parent(slot) == Some(parent) && self.document.next_sibling(last) == before {
			return;
		}
		let mut nodes = vec![slot];
		let mut current = slot;
		while current != last {
			match self.document.next_sibling(current) {
				Some(next) => {
					nodes.push(next);
					current = next;
				}
				None => break,
			}
		}
		for node in nodes {
			self.document.insert_before(parent, node, before);
		}
	}

	/// Renders `child` as new content and inserts it before `before`.
	pub(super) fn insert_new(&mut self, child: &Child, parent: NodeId, before: Option<NodeId>, depth: usize) -> NodeId {
		let fragment = self.document.create_fragment();
		let node = self.dispatch_child(None, child, fragment, true, Scope::default(), depth);
		self.document.insert_before(parent, fragment, before);
		self.document.free(fragment);
		node
	}

	/// Reconciles `children` against the run of `len` slots starting at `first`. A `len` of [`None`] means "until the end of `parent`".
	///
	/// `group` identifies the list for keyed bookkeeping: the parent element, or the fragment's boundary marker.
	/// Returns the new head node of each child.
	pub(super) fn update_children(&mut self, group: NodeId, parent: NodeId, first: Option<NodeId>, children: &[Child], len: Option<usize>, depth: usize) -> Vec<NodeId> {
		let keys = keys_of(children);
		match (keys, self.tables.keyed_siblings.remove(&group)) {
			(Some(keys), Some(previous)) => {
				let end = self.run_end(first, len);
				let doms = self.update_keyed(parent, previous, children, &keys, end, depth);
				self.register_keyed(group, keys, &doms);
				doms
			}
			(keys, _) => {
				let doms = self.update_positional(parent, first, children, len, depth);
				match keys {
					Some(keys) => self.register_keyed(group, keys, &doms),
					None => trace!("Not keyed."),
				}
				doms
			}
		}
	}

	fn register_keyed(&mut self, group: NodeId, keys: Vec<Key>, doms: &[NodeId]) {
		let keyed = keys.into_iter().zip(doms.iter().copied()).map(|(key, dom)| Keyed { key, dom }).collect();
		self.tables.keyed_siblings.insert(group, keyed);
	}

	fn update_positional(&mut self, parent: NodeId, first: Option<NodeId>, children: &[Child], len: Option<usize>, depth: usize) -> Vec<NodeId> {
		let span = trace_span!("Positional children", len = children.len(), previous_len = ?len);
		let _enter = span.enter();

		let mut doms = Vec::with_capacity(children.len());
		let mut current = self.skip_removing(first);
		let mut remaining = len;
		for child in children {
			match current.filter(|_| remaining != Some(0)) {
				Some(dom) => {
					let next = self.next_slot(dom);
					doms.push(self.dispatch_child(Some(dom), child, parent, false, Scope::default(), depth));
					current = next;
					remaining = remaining.map(|remaining| remaining - 1);
				}
				None => doms.push(self.insert_new(child, parent, current, depth)),
			}
		}

		match remaining {
			Some(remaining) => {
				for _ in 0..remaining {
					let dom = match current {
						Some(dom) => dom,
						None => break,
					};
					current = self.next_slot(dom);
					self.remove(dom);
				}
			}
			None => {
				while let Some(dom) = current {
					current = self.next_slot(dom);
					self.remove(dom);
				}
			}
		}
		doms
	}
}

/// The keys of `children`, if every child has one and none repeats.
fn keys_of(children: &[Child]) -> Option<Vec<Key>> {
	let keyed = children.iter().filter(|child| child.key().is_some()).count();
	if keyed == 0 {
		return None;
	}
	if keyed < children.len() {
		warn!("{} of {} siblings have a key. Falling back to positional reconciliation.", keyed, children.len());
		return None;
	}

	let mut seen = HashSet::with_capacity(children.len());
	let mut keys = Vec::with_capacity(children.len());
	for key in children.iter().filter_map(Child::key) {
		if !seen.insert(key) {
			warn!("Duplicate key {:?} among siblings. Falling back to positional reconciliation.", key);
			return None;
		}
		keys.push(key.clone());
	}
	Some(keys)
}
