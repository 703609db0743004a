//! Keyed child lists.
//!
//! A dual-pointer diff: common heads and tails are diffed in place, a crossed head/tail pair is swapped directly,
//! and anything else falls back to a lookup by key that either inserts the new items preceding an in-order run
//! or replaces the current old item outright.

use super::{tables::Keyed, Renderer, Scope};
use crate::{
	view::{Child, Key},
	NodeId,
};
use hashbrown::HashMap;
use tracing::{error, trace, trace_span};

impl Renderer {
	/// Returns the new head node of each child.
	///
	/// `end` is the node following the previous run, or [`None`] if the run extends to the end of `parent`.
	#[allow(clippy::too_many_lines)]
	pub(super) fn update_keyed(&mut self, parent: NodeId, previous: Vec<Keyed>, children: &[Child], keys: &[Key], end: Option<NodeId>, depth: usize) -> Vec<NodeId> {
		let span = trace_span!("Keyed children", len = children.len(), previous_len = previous.len());
		let _enter = span.enter();

		let a: Vec<Keyed> = previous
			.into_iter()
			.filter(|keyed| self.document.contains(keyed.dom) && !self.tables.removing.contains_key(&keyed.dom))
			.collect();
		let b = keys;
		let mut b_doms: Vec<Option<NodeId>> = vec![None; b.len()];

		let (mut a_start, mut a_end) = (0, a.len());
		let (mut b_start, mut b_end) = (0, b.len());
		// New key → index, over the new window when first needed.
		let mut map: Option<HashMap<Key, usize>> = None;
		// Old key → node, over the whole previous list.
		let mut ax: Option<HashMap<Key, NodeId>> = None;
		// Old nodes replaced before their new position was reached.
		let mut parking: Option<NodeId> = None;

		while a_start < a_end || b_start < b_end {
			if a_end == a_start {
				let before = if b_end < b.len() { b_doms[b_end] } else { end };
				let span = trace_span!("Inserting tail", count = b_end - b_start);
				let _enter = span.enter();
				while b_start < b_end {
					b_doms[b_start] = Some(self.place(&children[b_start], &b[b_start], ax.as_mut(), parent, before, depth));
					b_start += 1;
				}
			} else if b_end == b_start {
				if !map.as_ref().map_or(false, |map| map.contains_key(&a[a_start].key)) {
					trace!("Removing {:?}.", a[a_start].key);
					self.remove(a[a_start].dom);
				}
				a_start += 1;
			} else if a[a_start].key == b[b_start] {
				b_doms[b_start] = Some(self.dispatch_child(Some(a[a_start].dom), &children[b_start], parent, false, Scope::default(), depth));
				a_start += 1;
				b_start += 1;
			} else if a[a_end - 1].key == b[b_end - 1] {
				b_doms[b_end - 1] = Some(self.dispatch_child(Some(a[a_end - 1].dom), &children[b_end - 1], parent, false, Scope::default(), depth));
				a_end -= 1;
				b_end -= 1;
			} else if a[a_start].key == b[b_end - 1] && b[b_start] == a[a_end - 1].key {
				let span = trace_span!("Swapping", head = ?a[a_start].key, tail = ?a[a_end - 1].key);
				let _enter = span.enter();
				let (head, tail) = (a[a_start].dom, a[a_end - 1].dom);
				let after_tail = self.document.next_sibling(self.last_of(tail));
				self.move_slot(parent, tail, Some(head));
				self.move_slot(parent, head, after_tail);
				b_doms[b_start] = Some(self.dispatch_child(Some(tail), &children[b_start], parent, false, Scope::default(), depth));
				b_doms[b_end - 1] = Some(self.dispatch_child(Some(head), &children[b_end - 1], parent, false, Scope::default(), depth));
				a_start += 1;
				a_end -= 1;
				b_start += 1;
				b_end -= 1;
			} else {
				let map = map.get_or_insert_with(|| (b_start..b_end).map(|i| (b[i].clone(), i)).collect());
				match map.get(&a[a_start].key).copied() {
					Some(index) if b_start < index && index < b_end => {
						let mut i = a_start;
						let mut sequence = 1;
						loop {
							i += 1;
							if i < a_end && i < b_end && map.get(&a[i].key) == Some(&(index + sequence)) {
								sequence += 1;
							} else {
								break;
							}
						}

						let ax = ax.get_or_insert_with(|| a.iter().map(|keyed| (keyed.key.clone(), keyed.dom)).collect());
						if sequence > index - b_start {
							let span = trace_span!("Inserting before run", count = index - b_start, run = sequence);
							let _enter = span.enter();
							let before = Some(a[a_start].dom);
							while b_start < index {
								b_doms[b_start] = Some(self.place(&children[b_start], &b[b_start], Some(&mut *ax), parent, before, depth));
								b_start += 1;
							}
						} else {
							let span = trace_span!("Replacing", old = ?a[a_start].key, new = ?b[b_start]);
							let _enter = span.enter();
							let old = a[a_start].dom;
							b_doms[b_start] = Some(self.place(&children[b_start], &b[b_start], Some(&mut *ax), parent, Some(old), depth));
							let parking = *parking.get_or_insert_with(|| self.document.create_fragment());
							self.move_slot(parking, old, None);
							a_start += 1;
							b_start += 1;
						}
					}
					Some(_) => a_start += 1,
					None => {
						trace!("Removing {:?}.", a[a_start].key);
						self.remove(a[a_start].dom);
						a_start += 1;
					}
				}
			}
		}

		if let Some(parking) = parking {
			for leftover in self.document.children(parking) {
				self.remove(leftover);
			}
			self.document.free(parking);
		}

		let mut doms = Vec::with_capacity(b.len());
		for (i, dom) in b_doms.into_iter().enumerate() {
			match dom {
				Some(dom) => doms.push(dom),
				None => {
					error!("Keyed child {:?} was never placed. Appending it.", b[i]);
					doms.push(self.insert_new(&children[i], parent, end, depth));
				}
			}
		}
		doms
	}

	/// Moves the previous node of `key` before `before` and diffs it, or inserts new content there.
	fn place(&mut self, child: &Child, key: &Key, ax: Option<&mut HashMap<Key, NodeId>>, parent: NodeId, before: Option<NodeId>, depth: usize) -> NodeId {
		match ax.and_then(|ax| ax.remove(key)) {
			Some(dom) if self.document.contains(dom) => {
				self.move_slot(parent, dom, before);
				self.dispatch_child(Some(dom), child, parent, false, Scope::default(), depth)
			}
			_ => self.insert_new(child, parent, before, depth),
		}
	}
}
