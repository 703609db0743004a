//! Identity side-tables, keyed by output node.
//!
//! Entries are removed explicitly when their node is freed, see [`Renderer::free_node`](`super::Renderer::free_node`).

use crate::{
	live::{Live, Subscription},
	scheduler::{Home, LocalRedraw, Redraw},
	view::{Attrs, Child, Component, Key, Render, Teardown, View},
	Rejection, NodeId,
};
use core::cell::Cell;
use futures_util::future::{LocalBoxFuture, Shared};
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;

#[derive(Default)]
pub(crate) struct Tables {
	/// Render stack of the component(s) that produced a node.
	pub component_state: HashMap<NodeId, Tree>,
	/// Nodes waiting for deferred teardown work before they are detached, with that work's completion.
	pub removing: HashMap<NodeId, Completion>,
	/// Teardown callbacks returned by `life` hooks.
	pub teardowns: HashMap<NodeId, Vec<Teardown>>,
	/// Fragment boundary marker → number of slots that follow it.
	pub array_bounds: HashMap<NodeId, usize>,
	/// Child group (parent element or fragment marker) → previous keyed children.
	pub keyed_siblings: HashMap<NodeId, Vec<Keyed>>,
	/// Last applied attributes.
	pub applied: HashMap<NodeId, Attrs>,
	pub live_slots: HashMap<NodeId, LiveSlot>,
	pub live_vars: HashMap<NodeId, Vec<(Rc<str>, Subscription)>>,
	/// Routed `href` paths, normalized and without prefix.
	pub links: HashMap<NodeId, Rc<str>>,
	/// Elements whose `id` attribute was set from their tag.
	pub tag_ids: HashSet<NodeId>,
}
impl Tables {
	/// Forgets all bookkeeping of one node.
	pub fn forget(&mut self, node: NodeId) {
		self.component_state.remove(&node);
		self.removing.remove(&node);
		self.teardowns.remove(&node);
		self.array_bounds.remove(&node);
		self.keyed_siblings.remove(&node);
		self.applied.remove(&node);
		self.live_slots.remove(&node);
		self.live_vars.remove(&node);
		self.links.remove(&node);
		self.tag_ids.remove(&node);
	}

	/// Re-points keyed bookkeeping after a node was replaced outside of its list's pass.
	pub fn repoint(&mut self, old: NodeId, new: NodeId) {
		for keyed in self.keyed_siblings.values_mut().flatten() {
			if keyed.dom == old {
				keyed.dom = new;
			}
		}
	}
}

/// Completes once all teardown work of a removing node has settled. Awaited by its removing ancestors, too.
pub(crate) type Completion = Shared<LocalBoxFuture<'static, ()>>;

#[derive(Debug, Clone)]
pub(crate) struct Keyed {
	pub key: Key,
	pub dom: NodeId,
}

pub(crate) struct LiveSlot {
	pub source: Live<Child>,
	pub home: Home,
	pub _subscription: Subscription,
}

/// The persistent render stack of one component position.
///
/// Frames are addressed by nesting depth, so that a component whose output is itself a component invocation
/// resumes the right instance on the next pass.
pub(crate) struct Tree {
	pub frames: Vec<Frame>,
	pub cursor: usize,
	pub high_water: usize,
	/// The outermost invocation, replayed by local redraws.
	pub view: View,
	pub home: Home,
	pub redraw: LocalRedraw,
}
impl Tree {
	pub fn new(redraw: Redraw) -> Self {
		let home: Home = Rc::new(Cell::new(None));
		Self {
			frames: Vec::new(),
			cursor: 0,
			high_water: 0,
			view: View::default(),
			redraw: LocalRedraw::new(home.clone(), redraw),
			home,
		}
	}
}
impl Drop for Tree {
	fn drop(&mut self) {
		self.home.set(None);
	}
}

pub(crate) struct Frame {
	pub component: Component,
	pub instance: Instance,
}

pub(crate) enum Instance {
	Stateless,
	Stateful(Render),
	/// Waiting for the future with this token.
	Pending(u64),
	Settled(Result<Child, Rejection>),
}
