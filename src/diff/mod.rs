//! The reconciler.
//!
//! A [`Renderer`] owns the output [`Document`], every identity side-table and the pending async work.
//! Each pass walks descriptor children and output siblings in lock-step through [`Renderer::dispatch_child`],
//! which hands each slot to the value, element, fragment, live or component differ.

mod attributes;
mod component;
mod element;
mod keyed;
mod list;
mod remove;
mod tables;
mod value;

use self::tables::Tables;
use crate::{
	dom::Document,
	error::{Error, Rejection},
	event::{self, Event},
	live::{Live, Subscription},
	rc_hash_map::RcHashMap,
	router::Router,
	scheduler::{FrameHost, Home, Redraw, Request},
	view::{Child, Value},
	NodeId,
};
use core::{
	fmt::{self, Debug, Formatter},
	mem, slice,
	task::{Context, Poll, Waker},
};
use futures_signals::signal::SignalExt;
use futures_util::{
	future::{abortable, ready, FutureExt, LocalBoxFuture},
	stream::{FuturesUnordered, StreamExt},
	task::noop_waker,
};
use std::rc::Rc;
use tracing::{error, info, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Renderer configuration.
#[derive(Clone)]
pub struct Options {
	router: Option<Rc<dyn Router>>,
	on_rejection: Rc<dyn Fn(&Rejection) -> Child>,
	redraw_on_event: bool,
	depth_limit: usize,
	waker: Waker,
}
impl Default for Options {
	fn default() -> Self {
		Self {
			router: None,
			on_rejection: Rc::new(|_| Child::Value(Value::Null)),
			redraw_on_event: true,
			depth_limit: 1024,
			waker: noop_waker(),
		}
	}
}
impl Debug for Options {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Options")
			.field("router", &self.router.as_ref().map(|router| router.prefix().to_owned()))
			.field("redraw_on_event", &self.redraw_on_event)
			.field("depth_limit", &self.depth_limit)
			.finish_non_exhaustive()
	}
}
impl Options {
	/// Enables `href` prefixing and intercepted client-side navigation.
	#[must_use]
	pub fn with_router(mut self, router: Rc<dyn Router>) -> Self {
		self.router = Some(router);
		self
	}

	/// Sets how a rejected async component is rendered. By default, it renders as an empty marker.
	#[must_use]
	pub fn with_on_rejection(mut self, on_rejection: impl Fn(&Rejection) -> Child + 'static) -> Self {
		self.on_rejection = Rc::new(on_rejection);
		self
	}

	/// Whether a dispatched event that reached a handler requests a global redraw. Defaults to `true`.
	#[must_use]
	pub fn with_redraw_on_event(mut self, redraw_on_event: bool) -> Self {
		self.redraw_on_event = redraw_on_event;
		self
	}

	/// Maximum descriptor nesting. Deeper content is not rendered. Defaults to 1024.
	#[must_use]
	pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	/// Woken whenever pending work (async components, teardown, [`Live`] changes) can make progress.
	/// The host should then call [`Renderer::poll`] or [`Renderer::frame`].
	///
	/// Defaults to a no-op waker, for hosts that poll on their own schedule.
	#[must_use]
	pub fn with_waker(mut self, waker: Waker) -> Self {
		self.waker = waker;
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u32);

struct Mount {
	parent: NodeId,
	view: Box<dyn FnMut() -> Child>,
}

/// Per-event-name bookkeeping of the shared dispatcher.
#[derive(Debug, Clone, Copy)]
struct EventRoute {
	bubbles: bool,
}

/// The effect of a settled future, applied strictly after the pass that spawned it.
enum Settled {
	Component { home: Home, level: usize, token: u64, outcome: Result<Child, Rejection> },
	Detach(NodeId),
	/// A [`Live`] subscription ended.
	Unsubscribed,
}

/// How a slot relates to its surroundings.
#[derive(Default)]
pub(crate) struct Scope<'a> {
	/// The render stack of the component whose output is being diffed, if any.
	tree: Option<&'a mut tables::Tree>,
	/// Whether this is the current value of a [`Live`] child.
	live: bool,
}

pub struct Renderer {
	document: Document,
	tables: Tables,
	tasks: FuturesUnordered<LocalBoxFuture<'static, Settled>>,
	listeners: RcHashMap<Rc<str>, u32, EventRoute>,
	options: Options,
	redraw: Redraw,
	mounts: Vec<Option<Mount>>,
	next_token: u64,
}
impl Debug for Renderer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Renderer")
			.field("document", &self.document)
			.field("tasks", &self.tasks.len())
			.field("options", &self.options)
			.field("redraw", &self.redraw)
			.field("mounts", &self.mounts.iter().filter(|mount| mount.is_some()).count())
			.finish_non_exhaustive()
	}
}
impl Renderer {
	#[must_use]
	pub fn new(host: Rc<dyn FrameHost>) -> Self {
		Self::with_options(host, Options::default())
	}

	#[must_use]
	pub fn with_options(host: Rc<dyn FrameHost>, options: Options) -> Self {
		Self {
			document: Document::new(),
			tables: Tables::default(),
			tasks: FuturesUnordered::new(),
			listeners: RcHashMap::new(),
			options,
			redraw: Redraw::new(host),
			mounts: Vec::new(),
			next_token: 0,
		}
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// Direct access to the output tree, e.g. to create mount targets.
	///
	/// Don't restructure content managed by a mount through this.
	pub fn document_mut(&mut self) -> &mut Document {
		&mut self.document
	}

	/// A handle that requests a global redraw.
	#[must_use]
	pub fn redraw(&self) -> Redraw {
		self.redraw.clone()
	}

	/// Mounts `view` as the content of `parent` and renders it immediately.
	///
	/// `view` is called again on each global redraw.
	/// Existing children of `parent` are reconciled against positionally.
	///
	/// # Errors
	///
	/// Iff `parent` is not a live element.
	#[allow(clippy::cast_possible_truncation)]
	pub fn mount(&mut self, parent: NodeId, view: impl FnMut() -> Child + 'static) -> Result<MountId, Error> {
		if !self.document.contains(parent) {
			return Err(Error::DeadNode(parent));
		}
		if !self.document.is_element(parent) {
			return Err(Error::NotAnElement(parent));
		}
		let id = MountId(self.mounts.len() as u32);
		self.mounts.push(Some(Mount { parent, view: Box::new(view) }));
		self.render_mount(id);
		Ok(id)
	}

	/// Removes the content of a mount (honouring deferred teardown) and forgets it.
	///
	/// # Errors
	///
	/// Iff `id` is not currently mounted.
	pub fn unmount(&mut self, id: MountId) -> Result<(), Error> {
		let mount = self.mounts.get_mut(id.0 as usize).and_then(Option::take).ok_or(Error::UnknownMount(id))?;
		let span = trace_span!("Unmounting", ?id);
		let _enter = span.enter();
		if self.document.contains(mount.parent) {
			let first = self.skip_removing(self.document.first_child(mount.parent));
			self.update_children(mount.parent, mount.parent, first, &[], None, 0);
		}
		Ok(())
	}

	/// Runs a global pass over all mounts immediately.
	#[allow(clippy::cast_possible_truncation)]
	pub fn render(&mut self) {
		for index in 0..self.mounts.len() {
			self.render_mount(MountId(index as u32));
		}
	}

	#[instrument(skip(self))]
	fn render_mount(&mut self, id: MountId) {
		let (parent, child) = match self.mounts.get_mut(id.0 as usize) {
			Some(Some(mount)) => (mount.parent, (mount.view)()),
			_ => return,
		};
		if !self.document.contains(parent) {
			return error!("Mount target {:?} was freed. Skipping.", parent);
		}
		let first = self.skip_removing(self.document.first_child(parent));
		self.update_children(parent, parent, first, slice::from_ref(&child), None, 0);
	}

	/// Applies all settled async work and queues [`Live`] changes for the next frame.
	/// Returns how many async components and deferred removals settled.
	///
	/// This never blocks. Hosts call it (or [`Renderer::frame`]) whenever the [waker](`Options::with_waker`) is woken.
	pub fn poll(&mut self) -> usize {
		let waker = self.options.waker.clone();
		let mut cx = Context::from_waker(&waker);
		let mut count = 0;
		while let Poll::Ready(Some(settled)) = self.tasks.poll_next_unpin(&mut cx) {
			if !matches!(settled, Settled::Unsubscribed) {
				count += 1;
			}
			self.settle(settled);
		}
		count
	}

	/// Number of futures that have not settled yet, including [`Live`] subscriptions.
	#[must_use]
	pub fn pending_tasks(&self) -> usize {
		self.tasks.len()
	}

	fn spawn(&mut self, task: LocalBoxFuture<'static, Settled>) {
		self.tasks.push(task);
	}

	/// Calls `emit` with each later value of `live` until the returned [`Subscription`] is dropped.
	fn subscribe<T: Clone + 'static>(&mut self, live: &Live<T>, mut emit: impl FnMut(T) + 'static) -> Subscription {
		let mut current = true;
		let (changes, handle) = abortable(live.signal().for_each(move |value| {
			// The first value is the one that was just rendered.
			if !mem::replace(&mut current, false) {
				emit(value);
			}
			ready(())
		}));
		let mut task = changes.map(|_| Settled::Unsubscribed).boxed_local();

		// Polled once right away, so that a change before the next poll isn't mistaken for the rendered value.
		let waker = self.options.waker.clone();
		if task.poll_unpin(&mut Context::from_waker(&waker)).is_pending() {
			self.spawn(task);
		}
		Subscription::new(handle)
	}

	fn settle(&mut self, settled: Settled) {
		match settled {
			Settled::Component { home, level, token, outcome } => {
				let frame = home.get().and_then(|node| self.tables.component_state.get_mut(&node)).and_then(|tree| tree.frames.get_mut(level));
				match frame {
					Some(frame) if matches!(frame.instance, tables::Instance::Pending(pending) if pending == token) => {
						if let Err(rejection) = &outcome {
							error!("Async component rejected: {}", rejection);
						}
						frame.instance = tables::Instance::Settled(outcome);
						self.redraw.request();
					}
					_ => trace!("Discarding outcome of superseded async component."),
				}
			}
			Settled::Detach(node) => {
				if self.tables.removing.remove(&node).is_some() && self.document.contains(node) {
					trace!("Detaching {:?} after deferred teardown.", node);
					self.free_node(node);
				}
			}
			Settled::Unsubscribed => trace!("Live subscription ended."),
		}
	}

	/// Runs one coalesced frame: settled futures, live updates, local redraws and then the global redraw, if requested.
	pub fn frame(&mut self) {
		let span = trace_span!("frame");
		let _enter = span.enter();
		self.redraw.begin_frame();

		self.poll();
		for request in self.redraw.take_requests() {
			self.apply(request);
		}
		if self.redraw.take_global() {
			self.render();
		}

		let purged = self.listeners.purge();
		trace!("Purged {} unused event route(s).", purged);
		info!("Event route count/cached capacity: {}/{}", self.listeners.len(), self.listeners.capacity());
		if STATIC_MAX_LEVEL >= Level::WARN && self.tasks.len() >= 100 {
			warn!(
				"{} futures are still pending after this frame.\n\
				Besides live subscriptions, this may point to async components or teardown hooks that never settle.",
				self.tasks.len()
			);
		}
		self.redraw.end_frame();
	}

	fn apply(&mut self, request: Request) {
		match request {
			Request::Local(home) => {
				let node = match home.get() {
					Some(node) => node,
					None => return trace!("Skipping local redraw of unmounted component."),
				};
				let (parent, view) = match (self.document.parent(node), self.tables.component_state.get(&node)) {
					(Some(parent), Some(tree)) if !self.tables.removing.contains_key(&node) => (parent, tree.view.clone()),
					_ => return trace!("Skipping local redraw of detached component."),
				};
				let span = trace_span!("Local redraw", ?node);
				let _enter = span.enter();
				let new = self.dispatch_child(Some(node), &Child::View(view), parent, false, Scope::default(), 0);
				if new != node {
					self.tables.repoint(node, new);
				}
			}
			Request::LiveChild { home, child } => {
				let node = match home.get() {
					Some(node) => node,
					None => return,
				};
				let parent = match self.document.parent(node) {
					Some(parent) if self.tables.live_slots.contains_key(&node) && !self.tables.removing.contains_key(&node) => parent,
					_ => return trace!("Skipping update of detached live child."),
				};
				// Taken out first, as replacing the node forgets its bookkeeping.
				let slot = self.tables.live_slots.remove(&node);
				let new = self.dispatch_child(Some(node), &child, parent, false, Scope { tree: None, live: true }, 0);
				if let Some(slot) = slot {
					self.tables.live_slots.insert(new, slot);
				}
				if new != node {
					home.set(Some(new));
					self.tables.repoint(node, new);
				}
			}
			Request::LiveVar { node, name, value } => {
				if self.document.contains(node) {
					self.document.set_style_property(node, &name, &value.to_text());
				}
			}
		}
	}

	/// Reconciles one slot. Returns the slot's new head node.
	///
	/// `dom` is the slot's previous head node, if any. New nodes are inserted before it and it is removed if it can't be reused.
	/// `create` forces new nodes.
	pub(crate) fn dispatch_child(&mut self, dom: Option<NodeId>, child: &Child, parent: NodeId, create: bool, scope: Scope<'_>, depth: usize) -> NodeId {
		let dom = dom.filter(|&dom| self.document.contains(dom));
		if depth > self.options.depth_limit {
			error!("Depth limit reached");
			return self.diff_value(dom, &Value::Null, parent, create);
		}

		if let Some(dom) = dom {
			if !scope.live {
				let is_component = matches!(child, Child::View(view) if view.component.is_some());
				if !is_component && scope.tree.is_none() {
					self.tables.component_state.remove(&dom);
				}
				if !matches!(child, Child::Live(_)) {
					self.tables.live_slots.remove(&dom);
				}
			}
		}

		match child {
			Child::Value(value) => self.diff_value(dom, value, parent, create),
			Child::View(view) if view.component.is_some() => self.diff_component(dom, view, parent, create, scope, depth),
			Child::View(view) => self.diff_element(dom, view, parent, create, depth),
			Child::Fragment(children) => self.diff_fragment(dom, children, parent, create, depth),
			Child::Live(live) => self.diff_live(dom, live, parent, create, depth),
			Child::Lazy(lazy) => {
				let child = lazy();
				self.dispatch_child(dom, &child, parent, create, scope, depth)
			}
		}
	}

	fn diff_live(&mut self, dom: Option<NodeId>, live: &Live<Child>, parent: NodeId, create: bool, depth: usize) -> NodeId {
		let span = trace_span!("Diffing live child", ?dom);
		let _enter = span.enter();
		let existing = dom.and_then(|dom| self.tables.live_slots.remove(&dom)).filter(|slot| slot.source.ptr_eq(live));
		let node = self.dispatch_child(dom, &live.get(), parent, create, Scope { tree: None, live: true }, depth);

		let slot = match existing {
			Some(slot) => slot,
			None => {
				trace!("Subscribing live child.");
				let home: Home = Rc::default();
				let redraw = self.redraw.clone();
				let subscription = self.subscribe(live, {
					let home = home.clone();
					move |child| redraw.push(Request::LiveChild { home: home.clone(), child })
				});
				tables::LiveSlot { source: live.clone(), home, _subscription: subscription }
			}
		};
		slot.home.set(Some(node));
		self.tables.live_slots.insert(node, slot);
		node
	}

	/// Dispatches `event` to `target` and, if it bubbles, its ancestors.
	///
	/// At each node with a native listener for the event, the handler from the node's currently applied attributes is called.
	/// Returns whether any handler was called or a routed link navigated.
	#[instrument(skip(self, event), fields(event = event.name()))]
	pub fn dispatch(&mut self, target: NodeId, event: &Event) -> bool {
		let bubbles = match self.listeners.get(event.name()) {
			Some((count, route)) if *count > 0 => route.bubbles,
			_ => {
				trace!("No listeners.");
				return false;
			}
		};
		event.set_target(target);

		let handler_name = format!("on{}", event.name());
		let mut handled = false;
		let mut current = Some(target);
		while let Some(node) = current {
			if self.document.has_listener(node, event.name()) {
				event.set_current_target(Some(node));
				let handler = self.tables.applied.get(&node).and_then(|attrs| attrs.handler(&handler_name)).cloned();
				if let Some(handler) = handler {
					handler(event);
					handled = true;
				}
				if event.name() == "click" {
					handled |= self.follow_link(node, event);
				}
			}
			if !bubbles || event.propagation_stopped() {
				break;
			}
			current = self.document.parent(node);
		}
		event.set_current_target(None);

		if handled && self.options.redraw_on_event {
			self.redraw.request();
		}
		handled
	}

	fn follow_link(&mut self, node: NodeId, event: &Event) -> bool {
		let (path, router) = match (self.tables.links.get(&node), &self.options.router) {
			(Some(path), Some(router)) => (path.clone(), router.clone()),
			_ => return false,
		};
		if event.button != 0 || event.modifiers.any() || self.document.attribute(node, "target").is_some() || event.default_prevented() {
			trace!("Not intercepting link click.");
			return false;
		}
		event.prevent_default();
		router.navigate(&path);
		self.redraw.request();
		true
	}

	/// Adds or removes the native listener for `event` on `node`, depending on whether anything on it still handles that event.
	fn sync_listener(&mut self, node: NodeId, name: &str, handled: bool) {
		let bound = self.document.has_listener(node, name);
		if handled && !bound {
			self.document.add_event_listener(node, name);
			if self
				.listeners
				.increment_or_insert_with(name.into(), || EventRoute { bubbles: event::bubbles(name) })
				.is_err()
			{
				error!("Too many bindings of event {:?}.", name);
			}
		} else if !handled && bound {
			self.document.remove_event_listener(node, name);
			self.release_listener(name);
		}
	}

	fn release_listener(&mut self, name: &str) {
		match self.listeners.weak_decrement(name) {
			Ok(Some(_)) => (),
			Ok(None) => warn!("Released unknown event route {:?}.", name),
			Err(error) => error!("Event route {:?}: {}", name, error),
		}
	}

	/// How many nodes currently have a native listener for `event`.
	#[must_use]
	pub fn listener_count(&self, event: &str) -> u32 {
		self.listeners.get(event).map_or(0, |(count, _)| *count)
	}

	/// Whether `node` is waiting for deferred teardown work before being detached.
	#[must_use]
	pub fn is_removing(&self, node: NodeId) -> bool {
		self.tables.removing.contains_key(&node)
	}

	/// Length of the render stack of the component(s) that produced `node`.
	#[must_use]
	pub fn render_stack_len(&self, node: NodeId) -> Option<usize> {
		self.tables.component_state.get(&node).map(|tree| tree.frames.len())
	}
}
