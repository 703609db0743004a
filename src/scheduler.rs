//! Redraw coalescing.
//!
//! Any number of redraw requests between two frames collapse into a single [`FrameHost::request_frame`] call.
//! The requested work itself runs in [`Renderer::frame`](`crate::Renderer::frame`).

use crate::{
	view::{Child, Value},
	NodeId,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
	mem,
};
use std::{collections::VecDeque, rc::Rc};
use tracing::trace;

/// The host's "run once before the next paint" primitive.
///
/// Implementations should arrange for [`Renderer::frame`](`crate::Renderer::frame`) to be called soon after.
pub trait FrameHost {
	fn request_frame(&self);
}

/// A [`FrameHost`] that only counts requests, for hosts that drive frames themselves.
#[derive(Debug, Default)]
pub struct ManualFrames {
	requested: Cell<usize>,
}
impl ManualFrames {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// How many frames were requested so far.
	#[must_use]
	pub fn requested(&self) -> usize {
		self.requested.get()
	}
}
impl FrameHost for ManualFrames {
	fn request_frame(&self) {
		self.requested.set(self.requested.get() + 1);
	}
}

/// Shared between a render stack and the [`LocalRedraw`]s and pending futures created for it.
/// Holds the stack's current output node, or [`None`] once the stack is gone.
pub(crate) type Home = Rc<Cell<Option<NodeId>>>;

pub(crate) enum Request {
	Local(Home),
	LiveChild { home: Home, child: Child },
	LiveVar { node: NodeId, name: Rc<str>, value: Value },
}
impl Debug for Request {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Request::Local(home) => f.debug_tuple("Local").field(&home.get()).finish(),
			Request::LiveChild { home, child } => f.debug_struct("LiveChild").field("home", &home.get()).field("child", child).finish(),
			Request::LiveVar { node, name, value } => f.debug_struct("LiveVar").field("node", node).field("name", name).field("value", value).finish(),
		}
	}
}

struct State {
	idle: Cell<bool>,
	global: Cell<bool>,
	host: Rc<dyn FrameHost>,
	requests: RefCell<VecDeque<Request>>,
}

/// A handle that requests a global redraw of every mount.
#[derive(Clone)]
pub struct Redraw(Rc<State>);
impl Debug for Redraw {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Redraw")
			.field("idle", &self.0.idle.get())
			.field("global", &self.0.global.get())
			.field("requests", &self.0.requests.borrow().len())
			.finish()
	}
}
impl Redraw {
	pub(crate) fn new(host: Rc<dyn FrameHost>) -> Self {
		Self(Rc::new(State {
			idle: Cell::new(true),
			global: Cell::new(false),
			host,
			requests: RefCell::new(VecDeque::new()),
		}))
	}

	pub fn request(&self) {
		self.0.global.set(true);
		self.schedule();
	}

	/// Whether no frame is currently requested or running.
	#[must_use]
	pub fn is_idle(&self) -> bool {
		self.0.idle.get()
	}

	fn schedule(&self) {
		if self.0.idle.replace(false) {
			trace!("Requesting frame.");
			self.0.host.request_frame();
		}
	}

	/// Queues `request` for the next frame. A local redraw that is already queued isn't queued again.
	pub(crate) fn push(&self, request: Request) {
		{
			let mut requests = self.0.requests.borrow_mut();
			if let Request::Local(home) = &request {
				if requests.iter().any(|queued| matches!(queued, Request::Local(queued) if Rc::ptr_eq(queued, home))) {
					return trace!("Local redraw already queued.");
				}
			}
			requests.push_back(request);
		}
		self.schedule();
	}

	/// Marks a frame as running. Requests made until [`Self::end_frame`] are deferred to a follow-up frame.
	pub(crate) fn begin_frame(&self) {
		self.0.idle.set(false);
	}

	pub(crate) fn take_requests(&self) -> VecDeque<Request> {
		mem::take(&mut *self.0.requests.borrow_mut())
	}

	pub(crate) fn take_global(&self) -> bool {
		self.0.global.replace(false)
	}

	pub(crate) fn end_frame(&self) {
		self.0.idle.set(true);
		if self.0.global.get() || !self.0.requests.borrow().is_empty() {
			self.schedule();
		}
	}
}

/// The self-redraw callback handed to every component invocation.
///
/// Re-runs the diff rooted at the component's current output node in the next frame.
#[derive(Clone)]
pub struct LocalRedraw {
	home: Home,
	redraw: Redraw,
}
impl Debug for LocalRedraw {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalRedraw").field("home", &self.home.get()).finish()
	}
}
impl LocalRedraw {
	pub(crate) fn new(home: Home, redraw: Redraw) -> Self {
		Self { home, redraw }
	}

	pub fn request(&self) {
		self.redraw.push(Request::Local(self.home.clone()));
	}

	/// Whether the component is still mounted.
	#[must_use]
	pub fn is_mounted(&self) -> bool {
		self.home.get().is_some()
	}
}
