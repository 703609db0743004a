use crate::NodeId;
use core::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
	pub ctrl: bool,
	pub shift: bool,
	pub alt: bool,
	pub meta: bool,
}
impl Modifiers {
	#[must_use]
	pub fn any(self) -> bool {
		self.ctrl || self.shift || self.alt || self.meta
	}
}

/// Whether events named `name` continue from their target to its ancestors.
#[must_use]
pub fn bubbles(name: &str) -> bool {
	!matches!(name, "focus" | "blur" | "mouseenter" | "mouseleave" | "load" | "unload" | "scroll")
}

/// An event dispatched into the output tree with [`Renderer::dispatch`](`crate::Renderer::dispatch`).
#[derive(Debug)]
pub struct Event {
	name: Rc<str>,
	/// Mouse button, `0` being the primary one.
	pub button: i16,
	pub modifiers: Modifiers,
	target: Cell<Option<NodeId>>,
	current_target: Cell<Option<NodeId>>,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}
impl Event {
	#[must_use]
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		Self {
			name: name.into(),
			button: 0,
			modifiers: Modifiers::default(),
			target: Cell::new(None),
			current_target: Cell::new(None),
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	/// A primary-button click.
	#[must_use]
	pub fn click() -> Self {
		Self::new("click")
	}

	#[must_use]
	pub fn with_button(mut self, button: i16) -> Self {
		self.button = button;
		self
	}

	#[must_use]
	pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
		self.modifiers = modifiers;
		self
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether the event continues to the target's ancestors.
	#[must_use]
	pub fn bubbles(&self) -> bool {
		bubbles(&self.name)
	}

	#[must_use]
	pub fn target(&self) -> Option<NodeId> {
		self.target.get()
	}

	/// The node whose handler is currently running.
	#[must_use]
	pub fn current_target(&self) -> Option<NodeId> {
		self.current_target.get()
	}

	pub(crate) fn set_target(&self, target: NodeId) {
		self.target.set(Some(target));
	}

	pub(crate) fn set_current_target(&self, current_target: Option<NodeId>) {
		self.current_target.set(current_target);
	}

	pub fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	pub fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}

	#[must_use]
	pub fn propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}
