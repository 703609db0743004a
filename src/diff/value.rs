use super::Renderer;
use crate::{dom::NodeKind, view::Value, NodeId};
use std::borrow::Cow;
use tracing::trace_span;

impl Renderer {
	/// Reconciles a primitive value onto a text node, or onto an empty marker for booleans and null.
	///
	/// An existing node of the right kind is kept, and only written to if its data differs.
	pub(super) fn diff_value(&mut self, dom: Option<NodeId>, value: &Value, parent: NodeId, create: bool) -> NodeId {
		let marker = value.is_marker();
		let text = if marker { Cow::Borrowed("") } else { value.to_text() };

		#[cfg(feature = "dangerous-logging")]
		let span = trace_span!("Diffing value", ?dom, text = &*text, marker);
		#[cfg(not(feature = "dangerous-logging"))]
		let span = trace_span!("Diffing value", ?dom, len = text.len(), marker);
		let _enter = span.enter();

		if let Some(dom) = dom.filter(|_| !create) {
			let reusable = match self.document.kind(dom) {
				Some(NodeKind::Text) => !marker,
				Some(NodeKind::Comment) => marker && !self.tables.array_bounds.contains_key(&dom),
				_ => false,
			};
			if reusable {
				self.document.set_text(dom, &text);
				return dom;
			}
		}

		let node = if marker { self.document.create_comment("") } else { self.document.create_text(&text) };
		self.replace(dom, node, parent);
		node
	}

	/// Inserts `node` where `dom` is (or at the end of `parent`) and removes `dom`.
	pub(super) fn replace(&mut self, dom: Option<NodeId>, node: NodeId, parent: NodeId) {
		self.document.insert_before(parent, node, dom);
		if let Some(dom) = dom {
			self.remove(dom);
		}
	}
}
