use super::Renderer;
use crate::{
	view::{Child, View},
	NodeId,
};
use tracing::{trace, trace_span};

impl Renderer {
	/// Reconciles one plain element.
	///
	/// The previous node is reused unless its tag name differs or `create` is set.
	/// Attributes are applied after the children, so `life` hooks see the finished subtree.
	pub(super) fn diff_element(&mut self, dom: Option<NodeId>, view: &View, parent: NodeId, create: bool, depth: usize) -> NodeId {
		let name = view.element_name();
		let span = trace_span!("Diffing element", ?dom, tag = name, create);
		let _enter = span.enter();

		let reused = dom.filter(|&dom| !create && self.document.tag_name(dom) == Some(name) && !self.tables.removing.contains_key(&dom));
		let (node, fresh) = match reused {
			Some(node) => (node, false),
			None => {
				trace!("Creating <{}>.", name);
				let node = self.document.create_element(name);
				self.document.insert_before(parent, node, dom);
				(node, true)
			}
		};

		match view.children.as_slice() {
			[Child::Value(value)] if fresh && !value.is_marker() => {
				let text = self.document.create_text(&value.to_text());
				self.document.append_child(node, text);
			}
			children => {
				let first = self.skip_removing(self.document.first_child(node));
				self.update_children(node, node, first, children, None, depth + 1);
			}
		}

		self.diff_attributes(node, view, fresh);

		if let Some(dom) = dom.filter(|_| fresh) {
			self.remove(dom);
		}
		node
	}

	/// Reconciles a nested child list, delimited by a boundary marker that records its length.
	pub(super) fn diff_fragment(&mut self, dom: Option<NodeId>, children: &[Child], parent: NodeId, create: bool, depth: usize) -> NodeId {
		let span = trace_span!("Diffing fragment", ?dom, len = children.len(), create);
		let _enter = span.enter();

		let (marker, len) = match dom.filter(|_| !create).and_then(|dom| self.tables.array_bounds.get(&dom).map(|&len| (dom, len))) {
			Some(existing) => existing,
			None => {
				let marker = self.document.create_comment("[0");
				self.document.insert_before(parent, marker, dom);
				self.tables.array_bounds.insert(marker, 0);
				(marker, 0)
			}
		};

		let first = self.skip_removing(self.document.next_sibling(marker));
		self.update_children(marker, parent, first, children, Some(len), depth + 1);
		self.tables.array_bounds.insert(marker, children.len());
		self.document.set_text(marker, &format!("[{}", children.len()));

		if let Some(dom) = dom.filter(|&dom| dom != marker) {
			self.remove(dom);
		}
		marker
	}
}
