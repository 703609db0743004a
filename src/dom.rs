//! The live output tree: a DOM-like arena of element, text, comment and fragment nodes.
//!
//! Nodes are addressed by generational [`NodeId`]s. Freed slots are reused with a bumped generation,
//! so a stale id is detectably dead instead of silently aliasing a newer node.

use crate::view::Value;
use core::fmt::{self, Debug, Formatter, Write};
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{error, trace};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
	index: u32,
	generation: u32,
}
impl Debug for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "#{}v{}", self.index, self.generation)
	}
}

/// Names that are assigned as properties rather than attributes when the value isn't boolean.
const PROPERTIES: &[&str] = &["value", "checked", "selected", "indeterminate", "scrollTop", "scrollLeft"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	Fragment,
}

#[derive(Debug)]
enum Content {
	Element(Element),
	Text(String),
	Comment(String),
	Fragment,
}

#[derive(Debug)]
struct Element {
	name: Rc<str>,
	attributes: Vec<(Rc<str>, String)>,
	properties: HashMap<Rc<str>, Value>,
	style: Vec<(Rc<str>, String)>,
	listeners: HashSet<Rc<str>>,
}

#[derive(Debug)]
struct Node {
	content: Content,
	parent: Option<NodeId>,
	first_child: Option<NodeId>,
	last_child: Option<NodeId>,
	previous_sibling: Option<NodeId>,
	next_sibling: Option<NodeId>,
	/// Whether the node has been inserted below a non-fragment parent before.
	placed: bool,
}

#[derive(Debug)]
struct Slot {
	generation: u32,
	node: Option<Node>,
}

/// Counts of effective mutations, for observing churn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MutationStats {
	/// Nodes allocated, not counting transient fragments.
	pub created: usize,
	pub inserted: usize,
	pub moved: usize,
	pub detached: usize,
	pub text_writes: usize,
	pub attribute_writes: usize,
	pub property_writes: usize,
	pub style_writes: usize,
	pub listener_writes: usize,
}
impl MutationStats {
	/// Every counted mutation.
	#[must_use]
	pub fn total(&self) -> usize {
		self.created + self.inserted + self.moved + self.detached + self.text_writes + self.attribute_writes + self.property_writes + self.style_writes + self.listener_writes
	}
}

#[derive(Debug)]
pub struct Document {
	slots: Vec<Slot>,
	free: Vec<u32>,
	body: NodeId,
	stats: MutationStats,
}
impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}
impl Document {
	/// Creates a document with an empty `body` element.
	#[must_use]
	pub fn new() -> Self {
		let mut document = Self {
			slots: Vec::new(),
			free: Vec::new(),
			body: NodeId { index: 0, generation: 0 },
			stats: MutationStats::default(),
		};
		document.body = document.create_element("body");
		document.stats = MutationStats::default();
		document
	}

	#[must_use]
	pub fn body(&self) -> NodeId {
		self.body
	}

	#[must_use]
	pub fn stats(&self) -> MutationStats {
		self.stats
	}

	pub fn reset_stats(&mut self) {
		self.stats = MutationStats::default();
	}

	/// Whether `node` refers to a live (not freed) node.
	#[must_use]
	pub fn contains(&self, node: NodeId) -> bool {
		self.get(node).is_some()
	}

	fn get(&self, node: NodeId) -> Option<&Node> {
		let slot = self.slots.get(node.index as usize)?;
		if slot.generation == node.generation {
			slot.node.as_ref()
		} else {
			None
		}
	}

	fn get_mut(&mut self, node: NodeId) -> Option<&mut Node> {
		let slot = self.slots.get_mut(node.index as usize)?;
		if slot.generation == node.generation {
			slot.node.as_mut()
		} else {
			None
		}
	}

	fn element(&self, node: NodeId) -> Option<&Element> {
		match &self.get(node)?.content {
			Content::Element(element) => Some(element),
			_ => None,
		}
	}

	fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
		match &mut self.get_mut(node)?.content {
			Content::Element(element) => Some(element),
			_ => None,
		}
	}

	#[allow(clippy::cast_possible_truncation)]
	fn allocate(&mut self, content: Content) -> NodeId {
		if !matches!(content, Content::Fragment) {
			self.stats.created += 1;
		}
		let node = Node {
			content,
			parent: None,
			first_child: None,
			last_child: None,
			previous_sibling: None,
			next_sibling: None,
			placed: false,
		};
		match self.free.pop() {
			Some(index) => {
				let slot = &mut self.slots[index as usize];
				slot.node = Some(node);
				NodeId { index, generation: slot.generation }
			}
			None => {
				self.slots.push(Slot { generation: 0, node: Some(node) });
				NodeId { index: (self.slots.len() - 1) as u32, generation: 0 }
			}
		}
	}

	pub fn create_element(&mut self, name: &str) -> NodeId {
		self.allocate(Content::Element(Element {
			name: name.into(),
			attributes: Vec::new(),
			properties: HashMap::new(),
			style: Vec::new(),
			listeners: HashSet::new(),
		}))
	}

	pub fn create_text(&mut self, text: &str) -> NodeId {
		self.allocate(Content::Text(text.to_owned()))
	}

	pub fn create_comment(&mut self, data: &str) -> NodeId {
		self.allocate(Content::Comment(data.to_owned()))
	}

	/// A detached container. Inserting it splices its children instead.
	pub fn create_fragment(&mut self) -> NodeId {
		self.allocate(Content::Fragment)
	}

	#[must_use]
	pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
		Some(match self.get(node)?.content {
			Content::Element(_) => NodeKind::Element,
			Content::Text(_) => NodeKind::Text,
			Content::Comment(_) => NodeKind::Comment,
			Content::Fragment => NodeKind::Fragment,
		})
	}

	#[must_use]
	pub fn is_element(&self, node: NodeId) -> bool {
		self.kind(node) == Some(NodeKind::Element)
	}

	#[must_use]
	pub fn tag_name(&self, node: NodeId) -> Option<&str> {
		self.element(node).map(|element| &*element.name)
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.parent
	}

	#[must_use]
	pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.first_child
	}

	#[must_use]
	pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.last_child
	}

	#[must_use]
	pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.next_sibling
	}

	#[must_use]
	pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.previous_sibling
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		let mut children = Vec::new();
		let mut next = self.first_child(node);
		while let Some(child) = next {
			children.push(child);
			next = self.next_sibling(child);
		}
		children
	}

	/// `node` and all its descendants, parents first.
	#[must_use]
	pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
		let mut nodes = vec![node];
		let mut i = 0;
		while i < nodes.len() {
			let children = self.children(nodes[i]);
			nodes.extend(children);
			i += 1;
		}
		nodes
	}

	fn unlink(&mut self, node: NodeId) -> Option<NodeId> {
		let (parent, previous, next) = {
			let data = self.get_mut(node)?;
			let parent = data.parent.take()?;
			(parent, data.previous_sibling.take(), data.next_sibling.take())
		};
		match previous {
			Some(previous) => self.get_mut(previous)?.next_sibling = next,
			None => self.get_mut(parent)?.first_child = next,
		}
		match next {
			Some(next) => self.get_mut(next)?.previous_sibling = previous,
			None => self.get_mut(parent)?.last_child = previous,
		}
		Some(parent)
	}

	fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
		let previous = match reference {
			Some(reference) => self.previous_sibling(reference),
			None => self.last_child(parent),
		};
		if let Some(data) = self.get_mut(child) {
			data.parent = Some(parent);
			data.previous_sibling = previous;
			data.next_sibling = reference;
		}
		match previous {
			Some(previous) => {
				if let Some(data) = self.get_mut(previous) {
					data.next_sibling = Some(child);
				}
			}
			None => {
				if let Some(data) = self.get_mut(parent) {
					data.first_child = Some(child);
				}
			}
		}
		match reference {
			Some(reference) => {
				if let Some(data) = self.get_mut(reference) {
					data.previous_sibling = Some(child);
				}
			}
			None => {
				if let Some(data) = self.get_mut(parent) {
					data.last_child = Some(child);
				}
			}
		}
	}

	/// Inserts `child` into `parent` before `reference`, or at the end.
	///
	/// `child` is first detached from wherever it is. A fragment `child` moves its children instead of itself.
	pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
		if reference == Some(child) {
			return;
		}
		if reference.is_some() && reference.and_then(|r| self.parent(r)) != Some(parent) {
			return error!("Reference {:?} is not a child of {:?}. Not inserting {:?}.", reference, parent, child);
		}
		match self.kind(child) {
			None => return error!("Tried to insert dead node {:?}.", child),
			Some(NodeKind::Fragment) => {
				for grandchild in self.children(child) {
					self.insert_before(parent, grandchild, reference);
				}
				return;
			}
			Some(_) => (),
		}
		let placing = self.kind(parent) != Some(NodeKind::Fragment);
		self.unlink(child);
		self.link(parent, child, reference);
		if placing {
			if let Some(data) = self.get_mut(child) {
				if data.placed {
					self.stats.moved += 1;
				} else {
					data.placed = true;
					self.stats.inserted += 1;
				}
			}
		}
	}

	pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
		self.insert_before(parent, child, None);
	}

	/// Removes `node` from its parent, keeping it alive.
	pub fn detach(&mut self, node: NodeId) {
		if let Some(parent) = self.unlink(node) {
			if self.kind(parent) != Some(NodeKind::Fragment) {
				self.stats.detached += 1;
			}
		}
	}

	/// Detaches `node` and frees it together with its subtree.
	pub fn free(&mut self, node: NodeId) {
		self.detach(node);
		for freed in self.subtree(node) {
			if let Some(slot) = self.slots.get_mut(freed.index as usize) {
				slot.node = None;
				slot.generation = slot.generation.wrapping_add(1);
				self.free.push(freed.index);
			}
		}
		trace!("Freed {:?}.", node);
	}

	/// Text or comment data.
	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.content {
			Content::Text(text) | Content::Comment(text) => Some(text),
			_ => None,
		}
	}

	/// Writes text or comment data, if it differs.
	pub fn set_text(&mut self, node: NodeId, data: &str) {
		let changed = match self.get_mut(node).map(|node| &mut node.content) {
			Some(Content::Text(text) | Content::Comment(text)) => {
				if text == data {
					false
				} else {
					data.clone_into(text);
					true
				}
			}
			_ => return error!("Tried to set text of non-character node {:?}.", node),
		};
		if changed {
			self.stats.text_writes += 1;
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		let element = self.element(node)?;
		element.attributes.iter().find(|(n, _)| &**n == name).map(|(_, value)| value.as_str())
	}

	#[must_use]
	pub fn attributes(&self, node: NodeId) -> Vec<(&str, &str)> {
		self.element(node)
			.map(|element| element.attributes.iter().map(|(name, value)| (&**name, value.as_str())).collect())
			.unwrap_or_default()
	}

	pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
		let element = match self.element_mut(node) {
			Some(element) => element,
			None => return error!("Tried to set attribute {:?} on non-element {:?}.", name, node),
		};
		match element.attributes.iter_mut().find(|(n, _)| &**n == name) {
			Some((_, existing)) if existing == value => return,
			Some((_, existing)) => value.clone_into(existing),
			None => element.attributes.push((name.into(), value.to_owned())),
		}
		self.stats.attribute_writes += 1;
	}

	pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> bool {
		let removed = match self.element_mut(node) {
			Some(element) => {
				let len = element.attributes.len();
				element.attributes.retain(|(n, _)| &**n != name);
				element.attributes.len() != len
			}
			None => false,
		};
		if removed {
			self.stats.attribute_writes += 1;
		}
		removed
	}

	/// Whether `name` is a settable property of `node`.
	#[must_use]
	pub fn has_property(&self, node: NodeId, name: &str) -> bool {
		self.is_element(node) && PROPERTIES.contains(&name)
	}

	#[must_use]
	pub fn property(&self, node: NodeId, name: &str) -> Option<&Value> {
		self.element(node)?.properties.get(name)
	}

	pub fn set_property(&mut self, node: NodeId, name: &str, value: Value) {
		let element = match self.element_mut(node) {
			Some(element) => element,
			None => return error!("Tried to set property {:?} on non-element {:?}.", name, node),
		};
		if element.properties.get(name) == Some(&value) {
			return;
		}
		element.properties.insert(name.into(), value);
		self.stats.property_writes += 1;
	}

	#[must_use]
	pub fn style_property(&self, node: NodeId, name: &str) -> Option<&str> {
		let element = self.element(node)?;
		element.style.iter().find(|(n, _)| &**n == name).map(|(_, value)| value.as_str())
	}

	/// Sets a (custom) style property, if it differs.
	pub fn set_style_property(&mut self, node: NodeId, name: &str, value: &str) {
		let element = match self.element_mut(node) {
			Some(element) => element,
			None => return error!("Tried to set style {:?} on non-element {:?}.", name, node),
		};
		match element.style.iter_mut().find(|(n, _)| &**n == name) {
			Some((_, existing)) if existing == value => return,
			Some((_, existing)) => value.clone_into(existing),
			None => element.style.push((name.into(), value.to_owned())),
		}
		self.stats.style_writes += 1;
	}

	/// Returns whether a native listener for `event` was newly added.
	pub fn add_event_listener(&mut self, node: NodeId, event: &str) -> bool {
		let added = self.element_mut(node).map_or(false, |element| element.listeners.insert(event.into()));
		if added {
			self.stats.listener_writes += 1;
		}
		added
	}

	/// Returns whether a native listener for `event` was present.
	pub fn remove_event_listener(&mut self, node: NodeId, event: &str) -> bool {
		let removed = self.element_mut(node).map_or(false, |element| element.listeners.remove(event));
		if removed {
			self.stats.listener_writes += 1;
		}
		removed
	}

	#[must_use]
	pub fn has_listener(&self, node: NodeId, event: &str) -> bool {
		self.element(node).map_or(false, |element| element.listeners.contains(event))
	}

	#[must_use]
	pub fn listeners(&self, node: NodeId) -> Vec<Rc<str>> {
		self.element(node).map(|element| element.listeners.iter().cloned().collect()).unwrap_or_default()
	}

	/// Serializes `node` and its subtree.
	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_html(node, &mut html);
		html
	}

	/// Serializes the children of `node`.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		for child in self.children(node) {
			self.write_html(child, &mut html);
		}
		html
	}

	fn write_html(&self, node: NodeId, html: &mut String) {
		let data = match self.get(node) {
			Some(data) => data,
			None => return,
		};
		match &data.content {
			Content::Element(element) => {
				html.push('<');
				html.push_str(&element.name);
				for (name, value) in &element.attributes {
					let _ = write!(html, " {}=\"{}\"", name, escape(value, true));
				}
				if !element.style.is_empty() && !element.attributes.iter().any(|(name, _)| &**name == "style") {
					html.push_str(" style=\"");
					for (i, (name, value)) in element.style.iter().enumerate() {
						if i > 0 {
							html.push(' ');
						}
						let _ = write!(html, "{}: {};", name, escape(value, true));
					}
					html.push('"');
				}
				html.push('>');
				for child in self.children(node) {
					self.write_html(child, html);
				}
				let _ = write!(html, "</{}>", element.name);
			}
			Content::Text(text) => html.push_str(&escape(text, false)),
			Content::Comment(data) => {
				let _ = write!(html, "<!--{}-->", data);
			}
			Content::Fragment => {
				for child in self.children(node) {
					self.write_html(child, html);
				}
			}
		}
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' if attribute => escaped.push_str("&quot;"),
			c => escaped.push(c),
		}
	}
	escaped
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_move_detach() {
		let mut document = Document::new();
		let body = document.body();
		let a = document.create_text("a");
		let b = document.create_text("b");
		document.append_child(body, a);
		document.append_child(body, b);
		assert_eq!(document.inner_html(body), "ab");

		document.insert_before(body, b, Some(a));
		assert_eq!(document.inner_html(body), "ba");
		assert_eq!(document.stats().moved, 1);
		assert_eq!(document.stats().inserted, 2);

		document.detach(b);
		assert_eq!(document.inner_html(body), "a");
		assert!(document.contains(b));
	}

	#[test]
	fn fragments_splice_their_children() {
		let mut document = Document::new();
		let body = document.body();
		let tail = document.create_comment("");
		document.append_child(body, tail);

		let fragment = document.create_fragment();
		let x = document.create_element("i");
		let y = document.create_text("y");
		document.append_child(fragment, x);
		document.append_child(fragment, y);
		document.insert_before(body, fragment, Some(tail));

		assert_eq!(document.inner_html(body), "<i></i>y<!---->");
		assert_eq!(document.first_child(fragment), None);
		assert_eq!(document.stats().moved, 0);
	}

	#[test]
	fn freed_ids_are_dead() {
		let mut document = Document::new();
		let body = document.body();
		let div = document.create_element("div");
		let text = document.create_text("t");
		document.append_child(body, div);
		document.append_child(div, text);
		document.free(div);

		assert!(!document.contains(div));
		assert!(!document.contains(text));
		let reused = document.create_text("new");
		assert_ne!(reused, div);
		assert_ne!(reused, text);
		assert_eq!(document.text(text), None);
	}

	#[test]
	fn identical_writes_are_not_counted() {
		let mut document = Document::new();
		let div = document.create_element("div");
		document.reset_stats();

		document.set_attribute(div, "id", "x");
		document.set_attribute(div, "id", "x");
		document.set_style_property(div, "--a", "1");
		document.set_style_property(div, "--a", "1");
		assert_eq!(document.stats().total(), 2);
		assert_eq!(document.outer_html(div), "<div id=\"x\" style=\"--a: 1;\"></div>");
	}
}
