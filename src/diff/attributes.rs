//! Attribute, event, class and style variable reconciliation of one element.

use super::Renderer;
use crate::{
	router,
	scheduler::Request,
	view::{join_classes, AttrValue, Attrs, Tag, Value, VarValue, View},
	NodeId,
};
use std::rc::Rc;
use tracing::{trace, trace_span, warn};

/// Keys that are never applied generically.
const RESERVED: &[&str] = &["key", "life", "class", "className"];

fn event_name(key: &str) -> Option<&str> {
	key.strip_prefix("on").filter(|name| !name.is_empty())
}

impl Renderer {
	/// Synchronizes `node`'s attributes, listeners, `class` and style variables with `view`.
	///
	/// `life` hooks only run for `fresh` nodes, once everything else is applied.
	pub(super) fn diff_attributes(&mut self, node: NodeId, view: &View, fresh: bool) {
		let span = trace_span!("Diffing attributes", ?node, len = view.attrs.len(), fresh);
		let _enter = span.enter();

		let previous = self.tables.applied.remove(&node).unwrap_or_default();
		let mut changed = false;

		for (key, value) in view.attrs.iter() {
			if RESERVED.contains(&&**key) {
				continue;
			}

			let old = previous.get(key);
			if old == Some(value) {
				continue;
			}
			changed = true;
			if event_name(key).is_some() && old.map_or(false, |old| old.same_kind(value)) {
				trace!("Handler of {:?} changed. Keeping the listener.", key);
				continue;
			}
			self.apply_attribute(node, key, Some(value), &view.attrs);
		}

		for (key, _) in previous.iter() {
			if !view.attrs.contains(key) && !RESERVED.contains(&&**key) {
				changed = true;
				self.apply_attribute(node, key, None, &view.attrs);
			}
		}

		self.diff_class(node, view);
		self.diff_tag_id(node, view);
		if let Some(tag) = &view.tag {
			self.apply_vars(node, tag, fresh);
		}

		if fresh {
			for hook in view.attrs.life() {
				if let Some(teardown) = hook(&mut self.document, node) {
					self.tables.teardowns.entry(node).or_default().push(teardown);
				}
			}
		}

		if changed {
			self.tables.applied.insert(node, view.attrs.clone());
		} else if !previous.is_empty() {
			self.tables.applied.insert(node, previous);
		}
	}

	/// The tag's id applies unless an explicit `id` attribute overrides it.
	fn diff_tag_id(&mut self, node: NodeId, view: &View) {
		if view.attrs.contains("id") {
			self.tables.tag_ids.remove(&node);
			return;
		}
		match view.tag.as_deref().and_then(Tag::element_id) {
			Some(id) => {
				self.document.set_attribute(node, "id", id);
				self.tables.tag_ids.insert(node);
			}
			None => {
				if self.tables.tag_ids.remove(&node) {
					trace!("Tag id went away.");
					self.document.remove_attribute(node, "id");
				}
			}
		}
	}

	/// Applies one attribute. `value` is [`None`] if it was removed.
	fn apply_attribute(&mut self, node: NodeId, key: &str, value: Option<&AttrValue>, attrs: &Attrs) {
		#[cfg(feature = "dangerous-logging")]
		let span = trace_span!("Applying attribute", key, ?value);
		#[cfg(not(feature = "dangerous-logging"))]
		let span = trace_span!("Applying attribute", key, removed = value.is_none());
		let _enter = span.enter();

		if let Some(event) = event_name(key) {
			let handled = attrs.handler(key).is_some() || (event == "click" && self.tables.links.contains_key(&node));
			return self.sync_listener(node, event, handled);
		}

		let null = Value::Null;
		let value = match value {
			Some(AttrValue::Value(value)) => value,
			Some(other) => {
				warn!("Ignoring {:?} for non-event attribute {:?}.", other, key);
				return;
			}
			None => &null,
		};

		if key == "href" {
			return self.apply_href(node, value, attrs);
		}

		if value.is_removal() {
			self.document.remove_attribute(node, key);
			if self.document.property(node, key).is_some() {
				self.document.set_property(node, key, value.clone());
			}
		} else if self.document.has_property(node, key) && !matches!(value, Value::Bool(_)) {
			self.document.set_property(node, key, value.clone());
		} else if let Value::Bool(true) = value {
			self.document.set_attribute(node, key, "");
		} else {
			self.document.set_attribute(node, key, &value.to_text());
		}
	}

	/// Routed links are prefixed and their clicks intercepted, see [`Renderer::dispatch`].
	fn apply_href(&mut self, node: NodeId, value: &Value, attrs: &Attrs) {
		if value.is_removal() {
			self.document.remove_attribute(node, "href");
			self.tables.links.remove(&node);
		} else {
			let href = value.to_text();
			match &self.options.router {
				Some(routing) if router::is_routable(&href) => {
					let path = routing.normalize(&href);
					self.document.set_attribute(node, "href", &format!("{}{}", routing.prefix(), path));
					self.tables.links.insert(node, path.into());
				}
				_ => {
					self.document.set_attribute(node, "href", &href);
					self.tables.links.remove(&node);
				}
			}
		}
		let handled = attrs.handler("onclick").is_some() || self.tables.links.contains_key(&node);
		self.sync_listener(node, "click", handled);
	}

	/// `class` is the explicit attribute followed by the tag's classes. An empty result removes the attribute.
	fn diff_class(&mut self, node: NodeId, view: &View) {
		let explicit = match view.attrs.get("class").or_else(|| view.attrs.get("className")) {
			Some(AttrValue::Value(value)) if !value.is_removal() => value.to_text().into_owned(),
			_ => String::new(),
		};
		let classes = join_classes(&explicit, view.tag.as_ref().map_or("", |tag| tag.classes()));
		if classes.is_empty() {
			self.document.remove_attribute(node, "class");
		} else {
			self.document.set_attribute(node, "class", &classes);
		}
	}

	/// Applies the style variables of `tag` and its parents. Nearer tags bind first, so the innermost binding of a name wins.
	fn apply_vars(&mut self, node: NodeId, tag: &Tag, fresh: bool) {
		let mut resolved: Vec<(&Rc<str>, &VarValue)> = Vec::new();
		for (name, value) in tag.chain().flat_map(Tag::vars) {
			match resolved.iter_mut().find(|(resolved, _)| *resolved == name) {
				Some(binding) => binding.1 = value,
				None => resolved.push((name, value)),
			}
		}

		for (name, value) in resolved {
			let value = match value {
				VarValue::Value(value) => value.clone(),
				VarValue::Computed(compute) => compute(&self.document, node),
				VarValue::Live(live) => {
					if fresh {
						let redraw = self.redraw.clone();
						let subscribed_name = name.clone();
						let subscription = self.subscribe(live, move |value| {
							redraw.push(Request::LiveVar {
								node,
								name: subscribed_name.clone(),
								value,
							});
						});
						self.tables.live_vars.entry(node).or_default().push((name.clone(), subscription));
					}
					live.get()
				}
			};
			self.document.set_style_property(node, name, &value.to_text());
		}
	}
}
