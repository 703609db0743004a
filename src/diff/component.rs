//! Component expansion.
//!
//! Each component position owns a [`Tree`] (render stack) stored under the output node it produced.
//! A component whose output is another component invocation pushes a frame at the next depth,
//! so nested stateful instances resume from the right frame on later passes.

use super::{
	tables::{Frame, Instance, Tree},
	Renderer, Scope, Settled,
};
use crate::{
	view::{Child, Component, Props, Value, View},
	NodeId,
};
use futures_util::future::FutureExt;
use tracing::{trace, trace_span};

impl Renderer {
	pub(super) fn diff_component(&mut self, dom: Option<NodeId>, view: &View, parent: NodeId, create: bool, scope: Scope<'_>, depth: usize) -> NodeId {
		if let Some(tree) = scope.tree {
			return self.expand(dom, view, parent, create, tree, depth);
		}

		let mut tree = dom
			.filter(|_| !create)
			.and_then(|dom| self.tables.component_state.remove(&dom))
			.unwrap_or_else(|| Tree::new(self.redraw.clone()));
		tree.cursor = 0;
		tree.high_water = 0;
		tree.view = view.clone();

		let node = self.expand(dom, view, parent, create, &mut tree, depth);

		// Frames beyond the deepest level used in this pass belong to components that are gone.
		tree.frames.truncate(tree.high_water);
		tree.home.set(Some(node));
		self.tables.component_state.insert(node, tree);
		node
	}

	fn expand(&mut self, dom: Option<NodeId>, view: &View, parent: NodeId, mut create: bool, tree: &mut Tree, depth: usize) -> NodeId {
		let component = match &view.component {
			Some(component) => component,
			None => return self.dispatch_child(dom, &Child::View(view.clone()), parent, create, Scope::default(), depth),
		};
		let level = tree.cursor;
		tree.high_water = tree.high_water.max(level + 1);

		let span = trace_span!("Expanding component", ?component, level, ?dom);
		let _enter = span.enter();

		let resumed = match tree.frames.get_mut(level) {
			Some(frame) if frame.component.same_kind(component) => {
				frame.component = component.clone();
				!create
			}
			Some(_) => {
				trace!("Component kind changed. Recreating.");
				create = true;
				false
			}
			None => false,
		};

		let props = Props {
			attrs: &view.attrs,
			children: &view.children,
			redraw: &tree.redraw,
		};
		let output = if resumed {
			match &tree.frames[level].instance {
				Instance::Stateless => match component {
					Component::Stateless(render) => render(&props),
					_ => Child::Value(Value::Null),
				},
				Instance::Stateful(render) => render.clone()(&props),
				Instance::Pending(_) => {
					trace!("Still pending.");
					return self.diff_value(dom, &Value::Null, parent, create);
				}
				Instance::Settled(Ok(child)) => child.clone(),
				Instance::Settled(Err(rejection)) => (self.options.on_rejection)(rejection),
			}
		} else {
			tree.frames.truncate(level);
			match component {
				Component::Stateless(render) => {
					let output = render(&props);
					tree.frames.push(Frame { component: component.clone(), instance: Instance::Stateless });
					output
				}
				Component::Stateful(init) => {
					let render = init(&props);
					let output = render(&props);
					tree.frames.push(Frame { component: component.clone(), instance: Instance::Stateful(render) });
					output
				}
				Component::Async(start) => {
					let pending = start(&props);
					let token = self.next_token;
					self.next_token += 1;
					tree.frames.push(Frame { component: component.clone(), instance: Instance::Pending(token) });

					let home = tree.home.clone();
					self.spawn(
						pending
							.map(move |outcome| Settled::Component { home, level, token, outcome })
							.boxed_local(),
					);
					trace!("Mounting placeholder.");
					return self.diff_value(dom, &Value::Null, parent, create);
				}
			}
		};

		let output = output.with_invoker_tag(view.tag.as_ref());
		tree.cursor = level + 1;
		let node = self.dispatch_child(dom, &output, parent, create, Scope { tree: Some(&mut *tree), live: false }, depth + 1);
		tree.cursor = level;
		node
	}
}
