//! View descriptors: the declarative, immutable-per-render input of the reconciler.
//!
//! A [`View`] is either a plain element (it has a [`Tag`] naming the element) or a component invocation (it carries a [`Component`]).
//! Children are [`Child`] values, which additionally cover primitive values, fragments, [`Live`] streams and lazily evaluated children.

use crate::{dom::Document, error::Rejection, event::Event, live::Live, scheduler::LocalRedraw, NodeId};
use core::{
	fmt::{self, Debug, Display, Formatter},
	future::Future,
};
use futures_util::future::{FutureExt, LocalBoxFuture};
use hashbrown::HashMap;
use std::{borrow::Cow, rc::Rc};

/// A primitive child or attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	Text(Rc<str>),
}
impl Value {
	/// Whether this value renders as an empty marker node rather than as text.
	#[must_use]
	pub fn is_marker(&self) -> bool {
		matches!(self, Value::Null | Value::Bool(_))
	}

	/// Falsy, but not zero. Attributes with such a value are removed instead of set.
	#[must_use]
	pub fn is_removal(&self) -> bool {
		match self {
			Value::Null | Value::Bool(false) => true,
			Value::Bool(true) => false,
			Value::Number(n) => n.is_nan(),
			Value::Text(text) => text.is_empty(),
		}
	}

	#[must_use]
	pub fn to_text(&self) -> Cow<'_, str> {
		match self {
			Value::Null => Cow::Borrowed(""),
			Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
			Value::Number(n) => Cow::Owned(format_number(*n)),
			Value::Text(text) => Cow::Borrowed(text),
		}
	}
}
impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_text())
	}
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
	if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
		format!("{}", n as i64)
	} else if n.is_nan() {
		"NaN".to_owned()
	} else if n.is_infinite() {
		if n > 0.0 { "Infinity" } else { "-Infinity" }.to_owned()
	} else {
		n.to_string()
	}
}

impl From<&str> for Value {
	fn from(text: &str) -> Self {
		Value::Text(text.into())
	}
}
impl From<String> for Value {
	fn from(text: String) -> Self {
		Value::Text(text.into())
	}
}
impl From<Rc<str>> for Value {
	fn from(text: Rc<str>) -> Self {
		Value::Text(text)
	}
}
impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}
impl From<f64> for Value {
	fn from(n: f64) -> Self {
		Value::Number(n)
	}
}
impl From<i32> for Value {
	fn from(n: i32) -> Self {
		Value::Number(n.into())
	}
}
impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(value: Option<T>) -> Self {
		value.map_or(Value::Null, Into::into)
	}
}

/// Identity hint for keyed reconciliation. Must be unique among siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
	Int(i64),
	Str(Rc<str>),
}
impl From<i64> for Key {
	fn from(key: i64) -> Self {
		Key::Int(key)
	}
}
impl From<i32> for Key {
	fn from(key: i32) -> Self {
		Key::Int(key.into())
	}
}
impl From<usize> for Key {
	#[allow(clippy::cast_possible_wrap)]
	fn from(key: usize) -> Self {
		Key::Int(key as i64)
	}
}
impl From<&str> for Key {
	fn from(key: &str) -> Self {
		Key::Str(key.into())
	}
}
impl From<String> for Key {
	fn from(key: String) -> Self {
		Key::Str(key.into())
	}
}

pub type Handler = Rc<dyn Fn(&Event)>;

/// Deferred teardown work returned by a teardown callback. Rejections are tolerated.
pub type Settling = LocalBoxFuture<'static, Result<(), Rejection>>;

/// Invoked once when the node is removed. May return [`Settling`] work to defer the node's detachment.
pub type Teardown = Box<dyn FnOnce(&mut Document, NodeId) -> Option<Settling>>;

/// Invoked once when the node is first mounted.
pub type Life = Rc<dyn Fn(&mut Document, NodeId) -> Option<Teardown>>;

#[derive(Clone)]
pub enum AttrValue {
	Value(Value),
	Handler(Handler),
	Life(Vec<Life>),
}
impl AttrValue {
	pub(crate) fn same_kind(&self, other: &AttrValue) -> bool {
		matches!(
			(self, other),
			(AttrValue::Value(_), AttrValue::Value(_)) | (AttrValue::Handler(_), AttrValue::Handler(_)) | (AttrValue::Life(_), AttrValue::Life(_))
		)
	}
}
impl PartialEq for AttrValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(AttrValue::Value(a), AttrValue::Value(b)) => a == b,
			(AttrValue::Handler(a), AttrValue::Handler(b)) => Rc::ptr_eq(a, b),
			(AttrValue::Life(a), AttrValue::Life(b)) => a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Rc::ptr_eq(a, b)),
			_ => false,
		}
	}
}
impl Debug for AttrValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			AttrValue::Value(value) => Debug::fmt(value, f),
			AttrValue::Handler(_) => f.write_str("<handler>"),
			AttrValue::Life(hooks) => write!(f, "<{} life hook(s)>", hooks.len()),
		}
	}
}
impl<T: Into<Value>> From<T> for AttrValue {
	fn from(value: T) -> Self {
		AttrValue::Value(value.into())
	}
}

/// Attribute, event handler and lifecycle hook mapping of one descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attrs(HashMap<Rc<str>, AttrValue>);
impl Attrs {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, name: impl Into<Rc<str>>, value: impl Into<AttrValue>) -> Option<AttrValue> {
		self.0.insert(name.into(), value.into())
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&AttrValue> {
		self.0.get(name)
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(name)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &AttrValue)> {
		self.0.iter()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// The `life` hooks, or none.
	#[must_use]
	pub fn life(&self) -> &[Life] {
		match self.0.get("life") {
			Some(AttrValue::Life(hooks)) => hooks,
			_ => &[],
		}
	}

	pub(crate) fn handler(&self, name: &str) -> Option<&Handler> {
		match self.0.get(name) {
			Some(AttrValue::Handler(handler)) => Some(handler),
			_ => None,
		}
	}
}

/// A CSS custom property value.
#[derive(Clone)]
pub enum VarValue {
	Value(Value),
	/// Subscribed once on mount; every emission is written to the node.
	Live(Live<Value>),
	/// Computed against the node on every pass.
	Computed(Rc<dyn Fn(&Document, NodeId) -> Value>),
}
impl Debug for VarValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			VarValue::Value(value) => Debug::fmt(value, f),
			VarValue::Live(live) => f.debug_tuple("Live").field(&live.get()).finish(),
			VarValue::Computed(_) => f.write_str("<computed>"),
		}
	}
}
impl<T: Into<Value>> From<T> for VarValue {
	fn from(value: T) -> Self {
		VarValue::Value(value.into())
	}
}
impl From<Live<Value>> for VarValue {
	fn from(live: Live<Value>) -> Self {
		VarValue::Live(live)
	}
}

/// Element identity and styling information.
///
/// `parent` forms a chain that collects the style variables contributed by nested component wrapping.
#[derive(Clone, Debug)]
pub struct Tag {
	name: Option<Rc<str>>,
	id: Option<Rc<str>>,
	classes: Rc<str>,
	args: Vec<Value>,
	vars: Vec<(Rc<str>, VarValue)>,
	parent: Option<Rc<Tag>>,
}
impl Default for Tag {
	fn default() -> Self {
		Self {
			name: None,
			id: None,
			classes: "".into(),
			args: Vec::new(),
			vars: Vec::new(),
			parent: None,
		}
	}
}
impl Tag {
	#[must_use]
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		Self { name: Some(name.into()), ..Self::default() }
	}

	/// A tag without element name, as used to style a component invocation.
	#[must_use]
	pub fn anonymous() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn id(mut self, id: impl Into<Rc<str>>) -> Self {
		self.id = Some(id.into());
		self
	}

	#[must_use]
	pub fn class(mut self, class: &str) -> Self {
		self.classes = join_classes(&self.classes, class).into();
		self
	}

	#[must_use]
	pub fn arg(mut self, arg: impl Into<Value>) -> Self {
		self.args.push(arg.into());
		self
	}

	/// Binds a CSS custom property. A later binding of the same name replaces the earlier one.
	#[must_use]
	pub fn var(mut self, name: impl Into<Rc<str>>, value: impl Into<VarValue>) -> Self {
		let name = name.into();
		let value = value.into();
		match self.vars.iter_mut().find(|(n, _)| *n == name) {
			Some(slot) => slot.1 = value,
			None => self.vars.push((name, value)),
		}
		self
	}

	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	#[must_use]
	pub fn element_id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	#[must_use]
	pub fn classes(&self) -> &str {
		&self.classes
	}

	#[must_use]
	pub fn args(&self) -> &[Value] {
		&self.args
	}

	#[must_use]
	pub fn vars(&self) -> &[(Rc<str>, VarValue)] {
		&self.vars
	}

	#[must_use]
	pub fn parent(&self) -> Option<&Rc<Tag>> {
		self.parent.as_ref()
	}

	/// This tag followed by its `parent` chain.
	pub fn chain(&self) -> impl Iterator<Item = &Tag> {
		let mut next = Some(self);
		core::iter::from_fn(move || {
			let current = next?;
			next = current.parent.as_deref();
			Some(current)
		})
	}

	/// Merges the tag of a component's own output (`inner`) with the tag of the invocation that produced it.
	///
	/// Name and id prefer the invoker's. Classes are concatenated, inner first.
	/// Args and vars are the invoker's, while `parent` links the inner tag so its variables are still applied after the invoker's.
	#[must_use]
	pub fn merge(inner: &Rc<Tag>, invoker: &Rc<Tag>) -> Rc<Tag> {
		Rc::new(Tag {
			name: invoker.name.clone().or_else(|| inner.name.clone()),
			id: invoker.id.clone().or_else(|| inner.id.clone()),
			classes: join_classes(&inner.classes, &invoker.classes).into(),
			args: invoker.args.clone(),
			vars: invoker.vars.clone(),
			parent: Some(inner.clone()),
		})
	}
}

pub(crate) fn join_classes(a: &str, b: &str) -> String {
	match (a.trim(), b.trim()) {
		("", b) => b.to_owned(),
		(a, "") => a.to_owned(),
		(a, b) => format!("{} {}", a, b),
	}
}

/// Arguments of one component invocation.
pub struct Props<'a> {
	pub attrs: &'a Attrs,
	pub children: &'a [Child],
	/// Re-runs the diff rooted at this component's current node.
	pub redraw: &'a LocalRedraw,
}
impl Props<'_> {
	#[must_use]
	pub fn life(&self) -> &[Life] {
		self.attrs.life()
	}
}

/// The render function of a stateful component instance.
pub type Render = Rc<dyn Fn(&Props<'_>) -> Child>;

pub type Pending = LocalBoxFuture<'static, Result<Child, Rejection>>;

/// A producer of further view trees.
#[derive(Clone)]
pub enum Component {
	/// Invoked on every pass.
	Stateless(Rc<dyn Fn(&Props<'_>) -> Child>),
	/// Invoked once per instance to create its [`Render`] function, which is then invoked on every pass.
	Stateful(Rc<dyn Fn(&Props<'_>) -> Render>),
	/// Invoked once per instance. A placeholder is shown until the returned future settles.
	Async(Rc<dyn Fn(&Props<'_>) -> Pending>),
}
impl Component {
	pub fn stateless(render: impl Fn(&Props<'_>) -> Child + 'static) -> Self {
		Component::Stateless(Rc::new(render))
	}

	pub fn stateful<R>(init: impl Fn(&Props<'_>) -> R + 'static) -> Self
	where
		R: Fn(&Props<'_>) -> Child + 'static,
	{
		Component::Stateful(Rc::new(move |props: &Props<'_>| Rc::new(init(props)) as Render))
	}

	pub fn future<F>(start: impl Fn(&Props<'_>) -> F + 'static) -> Self
	where
		F: Future<Output = Result<Child, Rejection>> + 'static,
	{
		Component::Async(Rc::new(move |props: &Props<'_>| start(props).boxed_local()))
	}

	fn identity(&self) -> *const () {
		match self {
			Component::Stateless(f) => Rc::as_ptr(f).cast(),
			Component::Stateful(f) => Rc::as_ptr(f).cast(),
			Component::Async(f) => Rc::as_ptr(f).cast(),
		}
	}

	/// Whether an instance created by `self` can be resumed for `other`.
	///
	/// Producers are matched by kind only, so a component constructed anew on every pass keeps its instance.
	pub(crate) fn same_kind(&self, other: &Component) -> bool {
		matches!(
			(self, other),
			(Component::Stateless(_), Component::Stateless(_)) | (Component::Stateful(_), Component::Stateful(_)) | (Component::Async(_), Component::Async(_))
		)
	}
}
impl Debug for Component {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let kind = match self {
			Component::Stateless(_) => "Stateless",
			Component::Stateful(_) => "Stateful",
			Component::Async(_) => "Async",
		};
		write!(f, "{}({:p})", kind, self.identity())
	}
}

/// A declarative description of an element or component invocation.
#[derive(Clone, Debug, Default)]
pub struct View {
	pub(crate) tag: Option<Rc<Tag>>,
	pub(crate) attrs: Attrs,
	pub(crate) children: Vec<Child>,
	pub(crate) key: Option<Key>,
	pub(crate) component: Option<Component>,
}
impl View {
	/// A plain element.
	#[must_use]
	pub fn new(name: impl Into<Rc<str>>) -> Self {
		Self::tagged(Tag::new(name))
	}

	#[must_use]
	pub fn tagged(tag: Tag) -> Self {
		Self { tag: Some(Rc::new(tag)), ..Self::default() }
	}

	/// A component invocation.
	#[must_use]
	pub fn of(component: Component) -> Self {
		Self { component: Some(component), ..Self::default() }
	}

	/// Sets the tag, for example to style a component invocation.
	#[must_use]
	pub fn with_tag(mut self, tag: Tag) -> Self {
		self.tag = Some(Rc::new(tag));
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<Rc<str>>, value: impl Into<AttrValue>) -> Self {
		self.attrs.insert(name, value);
		self
	}

	#[must_use]
	pub fn class(self, class: impl Into<Value>) -> Self {
		self.attr("class", class.into())
	}

	/// Binds `handler` to the event `name`, e.g. `"click"`.
	#[must_use]
	pub fn on(self, name: &str, handler: impl Fn(&Event) + 'static) -> Self {
		self.attr(format!("on{}", name), AttrValue::Handler(Rc::new(handler)))
	}

	/// Adds a lifecycle hook, invoked once when the node is first mounted.
	#[must_use]
	pub fn life(mut self, hook: impl Fn(&mut Document, NodeId) -> Option<Teardown> + 'static) -> Self {
		let hook: Life = Rc::new(hook);
		match self.attrs.0.get_mut("life") {
			Some(AttrValue::Life(hooks)) => hooks.push(hook),
			_ => {
				self.attrs.insert("life", AttrValue::Life(vec![hook]));
			}
		}
		self
	}

	#[must_use]
	pub fn key(mut self, key: impl Into<Key>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<Child>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn children<C: Into<Child>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
		self.children.extend(children.into_iter().map(Into::into));
		self
	}

	#[must_use]
	pub fn get_tag(&self) -> Option<&Rc<Tag>> {
		self.tag.as_ref()
	}

	#[must_use]
	pub fn get_attrs(&self) -> &Attrs {
		&self.attrs
	}

	#[must_use]
	pub fn get_children(&self) -> &[Child] {
		&self.children
	}

	#[must_use]
	pub fn get_key(&self) -> Option<&Key> {
		self.key.as_ref()
	}

	#[must_use]
	pub fn get_component(&self) -> Option<&Component> {
		self.component.as_ref()
	}

	pub(crate) fn element_name(&self) -> &str {
		self.tag.as_ref().and_then(|tag| tag.name()).unwrap_or("div")
	}
}

/// One entry of a child list.
#[derive(Clone)]
pub enum Child {
	Value(Value),
	View(View),
	Fragment(Vec<Child>),
	Live(Live<Child>),
	Lazy(Rc<dyn Fn() -> Child>),
}
impl Child {
	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			Child::View(view) => view.key.as_ref(),
			_ => None,
		}
	}

	pub fn lazy(f: impl Fn() -> Child + 'static) -> Self {
		Child::Lazy(Rc::new(f))
	}

	/// Merges `invoker`'s tag into this component output, if it is a view.
	pub(crate) fn with_invoker_tag(self, invoker: Option<&Rc<Tag>>) -> Self {
		match (self, invoker) {
			(Child::View(mut view), Some(invoker)) => {
				view.tag = Some(match &view.tag {
					Some(inner) => Tag::merge(inner, invoker),
					None => invoker.clone(),
				});
				Child::View(view)
			}
			(child, _) => child,
		}
	}
}
impl Debug for Child {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Child::Value(value) => Debug::fmt(value, f),
			Child::View(view) => Debug::fmt(view, f),
			Child::Fragment(children) => f.debug_list().entries(children).finish(),
			Child::Live(live) => f.debug_tuple("Live").field(&live.get()).finish(),
			Child::Lazy(_) => f.write_str("<lazy>"),
		}
	}
}
impl From<View> for Child {
	fn from(view: View) -> Self {
		Child::View(view)
	}
}
impl From<Value> for Child {
	fn from(value: Value) -> Self {
		Child::Value(value)
	}
}
impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Value(text.into())
	}
}
impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Value(text.into())
	}
}
impl From<f64> for Child {
	fn from(n: f64) -> Self {
		Child::Value(n.into())
	}
}
impl From<i32> for Child {
	fn from(n: i32) -> Self {
		Child::Value(n.into())
	}
}
impl From<bool> for Child {
	fn from(b: bool) -> Self {
		Child::Value(b.into())
	}
}
impl From<Vec<Child>> for Child {
	fn from(children: Vec<Child>) -> Self {
		Child::Fragment(children)
	}
}
impl From<Live<Child>> for Child {
	fn from(live: Live<Child>) -> Self {
		Child::Live(live)
	}
}
impl<T: Into<Child>> From<Option<T>> for Child {
	fn from(child: Option<T>) -> Self {
		child.map_or(Child::Value(Value::Null), Into::into)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numbers_render_like_text() {
		assert_eq!(Value::Number(1.0).to_text(), "1");
		assert_eq!(Value::Number(-2.5).to_text(), "-2.5");
		assert_eq!(Value::Number(f64::NAN).to_text(), "NaN");
	}

	#[test]
	fn removal_values_are_falsy_but_not_zero() {
		assert!(Value::Null.is_removal());
		assert!(Value::Bool(false).is_removal());
		assert!(Value::from("").is_removal());
		assert!(!Value::Number(0.0).is_removal());
		assert!(!Value::Bool(true).is_removal());
	}

	#[test]
	fn merge_keeps_both_tags_in_chain() {
		let inner = Rc::new(Tag::new("button").class("inner").var("--a", 1));
		let invoker = Rc::new(Tag::anonymous().id("go").class("outer").var("--b", 2));
		let merged = Tag::merge(&inner, &invoker);

		assert_eq!(merged.name(), Some("button"));
		assert_eq!(merged.element_id(), Some("go"));
		assert_eq!(merged.classes(), "inner outer");
		let names: Vec<_> = merged.chain().flat_map(|tag| tag.vars().iter().map(|(name, _)| name.to_string())).collect();
		assert_eq!(names, ["--b", "--a"]);
	}

	#[test]
	fn invoker_name_wins() {
		let inner = Rc::new(Tag::new("div"));
		let invoker = Rc::new(Tag::new("section"));
		assert_eq!(Tag::merge(&inner, &invoker).name(), Some("section"));
	}

	#[test]
	fn later_var_replaces_earlier() {
		let tag = Tag::anonymous().var("--x", 1).var("--x", 2);
		assert_eq!(tag.vars().len(), 1);
		assert!(matches!(tag.vars()[0].1, VarValue::Value(Value::Number(n)) if n == 2.0));
	}
}
