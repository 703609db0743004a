use futures_channel::oneshot;
use futures_util::FutureExt;
use phloem::{
	view::{AttrValue, Teardown},
	Child, Component, LocalRedraw, ManualFrames, NodeId, Options, Props, Rejection, Renderer, Tag, Value, View,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

fn setup(options: Options, view: impl FnMut() -> Child + 'static) -> (Rc<ManualFrames>, Renderer, NodeId) {
	let host = Rc::new(ManualFrames::new());
	let mut renderer = Renderer::with_options(host.clone(), options);
	let body = renderer.document().body();
	renderer.mount(body, view).unwrap();
	(host, renderer, body)
}

type Outcome = Result<Child, Rejection>;

/// An async component that waits for the returned sender.
fn deferred() -> (Component, oneshot::Sender<Outcome>) {
	let (tx, rx) = oneshot::channel::<Outcome>();
	let rx = RefCell::new(Some(rx));
	let component = Component::future(move |_: &Props<'_>| {
		rx.borrow_mut()
			.take()
			.unwrap()
			.map(|received| received.unwrap_or_else(|_| Err(Rejection::new("canceled"))))
	});
	(component, tx)
}

#[test]
fn async_component_shows_placeholder_until_settled() {
	let (component, tx) = deferred();
	let (host, mut renderer, body) = setup(Options::default(), move || View::of(component.clone()).into());
	assert_eq!(renderer.document().inner_html(body), "<!---->");
	assert_eq!(renderer.poll(), 0);
	assert_eq!(renderer.pending_tasks(), 1);

	tx.send(Ok(View::new("p").child("loaded").into())).unwrap();
	assert_eq!(renderer.poll(), 1);
	assert_eq!(host.requested(), 1);
	assert_eq!(renderer.document().inner_html(body), "<!---->");

	renderer.frame();
	assert_eq!(renderer.document().inner_html(body), "<p>loaded</p>");

	renderer.render();
	assert_eq!(renderer.document().inner_html(body), "<p>loaded</p>");
	assert_eq!(renderer.pending_tasks(), 0);
}

#[test]
fn superseded_async_component_is_ignored() {
	let (first, first_tx) = deferred();
	let (second, second_tx) = deferred();
	let current = Rc::new(RefCell::new(Some(first)));
	let (host, mut renderer, body) = setup(Options::default(), {
		let current = current.clone();
		move || match &*current.borrow() {
			Some(component) => View::of(component.clone()).into(),
			None => "between".into(),
		}
	});

	*current.borrow_mut() = None;
	renderer.render();
	*current.borrow_mut() = Some(second);
	renderer.render();
	assert_eq!(renderer.pending_tasks(), 2);

	first_tx.send(Ok("stale".into())).unwrap();
	assert_eq!(renderer.poll(), 1);
	assert_eq!(host.requested(), 0);
	renderer.render();
	assert_eq!(renderer.document().inner_html(body), "<!---->");

	second_tx.send(Ok("fresh".into())).unwrap();
	assert_eq!(renderer.poll(), 1);
	renderer.frame();
	assert_eq!(renderer.document().inner_html(body), "fresh");
}

#[test]
fn inline_components_are_resumed() {
	let inits = Rc::new(Cell::new(0));
	let (_, mut renderer, body) = setup(Options::default(), {
		let inits = inits.clone();
		move || {
			let inits = inits.clone();
			let stateful = Component::stateful(move |_: &Props<'_>| {
				inits.set(inits.get() + 1);
				|_: &Props<'_>| -> Child { View::new("b").child("kept").into() }
			});
			View::new("main")
				.child(View::of(Component::stateless(|_| View::new("p").child("x").into())))
				.child(View::of(stateful))
				.into()
		}
	});
	let main = renderer.document().first_child(body).unwrap();
	let p = renderer.document().first_child(main).unwrap();

	renderer.document_mut().reset_stats();
	renderer.render();
	assert_eq!(renderer.document().stats().total(), 0, "{:?}", renderer.document().stats());
	assert_eq!(renderer.document().first_child(main), Some(p));
	assert_eq!(inits.get(), 1);
	assert_eq!(renderer.document().inner_html(main), "<p>x</p><b>kept</b>");
}

#[test]
fn rejection_renders_through_options() {
	let (component, tx) = deferred();
	let options = Options::default().with_on_rejection(|rejection| View::new("em").child(rejection.message.to_string()).into());
	let (_, mut renderer, body) = setup(options, move || View::of(component.clone()).into());

	tx.send(Err(Rejection::new("nope"))).unwrap();
	renderer.poll();
	renderer.frame();
	assert_eq!(renderer.document().inner_html(body), "<em>nope</em>");
}

fn depth_of(props: &Props<'_>) -> i32 {
	match props.attrs.get("depth") {
		Some(AttrValue::Value(Value::Number(depth))) => *depth as i32,
		_ => 1,
	}
}

#[test]
fn nested_stateful_instances_resume_by_depth() {
	let inits = Rc::new(Cell::new(0));
	let slot: Rc<RefCell<Option<Component>>> = Rc::default();
	let nest = Component::stateful({
		let inits = inits.clone();
		let slot = slot.clone();
		move |_: &Props<'_>| {
			inits.set(inits.get() + 1);
			let slot = slot.clone();
			move |props: &Props<'_>| -> Child {
				let depth = depth_of(props);
				if depth > 1 {
					View::of(slot.borrow().clone().unwrap()).attr("depth", depth - 1).into()
				} else {
					View::new("span").child("leaf").into()
				}
			}
		}
	});
	*slot.borrow_mut() = Some(nest.clone());

	let depth = Rc::new(Cell::new(4));
	let (_, mut renderer, body) = setup(Options::default(), {
		let depth = depth.clone();
		move || View::of(nest.clone()).attr("depth", depth.get()).into()
	});
	let span = renderer.document().first_child(body).unwrap();
	assert_eq!(renderer.render_stack_len(span), Some(4));
	assert_eq!(inits.get(), 4);

	depth.set(2);
	renderer.render();
	assert_eq!(renderer.document().first_child(body), Some(span));
	assert_eq!(renderer.render_stack_len(span), Some(2));
	assert_eq!(inits.get(), 4);

	depth.set(4);
	renderer.render();
	assert_eq!(renderer.render_stack_len(span), Some(4));
	assert_eq!(inits.get(), 6);
	assert_eq!(renderer.document().inner_html(body), "<span>leaf</span>");
}

#[test]
fn local_redraw_skips_the_mount_view() {
	let views = Rc::new(Cell::new(0));
	let ticks = Rc::new(Cell::new(0));
	let renders = Rc::new(Cell::new(0));
	let handle: Rc<RefCell<Option<LocalRedraw>>> = Rc::default();
	let counter = Component::stateful({
		let (ticks, renders) = (ticks.clone(), renders.clone());
		let handle = handle.clone();
		move |props: &Props<'_>| {
			*handle.borrow_mut() = Some(props.redraw.clone());
			let (ticks, renders) = (ticks.clone(), renders.clone());
			move |_: &Props<'_>| -> Child {
				renders.set(renders.get() + 1);
				View::new("output").child(ticks.get()).into()
			}
		}
	});
	let (host, mut renderer, body) = setup(Options::default(), {
		let views = views.clone();
		move || {
			views.set(views.get() + 1);
			View::new("main").child(View::of(counter.clone())).into()
		}
	});
	let output = renderer.document().first_child(renderer.document().first_child(body).unwrap()).unwrap();
	assert_eq!(views.get(), 1);

	ticks.set(1);
	let redraw = handle.borrow().clone().unwrap();
	assert!(redraw.is_mounted());
	redraw.request();
	redraw.request();
	assert_eq!(host.requested(), 1);

	renderer.frame();
	assert_eq!(views.get(), 1);
	assert_eq!(renders.get(), 2);
	assert_eq!(renderer.document().outer_html(output), "<output>1</output>");
	assert_eq!(renderer.document().inner_html(body), "<main><output>1</output></main>");
}

#[test]
fn invocation_tag_merges_into_output() {
	let button = Component::stateless(|_| View::tagged(Tag::new("button").class("inner")).into());
	let (_, renderer, body) = setup(Options::default(), move || {
		View::of(button.clone()).with_tag(Tag::anonymous().class("outer").var("--x", 1)).into()
	});
	assert_eq!(renderer.document().inner_html(body), r#"<button class="inner outer" style="--x: 1;"></button>"#);
}

#[test]
fn life_hook_runs_once_and_tears_down_on_removal() {
	let mounted = Rc::new(Cell::new(0));
	let torn_down = Rc::new(Cell::new(0));
	let shown = Rc::new(Cell::new(true));
	let (_, mut renderer, body) = setup(Options::default(), {
		let (mounted, torn_down, shown) = (mounted.clone(), torn_down.clone(), shown.clone());
		move || {
			let (mounted, torn_down) = (mounted.clone(), torn_down.clone());
			let hooked = View::new("div").life(move |document, node| {
				mounted.set(mounted.get() + 1);
				document.set_attribute(node, "data-mounted", "");
				let torn_down = torn_down.clone();
				let teardown: Teardown = Box::new(move |_, _| {
					torn_down.set(torn_down.get() + 1);
					None
				});
				Some(teardown)
			});
			Child::from(shown.get().then(|| hooked))
		}
	});
	assert_eq!(renderer.document().inner_html(body), r#"<div data-mounted=""></div>"#);

	renderer.render();
	renderer.render();
	assert_eq!(mounted.get(), 1);
	assert_eq!(torn_down.get(), 0);

	shown.set(false);
	renderer.render();
	assert_eq!(torn_down.get(), 1);
	assert_eq!(renderer.document().inner_html(body), "<!---->");
}
