use futures_util::task::{waker, ArcWake};
use phloem::{Child, Live, ManualFrames, MountId, NodeId, Options, Renderer, Tag, Value, View};
use std::{
	cell::Cell,
	rc::Rc,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};

#[derive(Default)]
struct Wakes(AtomicUsize);
impl ArcWake for Wakes {
	fn wake_by_ref(arc_self: &Arc<Self>) {
		arc_self.0.fetch_add(1, Ordering::SeqCst);
	}
}

struct Fixture {
	host: Rc<ManualFrames>,
	wakes: Arc<Wakes>,
	renderer: Renderer,
	mount: MountId,
	views: Rc<Cell<usize>>,
	p: NodeId,
}

fn setup(text: &Live<Child>, width: &Live<Value>) -> Fixture {
	let host = Rc::new(ManualFrames::new());
	let wakes = Arc::new(Wakes::default());
	let mut renderer = Renderer::with_options(host.clone(), Options::default().with_waker(waker(wakes.clone())));
	let body = renderer.document().body();
	let views = Rc::new(Cell::new(0));
	let mount = renderer
		.mount(body, {
			let (text, width, views) = (text.clone(), width.clone(), views.clone());
			move || {
				views.set(views.get() + 1);
				View::tagged(Tag::new("p").var("--width", width.clone())).child(text.clone()).into()
			}
		})
		.unwrap();
	let p = renderer.document().first_child(body).unwrap();
	Fixture { host, wakes, renderer, mount, views, p }
}

#[test]
fn live_child_updates_in_place() {
	let text = Live::new(Child::from("a"));
	let width = Live::new(Value::from(1));
	let Fixture { host, wakes, mut renderer, views, p, .. } = setup(&text, &width);
	let node = renderer.document().first_child(p).unwrap();
	assert_eq!(renderer.document().inner_html(p), "a");
	assert_eq!(renderer.pending_tasks(), 2);

	text.set("b".into());
	text.set("c".into());
	assert!(wakes.0.load(Ordering::SeqCst) > 0);
	assert_eq!(host.requested(), 0);

	assert_eq!(renderer.poll(), 0);
	assert_eq!(host.requested(), 1);
	assert_eq!(renderer.document().inner_html(p), "a");

	renderer.frame();
	assert_eq!(renderer.document().first_child(p), Some(node));
	assert_eq!(renderer.document().text(node), Some("c"));
	assert_eq!(views.get(), 1);

	renderer.render();
	renderer.poll();
	assert_eq!(renderer.pending_tasks(), 2);
	assert_eq!(renderer.document().first_child(p), Some(node));
}

#[test]
fn live_child_survives_changing_kind() {
	let text = Live::new(Child::from("a"));
	let width = Live::new(Value::from(1));
	let Fixture { mut renderer, p, .. } = setup(&text, &width);

	text.set(View::new("b").child("bold").into());
	renderer.frame();
	assert_eq!(renderer.document().inner_html(p), "<b>bold</b>");
	assert_eq!(renderer.pending_tasks(), 2);

	text.set("plain".into());
	renderer.frame();
	assert_eq!(renderer.document().inner_html(p), "plain");

	renderer.render();
	renderer.poll();
	assert_eq!(renderer.document().inner_html(p), "plain");
	assert_eq!(renderer.pending_tasks(), 2);
}

#[test]
fn live_variables_write_styles() {
	let text = Live::new(Child::from("a"));
	let width = Live::new(Value::from(1));
	let Fixture { mut renderer, p, .. } = setup(&text, &width);
	assert_eq!(renderer.document().style_property(p, "--width"), Some("1"));

	width.set(2.into());
	renderer.frame();
	assert_eq!(renderer.document().style_property(p, "--width"), Some("2"));

	renderer.render();
	renderer.poll();
	assert_eq!(renderer.pending_tasks(), 2);
	assert_eq!(renderer.document().outer_html(p), r#"<p style="--width: 2;">a</p>"#);
}

#[test]
fn unmount_unsubscribes() {
	let text = Live::new(Child::from("a"));
	let width = Live::new(Value::from(1));
	let Fixture { host, mut renderer, mount, .. } = setup(&text, &width);
	assert_eq!(renderer.pending_tasks(), 2);

	renderer.unmount(mount).unwrap();
	assert_eq!(renderer.poll(), 0);
	assert_eq!(renderer.pending_tasks(), 0);

	text.set("gone".into());
	width.set(0.into());
	renderer.poll();
	assert_eq!(host.requested(), 0);
}

#[test]
fn live_values_can_be_set_from_handlers() {
	let count = Live::new(Value::from(0));
	let host = Rc::new(ManualFrames::new());
	let mut renderer = Renderer::new(host);
	let body = renderer.document().body();
	renderer
		.mount(body, {
			let count = count.clone();
			move || {
				let clicked = count.clone();
				View::new("button")
					.on("click", move |_| {
						let next = match clicked.get() {
							Value::Number(n) => n + 1.0,
							_ => 0.0,
						};
						clicked.set(next.into());
						clicked.set((next + 1.0).into());
					})
					.child(Live::new(Child::from("+")))
					.into()
			}
		})
		.unwrap();
	let button = renderer.document().first_child(body).unwrap();

	assert!(renderer.dispatch(button, &phloem::Event::click()));
	assert_eq!(count.get(), Value::from(2.0));
}
