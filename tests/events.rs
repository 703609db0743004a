use phloem::{
	event::Modifiers,
	router::{MemoryRouter, Router},
	Child, Event, ManualFrames, NodeId, Options, Renderer, View,
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

type Log = Rc<RefCell<Vec<(&'static str, Option<NodeId>)>>>;

fn logging(log: &Log, name: &'static str, stop: bool) -> impl Fn(&Event) + 'static {
	let log = log.clone();
	move |event: &Event| {
		log.borrow_mut().push((name, event.current_target()));
		if stop {
			event.stop_propagation();
		}
	}
}

fn nested(log: &Log, stop: bool) -> impl FnMut() -> Child + 'static {
	let log = log.clone();
	move || {
		View::new("div")
			.on("click", logging(&log, "div", false))
			.on("focus", logging(&log, "div", false))
			.child(View::new("button").on("click", logging(&log, "button", stop)).child("go"))
			.into()
	}
}

#[test]
fn clicks_bubble_from_the_target() {
	let log = Log::default();
	let (host, mut renderer, body) = setup(Options::default(), nested(&log, false));
	let div = renderer.document().first_child(body).unwrap();
	let button = renderer.document().first_child(div).unwrap();

	let event = Event::click();
	assert!(renderer.dispatch(button, &event));
	assert_eq!(*log.borrow(), [("button", Some(button)), ("div", Some(div))]);
	assert_eq!(event.target(), Some(button));
	assert_eq!(event.current_target(), None);
	assert_eq!(host.requested(), 1);
}

#[test]
fn stopped_propagation_ends_the_walk() {
	let log = Log::default();
	let (_, mut renderer, body) = setup(Options::default(), nested(&log, true));
	let button = renderer.document().first_child(renderer.document().first_child(body).unwrap()).unwrap();

	assert!(renderer.dispatch(button, &Event::click()));
	assert_eq!(log.borrow().len(), 1);
	assert_eq!(log.borrow()[0].0, "button");
}

#[test]
fn focus_does_not_bubble() {
	let log = Log::default();
	let (_, mut renderer, body) = setup(Options::default(), nested(&log, false));
	let div = renderer.document().first_child(body).unwrap();
	let button = renderer.document().first_child(div).unwrap();

	assert!(!renderer.dispatch(button, &Event::new("focus")));
	assert!(log.borrow().is_empty());
	assert!(renderer.dispatch(div, &Event::new("focus")));
	assert_eq!(*log.borrow(), [("div", Some(div))]);
}

#[test]
fn unknown_events_are_not_handled() {
	let log = Log::default();
	let (host, mut renderer, body) = setup(Options::default(), nested(&log, false));
	assert!(!renderer.dispatch(body, &Event::new("keydown")));
	assert!(!renderer.dispatch(body, &Event::click()));
	assert_eq!(host.requested(), 0);
}

#[test]
fn swapped_handlers_keep_the_listener() {
	let generation = Rc::new(Cell::new(0));
	let seen = Rc::new(Cell::new(-1));
	let (_, mut renderer, body) = setup(Options::default().with_redraw_on_event(false), {
		let (generation, seen) = (generation.clone(), seen.clone());
		move || {
			let current = generation.get();
			let seen = seen.clone();
			View::new("button").on("click", move |_| seen.set(current)).into()
		}
	});
	let button = renderer.document().first_child(body).unwrap();
	assert_eq!(renderer.listener_count("click"), 1);

	generation.set(1);
	renderer.document_mut().reset_stats();
	renderer.render();
	assert_eq!(renderer.document().stats().listener_writes, 0);
	assert_eq!(renderer.listener_count("click"), 1);

	assert!(renderer.dispatch(button, &Event::click()));
	assert_eq!(seen.get(), 1);
}

#[test]
fn removed_handlers_release_the_listener() {
	let bound = Rc::new(Cell::new(true));
	let (host, mut renderer, body) = setup(Options::default(), {
		let bound = bound.clone();
		move || {
			let button = View::new("button");
			let button = if bound.get() { button.on("click", |_| ()) } else { button };
			button.into()
		}
	});
	let button = renderer.document().first_child(body).unwrap();

	bound.set(false);
	renderer.render();
	assert!(!renderer.document().has_listener(button, "click"));
	assert_eq!(renderer.listener_count("click"), 0);
	assert!(!renderer.dispatch(button, &Event::click()));
	assert_eq!(host.requested(), 0);

	bound.set(true);
	renderer.render();
	assert_eq!(renderer.listener_count("click"), 1);
}

fn linked(href: &'static str, target: Option<&'static str>) -> (Rc<MemoryRouter>, Rc<ManualFrames>, Renderer, NodeId) {
	let router = Rc::new(MemoryRouter::new("#!"));
	let (host, renderer, body) = setup(Options::default().with_router(router.clone()), move || {
		View::new("nav").child(View::new("a").attr("href", href).attr("target", target).child(View::new("span").child("About"))).into()
	});
	(router, host, renderer, body)
}

#[test]
fn routed_links_are_prefixed_and_intercepted() {
	let (router, host, mut renderer, body) = linked("/about//team", None);
	let nav = renderer.document().first_child(body).unwrap();
	let a = renderer.document().first_child(nav).unwrap();
	let span = renderer.document().first_child(a).unwrap();
	assert_eq!(renderer.document().attribute(a, "href"), Some("#!/about/team"));

	let event = Event::click();
	assert!(renderer.dispatch(span, &event));
	assert!(event.default_prevented());
	assert_eq!(router.current(), "/about/team");
	assert_eq!(host.requested(), 1);
}

#[test]
fn modified_clicks_are_left_to_the_host() {
	let (router, _, mut renderer, body) = linked("/about", None);
	let a = renderer.document().first_child(renderer.document().first_child(body).unwrap()).unwrap();

	let event = Event::click().with_modifiers(Modifiers { ctrl: true, ..Modifiers::default() });
	assert!(!renderer.dispatch(a, &event));
	assert!(!event.default_prevented());
	assert!(!renderer.dispatch(a, &Event::click().with_button(1)));
	assert_eq!(router.history(), ["/"]);
}

#[test]
fn targeted_and_external_links_are_not_routed() {
	let (router, _, mut renderer, body) = linked("/about", Some("_blank"));
	let a = renderer.document().first_child(renderer.document().first_child(body).unwrap()).unwrap();
	assert!(!renderer.dispatch(a, &Event::click()));
	assert_eq!(router.history(), ["/"]);

	let (router, _, mut renderer, body) = linked("https://example.com/about", None);
	let a = renderer.document().first_child(renderer.document().first_child(body).unwrap()).unwrap();
	assert_eq!(renderer.document().attribute(a, "href"), Some("https://example.com/about"));
	assert!(!renderer.dispatch(a, &Event::click()));
	assert_eq!(router.history(), ["/"]);
}
