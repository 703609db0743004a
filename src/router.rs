//! The client-side navigation collaborator consumed by `href` handling.

use core::cell::RefCell;
use tracing::trace;

pub trait Router {
	/// Prepended to routed `href`s, e.g. `"#!"` for hash routing or `""` for path routing.
	fn prefix(&self) -> &str;

	/// Collapses repeated slashes and ensures a leading one.
	fn normalize(&self, path: &str) -> String {
		normalize_slashes(path)
	}

	/// Pushes `path` onto the navigation history.
	fn navigate(&self, path: &str);

	fn current(&self) -> String;
}

/// Whether `href` addresses a path of the current origin, which makes it eligible for routing.
#[must_use]
pub fn is_routable(href: &str) -> bool {
	!href.starts_with("//") && !href.starts_with('#') && !href.contains(':')
}

#[must_use]
pub fn normalize_slashes(path: &str) -> String {
	let mut normalized = String::with_capacity(path.len() + 1);
	if !path.starts_with('/') {
		normalized.push('/');
	}
	for c in path.chars() {
		if c == '/' && normalized.ends_with('/') {
			continue;
		}
		normalized.push(c);
	}
	normalized
}

/// A [`Router`] that keeps its history in memory.
#[derive(Debug)]
pub struct MemoryRouter {
	prefix: String,
	history: RefCell<Vec<String>>,
}
impl MemoryRouter {
	#[must_use]
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			history: RefCell::new(vec!["/".to_owned()]),
		}
	}

	#[must_use]
	pub fn history(&self) -> Vec<String> {
		self.history.borrow().clone()
	}
}
impl Router for MemoryRouter {
	fn prefix(&self) -> &str {
		&self.prefix
	}

	fn navigate(&self, path: &str) {
		let path = path.strip_prefix(self.prefix.as_str()).unwrap_or(path);
		let path = self.normalize(path);
		trace!("Navigating to {:?}.", path);
		self.history.borrow_mut().push(path);
	}

	fn current(&self) -> String {
		self.history.borrow().last().cloned().unwrap_or_else(|| "/".to_owned())
	}
}
