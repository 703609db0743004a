//! Reactive values.
//!
//! A [`Live`] is a [`futures_signals`] [`Mutable`] with stable identity.
//! The renderer subscribes to a [`Live`] child or style variable through its signal, as a task in its own future set,
//! and applies every later value for as long as the owning node stays mounted.

use core::fmt::{self, Debug, Formatter};
use futures_signals::signal::{Mutable, MutableSignalCloned};
use futures_util::future::AbortHandle;
use std::rc::Rc;

/// A shared, observable value.
pub struct Live<T>(Rc<Mutable<T>>);
impl<T> Clone for Live<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}
impl<T: Debug> Debug for Live<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Live").field(&*self.0.lock_ref()).finish()
	}
}
impl<T> From<Mutable<T>> for Live<T> {
	fn from(mutable: Mutable<T>) -> Self {
		Self(Rc::new(mutable))
	}
}
impl<T> Live<T> {
	pub fn new(value: T) -> Self {
		Mutable::new(value).into()
	}

	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.0.get_cloned()
	}

	/// Stores `value`. Subscribers see it the next time their task is polled.
	pub fn set(&self, value: T) {
		self.0.set(value);
	}

	/// The current value followed by every change. Intermediate values between two polls are skipped.
	#[must_use]
	pub fn signal(&self) -> MutableSignalCloned<T>
	where
		T: Clone,
	{
		self.0.signal_cloned()
	}

	#[must_use]
	pub fn mutable(&self) -> &Mutable<T> {
		&self.0
	}

	/// Whether both handles refer to the same stream.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

/// Ends a subscription task when dropped.
#[derive(Debug)]
pub struct Subscription(AbortHandle);
impl Subscription {
	pub(crate) fn new(handle: AbortHandle) -> Self {
		Self(handle)
	}
}
impl Drop for Subscription {
	fn drop(&mut self) {
		self.0.abort();
	}
}
