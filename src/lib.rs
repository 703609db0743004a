//! A keyed virtual-tree reconciler.
//!
//! [`Renderer`] diffs declarative [`View`] trees onto a live output [`Document`] in place.
//! It keeps node identity for keyed lists, resumes stateful and async components across passes
//! and defers the removal of nodes whose teardown hooks return pending work.

#![doc(html_root_url = "https://docs.rs/phloem/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod diff;
pub mod dom;
pub mod error;
pub mod event;
pub mod live;
pub mod rc_hash_map;
pub mod router;
pub mod scheduler;
pub mod view;

pub use crate::{
	diff::{MountId, Options, Renderer},
	dom::{Document, MutationStats, NodeId},
	error::{Error, Rejection},
	event::Event,
	live::Live,
	scheduler::{FrameHost, LocalRedraw, ManualFrames, Redraw},
	view::{Child, Component, Key, Props, Tag, Value, View},
};
