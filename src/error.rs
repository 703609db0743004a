use crate::{diff::MountId, NodeId};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("mount target {0:?} is not a live element")]
	NotAnElement(NodeId),
	#[error("unknown mount {0:?}")]
	UnknownMount(MountId),
	#[error("node {0:?} was already freed")]
	DeadNode(NodeId),
}

/// The failure of an async component or of deferred teardown work.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Rejection {
	pub message: Cow<'static, str>,
}
impl Rejection {
	pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
		Self { message: message.into() }
	}
}
