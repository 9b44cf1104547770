use thiserror::Error;

use crate::panic::CaughtPanic;

/// Error returned by [`Mailbox::send`](crate::Mailbox::send) and
/// [`Mailbox::try_send`](crate::Mailbox::try_send).
///
/// The rejected message is dropped; a successful send only means the message
/// was enqueued, never that it was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
	/// The sender's token fired before the message could be enqueued.
	#[error("send cancelled before the message was enqueued")]
	Cancelled,
	/// The actor loop terminated and closed its mailbox.
	#[error("actor mailbox closed")]
	Closed,
	/// The mailbox is at capacity and a non-blocking send was used.
	#[error("actor mailbox full")]
	Full,
}

/// Error returned when closing a mailbox that is already closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MailboxCloseError {
	#[error("mailbox already closed")]
	AlreadyClosed,
}

/// Outcome of one failed dispatch into a receiver.
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
	/// The receiver panicked; recoverable by respawning.
	#[error("receiver panicked: {0}")]
	Panicked(CaughtPanic),
	/// The receiver returned an error; fatal for the actor.
	#[error("receiver failed: {0:#}")]
	Failed(anyhow::Error),
}
