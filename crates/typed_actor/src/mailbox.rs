use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;
use crate::error::{MailboxCloseError, SendError};

/// Mailbox sizing configuration for actors.
#[derive(Debug, Clone)]
pub struct MailboxSpec {
	pub(crate) capacity: usize,
}

impl MailboxSpec {
	/// Creates a mailbox spec with the given capacity.
	///
	/// # Panics
	///
	/// Panics if `capacity` is zero.
	#[must_use]
	pub fn with_capacity(capacity: usize) -> Self {
		assert!(capacity > 0, "mailbox capacity must be > 0");
		Self { capacity }
	}
}

impl Default for MailboxSpec {
	/// One undelivered message at a time.
	fn default() -> Self {
		Self { capacity: 1 }
	}
}

struct MailboxState<T> {
	queue: VecDeque<Envelope<T>>,
	closed: bool,
}

struct MailboxInner<T> {
	capacity: usize,
	state: Mutex<MailboxState<T>>,
	notify_recv: Notify,
	notify_send: Notify,
}

/// Producer handle for one actor's mailbox.
///
/// Cloneable; any number of producers may send. Only the owning actor loop
/// can close it.
pub struct Mailbox<T> {
	inner: Arc<MailboxInner<T>>,
}

/// Consumer half of a mailbox, owned by exactly one actor loop.
pub(crate) struct MailboxReceiver<T> {
	inner: Arc<MailboxInner<T>>,
}

impl<T> Clone for Mailbox<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> std::fmt::Debug for Mailbox<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mailbox")
			.field("capacity", &self.inner.capacity)
			.field("closed", &self.is_closed())
			.finish()
	}
}

/// Creates a bounded mailbox and returns its producer and consumer halves.
pub(crate) fn channel<T>(spec: &MailboxSpec) -> (Mailbox<T>, MailboxReceiver<T>) {
	let inner = Arc::new(MailboxInner {
		capacity: spec.capacity,
		state: Mutex::new(MailboxState {
			queue: VecDeque::with_capacity(spec.capacity),
			closed: false,
		}),
		notify_recv: Notify::new(),
		notify_send: Notify::new(),
	});
	(
		Mailbox {
			inner: Arc::clone(&inner),
		},
		MailboxReceiver { inner },
	)
}

impl<T> Mailbox<T> {
	/// Enqueues `msg`, waiting for capacity when the mailbox is full.
	///
	/// Resolves with [`SendError::Cancelled`] if `ctx` fires first and with
	/// [`SendError::Closed`] once the actor loop has closed the mailbox.
	/// Messages from sends that complete are delivered in completion order.
	pub async fn send(&self, ctx: &CancellationToken, msg: T) -> Result<(), SendError> {
		let envelope = Envelope::new(msg, ctx.clone());
		loop {
			// Enable the notification *before* checking capacity so a pop or
			// close between the check and the await is not lost.
			let notified = self.inner.notify_send.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();

			if ctx.is_cancelled() {
				return Err(SendError::Cancelled);
			}
			{
				let mut state = self.inner.state.lock();
				if state.closed {
					return Err(SendError::Closed);
				}
				if state.queue.len() < self.inner.capacity {
					state.queue.push_back(envelope);
					self.inner.notify_recv.notify_one();
					return Ok(());
				}
			}

			tokio::select! {
				biased;
				_ = ctx.cancelled() => return Err(SendError::Cancelled),
				_ = &mut notified => {}
			}
		}
	}

	/// Non-blocking enqueue. Returns [`SendError::Full`] when at capacity.
	pub fn try_send(&self, ctx: &CancellationToken, msg: T) -> Result<(), SendError> {
		if ctx.is_cancelled() {
			return Err(SendError::Cancelled);
		}
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(SendError::Closed);
		}
		if state.queue.len() >= self.inner.capacity {
			return Err(SendError::Full);
		}
		state.queue.push_back(Envelope::new(msg, ctx.clone()));
		self.inner.notify_recv.notify_one();
		Ok(())
	}

	/// Returns `true` once the owning actor loop has closed the mailbox.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Returns the number of messages waiting for pickup.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	/// Returns `true` if no message is waiting for pickup.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns queue capacity.
	pub fn capacity(&self) -> usize {
		self.inner.capacity
	}
}

impl<T> MailboxReceiver<T> {
	/// Receives one envelope. Returns `None` once the mailbox is closed.
	///
	/// Cancel-safe: an envelope is only removed from the queue when it is
	/// returned.
	pub(crate) async fn recv(&self) -> Option<Envelope<T>> {
		loop {
			let notified = self.inner.notify_recv.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			{
				let mut state = self.inner.state.lock();
				if let Some(envelope) = state.queue.pop_front() {
					self.inner.notify_send.notify_waiters();
					return Some(envelope);
				}
				if state.closed {
					return None;
				}
			}
			notified.await;
		}
	}

	/// Closes the mailbox, dropping undelivered envelopes and waking every
	/// blocked sender.
	///
	/// Closing is not idempotent: a second call returns
	/// [`MailboxCloseError::AlreadyClosed`].
	pub(crate) fn close(&self) -> Result<(), MailboxCloseError> {
		let dropped = {
			let mut state = self.inner.state.lock();
			if state.closed {
				return Err(MailboxCloseError::AlreadyClosed);
			}
			state.closed = true;
			std::mem::take(&mut state.queue)
		};
		self.inner.notify_send.notify_waiters();
		self.inner.notify_recv.notify_waiters();
		drop(dropped);
		Ok(())
	}
}
