use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::envelope::Envelope;
use crate::error::DispatchError;
use crate::generation::GenerationClock;
use crate::mailbox::{self, Mailbox, MailboxReceiver, MailboxSpec};
use crate::panic;
use crate::receiver::{Receiver, Spawn};
use crate::system::LiveGuard;

/// Opaque exit classification for public consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActorExitKind {
	/// The start token fired.
	Cancelled,
	/// The mailbox was found closed while waiting for mail.
	MailboxClosed,
	/// The factory returned an error or panicked.
	SpawnFailed,
	/// The receiver returned an error.
	HandlerFailed,
}

/// Terminal exit summary of one actor.
///
/// Wraps the exit classification and optional error message without
/// exposing the internal `ExitReason` enum variants that carry
/// payload strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorExit {
	kind: ActorExitKind,
	message: Option<String>,
}

impl ActorExit {
	pub fn kind(&self) -> ActorExitKind {
		self.kind
	}

	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	pub fn is_failure(&self) -> bool {
		matches!(self.kind, ActorExitKind::SpawnFailed | ActorExitKind::HandlerFailed)
	}
}

impl From<&ExitReason> for ActorExit {
	fn from(reason: &ExitReason) -> Self {
		match reason {
			ExitReason::Cancelled => Self {
				kind: ActorExitKind::Cancelled,
				message: None,
			},
			ExitReason::MailboxClosed => Self {
				kind: ActorExitKind::MailboxClosed,
				message: None,
			},
			ExitReason::SpawnFailed(msg) => Self {
				kind: ActorExitKind::SpawnFailed,
				message: Some(msg.clone()),
			},
			ExitReason::HandlerFailed(msg) => Self {
				kind: ActorExitKind::HandlerFailed,
				message: Some(msg.clone()),
			},
		}
	}
}

/// Exit reason for one actor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitReason {
	Cancelled,
	MailboxClosed,
	SpawnFailed(String),
	HandlerFailed(String),
}

/// Builder spec for one actor.
pub struct ActorSpec<S> {
	pub(crate) name: String,
	pub(crate) mailbox: MailboxSpec,
	spawn: S,
}

impl<S> ActorSpec<S> {
	/// Creates a new actor spec from a receiver factory.
	pub fn new(name: impl Into<String>, spawn: S) -> Self {
		Self {
			name: name.into(),
			mailbox: MailboxSpec::default(),
			spawn,
		}
	}

	/// Configures mailbox capacity.
	#[must_use]
	pub fn mailbox(mut self, mailbox: MailboxSpec) -> Self {
		self.mailbox = mailbox;
		self
	}
}

#[derive(Debug, Default)]
struct ActorStatus {
	generation: GenerationClock,
	restarts: AtomicUsize,
}

/// Handle for one started actor.
///
/// Dereferences to the actor's [`Mailbox`]; it does not expose the receiver.
/// Dropping every handle does not stop the actor, only its start token does.
pub struct ActorRef<T> {
	name: Arc<str>,
	mailbox: Mailbox<T>,
	status: Arc<ActorStatus>,
	exit: watch::Receiver<Option<ActorExit>>,
}

impl<T> Clone for ActorRef<T> {
	fn clone(&self) -> Self {
		Self {
			name: Arc::clone(&self.name),
			mailbox: self.mailbox.clone(),
			status: Arc::clone(&self.status),
			exit: self.exit.clone(),
		}
	}
}

impl<T> std::fmt::Debug for ActorRef<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActorRef")
			.field("name", &self.name)
			.field("generation", &self.generation())
			.field("restarts", &self.restart_count())
			.field("exit", &self.exit())
			.finish()
	}
}

impl<T> Deref for ActorRef<T> {
	type Target = Mailbox<T>;

	fn deref(&self) -> &Mailbox<T> {
		&self.mailbox
	}
}

impl<T> ActorRef<T> {
	/// Actor name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The actor's mailbox handle.
	pub fn mailbox(&self) -> &Mailbox<T> {
		&self.mailbox
	}

	/// Generation of the current receiver; 0 before the first spawn.
	pub fn generation(&self) -> u64 {
		self.status.generation.current()
	}

	/// Number of receiver panics that triggered a restart.
	pub fn restart_count(&self) -> usize {
		self.status.restarts.load(Ordering::Acquire)
	}

	/// Returns the exit summary once the actor has terminated.
	pub fn exit(&self) -> Option<ActorExit> {
		self.exit.borrow().clone()
	}

	/// Returns `true` once the actor has terminated.
	pub fn is_terminated(&self) -> bool {
		self.exit.borrow().is_some()
	}

	/// Waits for this actor to terminate and returns its exit summary.
	pub async fn join(&self) -> ActorExit {
		let mut exit = self.exit.clone();
		// The exit is published before the sender drops, so a closed channel
		// still holds it.
		let _ = exit.wait_for(Option::is_some).await;
		let current = exit.borrow().clone();
		current.unwrap_or_else(|| ActorExit::from(&ExitReason::Cancelled))
	}
}

/// Closes the mailbox, publishes the exit, and releases the live count, in
/// that order, however the loop task ends.
struct LoopGuard<T> {
	name: Arc<str>,
	rx: MailboxReceiver<T>,
	reason: ExitReason,
	exit: watch::Sender<Option<ActorExit>>,
	_live: LiveGuard,
}

impl<T> Drop for LoopGuard<T> {
	fn drop(&mut self) {
		if let Err(err) = self.rx.close() {
			tracing::warn!(actor = %self.name, error = %err, "typed_actor.mailbox.close_failed");
		}
		let exit = ActorExit::from(&self.reason);
		tracing::debug!(actor = %self.name, kind = ?exit.kind(), message = exit.message(), "typed_actor.actor.exit");
		self.exit.send_replace(Some(exit));
	}
}

/// Launches the actor loop for `spec` on the actor runtime.
pub(crate) fn launch<T, S>(live: LiveGuard, cancel: CancellationToken, spec: ActorSpec<S>) -> ActorRef<T>
where
	T: Send + 'static,
	S: Spawn<T>,
{
	let (mailbox, rx) = mailbox::channel(&spec.mailbox);
	let (exit_tx, exit_rx) = watch::channel(None);
	let status = Arc::new(ActorStatus::default());
	let name: Arc<str> = Arc::from(spec.name);

	// The guard exists before the task does, so a task dropped unpolled still
	// closes the mailbox and publishes its exit before the live count drops.
	let mut guard = LoopGuard {
		name: Arc::clone(&name),
		rx,
		// Runtime teardown drops the task mid-loop; treat that as cancellation.
		reason: ExitReason::Cancelled,
		exit: exit_tx,
		_live: live,
	};
	let task_status = Arc::clone(&status);
	let task_name = Arc::clone(&name);
	let spawn = spec.spawn;
	tracing::trace!(actor = %name, capacity = spec.mailbox.capacity, "typed_actor.actor.start");
	crate::spawn::spawn_actor(&name, async move {
		let reason = run_actor_loop(&task_name, spawn, &guard.rx, &cancel, &task_status).await;
		guard.reason = reason;
	});

	ActorRef {
		name,
		mailbox,
		status,
		exit: exit_rx,
	}
}

/// Actor loop state. Terminating is the loop's return value.
enum Phase<T, R> {
	Spawning,
	Awaiting(R),
	Processing(R, Envelope<T>),
	Restarting,
}

async fn run_actor_loop<T, S>(name: &str, mut spawn: S, rx: &MailboxReceiver<T>, cancel: &CancellationToken, status: &ActorStatus) -> ExitReason
where
	T: Send + 'static,
	S: Spawn<T>,
{
	let mut phase = Phase::<T, S::Receiver>::Spawning;
	loop {
		phase = match phase {
			Phase::Spawning => {
				if cancel.is_cancelled() {
					tracing::debug!(actor = %name, "typed_actor.actor.cancelled");
					return ExitReason::Cancelled;
				}
				match panic::catch_sync(|| spawn.spawn()) {
					Ok(Ok(receiver)) => {
						let generation = status.generation.advance();
						tracing::trace!(actor = %name, generation, "typed_actor.receiver.spawned");
						Phase::Awaiting(receiver)
					}
					Ok(Err(err)) => {
						let error = format!("{err:#}");
						tracing::error!(actor = %name, error = %error, "typed_actor.spawn.failed");
						return ExitReason::SpawnFailed(error);
					}
					Err(panic) => {
						tracing::error!(actor = %name, panic = %panic.message, backtrace = %panic.backtrace, "typed_actor.spawn.panicked");
						return ExitReason::SpawnFailed(format!("spawn panicked: {}", panic.message));
					}
				}
			}
			Phase::Awaiting(receiver) => {
				// Cancellation is only observed between messages.
				tokio::select! {
					biased;
					_ = cancel.cancelled() => {
						tracing::debug!(actor = %name, "typed_actor.actor.cancelled");
						return ExitReason::Cancelled;
					}
					envelope = rx.recv() => {
						let Some(envelope) = envelope else {
							tracing::warn!(actor = %name, "typed_actor.mailbox.closed_under_loop");
							return ExitReason::MailboxClosed;
						};
						Phase::Processing(receiver, envelope)
					}
				}
			}
			Phase::Processing(mut receiver, envelope) => match dispatch(&mut receiver, envelope).await {
				Ok(()) => Phase::Awaiting(receiver),
				Err(DispatchError::Panicked(panic)) => {
					tracing::error!(
						actor = %name,
						generation = status.generation.current(),
						panic = %panic.message,
						backtrace = %panic.backtrace,
						"typed_actor.receiver.panicked"
					);
					drop(receiver);
					Phase::Restarting
				}
				Err(DispatchError::Failed(err)) => {
					let error = format!("{err:#}");
					tracing::error!(
						actor = %name,
						generation = status.generation.current(),
						error = %error,
						"typed_actor.receiver.failed"
					);
					return ExitReason::HandlerFailed(error);
				}
			},
			Phase::Restarting => {
				let restarts = status.restarts.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
				tracing::trace!(actor = %name, restarts, "typed_actor.receiver.restart");
				Phase::Spawning
			}
		};
	}
}

/// Hands one envelope to the receiver inside a panic boundary.
async fn dispatch<T, R>(receiver: &mut R, envelope: Envelope<T>) -> Result<(), DispatchError>
where
	T: Send + 'static,
	R: Receiver<T>,
{
	let (msg, ctx) = envelope.into_parts();
	match panic::catch(receiver.receive(ctx, msg)).await {
		Ok(Ok(())) => Ok(()),
		Ok(Err(err)) => Err(DispatchError::Failed(err)),
		Err(panic) => Err(DispatchError::Panicked(panic)),
	}
}
