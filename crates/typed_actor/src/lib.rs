//! Typed actors: one message type, one private mailbox, one receiver at a time.
//!
//! An actor is started on a [`System`] with a [`Spawn`] factory and a
//! [`CancellationToken`]. The returned [`ActorRef`] is a mailbox handle;
//! producers push messages with [`Mailbox::send`] and the actor loop hands
//! them one by one to the current [`Receiver`].
//!
//! Failure handling follows three rules:
//! * a receiver that panics is discarded and replaced by a fresh one from
//!   the factory, the offending message is dropped;
//! * a receiver that returns an error, or a factory that fails, ends the
//!   actor;
//! * cancelling the start token ends the actor at the next message boundary.
//!
//! Every terminated actor closes its mailbox, so later sends fail instead of
//! blocking. [`System::wait`] resolves once every actor started on that
//! system has terminated.

mod actor;
mod envelope;
mod error;
mod generation;
mod mailbox;
mod panic;
mod receiver;
mod spawn;
mod system;

pub use actor::{ActorExit, ActorExitKind, ActorRef, ActorSpec};
pub use error::{MailboxCloseError, SendError};
pub use mailbox::{Mailbox, MailboxSpec};
pub use receiver::{FnReceiver, Receiver, Spawn, receiver_fn};
pub use spawn::spawn;
pub use system::System;
pub use tokio_util::sync::CancellationToken;
