use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Stateful handler for one message type.
///
/// The actor loop calls [`receive`](Self::receive) for one message at a time.
/// State kept in `self` lives until the receiver is replaced:
/// * `Ok(())` keeps the receiver for the next message;
/// * `Err(_)` terminates the actor;
/// * a panic discards the receiver, drops the message, and a fresh receiver
///   is spawned before the next message.
#[async_trait]
pub trait Receiver<T>: Send + 'static
where
	T: Send + 'static,
{
	/// Handles one message. `ctx` is the token its sender was holding.
	async fn receive(&mut self, ctx: CancellationToken, msg: T) -> anyhow::Result<()>;
}

#[async_trait]
impl<T> Receiver<T> for Box<dyn Receiver<T>>
where
	T: Send + 'static,
{
	async fn receive(&mut self, ctx: CancellationToken, msg: T) -> anyhow::Result<()> {
		(**self).receive(ctx, msg).await
	}
}

/// Factory for the receivers of one actor.
///
/// Called once when the actor starts and again after every receiver panic.
/// An error or a panic here terminates the actor; it is never retried.
///
/// Implemented for every `FnMut() -> anyhow::Result<R>` closure.
pub trait Spawn<T>: Send + 'static
where
	T: Send + 'static,
{
	type Receiver: Receiver<T>;

	/// Produces a fresh receiver with no state carried over.
	fn spawn(&mut self) -> anyhow::Result<Self::Receiver>;
}

impl<T, F, R> Spawn<T> for F
where
	T: Send + 'static,
	F: FnMut() -> anyhow::Result<R> + Send + 'static,
	R: Receiver<T>,
{
	type Receiver = R;

	fn spawn(&mut self) -> anyhow::Result<R> {
		self()
	}
}

/// Receiver backed by an async closure. Created by [`receiver_fn`].
pub struct FnReceiver<F> {
	f: F,
}

/// Adapts `f(ctx, msg)` into a [`Receiver`].
///
/// ```
/// use typed_actor::{CancellationToken, receiver_fn};
///
/// let receiver = receiver_fn(|_ctx: CancellationToken, msg: String| async move {
/// 	tracing::info!(%msg, "received");
/// 	anyhow::Ok(())
/// });
/// # let _ = receiver;
/// ```
pub fn receiver_fn<F>(f: F) -> FnReceiver<F> {
	FnReceiver { f }
}

#[async_trait]
impl<T, F, Fut> Receiver<T> for FnReceiver<F>
where
	T: Send + 'static,
	F: FnMut(CancellationToken, T) -> Fut + Send + 'static,
	Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
	async fn receive(&mut self, ctx: CancellationToken, msg: T) -> anyhow::Result<()> {
		(self.f)(ctx, msg).await
	}
}
