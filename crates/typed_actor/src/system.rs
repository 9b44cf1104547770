use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::actor::{self, ActorRef, ActorSpec};
use crate::receiver::Spawn;

#[derive(Debug, Default)]
struct SystemInner {
	live: AtomicUsize,
	idle: Notify,
}

/// Join barrier over the actors started on it.
///
/// Cloning shares the barrier. Separate `System::new()` values are
/// independent of each other.
#[derive(Debug, Clone, Default)]
pub struct System {
	inner: Arc<SystemInner>,
}

impl System {
	/// Creates a system with no live actors.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the number of actor loops that have not terminated yet.
	pub fn live(&self) -> usize {
		self.inner.live.load(Ordering::Acquire)
	}

	/// Starts an unnamed actor with the default mailbox and returns its handle.
	///
	/// The actor runs until `ctx` is cancelled, its receiver returns an error,
	/// or `spawn` fails.
	pub fn start<T, S>(&self, ctx: &CancellationToken, spawn: S) -> ActorRef<T>
	where
		T: Send + 'static,
		S: Spawn<T>,
	{
		self.spawn(ctx, ActorSpec::new("actor", spawn))
	}

	/// Starts an actor from a spec and returns its handle without waiting.
	pub fn spawn<T, S>(&self, ctx: &CancellationToken, spec: ActorSpec<S>) -> ActorRef<T>
	where
		T: Send + 'static,
		S: Spawn<T>,
	{
		actor::launch(self.enter(), ctx.clone(), spec)
	}

	/// Waits until every actor started on this system has terminated.
	///
	/// Resolves immediately when no actor is live.
	pub async fn wait(&self) {
		loop {
			let idle = self.inner.idle.notified();
			tokio::pin!(idle);
			idle.as_mut().enable();
			if self.live() == 0 {
				return;
			}
			idle.await;
		}
	}

	/// Blocks the calling thread until every actor on this system has
	/// terminated.
	///
	/// For synchronous callers, including those that started actors on the
	/// fallback runtime. Calling it from inside an async task stalls that
	/// runtime worker; use [`wait`](Self::wait) there.
	pub fn wait_blocking(&self) {
		futures::executor::block_on(self.wait());
	}

	/// Waits with a deadline. Returns `true` if all actors terminated in time.
	pub async fn wait_timeout(&self, timeout: Duration) -> bool {
		tokio::time::timeout(timeout, self.wait()).await.is_ok()
	}

	/// Registers one live actor loop until the returned guard drops.
	pub(crate) fn enter(&self) -> LiveGuard {
		self.inner.live.fetch_add(1, Ordering::AcqRel);
		LiveGuard {
			inner: Arc::clone(&self.inner),
		}
	}
}

/// Live-count registration of one actor loop.
pub(crate) struct LiveGuard {
	inner: Arc<SystemInner>,
}

impl Drop for LiveGuard {
	fn drop(&mut self) {
		if self.inner.live.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.inner.idle.notify_waiters();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn wait_returns_immediately_without_actors() {
		let system = System::new();
		assert_eq!(system.live(), 0);
		assert!(system.wait_timeout(Duration::from_millis(50)).await);
	}

	#[tokio::test]
	async fn wait_blocks_until_last_guard_drops() {
		let system = System::new();
		let first = system.enter();
		let second = system.enter();
		assert_eq!(system.live(), 2);

		let waiter_system = system.clone();
		let waiter = crate::spawn(async move { waiter_system.wait().await });

		drop(first);
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert!(!waiter.is_finished(), "wait must not return while an actor is live");

		drop(second);
		tokio::time::timeout(Duration::from_millis(200), waiter)
			.await
			.expect("wait should return after the last actor exits")
			.unwrap();
		assert_eq!(system.live(), 0);
	}

	#[tokio::test]
	async fn wait_timeout_reports_live_actors() {
		let system = System::new();
		let guard = system.enter();
		assert!(!system.wait_timeout(Duration::from_millis(10)).await);
		drop(guard);
		assert!(system.wait_timeout(Duration::from_millis(10)).await);
	}

	#[tokio::test]
	async fn systems_are_independent() {
		let busy = System::new();
		let idle = System::new();
		let _guard = busy.enter();

		assert_eq!(idle.live(), 0);
		assert!(idle.wait_timeout(Duration::from_millis(10)).await);
		assert!(!busy.wait_timeout(Duration::from_millis(10)).await);
	}

	#[test]
	fn wait_blocking_returns_after_last_guard_on_another_thread() {
		let system = System::new();
		let guard = system.enter();

		let (tx, rx) = std::sync::mpsc::channel();
		let waiter_system = system.clone();
		let waiter = std::thread::spawn(move || {
			waiter_system.wait_blocking();
			let _ = tx.send(());
		});

		assert!(rx.recv_timeout(Duration::from_millis(20)).is_err(), "wait_blocking must not return while an actor is live");
		drop(guard);
		rx.recv_timeout(Duration::from_secs(1)).expect("wait_blocking should return after the last actor exits");
		waiter.join().unwrap();
	}

	#[test]
	fn wait_blocking_without_actors_returns_immediately() {
		System::new().wait_blocking();
	}

	#[tokio::test]
	async fn barrier_can_be_reused_after_reaching_zero() {
		let system = System::new();
		drop(system.enter());
		assert!(system.wait_timeout(Duration::from_millis(10)).await);

		let guard = system.enter();
		assert!(!system.wait_timeout(Duration::from_millis(10)).await);
		drop(guard);
		assert!(system.wait_timeout(Duration::from_millis(10)).await);
	}
}
