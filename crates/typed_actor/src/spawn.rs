use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Where an actor task was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
	/// The runtime the caller is running on.
	Current,
	/// The process-wide fallback runtime, for callers outside tokio.
	Fallback,
}

fn runtime_handle() -> (Handle, Placement) {
	if let Ok(handle) = Handle::try_current() {
		return (handle, Placement::Current);
	}

	static FALLBACK_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = FALLBACK_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("typed-actor-fallback")
			.build()
			.expect("failed to build typed-actor fallback runtime")
	});
	(runtime.handle().clone(), Placement::Fallback)
}

/// Spawns an async task on the current tokio runtime.
///
/// Outside of a runtime, tasks land on a lazily built process-wide runtime so
/// actors can be started from synchronous code.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	let (handle, placement) = runtime_handle();
	tracing::trace!(?placement, "typed_actor.spawn");
	handle.spawn(fut)
}

/// Spawns the loop task of actor `name` and reports where it was placed.
pub(crate) fn spawn_actor<F>(name: &str, fut: F) -> Placement
where
	F: Future<Output = ()> + Send + 'static,
{
	let (handle, placement) = runtime_handle();
	if placement == Placement::Fallback {
		tracing::debug!(actor = %name, "typed_actor.actor.fallback_runtime");
	}
	tracing::trace!(actor = %name, ?placement, "typed_actor.actor.spawn");
	// The loop reports through its guard; the join handle carries nothing.
	drop(handle.spawn(fut));
	placement
}
