use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// A panic caught at a dispatch or spawn boundary.
#[derive(Debug)]
pub(crate) struct CaughtPanic {
	pub(crate) message: String,
	/// Stack at the catch site. Follows `RUST_BACKTRACE`; disabled when unset.
	pub(crate) backtrace: Backtrace,
}

impl CaughtPanic {
	fn from_payload(payload: &(dyn Any + Send)) -> Self {
		Self {
			message: panic_message(payload),
			backtrace: Backtrace::capture(),
		}
	}
}

impl std::fmt::Display for CaughtPanic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.message)
	}
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// Polls `fut` to completion, converting a panic into a [`CaughtPanic`].
pub(crate) async fn catch<F>(fut: F) -> Result<F::Output, CaughtPanic>
where
	F: Future,
{
	AssertUnwindSafe(fut).catch_unwind().await.map_err(|payload| CaughtPanic::from_payload(&*payload))
}

/// Runs `f`, converting a panic into a [`CaughtPanic`].
pub(crate) fn catch_sync<R>(f: impl FnOnce() -> R) -> Result<R, CaughtPanic> {
	std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| CaughtPanic::from_payload(&*payload))
}
