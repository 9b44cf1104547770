use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation clock for the receivers of one actor.
///
/// Generation 0 means no receiver has been spawned yet.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
	current: AtomicU64,
}

impl GenerationClock {
	/// Advances to and returns the next generation ID.
	pub fn advance(&self) -> u64 {
		self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the latest issued generation ID.
	pub fn current(&self) -> u64 {
		self.current.load(Ordering::Acquire)
	}
}
