use tokio_util::sync::CancellationToken;

/// One message paired with the token its sender was holding.
///
/// The token bounds the sender's enqueue wait. The actor loop passes it on to
/// [`Receiver::receive`](crate::Receiver::receive) as `ctx` but never uses it
/// to interrupt a receiver that is already running.
#[derive(Debug)]
pub(crate) struct Envelope<T> {
	message: T,
	context: CancellationToken,
}

impl<T> Envelope<T> {
	pub(crate) fn new(message: T, context: CancellationToken) -> Self {
		Self { message, context }
	}

	/// Splits the envelope into message and token.
	pub(crate) fn into_parts(self) -> (T, CancellationToken) {
		(self.message, self.context)
	}
}
