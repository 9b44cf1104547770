use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use typed_actor::{ActorExitKind, ActorRef, CancellationToken, SendError, System, receiver_fn};

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
	let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
	while !check() {
		assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
		tokio::time::sleep(Duration::from_millis(1)).await;
	}
}

#[tokio::test]
async fn counter_receives_one_two_three() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let system = System::new();
	let ctx = CancellationToken::new();
	let seen = Arc::new(Mutex::new(Vec::new()));
	let total = Arc::new(Mutex::new(0));

	let (seen_w, total_w) = (Arc::clone(&seen), Arc::clone(&total));
	let actor: ActorRef<i32> = system.start(&ctx, move || {
		let (seen, total) = (Arc::clone(&seen_w), Arc::clone(&total_w));
		anyhow::Ok(receiver_fn(move |_ctx: CancellationToken, msg: i32| {
			seen.lock().push(msg);
			*total.lock() += msg;
			async { anyhow::Ok(()) }
		}))
	});

	for msg in [1, 2, 3] {
		actor.send(&ctx, msg).await.expect("actor is running");
	}
	eventually("three messages", || seen.lock().len() == 3).await;

	assert_eq!(*seen.lock(), vec![1, 2, 3]);
	assert_eq!(*total.lock(), 6);

	ctx.cancel();
	system.wait().await;
}

#[tokio::test]
async fn boom_restarts_with_fresh_instance() {
	let system = System::new();
	let ctx = CancellationToken::new();
	let spawns = Arc::new(AtomicUsize::new(0));
	let log = Arc::new(Mutex::new(Vec::<(usize, &'static str)>::new()));

	let (spawns_w, log_w) = (Arc::clone(&spawns), Arc::clone(&log));
	let actor: ActorRef<&'static str> = system.start(&ctx, move || {
		let instance = spawns_w.fetch_add(1, Ordering::SeqCst) + 1;
		let log = Arc::clone(&log_w);
		anyhow::Ok(receiver_fn(move |_ctx: CancellationToken, msg: &'static str| {
			log.lock().push((instance, msg));
			if msg == "boom" {
				panic!("boom");
			}
			async { anyhow::Ok(()) }
		}))
	});

	for msg in ["ok1", "boom", "ok2"] {
		actor.send(&ctx, msg).await.expect("panics are invisible to senders");
	}
	eventually("ok2", || log.lock().len() == 3).await;

	assert_eq!(*log.lock(), vec![(1, "ok1"), (1, "boom"), (2, "ok2")]);
	assert_eq!(spawns.load(Ordering::SeqCst), 2);

	ctx.cancel();
	system.wait().await;
}

#[tokio::test]
async fn cancel_after_start_unblocks_wait_and_fails_sends() {
	let system = System::new();
	let ctx = CancellationToken::new();
	let actor: ActorRef<String> = system.start(&ctx, || anyhow::Ok(receiver_fn(|_ctx: CancellationToken, _msg: String| async { anyhow::Ok(()) })));

	ctx.cancel();
	tokio::time::timeout(Duration::from_secs(1), system.wait())
		.await
		.expect("wait should return promptly");

	assert_eq!(actor.exit().map(|exit| exit.kind()), Some(ActorExitKind::Cancelled));
	for token in [ctx.clone(), CancellationToken::new()] {
		let result = tokio::time::timeout(Duration::from_millis(100), actor.send(&token, "late".to_string()))
			.await
			.expect("send after termination must not block");
		assert!(matches!(result, Err(SendError::Cancelled | SendError::Closed)), "got {result:?}");
	}
}

#[test]
fn actors_start_outside_a_runtime() {
	let system = System::new();
	let ctx = CancellationToken::new();
	let hits = Arc::new(AtomicUsize::new(0));

	let counter = Arc::clone(&hits);
	let actor: ActorRef<u8> = system.start(&ctx, move || {
		let counter = Arc::clone(&counter);
		anyhow::Ok(receiver_fn(move |_ctx: CancellationToken, _msg: u8| {
			counter.fetch_add(1, Ordering::SeqCst);
			async { anyhow::Ok(()) }
		}))
	});

	let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("test runtime");
	runtime.block_on(async {
		actor.send(&ctx, 1).await.expect("actor is running");
		eventually("one message", || hits.load(Ordering::SeqCst) == 1).await;
	});
	drop(runtime);

	ctx.cancel();
	system.wait_blocking();
	assert_eq!(system.live(), 0);
	assert_eq!(actor.exit().map(|exit| exit.kind()), Some(ActorExitKind::Cancelled));
}
