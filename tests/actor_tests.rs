//! Actor lifecycle integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use driveshaft::prelude::*;

fn echo_actor(ctx: &Context, name: &str) -> Actor {
    driveshaft::dev_tracing::init_tracing();
    Actor::spawn(ctx, name, |control, token| {
        while !token.is_cancelled() {
            match control.recv_message_timeout(Duration::from_millis(20)) {
                Ok(msg) => control.send_message(msg)?,
                Err(e) if e.is_transient() => continue,
                Err(e) if e.is_termination() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })
    .unwrap()
}

#[test]
fn echo_over_control_channel() {
    let ctx = Context::new();
    let mut actor = echo_actor(&ctx, "echo");

    let frontend = actor.frontend().unwrap();
    frontend
        .send_message(Message::new().push_str("ping").push_str("payload"))
        .unwrap();
    let reply = frontend
        .recv_message_timeout(Duration::from_secs(2))
        .unwrap();
    assert_eq!(reply.len(), 2);
    assert_eq!(reply.parse_frame_str(0).unwrap(), "ping");
    assert_eq!(reply.parse_frame_str(1).unwrap(), "payload");

    actor.close().unwrap();
}

#[test]
fn stop_then_join_exits_cleanly() {
    let ctx = Context::new();
    let mut actor = echo_actor(&ctx, "stopping");
    assert!(actor.is_running());

    actor.stop();
    assert!(actor.join_timeout(Duration::from_secs(2)).unwrap());
    actor.join().unwrap();
    assert!(!actor.is_running());
}

#[test]
fn join_timeout_reports_still_running() {
    let ctx = Context::new();
    let mut actor = echo_actor(&ctx, "running");
    assert!(!actor.join_timeout(Duration::from_millis(30)).unwrap());
    actor.close().unwrap();
}

#[test]
fn close_is_idempotent() {
    let ctx = Context::new();
    let mut actor = echo_actor(&ctx, "closing");
    actor.close().unwrap();
    actor.close().unwrap();
    assert!(actor.frontend().is_err());
}

#[test]
fn payload_failure_surfaces_at_join() {
    let ctx = Context::new();
    let mut actor = Actor::spawn(&ctx, "faulty", |_control, _token| {
        Err(DriveshaftError::InvalidState("engine seized"))
    })
    .unwrap();

    assert!(actor.join_timeout(Duration::from_secs(2)).unwrap());
    assert!(matches!(
        actor.join(),
        Err(DriveshaftError::InvalidState(_))
    ));
}

#[test]
fn shared_token_cancels_group() {
    let ctx = Context::new();
    let token = CancellationToken::new();
    let mut workers: Vec<Actor> = (0..3)
        .map(|i| {
            Actor::spawn_with_token(&ctx, &format!("group-{i}"), token.clone(), |_c, token| {
                while !token.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok(())
            })
            .unwrap()
        })
        .collect();

    token.cancel();
    for actor in &mut workers {
        assert!(actor.join_timeout(Duration::from_secs(2)).unwrap());
        actor.join().unwrap();
    }
}

#[test]
fn context_terminate_unwinds_actor() {
    let ctx = Context::new();
    let mut actor = echo_actor(&ctx, "terminated");
    ctx.terminate();

    assert!(actor.join_timeout(Duration::from_secs(2)).unwrap());
    // termination is a clean exit, not a failure
    actor.join().unwrap();
}

#[test]
fn monitor_pumps_socket_events() {
    let ctx = Context::new();
    let mut server = Socket::new(&ctx, SocketKind::Pair);
    let events = server.monitored();
    server.bind("inproc://monitored-actor").unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let mut monitor = ConnectionMonitor::spawn(&ctx, events, move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();

    let mut client = Socket::new(&ctx, SocketKind::Pair);
    client.connect("inproc://monitored-actor").unwrap();
    client
        .send_message(Message::new().push_str("hello"))
        .unwrap();
    server
        .recv_message_timeout(Duration::from_secs(2))
        .unwrap();

    // Bound + Accepted, delivered asynchronously
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while seen.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(seen.load(Ordering::SeqCst) >= 2);
    monitor.close().unwrap();
}
