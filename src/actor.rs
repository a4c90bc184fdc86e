//! Cancellable background threads with a PAIR control channel.
//!
//! An [`Actor`] runs a payload closure on a dedicated thread. The payload
//! receives a control socket (one end of an exclusive PAIR link) and a
//! [`CancellationToken`]; the owner keeps the other end of the link plus
//! the token. Spawning performs a handshake: the worker binds its control
//! endpoint and reports readiness before `spawn` returns, so the owner can
//! send on the control channel immediately without racing the bind.
//!
//! The payload is responsible for checking the token between units of
//! work. A payload error is captured and surfaced when the owner joins;
//! termination-category errors are treated as a clean exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::context::Context;
use crate::error::{DriveshaftError, Result};
use crate::socket::{Socket, SocketKind};

/// Cooperative cancellation flag shared between an actor and its owner.
///
/// Cancelling is a request, not a preemption: the payload observes it at
/// its next token check.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Irreversible.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A background thread joined to its owner by a PAIR control channel.
///
/// # Examples
///
/// ```
/// use driveshaft::actor::Actor;
/// use driveshaft::context::Context;
/// use driveshaft::message::Message;
/// use std::time::Duration;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut actor = Actor::spawn(&ctx, "echo", |control, token| {
///     while !token.is_cancelled() {
///         match control.recv_message_timeout(Duration::from_millis(50)) {
///             Ok(msg) => control.send_message(msg)?,
///             Err(e) if e.is_transient() => continue,
///             Err(e) if e.is_termination() => break,
///             Err(e) => return Err(e),
///         }
///     }
///     Ok(())
/// })?;
///
/// actor.frontend()?.send_message(Message::new().push_str("ping"))?;
/// let reply = actor.frontend()?.recv_message_timeout(Duration::from_secs(1))?;
/// assert_eq!(reply.parse_frame_str(0).unwrap(), "ping");
/// actor.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Actor {
    frontend: Option<Socket>,
    handle: Option<JoinHandle<()>>,
    done_rx: flume::Receiver<()>,
    failure: Arc<Mutex<Option<DriveshaftError>>>,
    token: CancellationToken,
    endpoint: String,
}

impl Actor {
    /// Spawn a payload on its own thread with a fresh token.
    ///
    /// Does not return until the worker's control endpoint is bound; a
    /// bind failure on the worker side fails the spawn.
    pub fn spawn<F>(ctx: &Context, name: &str, payload: F) -> Result<Self>
    where
        F: FnOnce(&mut Socket, &CancellationToken) -> Result<()> + Send + 'static,
    {
        Self::spawn_with_token(ctx, name, CancellationToken::new(), payload)
    }

    /// Spawn with a caller-provided token, allowing one token to cancel a
    /// group of actors.
    pub fn spawn_with_token<F>(
        ctx: &Context,
        name: &str,
        token: CancellationToken,
        payload: F,
    ) -> Result<Self>
    where
        F: FnOnce(&mut Socket, &CancellationToken) -> Result<()> + Send + 'static,
    {
        ctx.check()?;
        let endpoint = format!("inproc://driveshaft-actor-{name}-{}", ctx.next_serial());
        let (ready_tx, ready_rx) = flume::bounded::<Result<()>>(1);
        let (done_tx, done_rx) = flume::bounded::<()>(1);
        let failure = Arc::new(Mutex::new(None));

        let worker = ActorWorker {
            ctx: ctx.clone(),
            endpoint: endpoint.clone(),
            token: token.clone(),
            failure: Arc::clone(&failure),
            ready_tx,
            done_tx,
        };
        let handle = std::thread::Builder::new()
            .name(format!("driveshaft-{name}"))
            .spawn(move || worker.run(payload))?;

        // handshake: wait for the control endpoint before connecting
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(DriveshaftError::InvalidState(
                    "actor worker exited during startup",
                ));
            }
        }

        let mut frontend = Socket::new(ctx, SocketKind::Pair);
        frontend.connect(&endpoint)?;
        debug!(endpoint = %endpoint, "actor spawned");

        Ok(Self {
            frontend: Some(frontend),
            handle: Some(handle),
            done_rx,
            failure,
            token,
            endpoint,
        })
    }

    /// The owner's end of the control channel.
    ///
    /// # Errors
    ///
    /// `InvalidState` after close.
    pub fn frontend(&mut self) -> Result<&mut Socket> {
        self.frontend
            .as_mut()
            .ok_or(DriveshaftError::InvalidState("actor has been closed"))
    }

    /// The actor's cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The control channel endpoint, for diagnostics.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the worker thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.done_rx.is_empty() && !self.done_rx.is_disconnected()
    }

    /// Request the payload to stop; returns immediately.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Wait for the worker thread to exit and surface its result.
    ///
    /// # Errors
    ///
    /// The payload's failure if it returned one, `InvalidState` if the
    /// worker panicked.
    pub fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(DriveshaftError::InvalidState("actor worker panicked"));
            }
        }
        match self.failure.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Wait up to `timeout` for the worker to exit without consuming its
    /// result. Returns whether the worker has exited.
    pub fn join_timeout(&self, timeout: Duration) -> Result<bool> {
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => Ok(true),
            Err(flume::RecvTimeoutError::Timeout) => Ok(false),
        }
    }

    /// Cancel, drop the control channel, and join. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.token.cancel();
        if let Some(mut frontend) = self.frontend.take() {
            frontend.close();
        }
        self.join()
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        self.token.cancel();
        self.frontend.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("endpoint", &self.endpoint)
            .field("running", &self.is_running())
            .finish()
    }
}

struct ActorWorker {
    ctx: Context,
    endpoint: String,
    token: CancellationToken,
    failure: Arc<Mutex<Option<DriveshaftError>>>,
    ready_tx: flume::Sender<Result<()>>,
    done_tx: flume::Sender<()>,
}

impl ActorWorker {
    fn run<F>(self, payload: F)
    where
        F: FnOnce(&mut Socket, &CancellationToken) -> Result<()>,
    {
        let mut control = Socket::new(&self.ctx, SocketKind::Pair);
        if let Err(e) = control.bind(&self.endpoint) {
            let _ = self.ready_tx.send(Err(e));
            return;
        }
        let _ = self.ready_tx.send(Ok(()));

        if let Err(e) = payload(&mut control, &self.token) {
            if e.is_termination() {
                debug!(endpoint = %self.endpoint, "actor exited on termination");
            } else {
                debug!(endpoint = %self.endpoint, error = %e, "actor payload failed");
                *self.failure.lock() = Some(e);
            }
        }
        control.close();
        let _ = self.done_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cancel() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_spawn_handshake_allows_immediate_send() {
        let ctx = Context::new();
        let mut actor = Actor::spawn(&ctx, "handshake", |control, token| {
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
        .unwrap();

        // no sleep: the control endpoint is bound before spawn returns
        actor
            .frontend()
            .unwrap()
            .send_message(crate::message::Message::new().push_str("now"))
            .unwrap();
        let reply = actor
            .frontend()
            .unwrap()
            .recv_message_timeout(Duration::from_secs(1))
            .unwrap();
        assert_eq!(reply.parse_frame_str(0).unwrap(), "now");
        actor.close().unwrap();
    }

    #[test]
    fn test_payload_error_surfaces_at_join() {
        let ctx = Context::new();
        let mut actor = Actor::spawn(&ctx, "failing", |_control, _token| {
            Err(DriveshaftError::invalid_argument("boom"))
        })
        .unwrap();

        assert!(actor.join_timeout(Duration::from_secs(1)).unwrap());
        assert!(matches!(
            actor.join(),
            Err(DriveshaftError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_termination_is_clean_exit() {
        let ctx = Context::new();
        let mut actor = Actor::spawn(&ctx, "terminating", |_control, _token| {
            Err(DriveshaftError::Terminated)
        })
        .unwrap();

        assert!(actor.join_timeout(Duration::from_secs(1)).unwrap());
        actor.join().unwrap();
    }
}
