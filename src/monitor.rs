//! Socket event monitoring.
//!
//! Sockets emit lifecycle events (bind, connect, accept, disconnect) on an
//! optional channel. [`ConnectionMonitor`] pumps such a channel to a user
//! handler on its own actor thread; it is an alternate actor payload, not a
//! device, and demonstrates the cancellable-loop pattern without the
//! dual-socket engine.

use std::fmt;
use std::time::Duration;

use crate::actor::Actor;
use crate::context::Context;
use crate::error::Result;

/// Socket lifecycle events.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Socket successfully bound to an endpoint.
    Bound(String),

    /// Bind operation failed.
    BindFailed {
        /// Address the bind targeted.
        endpoint: String,
        /// Failure description.
        reason: String,
    },

    /// Socket successfully connected to a peer.
    Connected(String),

    /// Connection attempt failed.
    ConnectFailed {
        /// Address the connect targeted.
        endpoint: String,
        /// Failure description.
        reason: String,
    },

    /// Socket accepted a new incoming connection.
    Accepted(String),

    /// A peer went away.
    Disconnected(String),

    /// Socket was closed.
    Closed,
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound(ep) => write!(f, "Bound to {ep}"),
            Self::BindFailed { endpoint, reason } => {
                write!(f, "Bind failed for {endpoint}: {reason}")
            }
            Self::Connected(ep) => write!(f, "Connected to {ep}"),
            Self::ConnectFailed { endpoint, reason } => {
                write!(f, "Connect failed for {endpoint}: {reason}")
            }
            Self::Accepted(ep) => write!(f, "Accepted connection via {ep}"),
            Self::Disconnected(ep) => write!(f, "Disconnected from {ep}"),
            Self::Closed => write!(f, "Socket closed"),
        }
    }
}

/// Handle for receiving socket events.
pub type MonitorReceiver = flume::Receiver<SocketEvent>;

/// Sender side used by socket implementations to emit events.
pub(crate) type MonitorSender = flume::Sender<SocketEvent>;

/// How often the monitor pump re-checks its cancellation token.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Background event pump: delivers [`SocketEvent`]s to a handler on a
/// dedicated actor thread until cancelled or the event source closes.
///
/// # Examples
///
/// ```no_run
/// use driveshaft::context::Context;
/// use driveshaft::monitor::ConnectionMonitor;
/// use driveshaft::socket::{Socket, SocketKind};
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut server = Socket::new(&ctx, SocketKind::Pair);
/// let events = server.monitored();
/// server.bind("inproc://svc")?;
///
/// let mut monitor = ConnectionMonitor::spawn(&ctx, events, |event| {
///     println!("socket event: {event}");
/// })?;
/// // ...
/// monitor.close()?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionMonitor {
    actor: Actor,
}

impl ConnectionMonitor {
    /// Spawn the event pump on its own thread.
    ///
    /// The pump exits when cancelled, when the context terminates, or when
    /// every event sender has been dropped.
    pub fn spawn<F>(ctx: &Context, events: MonitorReceiver, mut handler: F) -> Result<Self>
    where
        F: FnMut(SocketEvent) + Send + 'static,
    {
        let actor = Actor::spawn(ctx, "monitor", move |control, token| {
            while !token.is_cancelled() {
                control.context().check()?;
                match events.recv_timeout(PUMP_INTERVAL) {
                    Ok(event) => handler(event),
                    Err(flume::RecvTimeoutError::Timeout) => continue,
                    Err(flume::RecvTimeoutError::Disconnected) => break,
                }
            }
            Ok(())
        })?;
        Ok(Self { actor })
    }

    /// Request the pump to stop; returns immediately.
    pub fn stop(&self) {
        self.actor.stop();
    }

    /// Stop the pump and wait for its thread to exit. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.actor.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = SocketEvent::Bound("inproc://svc".to_string());
        assert_eq!(event.to_string(), "Bound to inproc://svc");

        let event = SocketEvent::BindFailed {
            endpoint: "inproc://svc".to_string(),
            reason: "already in use".to_string(),
        };
        assert_eq!(
            event.to_string(),
            "Bind failed for inproc://svc: already in use"
        );
    }
}
