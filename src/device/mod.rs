//! Socket-pair relay devices.
//!
//! A device owns a frontend and a backend socket and shuttles complete
//! messages between them on a dedicated actor thread. The relay behavior
//! for each direction is a [`DeviceStrategy`]; the engine ([`Device`])
//! handles everything else: deferred configuration, the launch sequence,
//! the poll loop, cancellation, and teardown.
//!
//! Lifecycle: configure via [`Device::frontend_setup`] and
//! [`Device::backend_setup`], then [`Device::start`]. Endpoints are bound
//! on the engine thread; a bind or connect failure fails the launch and
//! surfaces when joining. [`Device::close`] (or drop) cancels the engine
//! and waits for it to unwind.

mod broker;
mod forwarder;
mod gateway;
mod queue;

pub use broker::{BrokerDevice, BrokerStrategy};
pub use forwarder::{ForwarderDevice, ForwarderStrategy};
pub use gateway::{StreamGatewayDevice, StreamGatewayStrategy};
pub use queue::{QueueDevice, QueueStrategy};

use std::time::Duration;

use tracing::{debug, trace};

use crate::actor::{Actor, CancellationToken};
use crate::context::Context;
use crate::error::{DriveshaftError, Result};
use crate::forward::ForwardOutcome;
use crate::poll::{poll, PollItem};
use crate::setup::SocketSetup;
use crate::socket::{Socket, SocketKind};

/// Default poll interval; bounds cancellation latency.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-direction relay behavior of a device.
///
/// The engine calls exactly one method per ready direction per loop
/// iteration, with exclusive access to both sockets. `Blocked` outcomes
/// are expected under backpressure and merely logged; errors unwind the
/// engine.
pub trait DeviceStrategy: Send + 'static {
    /// The frontend has a complete message (or retained backlog) pending.
    fn frontend_ready(&mut self, frontend: &mut Socket, backend: &mut Socket)
        -> Result<ForwardOutcome>;

    /// The backend has a complete message (or retained backlog) pending.
    fn backend_ready(&mut self, frontend: &mut Socket, backend: &mut Socket)
        -> Result<ForwardOutcome>;

    /// Short name used for thread naming and logs.
    fn name(&self) -> &'static str;
}

/// The sockets, their deferred configuration, and the strategy; moved onto
/// the engine thread at start.
struct DeviceCore<S> {
    frontend: Socket,
    backend: Socket,
    frontend_setup: SocketSetup,
    backend_setup: SocketSetup,
    strategy: S,
}

/// A relay engine between a frontend and a backend socket.
///
/// See the concrete aliases: [`ForwarderDevice`], [`QueueDevice`],
/// [`BrokerDevice`], [`StreamGatewayDevice`].
pub struct Device<S: DeviceStrategy> {
    ctx: Context,
    core: Option<DeviceCore<S>>,
    actor: Option<Actor>,
    poll_interval: Duration,
    initialized: bool,
}

impl<S: DeviceStrategy> Device<S> {
    pub(crate) fn with_strategy(
        ctx: &Context,
        frontend_kind: SocketKind,
        backend_kind: SocketKind,
        strategy: S,
    ) -> Self {
        Self {
            ctx: ctx.clone(),
            core: Some(DeviceCore {
                frontend: Socket::new(ctx, frontend_kind),
                backend: Socket::new(ctx, backend_kind),
                frontend_setup: SocketSetup::new(),
                backend_setup: SocketSetup::new(),
                strategy,
            }),
            actor: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            initialized: false,
        }
    }

    /// Deferred configuration for the frontend socket.
    ///
    /// # Errors
    ///
    /// `InvalidState` once the device has started.
    pub fn frontend_setup(&mut self) -> Result<&mut SocketSetup> {
        self.core
            .as_mut()
            .map(|core| &mut core.frontend_setup)
            .ok_or(DriveshaftError::InvalidState("device already started"))
    }

    /// Deferred configuration for the backend socket.
    pub fn backend_setup(&mut self) -> Result<&mut SocketSetup> {
        self.core
            .as_mut()
            .map(|core| &mut core.backend_setup)
            .ok_or(DriveshaftError::InvalidState("device already started"))
    }

    /// Override the poll interval (cancellation latency bound).
    ///
    /// # Errors
    ///
    /// `InvalidState` once the device has started.
    pub fn set_poll_interval(&mut self, interval: Duration) -> Result<()> {
        if self.actor.is_some() {
            return Err(DriveshaftError::InvalidState("device already started"));
        }
        self.poll_interval = interval;
        Ok(())
    }

    /// Apply the recorded configuration to both sockets.
    ///
    /// Runs on the caller's thread so configuration mistakes (no endpoint
    /// queued, bad option value) surface before any thread is spawned.
    /// Called implicitly by [`start`](Self::start).
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        let core = self
            .core
            .as_mut()
            .ok_or(DriveshaftError::InvalidState("device already started"))?;
        core.frontend_setup.configure(&mut core.frontend)?;
        core.backend_setup.configure(&mut core.backend)?;
        self.initialized = true;
        Ok(())
    }

    /// Launch the engine on its own thread.
    ///
    /// Endpoints are bound and connected on the engine thread; a failure
    /// there unwinds the engine and surfaces from [`join`](Self::join).
    pub fn start(&mut self) -> Result<()> {
        if self.actor.is_some() {
            return Err(DriveshaftError::InvalidState("device already started"));
        }
        self.initialize()?;
        let mut core = self
            .core
            .take()
            .ok_or(DriveshaftError::InvalidState("device already started"))?;
        let interval = self.poll_interval;
        let actor = Actor::spawn(&self.ctx, core.strategy.name(), move |_control, token| {
            run_device(&mut core, token, interval)
        })?;
        self.actor = Some(actor);
        Ok(())
    }

    /// Whether the engine thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.actor.as_ref().is_some_and(Actor::is_running)
    }

    /// Request the engine to stop; returns immediately.
    pub fn stop(&self) {
        if let Some(actor) = &self.actor {
            actor.stop();
        }
    }

    /// Wait for the engine thread to exit and surface its result.
    ///
    /// Call [`stop`](Self::stop) first, or the engine keeps relaying.
    pub fn join(&mut self) -> Result<()> {
        match self.actor.as_mut() {
            Some(actor) => actor.join(),
            None => Ok(()),
        }
    }

    /// Wait up to `timeout` for the engine to exit. Returns whether it has.
    pub fn join_timeout(&self, timeout: Duration) -> Result<bool> {
        match self.actor.as_ref() {
            Some(actor) => actor.join_timeout(timeout),
            None => Ok(true),
        }
    }

    /// Stop the engine and wait for it to unwind. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.stop();
        match self.actor.take() {
            Some(mut actor) => actor.close(),
            None => Ok(()),
        }
    }
}

impl<S: DeviceStrategy> Drop for Device<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl<S: DeviceStrategy> std::fmt::Debug for Device<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("running", &self.is_running())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Engine thread body: launch, relay until cancelled, tear down.
fn run_device<S: DeviceStrategy>(
    core: &mut DeviceCore<S>,
    token: &CancellationToken,
    interval: Duration,
) -> Result<()> {
    debug!(device = core.strategy.name(), "device engine starting");
    core.frontend_setup.bind_connect(&mut core.frontend)?;
    core.backend_setup.bind_connect(&mut core.backend)?;

    let result = device_loop(core, token, interval);

    core.frontend_setup.unbind_disconnect(&mut core.frontend);
    core.backend_setup.unbind_disconnect(&mut core.backend);
    core.frontend.close();
    core.backend.close();
    debug!(device = core.strategy.name(), "device engine stopped");

    match result {
        Err(e) if e.is_termination() => Ok(()),
        Err(e) if token.is_cancelled() => {
            debug!(device = core.strategy.name(), error = %e, "error during shutdown ignored");
            Ok(())
        }
        other => other,
    }
}

fn device_loop<S: DeviceStrategy>(
    core: &mut DeviceCore<S>,
    token: &CancellationToken,
    interval: Duration,
) -> Result<()> {
    while !token.is_cancelled() {
        // retry retained backlogs every iteration; a blocked relay must
        // drain once the destination has capacity even with no new traffic
        flush_backlog(&mut core.frontend)?;
        flush_backlog(&mut core.backend)?;

        let (frontend_ready, backend_ready) = {
            let mut items = [
                PollItem::readable(&mut core.frontend),
                PollItem::readable(&mut core.backend),
            ];
            if !poll(&mut items, Some(interval))? {
                continue;
            }
            (items[0].is_readable(), items[1].is_readable())
        };

        let DeviceCore {
            frontend,
            backend,
            strategy,
            ..
        } = core;
        if frontend_ready {
            if strategy.frontend_ready(frontend, backend)? == ForwardOutcome::Blocked {
                trace!(device = strategy.name(), "frontend relay blocked");
            }
        }
        if backend_ready {
            if strategy.backend_ready(frontend, backend)? == ForwardOutcome::Blocked {
                trace!(device = strategy.name(), "backend relay blocked");
            }
        }
    }
    Ok(())
}

/// Retry a socket's retained outbound messages; still-full queues are not
/// an error, they are retried on the next iteration.
fn flush_backlog(socket: &mut Socket) -> Result<()> {
    if !socket.has_pending() {
        return Ok(());
    }
    match socket.flush() {
        Ok(()) => Ok(()),
        Err(e) if e.is_transient() => {
            trace!("backlog still blocked");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
