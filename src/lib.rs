//! # Driveshaft
//!
//! A message-queue device layer: socket pairs relaying multipart messages
//! between a frontend and a backend on dedicated engine threads.
//!
//! ## Architecture
//!
//! Driveshaft is structured bottom-up:
//!
//! - **Transport**: [`socket`] — in-process message sockets over bounded
//!   channels, with multipart atomicity and per-kind routing
//! - **Mechanisms**: [`poll`] (level-triggered readiness), [`setup`]
//!   (deferred configuration), [`forward`] (atomic one-message relay),
//!   [`actor`] (cancellable threads with a control channel)
//! - **Devices**: [`device`] — forwarder, queue, broker, and stream
//!   gateway engines assembled from the mechanisms
//!
//! ## Quick Start
//!
//! ### Request broker
//!
//! ```rust,no_run
//! use driveshaft::prelude::*;
//!
//! # fn main() -> driveshaft::error::Result<()> {
//! let ctx = Context::new();
//!
//! let mut broker = BrokerDevice::new(&ctx);
//! broker.frontend_setup()?.bind("inproc://clients")?;
//! broker.backend_setup()?.bind("inproc://workers")?;
//! broker.start()?;
//!
//! let mut client = Socket::new(&ctx, SocketKind::Dealer);
//! client.connect("inproc://clients")?;
//! client.send_message(Message::new().push_str("job"))?;
//!
//! // ... a worker DEALER connected to inproc://workers handles it ...
//!
//! broker.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Background actor
//!
//! ```rust,no_run
//! use driveshaft::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> driveshaft::error::Result<()> {
//! let ctx = Context::new();
//! let mut actor = Actor::spawn(&ctx, "worker", |control, token| {
//!     while !token.is_cancelled() {
//!         match control.recv_message_timeout(Duration::from_millis(50)) {
//!             Ok(msg) => control.send_message(msg)?,
//!             Err(e) if e.is_transient() => continue,
//!             Err(e) if e.is_termination() => break,
//!             Err(e) => return Err(e),
//!         }
//!     }
//!     Ok(())
//! })?;
//! actor.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Shutdown
//!
//! Everything hangs off an explicit [`context::Context`]. Terminating it
//! fails subsequent socket operations with `Terminated`; running devices
//! and actors observe it within one polling interval and unwind cleanly.

#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod context;
/// Opt-in tracing initialization for tests and debugging.
pub mod dev_tracing;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod forward;
pub mod frame;
pub mod message;
pub mod monitor;
pub mod options;
pub mod poll;
pub mod setup;
pub mod socket;

/// Convenience re-exports for the common surface.
pub mod prelude {
    pub use crate::actor::{Actor, CancellationToken};
    pub use crate::context::Context;
    pub use crate::device::{
        BrokerDevice, Device, DeviceStrategy, ForwarderDevice, QueueDevice, StreamGatewayDevice,
    };
    pub use crate::error::{DriveshaftError, Result};
    pub use crate::forward::{forward_message, ForwardOutcome};
    pub use crate::frame::Frame;
    pub use crate::message::Message;
    pub use crate::monitor::{ConnectionMonitor, SocketEvent};
    pub use crate::options::{SocketOption, SocketOptions};
    pub use crate::poll::{poll, Interest, PollItem};
    pub use crate::setup::SocketSetup;
    pub use crate::socket::{Socket, SocketKind};
}
