//! Router-dealer request broker device.

use crate::context::Context;
use crate::error::Result;
use crate::forward::{forward_message, ForwardOutcome};
use crate::socket::{Socket, SocketKind};

use super::{Device, DeviceStrategy};

/// Bidirectional relay between a ROUTER frontend and a DEALER backend.
///
/// The frontend prefixes every request with the client's identity; the
/// relay preserves that envelope, so a worker that echoes the identity
/// frame back gets its reply routed to the original client. Replies
/// addressed to a client that has since disconnected are dropped.
#[derive(Debug, Default)]
pub struct BrokerStrategy;

impl DeviceStrategy for BrokerStrategy {
    fn frontend_ready(
        &mut self,
        frontend: &mut Socket,
        backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        forward_message(frontend, backend)
    }

    fn backend_ready(
        &mut self,
        frontend: &mut Socket,
        backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        forward_message(backend, frontend)
    }

    fn name(&self) -> &'static str {
        "broker"
    }
}

/// Broker device: ROUTER frontend, DEALER backend.
///
/// # Examples
///
/// ```no_run
/// use driveshaft::context::Context;
/// use driveshaft::device::BrokerDevice;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut device = BrokerDevice::new(&ctx);
/// device.frontend_setup()?.bind("inproc://clients")?;
/// device.backend_setup()?.bind("inproc://workers")?;
/// device.start()?;
/// # Ok(())
/// # }
/// ```
pub type BrokerDevice = Device<BrokerStrategy>;

impl BrokerDevice {
    /// Create a request broker.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Device::with_strategy(ctx, SocketKind::Router, SocketKind::Dealer, BrokerStrategy)
    }
}
