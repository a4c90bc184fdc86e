//! Pub-sub forwarder device.

use crate::context::Context;
use crate::error::{DriveshaftError, Result};
use crate::forward::{forward_message, ForwardOutcome};
use crate::socket::{Socket, SocketKind};

use super::{Device, DeviceStrategy};

/// One-way relay from a SUB frontend to a PUB backend.
///
/// Bridges publishers to subscribers across endpoint boundaries: the
/// frontend subscribes to everything upstream, the backend re-publishes to
/// downstream subscribers, which filter by their own subscriptions.
#[derive(Debug, Default)]
pub struct ForwarderStrategy;

impl DeviceStrategy for ForwarderStrategy {
    fn frontend_ready(
        &mut self,
        frontend: &mut Socket,
        backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        forward_message(frontend, backend)
    }

    fn backend_ready(
        &mut self,
        _frontend: &mut Socket,
        _backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        // PUB backends are never readable, so this cannot be reached
        Err(DriveshaftError::Unsupported(
            "forwarder devices relay frontend to backend only",
        ))
    }

    fn name(&self) -> &'static str {
        "forwarder"
    }
}

/// Forwarder device: SUB frontend, PUB backend.
///
/// # Examples
///
/// ```no_run
/// use driveshaft::context::Context;
/// use driveshaft::device::ForwarderDevice;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut device = ForwarderDevice::new(&ctx);
/// device.frontend_setup()?.bind("inproc://upstream")?;
/// device.backend_setup()?.bind("inproc://downstream")?;
/// device.start()?;
/// # Ok(())
/// # }
/// ```
pub type ForwarderDevice = Device<ForwarderStrategy>;

impl ForwarderDevice {
    /// Create a forwarder; the frontend subscribes to everything.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        let mut device =
            Device::with_strategy(ctx, SocketKind::Sub, SocketKind::Pub, ForwarderStrategy);
        if let Some(core) = device.core.as_mut() {
            core.frontend_setup.subscribe_all();
        }
        device
    }
}
