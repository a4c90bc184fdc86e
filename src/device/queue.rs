//! Push-pull pipeline queue device.

use crate::context::Context;
use crate::error::{DriveshaftError, Result};
use crate::forward::{forward_message, ForwardOutcome};
use crate::socket::{Socket, SocketKind};

use super::{Device, DeviceStrategy};

/// One-way relay from a PULL frontend to a PUSH backend.
///
/// Joins pipeline stages: fair-queues messages from upstream pushers and
/// redistributes them round-robin to downstream pullers, so producers and
/// consumers scale independently of each other.
#[derive(Debug, Default)]
pub struct QueueStrategy;

impl DeviceStrategy for QueueStrategy {
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
        // PUSH backends are never readable, so this cannot be reached
        Err(DriveshaftError::Unsupported(
            "queue devices relay frontend to backend only",
        ))
    }

    fn name(&self) -> &'static str {
        "queue"
    }
}

/// Queue device: PULL frontend, PUSH backend.
///
/// # Examples
///
/// ```no_run
/// use driveshaft::context::Context;
/// use driveshaft::device::QueueDevice;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut device = QueueDevice::new(&ctx);
/// device.frontend_setup()?.bind("inproc://producers")?;
/// device.backend_setup()?.bind("inproc://consumers")?;
/// device.start()?;
/// # Ok(())
/// # }
/// ```
pub type QueueDevice = Device<QueueStrategy>;

impl QueueDevice {
    /// Create a pipeline queue.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Device::with_strategy(ctx, SocketKind::Pull, SocketKind::Push, QueueStrategy)
    }
}
