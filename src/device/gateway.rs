//! Stream-dealer gateway device.

use tracing::debug;

use crate::context::Context;
use crate::error::{DriveshaftError, Result};
use crate::forward::ForwardOutcome;
use crate::frame::Frame;
use crate::message::Message;
use crate::socket::{Socket, SocketKind};

use super::{Device, DeviceStrategy};

/// Bidirectional relay between a STREAM frontend and a DEALER backend.
///
/// Inbound raw data is wrapped into a dealer envelope:
///
/// ```text
/// [connection identity] [empty] [gateway endpoint] [payload]
/// ```
///
/// so a backend service can tell connections and gateways apart. Replies
/// are expected as `[identity] [empty]? [payload...]`; the payload frames
/// are written back to the identified connection as one raw unit.
#[derive(Debug, Default)]
pub struct StreamGatewayStrategy;

impl DeviceStrategy for StreamGatewayStrategy {
    fn frontend_ready(
        &mut self,
        frontend: &mut Socket,
        backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        if backend.has_pending() {
            match backend.flush() {
                Ok(()) => {}
                Err(e) if e.is_transient() => return Ok(ForwardOutcome::Blocked),
                Err(e) => return Err(e),
            }
        }

        let msg = match frontend.recv_message() {
            Ok(msg) => msg,
            Err(e) if e.is_transient() => return Ok(ForwardOutcome::Idle),
            Err(e) => return Err(e),
        };
        let mut frames = msg.into_frames();
        if frames.is_empty() {
            return Ok(ForwardOutcome::Idle);
        }
        let identity = frames.remove(0);
        let origin = frontend.last_endpoint().unwrap_or("").to_string();

        let mut envelope = Message::new().push(identity).push_empty().push_str(&origin);
        for frame in frames {
            envelope = envelope.push(frame);
        }
        match backend.send_message(envelope) {
            Ok(()) => Ok(ForwardOutcome::Forwarded),
            Err(e) if e.is_transient() => Ok(ForwardOutcome::Blocked),
            Err(e) => Err(e),
        }
    }

    fn backend_ready(
        &mut self,
        frontend: &mut Socket,
        backend: &mut Socket,
    ) -> Result<ForwardOutcome> {
        let msg = match backend.recv_message() {
            Ok(msg) => msg,
            Err(e) if e.is_transient() => return Ok(ForwardOutcome::Idle),
            Err(e) => return Err(e),
        };
        let mut frames = msg.into_frames();
        if frames.len() < 2 {
            debug!("dropping reply without identity and payload");
            return Ok(ForwardOutcome::Idle);
        }
        let identity = frames.remove(0);
        if frames.first().is_some_and(Frame::is_empty) {
            frames.remove(0);
        }

        // the more flag stays on; the trailing empty frame terminates the
        // raw unit on the stream side
        frontend.try_send(identity, true)?;
        for frame in frames {
            frontend.try_send(frame, true)?;
        }
        match frontend.try_send(Frame::new(), true) {
            Ok(()) => Ok(ForwardOutcome::Forwarded),
            Err(DriveshaftError::WouldBlock) => Ok(ForwardOutcome::Blocked),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}

/// Stream gateway device: STREAM frontend, DEALER backend.
///
/// # Examples
///
/// ```no_run
/// use driveshaft::context::Context;
/// use driveshaft::device::StreamGatewayDevice;
///
/// # fn main() -> driveshaft::error::Result<()> {
/// let ctx = Context::new();
/// let mut device = StreamGatewayDevice::new(&ctx);
/// device.frontend_setup()?.bind("inproc://edge")?;
/// device.backend_setup()?.connect("inproc://service")?;
/// device.start()?;
/// # Ok(())
/// # }
/// ```
pub type StreamGatewayDevice = Device<StreamGatewayStrategy>;

impl StreamGatewayDevice {
    /// Create a stream gateway.
    #[must_use]
    pub fn new(ctx: &Context) -> Self {
        Device::with_strategy(
            ctx,
            SocketKind::Stream,
            SocketKind::Dealer,
            StreamGatewayStrategy,
        )
    }
}
